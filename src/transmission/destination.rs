use crate::error::ChainResult;
use crate::pipeline::{Shared, Sink};
use tracing::debug;

/// End of a chain: keeps the last buffer it was handed
#[derive(Debug)]
pub struct Destination<T> {
    received: Option<Shared<T>>,
    deliveries: usize,
}

impl<T> Destination<T> {
    pub fn new() -> Self {
        Self {
            received: None,
            deliveries: 0,
        }
    }

    pub fn received(&self) -> Option<&Shared<T>> {
        self.received.as_ref()
    }

    /// Number of buffers received so far
    pub fn deliveries(&self) -> usize {
        self.deliveries
    }
}

impl<T> Default for Destination<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sink<T> for Destination<T> {
    fn receive(&mut self, buffer: Shared<T>) -> ChainResult<()> {
        debug!("Destination received {} items", buffer.len());
        self.received = Some(buffer);
        self.deliveries += 1;
        Ok(())
    }
}
