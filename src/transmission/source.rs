use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

use crate::error::{ChainError, ChainResult};
use crate::pipeline::{Buffer, Shared, SinkRef, Source};

/// Head of a chain: holds the message and pushes it downstream on `emit`
pub struct BitSource {
    message: Shared<bool>,
    emitted: Option<Shared<bool>>,
    sinks: Vec<SinkRef<bool>>,
}

impl BitSource {
    /// Source for a caller-supplied message
    pub fn fixed(message: Buffer<bool>) -> Self {
        info!("Fixed source: {} bits", message.len());
        Self {
            message: Rc::new(message),
            emitted: None,
            sinks: Vec::new(),
        }
    }

    /// Source for a "0101..." string
    pub fn from_bit_str(bits: &str) -> ChainResult<Self> {
        Ok(Self::fixed(bits.parse()?))
    }

    /// Source for `len` uniformly random bits; a seed makes the message
    /// reproducible
    pub fn random(len: usize, seed: Option<u64>) -> ChainResult<Self> {
        if len == 0 {
            return Err(ChainError::invalid(
                "random message length must be positive",
            ));
        }

        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        let message: Buffer<bool> =
            (0..len).map(|_| rng.random::<bool>()).collect();

        info!("Random source: {} bits (seed {:?})", len, seed);
        debug!("Message: {}", message.to_bit_string());
        Ok(Self {
            message: Rc::new(message),
            emitted: None,
            sinks: Vec::new(),
        })
    }

    pub fn message(&self) -> &Shared<bool> {
        &self.message
    }
}

impl Source<bool> for BitSource {
    fn connect(&mut self, sink: SinkRef<bool>) {
        self.sinks.push(sink);
    }

    fn emit(&mut self) -> ChainResult<()> {
        self.emitted = Some(Rc::clone(&self.message));
        for (i, sink) in self.sinks.iter().enumerate() {
            trace!("source: pushing to sink #{}", i);
            sink.borrow_mut()
                .receive(Rc::clone(&self.message))?;
        }
        Ok(())
    }

    fn last_emitted(&self) -> Option<&Shared<bool>> {
        self.emitted.as_ref()
    }
}
