use std::marker::PhantomData;

use super::ChannelStats;
use crate::error::ChainResult;
use crate::pipeline::{Buffer, Transform};

/// Perfect channel: the output equals the input. Works for bits as well as
/// samples.
#[derive(Debug)]
pub struct IdealChannel<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> IdealChannel<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for IdealChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChannelStats for IdealChannel<T> {}

impl<T: Clone> Transform for IdealChannel<T> {
    type Input = T;
    type Output = T;

    fn name(&self) -> &'static str {
        "ideal-channel"
    }

    fn apply(&mut self, input: &Buffer<T>) -> ChainResult<Buffer<T>> {
        Ok(input.clone())
    }
}
