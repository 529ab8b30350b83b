use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ChannelStats;
use crate::error::{ChainError, ChainResult};
use crate::pipeline::{Buffer, Sample, Transform};

/// Maximum number of paths in a profile
pub const MAX_ECHOES: usize = 5;

/// One propagation path: delayed by `delay` samples, scaled by `amplitude`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub delay: usize,
    pub amplitude: Sample,
}

impl Echo {
    pub fn new(delay: usize, amplitude: Sample) -> ChainResult<Self> {
        let echo = Self { delay, amplitude };
        echo.validate()?;
        Ok(echo)
    }

    pub fn validate(&self) -> ChainResult<()> {
        if !(0.0..=1.0).contains(&self.amplitude) {
            return Err(ChainError::invalid(format!(
                "echo amplitude must be within [0, 1], got {}",
                self.amplitude
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Echo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.delay, self.amplitude)
    }
}

impl FromStr for Echo {
    type Err = ChainError;

    /// Parse `DELAY:AMPLITUDE`, e.g. `12:0.5`
    fn from_str(s: &str) -> ChainResult<Self> {
        let (delay, amplitude) = s.split_once(':').ok_or_else(|| {
            ChainError::invalid(format!("echo '{}' is not DELAY:AMPLITUDE", s))
        })?;
        let delay = delay.trim().parse::<usize>().map_err(|e| {
            ChainError::invalid(format!("echo delay '{}': {}", delay, e))
        })?;
        let amplitude = amplitude.trim().parse::<Sample>().map_err(|e| {
            ChainError::invalid(format!("echo amplitude '{}': {}", amplitude, e))
        })?;
        Echo::new(delay, amplitude)
    }
}

/// Ordered set of propagation paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultipathProfile {
    echoes: Vec<Echo>,
}

impl MultipathProfile {
    pub fn new(echoes: Vec<Echo>) -> ChainResult<Self> {
        let profile = Self { echoes };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> ChainResult<()> {
        if self.echoes.is_empty() {
            return Err(ChainError::invalid("multipath profile has no path"));
        }
        if self.echoes.len() > MAX_ECHOES {
            return Err(ChainError::invalid(format!(
                "multipath profile has {} paths, at most {} allowed",
                self.echoes.len(),
                MAX_ECHOES
            )));
        }
        self.echoes
            .iter()
            .try_for_each(Echo::validate)
    }

    pub fn echoes(&self) -> &[Echo] {
        &self.echoes
    }

    /// Longest delay, which is also the tail added to every buffer
    pub fn max_delay(&self) -> usize {
        self.echoes
            .iter()
            .map(|e| e.delay)
            .max()
            .unwrap_or(0)
    }

    /// Whether one of the paths arrives without delay. Such a path stands in
    /// for the direct signal.
    pub fn has_direct_path(&self) -> bool {
        self.echoes.iter().any(|e| e.delay == 0)
    }
}

/// Sums delayed, attenuated copies of the signal
pub struct MultipathChannel {
    profile: MultipathProfile,
}

impl MultipathChannel {
    pub fn new(profile: MultipathProfile) -> ChainResult<Self> {
        profile.validate()?;

        info!("Multipath channel initialized:");
        for (i, echo) in profile.echoes().iter().enumerate() {
            info!(
                "  - path {}: delay {} samples, amplitude {}",
                i, echo.delay, echo.amplitude
            );
        }

        Ok(Self { profile })
    }

    pub fn profile(&self) -> &MultipathProfile {
        &self.profile
    }

    /// Output is `len(input) + max_delay` long. Every path adds its scaled
    /// copy at its delay; the undelayed input is added on top unless a
    /// zero-delay path already carries it.
    pub fn transmit(&self, samples: &Buffer<Sample>) -> Buffer<Sample> {
        let input = samples.as_slice();
        let mut output = vec![0.0; input.len() + self.profile.max_delay()];

        for echo in self.profile.echoes() {
            let tail = &mut output[echo.delay..echo.delay + input.len()];
            for (out, &sample) in tail.iter_mut().zip(input) {
                *out += sample * echo.amplitude;
            }
        }

        if !self.profile.has_direct_path() {
            for (out, &sample) in output.iter_mut().zip(input) {
                *out += sample;
            }
        }

        debug!(
            "Combined {} paths: {} samples in, {} out",
            self.profile.echoes().len(),
            input.len(),
            output.len()
        );
        Buffer::from(output)
    }
}

impl ChannelStats for MultipathChannel {}

impl Transform for MultipathChannel {
    type Input = Sample;
    type Output = Sample;

    fn name(&self) -> &'static str {
        "multipath-channel"
    }

    fn apply(&mut self, input: &Buffer<Sample>) -> ChainResult<Buffer<Sample>> {
        Ok(self.transmit(input))
    }
}
