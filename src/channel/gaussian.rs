use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ChannelStats;
use crate::error::{ChainError, ChainResult};
use crate::pipeline::{Buffer, Sample, Transform};

/// Noise calibration for [`GaussianChannel`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    pub samples_per_symbol: usize,
    /// Target SNR per bit, in dB
    pub target_snr_per_bit_db: f64,
    /// Seed for reproducible noise; `None` draws a fresh seed from the OS
    pub seed: Option<u64>,
}

impl NoiseParams {
    pub fn validate(&self) -> ChainResult<()> {
        if self.samples_per_symbol == 0 {
            return Err(ChainError::invalid(
                "samples per symbol must be positive",
            ));
        }
        if !self.target_snr_per_bit_db.is_finite() {
            return Err(ChainError::invalid(format!(
                "target SNR per bit must be finite, got {}",
                self.target_snr_per_bit_db
            )));
        }
        Ok(())
    }
}

/// Measurements of the last noisy transmission
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseStats {
    /// Mean squared input sample
    pub signal_power: f64,
    /// Variance the noise was drawn with
    pub noise_variance: f64,
    /// Mean squared noise draw
    pub noise_power: f64,
    pub snr_db: f64,
    pub ebn0_db: f64,
}

/// Noise variance giving `snr_per_bit_db` for a signal of `signal_power`
/// sampled `samples_per_symbol` times per bit
pub fn noise_variance(
    signal_power: f64,
    samples_per_symbol: usize,
    snr_per_bit_db: f64,
) -> f64 {
    signal_power * samples_per_symbol as f64
        / (2.0 * 10f64.powf(snr_per_bit_db / 10.0))
}

/// Additive white Gaussian noise channel calibrated from a target SNR per bit
pub struct GaussianChannel {
    params: NoiseParams,
    rng: ChaCha8Rng,
    stats: Option<NoiseStats>,
    noise: Vec<Sample>,
}

impl GaussianChannel {
    pub fn new(params: NoiseParams) -> ChainResult<Self> {
        let rng = match params.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self::with_rng(params, rng)
    }

    /// Use an explicit generator instead of one derived from the seed
    pub fn with_rng(params: NoiseParams, rng: ChaCha8Rng) -> ChainResult<Self> {
        params.validate()?;

        info!("Gaussian channel initialized:");
        info!(
            "  - target SNR per bit: {} dB",
            params.target_snr_per_bit_db
        );
        info!("  - samples_per_symbol: {}", params.samples_per_symbol);
        info!("  - seed: {:?}", params.seed);

        Ok(Self {
            params,
            rng,
            stats: None,
            noise: Vec::new(),
        })
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Statistics of the last call, `None` before the first non-empty buffer
    pub fn stats(&self) -> Option<&NoiseStats> {
        self.stats.as_ref()
    }

    /// Noise draws added by the last call, in sample order
    pub fn noise_samples(&self) -> &[Sample] {
        &self.noise
    }

    /// Add freshly drawn noise to `samples`
    pub fn transmit(&mut self, samples: &Buffer<Sample>) -> ChainResult<Buffer<Sample>> {
        self.noise.clear();
        if samples.is_empty() {
            warn!("Gaussian channel received an empty buffer, nothing to measure");
            self.stats = None;
            return Ok(Buffer::new());
        }

        let spp = self.params.samples_per_symbol;
        let signal_power = mean_power(samples.iter().copied());
        let variance =
            noise_variance(signal_power, spp, self.params.target_snr_per_bit_db);
        let normal = Normal::new(0.0, variance.sqrt()).map_err(|e| {
            ChainError::invalid(format!("noise variance {}: {}", variance, e))
        })?;

        let mut output = Buffer::with_capacity(samples.len());
        self.noise.reserve(samples.len());
        for &sample in samples {
            let draw = normal.sample(&mut self.rng) as Sample;
            self.noise.push(draw);
            output.push(sample + draw);
        }

        let noise_power = mean_power(self.noise.iter().copied());
        let snr_db =
            10.0 * (signal_power * spp as f64 / (2.0 * noise_power)).log10();
        let stats = NoiseStats {
            signal_power,
            noise_variance: variance,
            noise_power,
            snr_db,
            ebn0_db: snr_db,
        };

        debug!(
            "Added noise to {} samples: Ps={:.4}, var={:.4}, Pn={:.4}, SNR={:.2} dB",
            samples.len(),
            signal_power,
            variance,
            noise_power,
            snr_db
        );
        self.stats = Some(stats);
        Ok(output)
    }
}

fn mean_power(values: impl ExactSizeIterator<Item = Sample>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.map(|v| (v as f64) * (v as f64)).sum::<f64>() / n as f64
}

impl ChannelStats for GaussianChannel {
    fn measured_noise_power(&self) -> Option<f64> {
        self.stats.map(|s| s.noise_power)
    }

    fn measured_snr_db(&self) -> Option<f64> {
        self.stats.map(|s| s.snr_db)
    }

    fn measured_ebn0_db(&self) -> Option<f64> {
        self.stats.map(|s| s.ebn0_db)
    }

    fn noise_variance(&self) -> Option<f64> {
        self.stats.map(|s| s.noise_variance)
    }
}

impl Transform for GaussianChannel {
    type Input = Sample;
    type Output = Sample;

    fn name(&self) -> &'static str {
        "gaussian-channel"
    }

    fn apply(&mut self, input: &Buffer<Sample>) -> ChainResult<Buffer<Sample>> {
        self.transmit(input)
    }
}
