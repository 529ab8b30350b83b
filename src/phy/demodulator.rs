use super::line_coding::{LineCode, WaveformParams};
use crate::error::{ChainError, ChainResult};
use crate::pipeline::{Buffer, Sample, Transform};
use tracing::{debug, info};

/// How a symbol block is turned back into a bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    /// A block is `1` when one of its samples equals the high amplitude
    /// exactly. Only valid on a clean chain.
    ExactLevel,
    /// A block is `1` when the mean of its decision window exceeds the
    /// midpoint between the two amplitudes
    #[default]
    Threshold,
}

pub struct Demodulator {
    params: WaveformParams,
    decision: Decision,
}

impl Demodulator {
    pub fn new(params: WaveformParams, decision: Decision) -> ChainResult<Self> {
        params.validate()?;

        info!("Demodulator initialized:");
        info!("  - line coding: {}", params.line_code);
        info!("  - samples_per_symbol: {}", params.samples_per_symbol);
        info!("  - decision: {:?}", decision);

        Ok(Self { params, decision })
    }

    pub fn params(&self) -> &WaveformParams {
        &self.params
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    /// Recover one bit per full symbol block. Samples that do not complete a
    /// block are dropped.
    pub fn demodulate(&self, samples: &Buffer<Sample>) -> ChainResult<Buffer<bool>> {
        if samples.is_empty() {
            return Err(ChainError::non_conformant(
                "demodulator received an empty sample buffer",
            ));
        }

        let spp = self.params.samples_per_symbol;
        let blocks = samples.as_slice().chunks_exact(spp);
        let leftover = blocks.remainder().len();
        let bits: Buffer<bool> = blocks.map(|block| self.decide(block)).collect();

        if leftover > 0 {
            debug!(
                "Dropped {} trailing samples that do not complete a symbol",
                leftover
            );
        }
        debug!(
            "Demodulated {} samples into {} bits ({}, {:?})",
            samples.len(),
            bits.len(),
            self.params.line_code,
            self.decision
        );

        Ok(bits)
    }

    fn decide(&self, block: &[Sample]) -> bool {
        let window = match self.params.line_code {
            LineCode::Nrz => block,
            LineCode::Rz | LineCode::Nrzt => &block[self.params.active_window()],
        };

        match (self.decision, self.params.line_code) {
            // RZ carries a rest level inside every block, so it is always
            // decided on its active third
            (Decision::ExactLevel, LineCode::Nrz | LineCode::Nrzt) => window
                .iter()
                .any(|&sample| sample == self.params.amplitude_high),
            _ => mean(window) > self.params.threshold(),
        }
    }
}

fn mean(window: &[Sample]) -> Sample {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<Sample>() / window.len() as Sample
}

impl Transform for Demodulator {
    type Input = Sample;
    type Output = bool;

    fn name(&self) -> &'static str {
        "demodulator"
    }

    fn apply(&mut self, input: &Buffer<Sample>) -> ChainResult<Buffer<bool>> {
        self.demodulate(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::Modulator;

    fn params(spp: usize, high: Sample, low: Sample, code: LineCode) -> WaveformParams {
        WaveformParams::new(spp, high, low, code).unwrap()
    }

    #[test]
    fn test_nrz_scenario_round_trip() {
        let p = params(3, 5.0, 0.0, LineCode::Nrz);
        let demod = Demodulator::new(p, Decision::ExactLevel).unwrap();
        let samples = Buffer::from(vec![5.0, 5.0, 5.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            demod.demodulate(&samples).unwrap().as_slice(),
            &[true, false]
        );
    }

    #[test]
    fn test_clean_round_trip_for_every_code_and_decision() {
        let bits: Buffer<bool> = "1100101110001".parse().unwrap();
        for code in LineCode::ALL {
            let low = if code == LineCode::Rz { 0.0 } else { -2.0 };
            let p = params(12, 3.0, low, code);
            let samples = Modulator::new(p).unwrap().modulate(&bits);
            for decision in [Decision::ExactLevel, Decision::Threshold] {
                let demod = Demodulator::new(p, decision).unwrap();
                assert_eq!(
                    demod.demodulate(&samples).unwrap(),
                    bits,
                    "{code} with {decision:?}"
                );
            }
        }
    }

    #[test]
    fn test_threshold_tolerates_offsets() {
        let bits: Buffer<bool> = "0110".parse().unwrap();
        for code in LineCode::ALL {
            let low = if code == LineCode::Rz { 0.0 } else { -1.0 };
            let p = params(9, 1.0, low, code);
            let clean = Modulator::new(p).unwrap().modulate(&bits);
            // alternate +-0.3 so no sample sits on an exact level
            let noisy: Buffer<Sample> = clean
                .iter()
                .enumerate()
                .map(|(i, &s)| if i % 2 == 0 { s + 0.3 } else { s - 0.3 })
                .collect();

            let demod = Demodulator::new(p, Decision::Threshold).unwrap();
            assert_eq!(demod.demodulate(&noisy).unwrap(), bits, "{code}");
        }
    }

    #[test]
    fn test_rz_ignores_rest_thirds() {
        let p = params(9, 1.0, 0.0, LineCode::Rz);
        let demod = Demodulator::new(p, Decision::ExactLevel).unwrap();
        // spikes on the rest thirds must not flip a `0`
        let samples = Buffer::from(vec![1.0, 1.0, 1.0, 0.0, 0.1, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(demod.demodulate(&samples).unwrap().as_slice(), &[false]);
    }

    #[test]
    fn test_trailing_samples_are_dropped() {
        let p = params(3, 1.0, 0.0, LineCode::Nrz);
        let demod = Demodulator::new(p, Decision::Threshold).unwrap();
        let samples = Buffer::from(vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(
            demod.demodulate(&samples).unwrap().as_slice(),
            &[true, false]
        );

        let short = Buffer::from(vec![1.0, 1.0]);
        assert!(demod.demodulate(&short).unwrap().is_empty());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let p = params(3, 1.0, 0.0, LineCode::Nrz);
        let demod = Demodulator::new(p, Decision::Threshold).unwrap();
        assert!(matches!(
            demod.demodulate(&Buffer::new()),
            Err(ChainError::NonConformantInput(_))
        ));
    }
}
