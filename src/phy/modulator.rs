use super::line_coding::{LineCode, WaveformParams, shape_nrz, shape_nrzt, shape_rz};
use crate::error::ChainResult;
use crate::pipeline::{Buffer, Sample, Transform};
use tracing::{debug, info};

/// Turns logical bits into analog samples for one line code
pub struct Modulator {
    params: WaveformParams,
}

impl Modulator {
    /// Create a modulator; the waveform parameters are validated up front
    pub fn new(params: WaveformParams) -> ChainResult<Self> {
        params.validate()?;

        info!("Modulator initialized:");
        info!("  - line coding: {}", params.line_code);
        info!("  - samples_per_symbol: {}", params.samples_per_symbol);
        info!(
            "  - amplitudes: [{}, {}]",
            params.amplitude_low, params.amplitude_high
        );

        Ok(Self { params })
    }

    pub fn params(&self) -> &WaveformParams {
        &self.params
    }

    /// Modulate a bit sequence. An empty sequence gives an empty waveform.
    pub fn modulate(&self, bits: &Buffer<bool>) -> Buffer<Sample> {
        let bits = bits.as_slice();
        let mut samples =
            Vec::with_capacity(self.samples_for_bits(bits.len()));

        match self.params.line_code {
            LineCode::Nrz => {
                for &bit in bits {
                    shape_nrz(&self.params, bit, &mut samples);
                }
            }
            LineCode::Rz => {
                for &bit in bits {
                    shape_rz(&self.params, bit, &mut samples);
                }
            }
            LineCode::Nrzt => {
                for (i, &bit) in bits.iter().enumerate() {
                    let previous = i.checked_sub(1).map(|p| bits[p]);
                    let next = bits.get(i + 1).copied();
                    shape_nrzt(&self.params, previous, bit, next, &mut samples);
                }
            }
        }

        debug!(
            "Modulated {} bits into {} samples ({})",
            bits.len(),
            samples.len(),
            self.params.line_code
        );
        Buffer::from(samples)
    }

    pub fn samples_for_bits(&self, num_bits: usize) -> usize {
        num_bits * self.params.samples_per_symbol
    }
}

impl Transform for Modulator {
    type Input = bool;
    type Output = Sample;

    fn name(&self) -> &'static str {
        "modulator"
    }

    fn apply(&mut self, input: &Buffer<bool>) -> ChainResult<Buffer<Sample>> {
        Ok(self.modulate(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;

    fn modulator(spp: usize, high: Sample, low: Sample, code: LineCode) -> Modulator {
        Modulator::new(WaveformParams::new(spp, high, low, code).unwrap()).unwrap()
    }

    #[test]
    fn test_nrz_holds_level_for_the_whole_period() {
        let m = modulator(3, 5.0, 0.0, LineCode::Nrz);
        let samples = m.modulate(&Buffer::from(vec![true, false]));
        assert_eq!(samples.as_slice(), &[5.0, 5.0, 5.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rz_rests_on_outer_thirds() {
        let m = modulator(9, 1.0, 0.0, LineCode::Rz);
        let samples = m.modulate(&Buffer::from(vec![true]));
        assert_eq!(
            samples.as_slice(),
            &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_rz_remainder_widens_active_interval() {
        let m = modulator(5, 2.0, 0.0, LineCode::Rz);
        let samples = m.modulate(&Buffer::from(vec![true, false]));
        assert_eq!(
            samples.as_slice(),
            &[0.0, 2.0, 2.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_nrzt_transitions_between_symbols() {
        let m = modulator(3, 3.0, -3.0, LineCode::Nrzt);
        let samples = m.modulate(&Buffer::from(vec![true, true, false]));
        assert_eq!(
            samples.as_slice(),
            &[
                0.0, 3.0, 3.0, // ramp from rest, flat into the next `1`
                3.0, 3.0, 3.0, // flat on both sides
                -0.0, -3.0, -3.0, // both edges ramp: previous differs, no next
            ]
        );
    }

    #[test]
    fn test_output_length_is_bits_times_period() {
        for code in LineCode::ALL {
            let high = 1.0;
            let m = modulator(10, high, 0.0, code);
            let bits: Buffer<bool> = "1101001".parse().unwrap();
            assert_eq!(m.modulate(&bits).len(), 70, "{code}");
        }
    }

    #[test]
    fn test_empty_input_is_legal() {
        let m = modulator(30, 1.0, 0.0, LineCode::Rz);
        assert!(m.modulate(&Buffer::new()).is_empty());
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let params = WaveformParams {
            samples_per_symbol: 3,
            amplitude_high: 1.0,
            amplitude_low: -1.0,
            line_code: LineCode::Rz,
        };
        assert!(matches!(
            Modulator::new(params),
            Err(ChainError::InvalidParameter(_))
        ));
    }
}
