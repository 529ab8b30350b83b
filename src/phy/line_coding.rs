use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};
use crate::pipeline::Sample;

/// Baseband line code family
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineCode {
    /// Non-return-to-zero: the symbol level is held for the whole period
    Nrz,
    /// Return-to-zero: rest, active level, rest
    Rz,
    /// NRZ with linear transitions between symbols of different value
    Nrzt,
}

impl LineCode {
    pub const ALL: [LineCode; 3] = [LineCode::Rz, LineCode::Nrz, LineCode::Nrzt];

    pub fn name(&self) -> &'static str {
        match self {
            LineCode::Nrz => "NRZ",
            LineCode::Rz => "RZ",
            LineCode::Nrzt => "NRZT",
        }
    }
}

impl fmt::Display for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of one symbol period shared by the modulator and demodulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformParams {
    pub samples_per_symbol: usize,
    pub amplitude_high: Sample,
    pub amplitude_low: Sample,
    pub line_code: LineCode,
}

impl WaveformParams {
    pub fn new(
        samples_per_symbol: usize,
        amplitude_high: Sample,
        amplitude_low: Sample,
        line_code: LineCode,
    ) -> ChainResult<Self> {
        let params = Self {
            samples_per_symbol,
            amplitude_high,
            amplitude_low,
            line_code,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> ChainResult<()> {
        if self.samples_per_symbol == 0 {
            return Err(ChainError::invalid(
                "samples per symbol must be positive",
            ));
        }
        // also rejects NaN amplitudes
        if !(self.amplitude_low < self.amplitude_high) {
            return Err(ChainError::invalid(format!(
                "amplitude low ({}) must be below amplitude high ({})",
                self.amplitude_low, self.amplitude_high
            )));
        }
        if self.amplitude_high < 0.0 {
            return Err(ChainError::invalid(format!(
                "amplitude high ({}) must not be negative",
                self.amplitude_high
            )));
        }
        match self.line_code {
            LineCode::Nrz | LineCode::Nrzt if self.amplitude_low > 0.0 => {
                Err(ChainError::invalid(format!(
                    "{} requires amplitude low <= 0, got {}",
                    self.line_code, self.amplitude_low
                )))
            }
            LineCode::Rz if self.amplitude_low != 0.0 => {
                Err(ChainError::invalid(format!(
                    "RZ requires amplitude low == 0, got {}",
                    self.amplitude_low
                )))
            }
            _ => Ok(()),
        }
    }

    /// Active level carried by a bit
    pub fn level(&self, bit: bool) -> Sample {
        if bit {
            self.amplitude_high
        } else {
            self.amplitude_low
        }
    }

    /// Length of the outer thirds of a symbol period
    pub fn delta(&self) -> usize {
        self.samples_per_symbol / 3
    }

    /// Samples left over by the integer split, given to the middle third
    pub fn remainder(&self) -> usize {
        self.samples_per_symbol % 3
    }

    /// Middle third of a period (plus remainder): the RZ active interval and
    /// the NRZT plateau
    pub fn active_window(&self) -> Range<usize> {
        let delta = self.delta();
        delta..self.samples_per_symbol - delta
    }

    /// Midpoint decision threshold
    pub fn threshold(&self) -> Sample {
        (self.amplitude_high + self.amplitude_low) / 2.0
    }
}

impl Default for WaveformParams {
    fn default() -> Self {
        Self {
            samples_per_symbol: crate::utils::consts::DEFAULT_SAMPLES_PER_SYMBOL,
            amplitude_high: crate::utils::consts::DEFAULT_AMPLITUDE_HIGH,
            amplitude_low: crate::utils::consts::DEFAULT_AMPLITUDE_LOW,
            line_code: LineCode::Rz,
        }
    }
}

/// Append one NRZ symbol
pub(crate) fn shape_nrz(params: &WaveformParams, bit: bool, out: &mut Vec<Sample>) {
    let level = params.level(bit);
    out.extend(std::iter::repeat_n(level, params.samples_per_symbol));
}

/// Append one RZ symbol: rest, active (+ remainder), rest
pub(crate) fn shape_rz(params: &WaveformParams, bit: bool, out: &mut Vec<Sample>) {
    let delta = params.delta();
    let active = delta + params.remainder();
    out.extend(std::iter::repeat_n(0.0, delta));
    out.extend(std::iter::repeat_n(params.level(bit), active));
    out.extend(std::iter::repeat_n(0.0, delta));
}

/// Append one NRZT symbol. An edge shared with a neighbour of the same value
/// stays flat; any other edge (including the sequence ends) ramps through 0.
pub(crate) fn shape_nrzt(
    params: &WaveformParams,
    previous: Option<bool>,
    bit: bool,
    next: Option<bool>,
    out: &mut Vec<Sample>,
) {
    let level = params.level(bit);
    let delta = params.delta();
    let span = delta as Sample;

    for j in 0..delta {
        out.push(if previous == Some(bit) {
            level
        } else {
            j as Sample / span * level
        });
    }
    out.extend(std::iter::repeat_n(level, delta + params.remainder()));
    for j in 0..delta {
        out.push(if next == Some(bit) {
            level
        } else {
            (delta - j) as Sample / span * level
        });
    }
}
