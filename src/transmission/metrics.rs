use serde::{Deserialize, Serialize};

use crate::phy::LineCode;

/// Bitwise comparison of a sent and a received message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitComparison {
    /// Bits present in both messages
    pub compared: usize,
    pub errors: usize,
}

impl BitComparison {
    /// Compare over the common prefix; extra bits on either side are ignored
    pub fn new(sent: &[bool], received: &[bool]) -> Self {
        let compared = sent.len().min(received.len());
        let errors = sent
            .iter()
            .zip(received)
            .filter(|(tx, rx)| tx != rx)
            .count();
        Self { compared, errors }
    }

    pub fn ber(&self) -> f64 {
        if self.compared == 0 {
            return 0.0;
        }
        self.errors as f64 / self.compared as f64
    }
}

/// Bit error rate of `received` against `sent`
pub fn bit_error_rate(sent: &[bool], received: &[bool]) -> f64 {
    BitComparison::new(sent, received).ber()
}

/// Complementary error function approximation.
pub fn erfc(x: f64) -> f64 {
    // Abramowitz & Stegun approximation 7.1.26
    let t = 1.0 / (1.0 + 0.3275911 * x.abs());
    let poly = t
        * (0.254829592
            + t * (-0.284496736
                + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let result = poly * (-x * x).exp();
    if x >= 0.0 { result } else { 2.0 - result }
}

/// Theoretical bit error probability of a line code at `ebn0_db`
pub fn theoretical_error_probability(line_code: LineCode, ebn0_db: f64) -> f64 {
    let ebn0 = 10f64.powf(ebn0_db / 10.0);
    match line_code {
        LineCode::Nrz | LineCode::Nrzt => 0.5 * erfc(ebn0.sqrt()),
        // half the energy of a symbol sits in the rest thirds
        LineCode::Rz => 0.5 * erfc((ebn0 / 2.0).sqrt()),
    }
}
