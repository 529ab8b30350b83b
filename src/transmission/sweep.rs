use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::simulator::simulate;
use crate::channel::MultipathProfile;
use crate::config::{MessageSpec, SimulationConfig};
use crate::error::{ChainError, ChainResult};
use crate::phy::{LineCode, WaveformParams};
use crate::pipeline::Sample;
use crate::ui::{ProgressManager, templates};
use crate::utils::consts::{
    DEFAULT_SAMPLES_PER_SYMBOL, SWEEP_MESSAGE_BITS, SWEEP_SNR_END_DB,
    SWEEP_SNR_START_DB, SWEEP_SNR_STEP_DB,
};

const PROGRESS_ID: &str = "sweep";

/// BER against SNR per bit, for several line codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub snr_start_db: f64,
    /// Inclusive
    pub snr_end_db: f64,
    pub snr_step_db: f64,
    pub message_bits: usize,
    pub seed: Option<u64>,
    pub line_codes: Vec<LineCode>,
    pub samples_per_symbol: usize,
    pub amplitude_high: Sample,
    /// Low level for NRZ and NRZT; RZ always rests on 0
    pub amplitude_low: Sample,
    pub use_repetition_coding: bool,
    pub multipath: Option<MultipathProfile>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            snr_start_db: SWEEP_SNR_START_DB,
            snr_end_db: SWEEP_SNR_END_DB,
            snr_step_db: SWEEP_SNR_STEP_DB,
            message_bits: SWEEP_MESSAGE_BITS,
            seed: None,
            line_codes: LineCode::ALL.to_vec(),
            samples_per_symbol: DEFAULT_SAMPLES_PER_SYMBOL,
            amplitude_high: 1.0,
            amplitude_low: -1.0,
            use_repetition_coding: false,
            multipath: None,
        }
    }
}

/// One simulation of the sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub snr_db: f64,
    pub line_code: LineCode,
    pub ber: f64,
    pub theoretical_error_probability: Option<f64>,
}

impl SweepConfig {
    pub fn validate(&self) -> ChainResult<()> {
        if !(self.snr_step_db.is_finite() && self.snr_step_db > 0.0) {
            return Err(ChainError::invalid(format!(
                "SNR step must be positive, got {}",
                self.snr_step_db
            )));
        }
        if !(self.snr_start_db.is_finite()
            && self.snr_end_db.is_finite()
            && self.snr_start_db <= self.snr_end_db)
        {
            return Err(ChainError::invalid(format!(
                "SNR range [{}, {}] is empty",
                self.snr_start_db, self.snr_end_db
            )));
        }
        if self.line_codes.is_empty() {
            return Err(ChainError::invalid("no line code selected"));
        }
        if self.message_bits == 0 {
            return Err(ChainError::invalid(
                "random message length must be positive",
            ));
        }
        for &code in &self.line_codes {
            self.waveform(code).validate()?;
        }
        if let Some(profile) = &self.multipath {
            profile.validate()?;
        }
        Ok(())
    }

    /// SNR values visited, from start up to and including end
    pub fn snr_points(&self) -> Vec<f64> {
        let steps =
            ((self.snr_end_db - self.snr_start_db) / self.snr_step_db + 1e-9).floor();
        (0..=steps as usize)
            .map(|i| self.snr_start_db + i as f64 * self.snr_step_db)
            .collect()
    }

    fn waveform(&self, line_code: LineCode) -> WaveformParams {
        let amplitude_low = match line_code {
            LineCode::Rz => 0.0,
            LineCode::Nrz | LineCode::Nrzt => self.amplitude_low,
        };
        WaveformParams {
            samples_per_symbol: self.samples_per_symbol,
            amplitude_high: self.amplitude_high,
            amplitude_low,
            line_code,
        }
    }

    fn simulation(&self, line_code: LineCode, snr_db: f64) -> SimulationConfig {
        SimulationConfig {
            message: MessageSpec::Random {
                len: self.message_bits,
            },
            seed: self.seed,
            waveform: self.waveform(line_code),
            snr_per_bit_db: Some(snr_db),
            multipath: self.multipath.clone(),
            use_repetition_coding: self.use_repetition_coding,
        }
    }
}

/// Run every (SNR, line code) pair and write one CSV row per SNR:
/// `snr_db,<CODE>,<CODE>_theory,...`
pub fn run_sweep<W: Write>(
    config: &SweepConfig,
    out: &mut W,
    progress: &ProgressManager,
) -> ChainResult<Vec<SweepPoint>> {
    config.validate()?;

    let snrs = config.snr_points();
    let total = (snrs.len() * config.line_codes.len()) as u64;
    info!(
        "Sweeping {} SNR values x {} line codes, {} bits each",
        snrs.len(),
        config.line_codes.len(),
        config.message_bits
    );
    if let Err(e) = progress.create_bar(PROGRESS_ID, total, templates::SWEEP, "") {
        warn!("Progress bar unavailable: {}", e);
    }

    let mut header = String::from("snr_db");
    for code in &config.line_codes {
        header.push_str(&format!(",{},{}_theory", code, code));
    }
    writeln!(out, "{}", header)?;

    let mut points = Vec::with_capacity(total as usize);
    for &snr_db in &snrs {
        let mut row = format!("{}", snr_db);
        for &line_code in &config.line_codes {
            let _ = progress.set_message(PROGRESS_ID, &format!("{} @ {} dB", line_code, snr_db));

            let report = simulate(config.simulation(line_code, snr_db))?;
            let point = SweepPoint {
                snr_db,
                line_code,
                ber: report.ber,
                theoretical_error_probability: report.theoretical_error_probability,
            };
            row.push_str(&format!(
                ",{},{}",
                point.ber,
                point
                    .theoretical_error_probability
                    .map(|p| p.to_string())
                    .unwrap_or_default()
            ));
            points.push(point);

            let _ = progress.inc(PROGRESS_ID, 1);
        }
        writeln!(out, "{}", row)?;
    }
    out.flush()?;

    let _ = progress.finish_and_clear(PROGRESS_ID);
    info!("Sweep done: {} runs", points.len());
    Ok(points)
}
