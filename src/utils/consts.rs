use crate::pipeline::Sample;

/// 日志级别（可被 RUST_LOG 覆盖）
pub const LOG_LEVEL: &str = "info";

// ============================================================================
// Waveform defaults
// ============================================================================

/// Samples per symbol period
pub const DEFAULT_SAMPLES_PER_SYMBOL: usize = 30;

/// Level carried by a logical `1`
pub const DEFAULT_AMPLITUDE_HIGH: Sample = 1.0;

/// Level carried by a logical `0`
pub const DEFAULT_AMPLITUDE_LOW: Sample = 0.0;

/// Length of the random message when none is given
pub const DEFAULT_MESSAGE_BITS: usize = 100;

// ============================================================================
// SNR sweep defaults
// ============================================================================

/// First SNR per bit of a sweep (dB)
pub const SWEEP_SNR_START_DB: f64 = -10.0;

/// Last SNR per bit of a sweep (dB, inclusive)
pub const SWEEP_SNR_END_DB: f64 = 15.0;

/// Step between two sweep points (dB)
pub const SWEEP_SNR_STEP_DB: f64 = 1.0;

/// Message length used at every sweep point
pub const SWEEP_MESSAGE_BITS: usize = 10_000;
