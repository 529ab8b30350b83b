// Physical layer: baseband line coding
// Maps logical bits to analog sample waveforms and back

pub mod demodulator;
pub mod line_coding;
pub mod modulator;

pub use demodulator::{Decision, Demodulator};
pub use line_coding::{LineCode, WaveformParams};
pub use modulator::Modulator;
