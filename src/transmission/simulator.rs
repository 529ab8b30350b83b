use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::metrics::{BitComparison, theoretical_error_probability};
use super::{BitSource, Destination};
use crate::channel::{
    ChannelStats, GaussianChannel, IdealChannel, MultipathChannel, NoiseParams,
    NoiseStats,
};
use crate::config::{MessageSpec, SimulationConfig};
use crate::error::ChainResult;
use crate::error_correction::{RepetitionDecoder, RepetitionEncoder};
use crate::phy::{Decision, Demodulator, LineCode, Modulator};
use crate::pipeline::{Sample, Shared, SinkRef, Source, Stage, StageRef};

/// The analog link between modulator and demodulator
pub enum AnalogChannel {
    Ideal(StageRef<IdealChannel<Sample>>),
    Gaussian(StageRef<GaussianChannel>),
}

impl AnalogChannel {
    fn as_sink(&self) -> SinkRef<Sample> {
        match self {
            AnalogChannel::Ideal(stage) => stage.clone() as SinkRef<Sample>,
            AnalogChannel::Gaussian(stage) => stage.clone() as SinkRef<Sample>,
        }
    }

    fn connect(&self, sink: SinkRef<Sample>) {
        match self {
            AnalogChannel::Ideal(stage) => stage.borrow_mut().connect(sink),
            AnalogChannel::Gaussian(stage) => stage.borrow_mut().connect(sink),
        }
    }

    /// Samples handed to the demodulator by the last run
    pub fn output(&self) -> Option<Shared<Sample>> {
        match self {
            AnalogChannel::Ideal(stage) => stage.borrow().last_emitted().cloned(),
            AnalogChannel::Gaussian(stage) => {
                stage.borrow().last_emitted().cloned()
            }
        }
    }

    pub fn noise_stats(&self) -> Option<NoiseStats> {
        match self {
            AnalogChannel::Ideal(_) => None,
            AnalogChannel::Gaussian(stage) => stage.borrow().inner().stats().copied(),
        }
    }
}

impl ChannelStats for AnalogChannel {
    fn measured_noise_power(&self) -> Option<f64> {
        self.noise_stats().map(|s| s.noise_power)
    }

    fn measured_snr_db(&self) -> Option<f64> {
        self.noise_stats().map(|s| s.snr_db)
    }

    fn measured_ebn0_db(&self) -> Option<f64> {
        self.noise_stats().map(|s| s.ebn0_db)
    }

    fn noise_variance(&self) -> Option<f64> {
        self.noise_stats().map(|s| s.noise_variance)
    }
}

/// Outcome of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub line_code: LineCode,
    pub samples_per_symbol: usize,
    pub repetition_coding: bool,
    pub sent_bits: usize,
    pub received_bits: usize,
    pub compared_bits: usize,
    pub bit_errors: usize,
    pub ber: f64,
    /// Only present when the repetition decoder ran
    pub frames_corrected: Option<usize>,
    /// Only present on a Gaussian channel
    pub noise: Option<NoiseStats>,
    pub theoretical_error_probability: Option<f64>,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} x{}{}",
            self.line_code,
            self.samples_per_symbol,
            if self.repetition_coding { " + repetition coding" } else { "" }
        )?;
        writeln!(
            f,
            "  bits: {} sent, {} received, {} errors",
            self.sent_bits, self.received_bits, self.bit_errors
        )?;
        if let Some(corrected) = self.frames_corrected {
            writeln!(f, "  frames corrected: {}", corrected)?;
        }
        if let Some(noise) = &self.noise {
            writeln!(
                f,
                "  noise: variance {:.4}, power {:.4}, SNR {:.2} dB, Eb/N0 {:.2} dB",
                noise.noise_variance, noise.noise_power, noise.snr_db, noise.ebn0_db
            )?;
        }
        if let Some(pe) = self.theoretical_error_probability {
            writeln!(f, "  theoretical Pe: {:.6}", pe)?;
        }
        write!(f, "  BER: {}", self.ber)
    }
}

/// A complete transmission chain built from a [`SimulationConfig`]:
///
/// source -> [encoder] -> modulator -> [multipath] -> ideal | gaussian
/// -> demodulator -> [decoder] -> destination
pub struct Simulator {
    config: SimulationConfig,
    source: BitSource,
    encoder: Option<StageRef<RepetitionEncoder>>,
    modulator: StageRef<Modulator>,
    multipath: Option<StageRef<MultipathChannel>>,
    channel: AnalogChannel,
    demodulator: StageRef<Demodulator>,
    decoder: Option<StageRef<RepetitionDecoder>>,
    destination: Rc<RefCell<Destination<bool>>>,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> ChainResult<Self> {
        config.validate()?;

        let mut source = match &config.message {
            MessageSpec::Fixed(bits) => BitSource::from_bit_str(bits)?,
            MessageSpec::Random { len } => BitSource::random(*len, config.seed)?,
        };

        let waveform = config.waveform;
        let modulator = Stage::shared(Modulator::new(waveform)?);

        let encoder = config
            .use_repetition_coding
            .then(|| Stage::shared(RepetitionEncoder::new()));
        match &encoder {
            Some(encoder) => {
                source.connect(encoder.clone() as SinkRef<bool>);
                encoder
                    .borrow_mut()
                    .connect(modulator.clone() as SinkRef<bool>);
            }
            None => source.connect(modulator.clone() as SinkRef<bool>),
        }

        let channel = match config.snr_per_bit_db {
            Some(target_snr_per_bit_db) => {
                AnalogChannel::Gaussian(Stage::shared(GaussianChannel::new(
                    NoiseParams {
                        samples_per_symbol: waveform.samples_per_symbol,
                        target_snr_per_bit_db,
                        seed: config.seed,
                    },
                )?))
            }
            None => AnalogChannel::Ideal(Stage::shared(IdealChannel::new())),
        };

        let multipath = match &config.multipath {
            Some(profile) => {
                let stage = Stage::shared(MultipathChannel::new(profile.clone())?);
                modulator
                    .borrow_mut()
                    .connect(stage.clone() as SinkRef<Sample>);
                stage.borrow_mut().connect(channel.as_sink());
                Some(stage)
            }
            None => {
                modulator.borrow_mut().connect(channel.as_sink());
                None
            }
        };

        // the exact-level detector only holds on an unimpaired link
        let decision = if config.is_impaired() {
            Decision::Threshold
        } else {
            Decision::ExactLevel
        };
        let demodulator = Stage::shared(Demodulator::new(waveform, decision)?);
        channel.connect(demodulator.clone() as SinkRef<Sample>);

        let destination = Rc::new(RefCell::new(Destination::new()));
        let decoder = config
            .use_repetition_coding
            .then(|| Stage::shared(RepetitionDecoder::new()));
        match &decoder {
            Some(decoder) => {
                demodulator
                    .borrow_mut()
                    .connect(decoder.clone() as SinkRef<bool>);
                decoder
                    .borrow_mut()
                    .connect(destination.clone() as SinkRef<bool>);
            }
            None => demodulator
                .borrow_mut()
                .connect(destination.clone() as SinkRef<bool>),
        }

        info!(
            "Chain ready: {} message, {}{}{}{}",
            config.message,
            waveform.line_code,
            if encoder.is_some() { ", repetition coding" } else { "" },
            if multipath.is_some() { ", multipath" } else { "" },
            match config.snr_per_bit_db {
                Some(_) => ", gaussian noise",
                None => ", ideal channel",
            }
        );

        Ok(Self {
            config,
            source,
            encoder,
            modulator,
            multipath,
            channel,
            demodulator,
            decoder,
            destination,
        })
    }

    /// Push the message through the whole chain once
    pub fn execute(&mut self) -> ChainResult<()> {
        debug!("Emitting {} bits", self.source.message().len());
        self.source.emit()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn sent(&self) -> &Shared<bool> {
        self.source.message()
    }

    /// Bits that reached the destination, `None` before `execute`
    pub fn received(&self) -> Option<Shared<bool>> {
        self.destination.borrow().received().cloned()
    }

    /// Symbols produced by the repetition encoder
    pub fn encoded(&self) -> Option<Shared<bool>> {
        self.encoder
            .as_ref()
            .and_then(|stage| stage.borrow().last_emitted().cloned())
    }

    /// Waveform produced by the modulator
    pub fn transmitted(&self) -> Option<Shared<Sample>> {
        self.modulator.borrow().last_emitted().cloned()
    }

    /// Waveform after the multipath stage, when there is one
    pub fn after_multipath(&self) -> Option<Shared<Sample>> {
        self.multipath
            .as_ref()
            .and_then(|stage| stage.borrow().last_emitted().cloned())
    }

    /// Waveform seen by the demodulator
    pub fn channel_output(&self) -> Option<Shared<Sample>> {
        self.channel.output()
    }

    /// Bits produced by the demodulator, before decoding
    pub fn demodulated(&self) -> Option<Shared<bool>> {
        self.demodulator.borrow().last_emitted().cloned()
    }

    pub fn channel(&self) -> &AnalogChannel {
        &self.channel
    }

    pub fn decision(&self) -> Decision {
        self.demodulator.borrow().inner().decision()
    }

    pub fn comparison(&self) -> BitComparison {
        let received = self.received();
        BitComparison::new(
            self.sent().as_slice(),
            received.as_ref().map(|r| r.as_slice()).unwrap_or(&[]),
        )
    }

    pub fn bit_error_rate(&self) -> f64 {
        self.comparison().ber()
    }

    /// Expected error probability at the measured Eb/N0, `None` without noise
    pub fn theoretical_error_probability(&self) -> Option<f64> {
        self.channel.measured_ebn0_db().map(|ebn0_db| {
            theoretical_error_probability(self.config.waveform.line_code, ebn0_db)
        })
    }

    pub fn report(&self) -> SimulationReport {
        let comparison = self.comparison();
        SimulationReport {
            line_code: self.config.waveform.line_code,
            samples_per_symbol: self.config.waveform.samples_per_symbol,
            repetition_coding: self.config.use_repetition_coding,
            sent_bits: self.sent().len(),
            received_bits: self.received().map(|r| r.len()).unwrap_or(0),
            compared_bits: comparison.compared,
            bit_errors: comparison.errors,
            ber: comparison.ber(),
            frames_corrected: self
                .decoder
                .as_ref()
                .map(|stage| stage.borrow().inner().last_stats().frames_corrected),
            noise: self.channel.noise_stats(),
            theoretical_error_probability: self.theoretical_error_probability(),
        }
    }
}

/// Build a chain, run it once and report
pub fn simulate(config: SimulationConfig) -> ChainResult<SimulationReport> {
    let mut simulator = Simulator::new(config)?;
    simulator.execute()?;
    let report = simulator.report();
    info!(
        "{}: {} errors over {} bits, BER = {}",
        report.line_code, report.bit_errors, report.compared_bits, report.ber
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Echo, MultipathProfile};
    use crate::phy::WaveformParams;

    fn fixed(bits: &str) -> SimulationConfig {
        SimulationConfig {
            message: MessageSpec::Fixed(bits.into()),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_default_chain_is_lossless() {
        let config = SimulationConfig {
            seed: Some(1),
            ..SimulationConfig::default()
        };
        let mut sim = Simulator::new(config).unwrap();
        assert_eq!(sim.decision(), Decision::ExactLevel);
        sim.execute().unwrap();

        assert_eq!(sim.received().unwrap(), *sim.sent());
        assert_eq!(sim.transmitted().unwrap().len(), 100 * 30);
        assert_eq!(sim.bit_error_rate(), 0.0);
        assert_eq!(sim.theoretical_error_probability(), None);
        assert_eq!(sim.channel().measured_snr_db(), None);
    }

    #[test]
    fn test_coding_stages_are_wired_in() {
        let mut config = fixed("1011001");
        config.use_repetition_coding = true;
        let mut sim = Simulator::new(config).unwrap();
        sim.execute().unwrap();

        assert_eq!(sim.encoded().unwrap().len(), 21);
        assert_eq!(sim.demodulated().unwrap().len(), 21);
        assert_eq!(sim.received().unwrap().to_bit_string(), "1011001");

        let report = sim.report();
        assert_eq!(report.frames_corrected, Some(0));
        assert_eq!(report.bit_errors, 0);
    }

    #[test]
    fn test_noise_switches_to_threshold_and_reports_stats() {
        let config = SimulationConfig {
            seed: Some(5),
            snr_per_bit_db: Some(10.0),
            waveform: WaveformParams::new(30, 1.0, -1.0, LineCode::Nrz).unwrap(),
            ..SimulationConfig::default()
        };
        let mut sim = Simulator::new(config).unwrap();
        assert_eq!(sim.decision(), Decision::Threshold);
        sim.execute().unwrap();

        let report = sim.report();
        let noise = report.noise.unwrap();
        assert!(noise.noise_variance > 0.0);
        assert!(report.theoretical_error_probability.unwrap() < 1e-3);
        // averaging 30 samples per bit leaves essentially no errors at 10 dB
        assert_eq!(report.bit_errors, 0);
    }

    #[test]
    fn test_multipath_output_feeds_the_channel() {
        let mut config = fixed("1100101");
        config.waveform = WaveformParams::new(9, 1.0, 0.0, LineCode::Rz).unwrap();
        config.multipath = Some(
            MultipathProfile::new(vec![Echo::new(4, 0.3).unwrap()]).unwrap(),
        );
        let mut sim = Simulator::new(config).unwrap();
        sim.execute().unwrap();

        let after = sim.after_multipath().unwrap();
        assert_eq!(after.len(), 7 * 9 + 4);
        assert_eq!(sim.channel_output().unwrap(), after);
        assert_eq!(sim.comparison().compared, 7);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_wiring() {
        let mut config = SimulationConfig::default();
        config.waveform.samples_per_symbol = 0;
        assert!(Simulator::new(config).is_err());
    }

    #[test]
    fn test_report_serializes() {
        let report = simulate(fixed("0000000")).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["line_code"], "RZ");
        assert_eq!(json["ber"], 0.0);
        assert!(json["noise"].is_null());
        assert!(report.to_string().contains("BER: 0"));
    }
}
