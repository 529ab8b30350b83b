use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::channel::MultipathProfile;
use crate::error::{ChainError, ChainResult};
use crate::phy::WaveformParams;
use crate::pipeline::Buffer;
use crate::utils::consts::DEFAULT_MESSAGE_BITS;

/// Shortest bit string read as a literal message rather than a length
pub const MIN_FIXED_MESSAGE_BITS: usize = 7;

/// Longest decimal length accepted for a random message
pub const MAX_RANDOM_LENGTH_DIGITS: usize = 6;

/// What the source sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSpec {
    /// Literal "0101..." message
    Fixed(String),
    /// `len` random bits
    Random { len: usize },
}

impl MessageSpec {
    pub fn validate(&self) -> ChainResult<()> {
        match self {
            MessageSpec::Fixed(bits) => bits.parse::<Buffer<bool>>().map(|_| ()),
            MessageSpec::Random { len: 0 } => Err(ChainError::invalid(
                "random message length must be positive",
            )),
            MessageSpec::Random { .. } => Ok(()),
        }
    }
}

impl Default for MessageSpec {
    fn default() -> Self {
        MessageSpec::Random {
            len: DEFAULT_MESSAGE_BITS,
        }
    }
}

impl fmt::Display for MessageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSpec::Fixed(bits) => write!(f, "{}", bits),
            MessageSpec::Random { len } => write!(f, "{} random bits", len),
        }
    }
}

impl FromStr for MessageSpec {
    type Err = ChainError;

    /// At least 7 binary digits form a literal message; a number of up to
    /// 6 digits is the length of a random message.
    fn from_str(s: &str) -> ChainResult<Self> {
        let all_binary = s.chars().all(|c| c == '0' || c == '1');
        let all_digits = !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

        if all_binary && s.len() >= MIN_FIXED_MESSAGE_BITS {
            return Ok(MessageSpec::Fixed(s.to_string()));
        }
        if all_digits && s.len() <= MAX_RANDOM_LENGTH_DIGITS {
            let len = s.parse::<usize>().map_err(|e| {
                ChainError::invalid(format!("message length '{}': {}", s, e))
            })?;
            let spec = MessageSpec::Random { len };
            spec.validate()?;
            return Ok(spec);
        }
        Err(ChainError::invalid(format!(
            "message '{}' is neither a bit string of {}+ digits nor a length of at most {} digits",
            s, MIN_FIXED_MESSAGE_BITS, MAX_RANDOM_LENGTH_DIGITS
        )))
    }
}

/// Everything needed to build and run one transmission chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub message: MessageSpec,
    /// Seeds both the random message and the channel noise
    pub seed: Option<u64>,
    pub waveform: WaveformParams,
    /// Gaussian noise is added only when set
    pub snr_per_bit_db: Option<f64>,
    pub multipath: Option<MultipathProfile>,
    pub use_repetition_coding: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            message: MessageSpec::default(),
            seed: None,
            waveform: WaveformParams::default(),
            snr_per_bit_db: None,
            multipath: None,
            use_repetition_coding: false,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> ChainResult<()> {
        self.message.validate()?;
        self.waveform.validate()?;
        if let Some(snr) = self.snr_per_bit_db {
            if !snr.is_finite() {
                return Err(ChainError::invalid(format!(
                    "target SNR per bit must be finite, got {}",
                    snr
                )));
            }
        }
        if let Some(profile) = &self.multipath {
            profile.validate()?;
        }
        Ok(())
    }

    /// Whether the analog path carries any impairment
    pub fn is_impaired(&self) -> bool {
        self.snr_per_bit_db.is_some() || self.multipath.is_some()
    }

    pub fn from_json(json: &str) -> ChainResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            ChainError::invalid(format!("configuration JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Echo;
    use crate::phy::LineCode;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.message, MessageSpec::Random { len: 100 });
        assert_eq!(config.waveform.line_code, LineCode::Rz);
        assert_eq!(config.waveform.samples_per_symbol, 30);
        assert_eq!(config.waveform.amplitude_high, 1.0);
        assert_eq!(config.waveform.amplitude_low, 0.0);
        assert!(!config.is_impaired());
        assert!(!config.use_repetition_coding);
        config.validate().unwrap();
    }

    #[test]
    fn test_message_parsing() {
        assert_eq!(
            "0110100".parse::<MessageSpec>().unwrap(),
            MessageSpec::Fixed("0110100".into())
        );
        assert_eq!(
            "100".parse::<MessageSpec>().unwrap(),
            MessageSpec::Random { len: 100 }
        );
        // short binary strings are lengths
        assert_eq!(
            "101".parse::<MessageSpec>().unwrap(),
            MessageSpec::Random { len: 101 }
        );
        for bad in ["0", "1234567", "abc", "", "12a"] {
            assert!(bad.parse::<MessageSpec>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_validation_reaches_nested_parameters() {
        let mut config = SimulationConfig::default();
        config.snr_per_bit_db = Some(f64::INFINITY);
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.waveform.amplitude_low = -1.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.message = MessageSpec::Fixed("01x".into());
        assert!(matches!(
            config.validate(),
            Err(ChainError::NonConformantInput(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig {
            message: MessageSpec::Fixed("1011001".into()),
            seed: Some(4),
            snr_per_bit_db: Some(3.5),
            multipath: Some(MultipathProfile::new(vec![Echo::new(4, 0.5).unwrap()]).unwrap()),
            use_repetition_coding: true,
            ..SimulationConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
    }
}
