// Channel models: transport impairments applied to analog samples

pub mod gaussian;
pub mod ideal;
pub mod multipath;

pub use gaussian::{GaussianChannel, NoiseParams, NoiseStats, noise_variance};
pub use ideal::IdealChannel;
pub use multipath::{Echo, MAX_ECHOES, MultipathChannel, MultipathProfile};

/// Measurements a channel exposes for BER reporting.
///
/// `None` means the measurement does not apply to this channel (or no buffer
/// has gone through it yet).
pub trait ChannelStats {
    fn measured_noise_power(&self) -> Option<f64> {
        None
    }

    fn measured_snr_db(&self) -> Option<f64> {
        None
    }

    fn measured_ebn0_db(&self) -> Option<f64> {
        None
    }

    fn noise_variance(&self) -> Option<f64> {
        None
    }
}
