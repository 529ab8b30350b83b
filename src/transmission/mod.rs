/// Transmission layer modules
pub mod destination;
pub mod metrics;
pub mod simulator;
pub mod source;
pub mod sweep;

pub use destination::*;
pub use metrics::*;
pub use simulator::*;
pub use source::*;
pub use sweep::*;
