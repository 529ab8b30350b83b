pub mod channel;
pub mod config;
pub mod error;
pub mod error_correction;
pub mod phy;
pub mod pipeline;
pub mod transmission;
pub mod ui;
pub mod utils;

pub use error::{ChainError, ChainResult};
