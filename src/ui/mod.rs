pub mod progress;

pub use progress::{ProgressManager, templates};

pub fn print_banner() {
    eprintln!("baseband-chain {}", env!("CARGO_PKG_VERSION"));
}
