pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod maps;
pub mod metrics;
pub mod probe;

pub use error::{EbtelError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
