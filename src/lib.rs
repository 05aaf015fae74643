pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod export;
pub mod processing;
pub mod training;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::{LocalStorage, SensorSource};
pub use config::HydroConfig;
pub use core::{EtlEngine, IrrigationPipeline, RunReport};
pub use utils::error::{EtlError, Result};
