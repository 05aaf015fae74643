#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{Cli, Command, PredictTarget};
pub use toml_config::{HydroConfig, SourceKind};
