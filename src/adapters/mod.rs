// Adapters layer: concrete implementations for external systems.

pub mod device;
pub mod firebase;
pub mod storage;

use crate::config::toml_config::{SourceConfig, SourceKind};
use crate::domain::ports::ReadingSource;
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;
use std::time::Duration;

pub use device::DeviceSource;
pub use firebase::FirebaseSource;
pub use storage::LocalStorage;

/// The configured reading source.
#[derive(Debug, Clone)]
pub enum SensorSource {
    Device(DeviceSource),
    Firebase(FirebaseSource),
}

impl SensorSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds());
        match config.kind {
            SourceKind::Device => Ok(Self::Device(DeviceSource::new(
                &config.endpoint,
                config.path.as_deref().unwrap_or("data"),
                timeout,
            )?)),
            SourceKind::Firebase => Ok(Self::Firebase(FirebaseSource::new(
                &config.endpoint,
                validate_required_field("source.path", &config.path)?,
                config.auth_token(),
                timeout,
            )?)),
        }
    }
}

impl ReadingSource for SensorSource {
    async fn fetch_csv(&self) -> Result<Vec<u8>> {
        match self {
            Self::Device(source) => source.fetch_csv().await,
            Self::Firebase(source) => source.fetch_csv().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Device(source) => source.describe(),
            Self::Firebase(source) => source.describe(),
        }
    }
}
