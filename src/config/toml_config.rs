use crate::domain::model::{ExportSettings, PreprocessSettings, TrainSettings};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DEVICE_ENDPOINT: &str = "http://192.168.137.15";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydroConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub preprocess: PreprocessSettings,
    #[serde(default)]
    pub train: TrainSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The controller's own HTTP file server.
    Device,
    /// Firebase Realtime Database over REST.
    Firebase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(alias = "type")]
    pub kind: SourceKind,
    pub endpoint: String,
    pub path: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl SourceConfig {
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    /// The auth token, unless it is empty or still an unresolved `${VAR}`.
    pub fn auth_token(&self) -> Option<String> {
        match self.auth_token.as_deref() {
            Some(token) if token.starts_with("${") => {
                tracing::warn!("Auth token {} was not resolved, sending no token", token);
                None
            }
            Some("") | None => None,
            Some(token) => Some(token.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig {
                name: "hydro-etl".to_string(),
                description: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            source: SourceConfig {
                kind: SourceKind::Device,
                endpoint: DEFAULT_DEVICE_ENDPOINT.to_string(),
                path: None,
                auth_token: None,
                timeout_seconds: None,
            },
            preprocess: PreprocessSettings::default(),
            train: TrainSettings::default(),
            export: ExportSettings::default(),
            load: LoadConfig::default(),
            monitoring: None,
        }
    }
}

impl HydroConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FIREBASE_TOKEN})；未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        if self.source.kind == SourceKind::Firebase {
            let path = validation::validate_required_field("source.path", &self.source.path)?;
            validation::validate_non_empty_string("source.path", path)?;
        }
        validation::validate_path("load.output_path", &self.load.output_path)?;

        let pre = &self.preprocess;
        validation::validate_range(
            "preprocess.moisture_start_below",
            pre.moisture_start_below,
            0.0,
            100.0,
        )?;
        validation::validate_range(
            "preprocess.moisture_end_at_or_above",
            pre.moisture_end_at_or_above,
            0.0,
            100.0,
        )?;
        validation::validate_range("preprocess.low_water_level", pre.low_water_level, 0.0, 100.0)?;

        validation::validate_fraction("train.test_fraction", self.train.test_fraction)?;
        validation::validate_range("train.ridge_lambda", self.train.ridge_lambda, 0.0, f64::MAX)?;
        validation::validate_range(
            "train.min_prediction_seconds",
            self.train.min_prediction_seconds,
            0.0,
            f64::MAX,
        )?;
        validation::validate_range(
            "train.fallback_prediction_seconds",
            self.train.fallback_prediction_seconds,
            0.0,
            f64::MAX,
        )?;

        validation::validate_identifier("export.moisture_name", &self.export.moisture_name)?;
        validation::validate_identifier("export.water_name", &self.export.water_name)?;
        if self.export.moisture_name == self.export.water_name {
            return Err(EtlError::InvalidConfigValueError {
                field: "export.water_name".to_string(),
                value: self.export.water_name.clone(),
                reason: "Must differ from export.moisture_name".to_string(),
            });
        }
        if self.export.bundle {
            validation::validate_path("export.bundle_filename", &self.export.bundle_filename)?;
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

impl ConfigProvider for HydroConfig {
    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn preprocess(&self) -> &PreprocessSettings {
        &self.preprocess
    }

    fn train(&self) -> &TrainSettings {
        &self.train
    }

    fn export(&self) -> &ExportSettings {
        &self.export
    }
}

impl Validate for HydroConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
