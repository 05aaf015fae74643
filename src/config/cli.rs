use crate::config::toml_config::{HydroConfig, SourceKind};
use crate::domain::model::ExportFormat;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::Path;

#[derive(Debug, Clone, Parser)]
#[command(name = "hydro-etl")]
#[command(about = "Turns irrigation sensor logs into firmware prediction tables")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = "hydro-etl.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override monitoring setting from config
    #[arg(long, global = true)]
    pub monitor: Option<bool>,

    /// Override source endpoint (device base URL or database URL)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Override source kind
    #[arg(long, global = true, value_enum)]
    pub source: Option<SourceKind>,

    /// Override output directory
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Download the sensor log and save it as sensor_data.csv
    Fetch,
    /// Build the moisture and water cycle datasets from sensor_data.csv
    Preprocess,
    /// Fit both models from the processed datasets
    Train,
    /// Write firmware sources for the trained models
    Export {
        /// Override export format (tables or blob)
        #[arg(long)]
        format: Option<ExportFormat>,
        /// Also pack the sources into a ZIP bundle
        #[arg(long)]
        bundle: bool,
    },
    /// Run every stage from fetch to export
    Run {
        /// Show what would be processed without executing
        #[arg(long)]
        dry_run: bool,
    },
    /// Query a trained model
    Predict {
        #[command(subcommand)]
        target: PredictTarget,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum PredictTarget {
    /// Seconds until the soil needs watering
    Moisture {
        #[arg(long, allow_negative_numbers = true)]
        temp: f64,
        #[arg(long)]
        humidity: f64,
        #[arg(long)]
        light: f64,
    },
    /// Seconds until the reservoir runs dry
    Water {
        #[arg(long)]
        level: f64,
        #[arg(long, allow_negative_numbers = true)]
        temp: f64,
        #[arg(long)]
        humidity: f64,
        #[arg(long)]
        light: f64,
    },
}

impl Cli {
    /// Loads the config file, or the built-in defaults when it does not
    /// exist, then applies command line overrides.
    pub fn load_config(&self) -> Result<HydroConfig> {
        let mut config = if self.config_file_exists() {
            HydroConfig::from_file(&self.config)?
        } else {
            HydroConfig::default()
        };

        if let Some(kind) = self.source {
            config.source.kind = kind;
        }
        if let Some(endpoint) = &self.endpoint {
            config.source.endpoint = endpoint.clone();
        }
        if let Some(output) = &self.output {
            config.load.output_path = output.clone();
        }
        if let Command::Export { format, bundle } = &self.command {
            if let Some(format) = format {
                config.export.format = *format;
            }
            if *bundle {
                config.export.bundle = true;
            }
        }

        Ok(config)
    }

    pub fn config_file_exists(&self) -> bool {
        Path::new(&self.config).exists()
    }

    pub fn monitor_enabled(&self, config: &HydroConfig) -> bool {
        self.monitor.unwrap_or_else(|| config.monitoring_enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_over_defaults() {
        let cli = Cli::parse_from([
            "hydro-etl",
            "--config",
            "/definitely/missing.toml",
            "--source",
            "firebase",
            "--endpoint",
            "https://garden.firebaseio.com",
            "--output",
            "/tmp/out",
            "export",
            "--format",
            "blob",
            "--bundle",
        ]);

        let config = cli.load_config().unwrap();

        assert_eq!(config.source.kind, SourceKind::Firebase);
        assert_eq!(config.source.endpoint, "https://garden.firebaseio.com");
        assert_eq!(config.load.output_path, "/tmp/out");
        assert_eq!(config.export.format, ExportFormat::Blob);
        assert!(config.export.bundle);
    }

    #[test]
    fn test_predict_arguments() {
        let cli = Cli::parse_from([
            "hydro-etl", "predict", "water", "--level", "20", "--temp", "-3", "--humidity", "65",
            "--light", "200000",
        ]);

        match cli.command {
            Command::Predict {
                target: PredictTarget::Water { level, temp, .. },
            } => {
                assert_eq!(level, 20.0);
                assert_eq!(temp, -3.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
