use anyhow::Context;
use clap::Parser;
use hydro_etl::config::{Command, PredictTarget};
use hydro_etl::domain::ports::ReadingSource;
use hydro_etl::training::{predict_time_to_empty, predict_time_to_water};
use hydro_etl::utils::{logger, validation::Validate};
use hydro_etl::{
    Cli, EtlEngine, EtlError, HydroConfig, IrrigationPipeline, LocalStorage, SensorSource,
};

type CliPipeline = IrrigationPipeline<LocalStorage, HydroConfig, SensorSource>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 載入配置（找不到檔案時使用預設值）
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting hydro-etl");
    if cli.config_file_exists() {
        tracing::info!("📁 Loaded configuration from: {}", cli.config);
    } else {
        tracing::info!("📁 No {} found, using built-in defaults", cli.config);
    }
    tracing::debug!("Effective config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = execute(&cli, config).await {
        std::process::exit(report_failure(&e));
    }
}

async fn execute(cli: &Cli, config: HydroConfig) -> anyhow::Result<()> {
    let monitor_enabled = cli.monitor_enabled(&config);
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.load.output_path.clone());
    let source =
        SensorSource::from_config(&config.source).context("Could not build the sensor source")?;

    if let Command::Run { dry_run: true } = cli.command {
        display_dry_run(&config, &source);
        return Ok(());
    }

    let pipeline: CliPipeline = IrrigationPipeline::new(storage, config, source);

    match &cli.command {
        Command::Fetch => {
            let data = pipeline.fetch().await.context("Fetch stage failed")?;
            println!("✅ Sensor log downloaded ({} bytes)", data.len());
        }
        Command::Preprocess => {
            let out = pipeline
                .preprocess_stored()
                .await
                .context("Preprocess stage failed")?;
            println!(
                "✅ {} moisture cycles, {} water cycles",
                out.moisture_cycles.len(),
                out.water_cycles.len()
            );
        }
        Command::Train => {
            let models = pipeline.train_stored().await.context("Train stage failed")?;
            for model in &models {
                match model.mae_seconds {
                    Some(mae) => println!("✅ {} model (MAE {:.1} s)", model.name, mae),
                    None => println!("✅ {} model", model.name),
                }
            }
            if models.is_empty() {
                println!("⚠️ No model trained: no cycles in the processed datasets");
            }
        }
        Command::Export { .. } => {
            let written = pipeline.export_stored().await.context("Export stage failed")?;
            for file in &written {
                println!("📁 {}", file);
            }
        }
        Command::Run { .. } => {
            let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
            let report = engine.run().await.context("Pipeline run failed")?;
            println!("✅ ETL process completed successfully!");
            println!(
                "   {} readings, {} moisture cycles, {} water cycles, {} models",
                report.readings, report.moisture_cycles, report.water_cycles, report.models_trained
            );
            println!("📁 Output saved to: {}", report.output_path);
        }
        Command::Predict { target } => predict(&pipeline, target).await?,
    }

    Ok(())
}

async fn predict(pipeline: &CliPipeline, target: &PredictTarget) -> anyhow::Result<()> {
    let export = &pipeline.config().export;
    let train = &pipeline.config().train;

    match *target {
        PredictTarget::Moisture {
            temp,
            humidity,
            light,
        } => {
            let model = pipeline.load_model(&export.moisture_name).await;
            let seconds = predict_time_to_water(
                model,
                temp,
                humidity,
                light,
                train.fallback_prediction_seconds,
            );
            println!(
                "Time until watering: {:.0} s ({:.1} h)",
                seconds,
                seconds / 3600.0
            );
        }
        PredictTarget::Water {
            level,
            temp,
            humidity,
            light,
        } => {
            let model = pipeline
                .load_model(&export.water_name)
                .await
                .context("Could not load the water level model")?;
            let seconds = predict_time_to_empty(&model, level, temp, humidity, light)?;
            println!(
                "Time until reservoir is empty: {:.0} s ({:.1} h)",
                seconds,
                seconds / 3600.0
            );
        }
    }
    Ok(())
}

/// Logs the failure and returns the process exit code.
fn report_failure(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<EtlError>() {
        Some(e) => {
            tracing::error!(
                "❌ {:#} (Category: {:?}, Severity: {:?})",
                error,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            e.severity().exit_code()
        }
        None => {
            tracing::error!("❌ {:#}", error);
            eprintln!("❌ {:#}", error);
            1
        }
    }
}

fn display_dry_run(config: &HydroConfig, source: &SensorSource) {
    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📋 Pipeline: {} v{}", config.pipeline.name, config.pipeline.version);
    if let Some(description) = &config.pipeline.description {
        println!("  {}", description);
    }

    println!();
    println!("📡 Data Source:");
    println!("  {}", source.describe());
    println!("  Timeout: {}s", config.source.timeout_seconds());

    let pre = &config.preprocess;
    println!();
    println!("⚙️ Cycle Detection:");
    println!(
        "  Moisture cycle: opens below {}%, closes at or above {}%",
        pre.moisture_start_below, pre.moisture_end_at_or_above
    );
    println!("  Water cycle: level at or below {}%", pre.low_water_level);

    let train = &config.train;
    println!();
    println!("📈 Training:");
    println!(
        "  Test fraction: {}, seed: {}, ridge lambda: {}",
        train.test_fraction, train.seed, train.ridge_lambda
    );
    println!(
        "  Minimum prediction: {}s, fallback: {}s",
        train.min_prediction_seconds, train.fallback_prediction_seconds
    );

    let export = &config.export;
    println!();
    println!("💾 Output:");
    println!("  Path: {}", config.load.output_path);
    println!(
        "  Models: {}, {} ({:?} format)",
        export.moisture_name, export.water_name, export.format
    );
    if export.bundle {
        println!("  Bundle: {} (ZIP)", export.bundle_filename);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
