use httpmock::prelude::*;
use hydro_etl::domain::model::ExportFormat;
use hydro_etl::utils::error::EtlError;
use hydro_etl::{EtlEngine, HydroConfig, IrrigationPipeline, LocalStorage, SensorSource};
use std::io::Read;
use tempfile::TempDir;

const SENSOR_LOG: &str = "\
timestamp,soil_moisture,water_level,temperature,humidity,light_intensity
2025-04-01 06:00:00,85,60,18,70,100
2025-04-01 06:30:00,65,45,20,65,800
2025-04-01 07:00:00,35,25,22,60,1600
2025-04-01 07:30:00,75,28,24,55,2400
2025-04-01 08:00:00,60,20,26,50,3000
2025-04-01 08:20:00,50,22,27,48,3200
2025-04-01 08:40:00,72,24,28,45,3300
2025-04-01 09:00:00,80,90,29,44,3400
";

fn config_for(kind: &str, endpoint: &str, output_path: &str) -> HydroConfig {
    let toml_content = format!(
        r#"
[pipeline]
name = "integration"
version = "1.0.0"

[source]
kind = "{}"
endpoint = "{}"
path = "data"
timeout_seconds = 5

[load]
output_path = "{}"
"#,
        kind,
        endpoint,
        output_path.replace('\\', "/")
    );
    HydroConfig::from_toml_str(&toml_content).unwrap()
}

fn engine_for(
    config: HydroConfig,
) -> EtlEngine<IrrigationPipeline<LocalStorage, HydroConfig, SensorSource>> {
    let storage = LocalStorage::new(config.load.output_path.clone());
    let source = SensorSource::from_config(&config.source).unwrap();
    EtlEngine::new_with_monitoring(IrrigationPipeline::new(storage, config, source), false)
}

#[tokio::test]
async fn test_end_to_end_run_from_device() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let device_mock = server.mock(|when, then| {
        when.method(GET).path("/data");
        then.status(200)
            .header("Content-Type", "text/csv")
            .body(SENSOR_LOG);
    });

    let engine = engine_for(config_for("device", &server.base_url(), &output_path));
    let report = engine.run().await.unwrap();

    device_mock.assert();
    assert_eq!(report.output_path, output_path);
    assert_eq!(report.readings, 8);
    assert_eq!(report.moisture_cycles, 2);
    assert_eq!(report.water_cycles, 2);
    assert_eq!(report.models_trained, 2);

    for file in [
        "sensor_data.csv",
        "sensor_features.csv",
        "processed_moisture_data.csv",
        "processed_water_data.csv",
        "moisture_model.json",
        "water_level_model.json",
        "moisture_model.h",
        "moisture_model.cpp",
        "water_level_model.h",
        "water_level_model.cpp",
    ] {
        assert!(temp_dir.path().join(file).exists(), "missing {}", file);
    }

    let moisture_csv =
        std::fs::read_to_string(temp_dir.path().join("processed_moisture_data.csv")).unwrap();
    assert!(moisture_csv
        .starts_with("start_time,end_time,duration,start_temp,start_humidity,avg_light"));
    assert!(moisture_csv.contains("2025-04-01 06:30:00,2025-04-01 07:30:00,3600"));

    let header = std::fs::read_to_string(temp_dir.path().join("moisture_model.h")).unwrap();
    assert!(header.contains("#ifndef MOISTURE_MODEL_H"));
    assert!(header.contains("N_FEATURES = 3"));
}

#[tokio::test]
async fn test_end_to_end_run_from_firebase() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let snapshot = serde_json::json!({
        "-Na1": {"timestamp": "2025-04-01 06:30:00", "soil_moisture": 65, "water_level": 45,
                 "temperature": 20, "humidity": 65, "light_intensity": 800},
        "-Na2": {"timestamp": "2025-04-01 07:00:00", "soil_moisture": 35, "water_level": 25,
                 "temperature": 22, "humidity": 60, "light_intensity": 1600},
        "-Na3": {"timestamp": "2025-04-01 07:30:00", "soil_moisture": 75, "water_level": 28,
                 "temperature": 24, "humidity": 55, "light_intensity": 2400},
        "-Na4": {"timestamp": "2025-04-01 08:00:00", "soil_moisture": 80, "water_level": 90,
                 "temperature": 26, "humidity": 50, "light_intensity": 3000}
    });
    let firebase_mock = server.mock(|when, then| {
        when.method(GET).path("/data.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(snapshot);
    });

    let engine = engine_for(config_for("firebase", &server.base_url(), &output_path));
    let report = engine.run().await.unwrap();

    firebase_mock.assert();
    assert_eq!(report.readings, 4);
    assert_eq!(report.moisture_cycles, 1);
    assert_eq!(report.water_cycles, 1);
    assert_eq!(report.models_trained, 2);

    let raw = std::fs::read_to_string(temp_dir.path().join("sensor_data.csv")).unwrap();
    assert!(raw.starts_with(
        "timestamp,soil_moisture,water_level,temperature,humidity,light_intensity"
    ));
    assert!(temp_dir.path().join("water_level_model.cpp").exists());
}

#[tokio::test]
async fn test_device_error_status_stops_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let device_mock = server.mock(|when, then| {
        when.method(GET).path("/data");
        then.status(500);
    });

    let engine = engine_for(config_for("device", &server.base_url(), &output_path));
    let result = engine.run().await;

    device_mock.assert();
    assert!(matches!(
        result,
        Err(EtlError::HttpStatusError { status: 500, .. })
    ));
    assert!(!temp_dir.path().join("sensor_data.csv").exists());
}

#[tokio::test]
async fn test_blob_export_with_bundle() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data");
        then.status(200).body(SENSOR_LOG);
    });

    let mut config = config_for("device", &server.base_url(), &output_path);
    config.export.format = ExportFormat::Blob;
    config.export.bundle = true;

    let engine = engine_for(config);
    engine.run().await.unwrap();

    // 單一標頭檔格式不會產生 .cpp
    assert!(temp_dir.path().join("moisture_model.h").exists());
    assert!(!temp_dir.path().join("moisture_model.cpp").exists());

    let zip_data = std::fs::read(temp_dir.path().join("firmware_bundle.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    assert_eq!(archive.len(), 2);

    let mut header = String::new();
    archive
        .by_name("water_level_model.h")
        .unwrap()
        .read_to_string(&mut header)
        .unwrap();
    assert!(header.contains("alignas(8) const unsigned char water_level_model_bin[]"));
    assert!(header.contains("water_level_model_bin_len"));
    // "HGRM"
    assert!(header.contains("0x48, 0x47, 0x52, 0x4d"));
}

#[tokio::test]
async fn test_stages_rerun_from_local_storage() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data");
        then.status(200).body(SENSOR_LOG);
    });

    let config = config_for("device", &server.base_url(), &output_path);
    let storage = LocalStorage::new(output_path.clone());
    let source = SensorSource::from_config(&config.source).unwrap();
    let pipeline = IrrigationPipeline::new(storage, config, source);

    pipeline.fetch().await.unwrap();
    pipeline.preprocess_stored().await.unwrap();
    let models = pipeline.train_stored().await.unwrap();
    assert_eq!(models.len(), 2);

    let written = pipeline.export_stored().await.unwrap();
    assert_eq!(written.len(), 4);

    let reloaded = pipeline.load_model("moisture").await.unwrap();
    assert_eq!(reloaded, models[0]);
}
