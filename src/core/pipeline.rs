use crate::domain::model::{
    MoistureCycle, RegressionModel, SensorReading, TransformResult, WaterCycle,
};
use crate::domain::ports::{ConfigProvider, Pipeline, ReadingSource, Storage};
use crate::export::{bundle_artifacts, render_model};
use crate::processing::{
    self, parse_readings, read_csv, write_csv, Preprocessed, FEATURES_FILE, MOISTURE_DATA_FILE,
    RAW_DATA_FILE, WATER_DATA_FILE,
};
use crate::training::{model_filename, train_moisture_model, train_water_level_model};
use crate::utils::error::{EtlError, Result};

/// Fetch, restructure, fit and export, with every intermediate file kept in
/// storage so each stage can also be rerun on its own.
pub struct IrrigationPipeline<S: Storage, C: ConfigProvider, R: ReadingSource> {
    storage: S,
    config: C,
    source: R,
}

impl<S: Storage, C: ConfigProvider, R: ReadingSource> IrrigationPipeline<S, C, R> {
    pub fn new(storage: S, config: C, source: R) -> Self {
        Self {
            storage,
            config,
            source,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Downloads the sensor log and stores it as `sensor_data.csv`.
    pub async fn fetch(&self) -> Result<Vec<u8>> {
        tracing::info!("Fetching sensor log from {}", self.source.describe());
        let data = self.source.fetch_csv().await?;
        self.storage.write_file(RAW_DATA_FILE, &data).await?;
        tracing::info!("Saved {} ({} bytes)", RAW_DATA_FILE, data.len());
        Ok(data)
    }

    /// Rebuilds the event datasets from the stored sensor log.
    pub async fn preprocess_stored(&self) -> Result<Preprocessed> {
        let raw = self.storage.read_file(RAW_DATA_FILE).await?;
        let parsed = parse_readings(&raw)?;
        if parsed.skipped_rows > 0 {
            tracing::warn!("Skipped {} unparseable rows", parsed.skipped_rows);
        }

        let out = processing::preprocess(&parsed.readings, self.config.preprocess());
        self.write_datasets(&out).await?;
        Ok(out)
    }

    /// Fits both models from the stored datasets and saves them as JSON.
    pub async fn train_stored(&self) -> Result<Vec<RegressionModel>> {
        let moisture: Vec<MoistureCycle> =
            read_csv(&self.storage.read_file(MOISTURE_DATA_FILE).await?)?;
        let water: Vec<WaterCycle> = read_csv(&self.storage.read_file(WATER_DATA_FILE).await?)?;

        let settings = self.config.train();
        let names = self.config.export();
        let mut models = Vec::new();
        models.extend(train_moisture_model(&names.moisture_name, &moisture, settings)?);
        models.extend(train_water_level_model(&names.water_name, &water, settings)?);

        for model in &models {
            self.save_model(model).await?;
        }
        Ok(models)
    }

    /// Writes firmware sources for whichever models have been saved.
    pub async fn export_stored(&self) -> Result<Vec<String>> {
        let names = self.config.export();
        let mut models = Vec::new();
        for name in [&names.moisture_name, &names.water_name] {
            match self.load_model(name).await {
                Ok(model) => models.push(model),
                Err(EtlError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!("No saved {} model, skipping export", name);
                }
                Err(e) => return Err(e),
            }
        }
        self.export_models(&models).await
    }

    pub async fn load_model(&self, name: &str) -> Result<RegressionModel> {
        let data = self.storage.read_file(&model_filename(name)).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn write_datasets(&self, out: &Preprocessed) -> Result<()> {
        self.storage
            .write_file(FEATURES_FILE, &write_csv(&out.features)?)
            .await?;
        self.storage
            .write_file(MOISTURE_DATA_FILE, &write_csv(&out.moisture_cycles)?)
            .await?;
        self.storage
            .write_file(WATER_DATA_FILE, &write_csv(&out.water_cycles)?)
            .await?;
        tracing::debug!(
            "Wrote {}, {} and {}",
            FEATURES_FILE,
            MOISTURE_DATA_FILE,
            WATER_DATA_FILE
        );
        Ok(())
    }

    async fn save_model(&self, model: &RegressionModel) -> Result<()> {
        let filename = model_filename(&model.name);
        let json = serde_json::to_string_pretty(model)?;
        self.storage.write_file(&filename, json.as_bytes()).await?;
        tracing::info!("{} model saved as '{}'", model.name, filename);
        Ok(())
    }

    async fn export_models(&self, models: &[RegressionModel]) -> Result<Vec<String>> {
        let export = self.config.export();
        let mut artifacts = Vec::new();
        for model in models {
            artifacts.extend(render_model(model, &model.name, export.format)?);
        }

        let mut written = Vec::new();
        for artifact in &artifacts {
            self.storage
                .write_file(&artifact.filename, artifact.contents.as_bytes())
                .await?;
            written.push(artifact.filename.clone());
        }

        if export.bundle && !artifacts.is_empty() {
            let zip_data = bundle_artifacts(&artifacts)?;
            tracing::debug!("Writing ZIP bundle ({} bytes) to storage", zip_data.len());
            self.storage
                .write_file(&export.bundle_filename, &zip_data)
                .await?;
            written.push(export.bundle_filename.clone());
        }

        if written.is_empty() {
            tracing::warn!("No trained models to export");
        } else {
            tracing::info!("Model exported to firmware sources: {}", written.join(", "));
        }
        Ok(written)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, R: ReadingSource> Pipeline for IrrigationPipeline<S, C, R> {
    async fn extract(&self) -> Result<Vec<SensorReading>> {
        let raw = self.fetch().await?;
        let parsed = parse_readings(&raw)?;
        if parsed.skipped_rows > 0 {
            tracing::warn!("Skipped {} unparseable rows", parsed.skipped_rows);
        }
        Ok(parsed.readings)
    }

    async fn transform(&self, data: Vec<SensorReading>) -> Result<TransformResult> {
        let out = processing::preprocess(&data, self.config.preprocess());

        let settings = self.config.train();
        let names = self.config.export();
        let moisture_model =
            train_moisture_model(&names.moisture_name, &out.moisture_cycles, settings)?;
        let water_model = train_water_level_model(&names.water_name, &out.water_cycles, settings)?;

        Ok(TransformResult {
            reading_count: data.len(),
            features: out.features,
            moisture_cycles: out.moisture_cycles,
            water_cycles: out.water_cycles,
            moisture_model,
            water_model,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let TransformResult {
            features,
            moisture_cycles,
            water_cycles,
            moisture_model,
            water_model,
            ..
        } = result;

        self.write_datasets(&Preprocessed {
            features,
            moisture_cycles,
            water_cycles,
        })
        .await?;

        let models: Vec<RegressionModel> = moisture_model.into_iter().chain(water_model).collect();
        for model in &models {
            self.save_model(model).await?;
        }
        self.export_models(&models).await?;

        Ok(self.config.output_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ExportFormat, ExportSettings, PreprocessSettings, TrainSettings};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        preprocess: PreprocessSettings,
        train: TrainSettings,
        export: ExportSettings,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                preprocess: PreprocessSettings::default(),
                train: TrainSettings::default(),
                export: ExportSettings::default(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn output_path(&self) -> &str {
            "test_output"
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

    struct StaticSource(&'static str);

    impl ReadingSource for StaticSource {
        async fn fetch_csv(&self) -> Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }

        fn describe(&self) -> String {
            "static test log".to_string()
        }
    }

    // Moisture cycles of 3600 s and 1200 s; low-water runs of 1800 s and 2400 s.
    const SENSOR_LOG: &str = "\
timestamp,soil_moisture,water_level,temperature,humidity,light_intensity
2025-04-01 06:00:00,85,60,18,70,100
2025-04-01 06:30:00,65,45,20,65,800
2025-04-01 07:00:00,35,25,22,60,1600
2025-04-01 07:00:00,36,25,22,60,1600
2025-04-01 07:30:00,75,28,24,55,2400
2025-04-01 08:00:00,60,20,26,50,3000
2025-04-01 08:20:00,50,22,27,48,3200
2025-04-01 08:40:00,72,24,28,45,3300
2025-04-01 09:00:00,80,90,29,44,3400
";

    fn pipeline(
        config: MockConfig,
    ) -> (
        IrrigationPipeline<MockStorage, MockConfig, StaticSource>,
        MockStorage,
    ) {
        let storage = MockStorage::new();
        (
            IrrigationPipeline::new(storage.clone(), config, StaticSource(SENSOR_LOG)),
            storage,
        )
    }

    #[tokio::test]
    async fn test_extract_saves_raw_log() {
        let (pipeline, storage) = pipeline(MockConfig::new());

        let readings = pipeline.extract().await.unwrap();

        assert_eq!(readings.len(), 9);
        assert_eq!(
            storage.get_file(RAW_DATA_FILE).await.unwrap(),
            SENSOR_LOG.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_transform_labels_cycles_and_trains() {
        let (pipeline, _) = pipeline(MockConfig::new());
        let readings = pipeline.extract().await.unwrap();

        let result = pipeline.transform(readings).await.unwrap();

        assert_eq!(result.reading_count, 9);
        assert_eq!(result.moisture_cycles.len(), 2);
        assert_eq!(result.moisture_cycles[0].duration, 3600.0);
        assert_eq!(result.moisture_cycles[1].duration, 1200.0);
        assert_eq!(result.water_cycles.len(), 2);
        assert_eq!(result.water_cycles[0].duration, 1800.0);
        assert_eq!(result.water_cycles[1].duration, 2400.0);

        let moisture = result.moisture_model.as_ref().unwrap();
        assert_eq!(moisture.name, "moisture");
        assert_eq!(moisture.n_features(), 3);
        let water = result.water_model.as_ref().unwrap();
        assert_eq!(water.name, "water_level");
        assert_eq!(water.n_features(), 4);
        assert_eq!(result.models().count(), 2);
    }

    #[tokio::test]
    async fn test_load_writes_every_artifact() {
        let (pipeline, storage) = pipeline(MockConfig::new());
        let readings = pipeline.extract().await.unwrap();
        let result = pipeline.transform(readings).await.unwrap();

        let output = pipeline.load(result).await.unwrap();

        assert_eq!(output, "test_output");
        for file in [
            FEATURES_FILE,
            MOISTURE_DATA_FILE,
            WATER_DATA_FILE,
            "moisture_model.json",
            "water_level_model.json",
            "moisture_model.h",
            "moisture_model.cpp",
            "water_level_model.h",
            "water_level_model.cpp",
        ] {
            assert!(storage.get_file(file).await.is_some(), "missing {}", file);
        }
        assert!(storage.get_file("firmware_bundle.zip").await.is_none());
    }

    #[tokio::test]
    async fn test_stages_run_from_storage() {
        let mut config = MockConfig::new();
        config.export.format = ExportFormat::Blob;
        config.export.bundle = true;
        let (pipeline, storage) = pipeline(config);

        pipeline.fetch().await.unwrap();
        let out = pipeline.preprocess_stored().await.unwrap();
        assert_eq!(out.moisture_cycles.len(), 2);

        let models = pipeline.train_stored().await.unwrap();
        assert_eq!(models.len(), 2);

        let written = pipeline.export_stored().await.unwrap();
        assert_eq!(
            written,
            vec![
                "moisture_model.h".to_string(),
                "water_level_model.h".to_string(),
                "firmware_bundle.zip".to_string(),
            ]
        );
        let header = storage.get_file("moisture_model.h").await.unwrap();
        assert!(String::from_utf8(header)
            .unwrap()
            .contains("alignas(8) const unsigned char moisture_model_bin[]"));

        let reloaded = pipeline.load_model("water_level").await.unwrap();
        assert_eq!(reloaded, models[1]);
    }

    #[tokio::test]
    async fn test_export_without_models_writes_nothing() {
        let (pipeline, _) = pipeline(MockConfig::new());
        let written = pipeline.export_stored().await.unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_preprocess_without_log_fails() {
        let (pipeline, _) = pipeline(MockConfig::new());
        assert!(matches!(
            pipeline.preprocess_stored().await,
            Err(EtlError::IoError(_))
        ));
    }
}
