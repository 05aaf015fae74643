use crate::domain::model::{
    ExportSettings, PreprocessSettings, SensorReading, TrainSettings, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Somewhere the controller's sensor log can be pulled from.
pub trait ReadingSource: Send + Sync {
    /// Returns the log as CSV in the raw reading schema.
    fn fetch_csv(&self) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn describe(&self) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn preprocess(&self) -> &PreprocessSettings;
    fn train(&self) -> &TrainSettings;
    fn export(&self) -> &ExportSettings;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<SensorReading>>;
    async fn transform(&self, data: Vec<SensorReading>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
