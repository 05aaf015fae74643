use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Summary of one full run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output_path: String,
    pub readings: usize,
    pub moisture_cycles: usize,
    pub water_cycles: usize,
    pub models_trained: usize,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Starting ETL process...");

        // Extract
        tracing::info!("Extracting sensor readings...");
        let readings = self.pipeline.extract().await?;
        tracing::info!("Extracted {} readings", readings.len());
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("Building cycle datasets and fitting models...");
        let result = self.pipeline.transform(readings).await?;
        let report = RunReport {
            output_path: String::new(),
            readings: result.reading_count,
            moisture_cycles: result.moisture_cycles.len(),
            water_cycles: result.water_cycles.len(),
            models_trained: result.models().count(),
        };
        tracing::info!(
            "Found {} moisture cycles and {} water cycles, trained {} models",
            report.moisture_cycles,
            report.water_cycles,
            report.models_trained
        );
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("Writing datasets, models and firmware sources...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(RunReport {
            output_path,
            ..report
        })
    }
}
