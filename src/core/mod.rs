pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{SensorReading, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, ReadingSource, Storage};
pub use crate::utils::error::Result;
pub use etl::{EtlEngine, RunReport};
pub use pipeline::IrrigationPipeline;
