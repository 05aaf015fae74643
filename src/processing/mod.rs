pub mod features;
pub mod moisture;
pub mod readings;
pub mod water;

use crate::domain::model::{
    FeatureRow, MoistureCycle, PreprocessSettings, SensorReading, WaterCycle,
};

pub use features::derive_features;
pub use moisture::label_moisture_cycles;
pub use readings::{parse_readings, read_csv, write_csv, ParsedReadings};
pub use water::group_water_cycles;

pub const RAW_DATA_FILE: &str = "sensor_data.csv";
pub const FEATURES_FILE: &str = "sensor_features.csv";
pub const MOISTURE_DATA_FILE: &str = "processed_moisture_data.csv";
pub const WATER_DATA_FILE: &str = "processed_water_data.csv";

#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    pub features: Vec<FeatureRow>,
    pub moisture_cycles: Vec<MoistureCycle>,
    pub water_cycles: Vec<WaterCycle>,
}

/// Runs every restructuring step over readings already sorted by time.
pub fn preprocess(readings: &[SensorReading], settings: &PreprocessSettings) -> Preprocessed {
    let features = derive_features(readings);
    let moisture_cycles = label_moisture_cycles(readings, settings);
    let water_cycles = group_water_cycles(readings, settings);

    tracing::info!(
        "Preprocessed {} readings into {} moisture cycles and {} water cycles",
        readings.len(),
        moisture_cycles.len(),
        water_cycles.len()
    );

    Preprocessed {
        features,
        moisture_cycles,
        water_cycles,
    }
}
