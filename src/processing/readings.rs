use crate::domain::model::{CsvRecord, SensorReading};
use crate::utils::error::{EtlError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const REQUIRED_COLUMNS: [&str; 5] = [
    "timestamp",
    "soil_moisture",
    "water_level",
    "temperature",
    "humidity",
];

const LIGHT_COLUMN: &str = "light_intensity";
const LIGHT_SHORT_COLUMN: &str = "light";

#[derive(Debug, Clone, Default)]
pub struct ParsedReadings {
    pub readings: Vec<SensorReading>,
    pub skipped_rows: usize,
    /// File line numbers of the skipped rows.
    pub skipped_lines: Vec<u64>,
}

/// Parses a raw sensor log and returns the readings sorted by timestamp.
/// Unparseable rows are skipped and counted.
pub fn parse_readings(data: &[u8]) -> Result<ParsedReadings> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = normalize_headers(reader.headers()?);
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(LIGHT_COLUMN))
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::ProcessingError {
            message: format!("sensor log is missing columns: {}", missing.join(", ")),
        });
    }

    let mut parsed = ParsedReadings::default();
    for row in reader.records() {
        // 解析錯誤會帶著該列的位置
        match row.and_then(|record| record.deserialize::<SensorReading>(Some(&headers))) {
            Ok(reading) => parsed.readings.push(reading),
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                tracing::warn!("Skipping sensor row on line {}: {}", line, e);
                parsed.skipped_rows += 1;
                parsed.skipped_lines.push(line);
            }
        }
    }

    if parsed.readings.is_empty() {
        return Err(EtlError::ProcessingError {
            message: "sensor log contains no parseable readings".to_string(),
        });
    }

    // sort_by_key 是穩定排序，同一時間的讀值保留檔案順序
    parsed.readings.sort_by_key(|r| r.timestamp);
    tracing::debug!(
        "Parsed {} readings ({} skipped)",
        parsed.readings.len(),
        parsed.skipped_rows
    );
    Ok(parsed)
}

/// Older firmware logs `light` instead of `light_intensity`. When both are
/// present `light_intensity` wins and `light` is ignored.
fn normalize_headers(headers: &csv::StringRecord) -> csv::StringRecord {
    let has_light_intensity = headers.iter().any(|h| h == LIGHT_COLUMN);
    headers
        .iter()
        .map(|h| {
            if h == LIGHT_SHORT_COLUMN && !has_light_intensity {
                LIGHT_COLUMN
            } else {
                h
            }
        })
        .collect()
}

pub fn write_csv<T: Serialize + CsvRecord>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(T::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// Strict reader for datasets this crate wrote itself.
pub fn read_csv<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
