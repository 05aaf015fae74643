//! Realtime Database reads over the REST interface.
//!
//! The database holds either one flat reading or a map of timestamped
//! readings under the configured path. Both shapes are flattened into the
//! same CSV layout the device serves.

use crate::domain::ports::ReadingSource;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

const COLUMNS: [&str; 6] = [
    "timestamp",
    "soil_moisture",
    "water_level",
    "temperature",
    "humidity",
    "light_intensity",
];

#[derive(Debug, Clone)]
pub struct FirebaseSource {
    url: String,
    auth_token: Option<String>,
    client: Client,
}

impl FirebaseSource {
    pub fn new(
        database_url: &str,
        path: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let url = format!(
            "{}/{}.json",
            database_url.trim_end_matches('/'),
            path.trim_matches('/')
        );
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            auth_token,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch_json(&self) -> Result<Value> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        tracing::debug!("Requesting {}", self.url);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

impl ReadingSource for FirebaseSource {
    async fn fetch_csv(&self) -> Result<Vec<u8>> {
        let data = self.fetch_json().await?;
        tracing::debug!("Fetched data: {}", data);
        json_to_csv(&data)
    }

    fn describe(&self) -> String {
        format!("realtime database at {}", self.url)
    }
}

/// Flattens a database snapshot into the raw reading CSV layout.
pub fn json_to_csv(data: &Value) -> Result<Vec<u8>> {
    let entries: Vec<(Option<&str>, &Map<String, Value>)> = match data {
        Value::Null => {
            return Err(EtlError::NoDataError {
                message: "No data found in Firebase".to_string(),
            })
        }
        Value::Object(map) if map.values().all(Value::is_object) => map
            .iter()
            .filter_map(|(key, value)| value.as_object().map(|obj| (Some(key.as_str()), obj)))
            .collect(),
        Value::Object(map) => vec![(None, map)],
        // 整數鍵的資料會以陣列回傳，缺號的位置是 null
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_object().map(|obj| (None, obj)))
            .collect(),
        other => {
            return Err(EtlError::ProcessingError {
                message: format!("unexpected database value: {}", other),
            })
        }
    };

    if entries.is_empty() {
        return Err(EtlError::NoDataError {
            message: "Firebase snapshot has no readings".to_string(),
        });
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for (key, entry) in entries {
        let timestamp = match entry.get("timestamp") {
            Some(value) if !value.is_null() => cell(Some(value)),
            _ => key.unwrap_or_default().to_string(),
        };
        let light = entry.get("light_intensity").or_else(|| entry.get("light"));
        writer.write_record([
            timestamp,
            cell(entry.get("soil_moisture")),
            cell(entry.get("water_level")),
            cell(entry.get("temperature")),
            cell(entry.get("humidity")),
            cell(light),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
