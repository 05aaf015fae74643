use crate::domain::ports::ReadingSource;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::time::Duration;

/// The controller's on-board file server, which serves its CSV log.
#[derive(Debug, Clone)]
pub struct DeviceSource {
    url: String,
    client: Client,
}

impl DeviceSource {
    pub fn new(endpoint: &str, path: &str, timeout: Duration) -> Result<Self> {
        let url = format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReadingSource for DeviceSource {
    async fn fetch_csv(&self) -> Result<Vec<u8>> {
        tracing::debug!("Requesting sensor log from {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        tracing::debug!("Device response status: {}", status);

        if !status.is_success() {
            tracing::error!("{} answered with status {}", self.url, status);
            return Err(EtlError::HttpStatusError {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        tracing::info!("CSV file downloaded successfully ({} bytes)", body.len());
        Ok(body.to_vec())
    }

    fn describe(&self) -> String {
        format!("device file server at {}", self.url)
    }
}
