//! Download of Tempest HTML reports

use crate::config::TempestConfig;
use crate::error::{FetchError, RcaError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetches a report and enforces size and content-type limits
pub struct ReportFetcher {
    http_client: Client,
    max_size: usize,
}

impl ReportFetcher {
    pub fn new(config: &TempestConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| RcaError::Internal(format!("report HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            max_size: config.max_report_size_bytes(),
        })
    }

    /// Fetch the HTML body at `url`
    pub async fn fetch(&self, url: &Url) -> std::result::Result<String, FetchError> {
        info!("Fetching Tempest report from {}", url);

        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let mut response = self.http_client.get(url.clone()).send().await.map_err(network)?;

        if response.status() != StatusCode::OK {
            warn!("Report fetch returned {}", response.status());
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_size {
                return Err(FetchError::TooLarge {
                    size: len as usize,
                    max_size: self.max_size,
                });
            }
        }

        let declared_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains("html"))
            .unwrap_or(false);

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(network)? {
            if body.len() + chunk.len() > self.max_size {
                return Err(FetchError::TooLarge {
                    size: body.len() + chunk.len(),
                    max_size: self.max_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let text = String::from_utf8_lossy(&body).into_owned();
        if !declared_html && !text.to_ascii_lowercase().contains("<html") {
            return Err(FetchError::NotHtml {
                url: url.to_string(),
            });
        }

        debug!("Fetched {} bytes of report", body.len());
        Ok(text)
    }
}
