use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;
use crate::stations::Station;

/// Capability to retrieve the raw bulletin text of one station
#[async_trait]
pub trait BulletinSource: Send + Sync {
    async fn fetch(&self, station: &Station) -> Result<String, FetchError>;
}

/// Fetches bulletins over HTTP from the station's configured URL
#[derive(Clone)]
pub struct HttpBulletinFetcher {
    client: reqwest::Client,
}

impl HttpBulletinFetcher {
    /// Create a fetcher whose requests are bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BulletinSource for HttpBulletinFetcher {
    #[instrument(skip(self), fields(station = %station.id, url = %station.url))]
    async fn fetch(&self, station: &Station) -> Result<String, FetchError> {
        debug!("Sending HTTP request for station bulletin");
        let response = self.client.get(&station.url).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if !status.is_success() {
            warn!("Bulletin request returned {}", status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: station.url.clone(),
            });
        }

        let text = response.text().await?;
        debug!("Retrieved bulletin text, size: {} bytes", text.len());

        Ok(text)
    }
}
