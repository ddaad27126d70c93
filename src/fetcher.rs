use crate::config::Config;
use crate::mock::MockGenerator;
use crate::models::{DataSource, Snapshot, SnapshotError};
use chrono::{DateTime, Utc};
use reqwest::{
    Client, StatusCode,
    header::{CACHE_CONTROL, PRAGMA},
};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream answered HTTP {0}")]
    Status(StatusCode),
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// A snapshot together with where it came from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub snapshot: Snapshot,
    pub source: DataSource,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    url: String,
    mock: MockGenerator,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.fetch_timeout).build()?;
        Ok(Self {
            client,
            url: config.api_url.clone(),
            mock: MockGenerator::new(config),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches the live snapshot, substituting mock data on any failure.
    pub async fn fetch_snapshot(&self, now: DateTime<Utc>) -> Fetched {
        match self.fetch_live().await {
            Ok(snapshot) => {
                debug!(labels = snapshot.labels.len(), "live snapshot received");
                Fetched {
                    snapshot,
                    source: DataSource::Live,
                }
            }
            Err(err) => {
                warn!(url = %self.url, error = %err, "occupancy data unavailable, using mock data");
                self.mock_snapshot(now)
            }
        }
    }

    pub fn mock_snapshot(&self, now: DateTime<Utc>) -> Fetched {
        Fetched {
            snapshot: self.mock.generate(now),
            source: DataSource::Mock,
        }
    }

    pub async fn fetch_live(&self) -> Result<Snapshot, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let snapshot: Snapshot = response.json().await?;
        Ok(snapshot.normalize()?)
    }
}
