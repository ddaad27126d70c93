use crate::chart::{Chart, RenderMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One polled payload: occupancy counts per place, one count per label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Snapshot {
    pub labels: Vec<String>,
    pub places: Vec<String>,
    #[serde(rename = "seriesByPlace")]
    pub series_by_place: BTreeMap<String, Vec<u32>>,
    pub last_updated_utc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotLayout {
    /// Every series carries one count per label.
    Hourly,
    /// Labels are area names and each series holds that area's single count.
    ByArea,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("series for {place:?} has {actual} values, expected {expected}")]
    SeriesLength {
        place: String,
        expected: usize,
        actual: usize,
    },
    #[error("series for {0:?} has no matching label")]
    UnlabelledArea(String),
}

impl Snapshot {
    pub fn layout(&self) -> Result<SnapshotLayout, SnapshotError> {
        let expected = self.labels.len();
        let mismatch = self
            .series_by_place
            .iter()
            .find(|(_, series)| series.len() != expected);

        let Some((place, series)) = mismatch else {
            return Ok(SnapshotLayout::Hourly);
        };

        let by_area = self
            .series_by_place
            .values()
            .all(|series| series.len() == 1);
        if !by_area {
            return Err(SnapshotError::SeriesLength {
                place: place.clone(),
                expected,
                actual: series.len(),
            });
        }

        match self
            .series_by_place
            .keys()
            .find(|place| !self.labels.contains(place))
        {
            Some(place) => Err(SnapshotError::UnlabelledArea(place.clone())),
            None => Ok(SnapshotLayout::ByArea),
        }
    }

    /// Rewrites a by-area payload so each series has one count per label.
    pub fn normalize(mut self) -> Result<Self, SnapshotError> {
        if self.layout()? == SnapshotLayout::ByArea {
            let width = self.labels.len();
            for (place, series) in self.series_by_place.iter_mut() {
                let value = series.first().copied().unwrap_or_default();
                let mut spread = vec![0; width];
                if let Some(index) = self.labels.iter().position(|label| label == place) {
                    spread[index] = value;
                }
                *series = spread;
            }
        }
        Ok(self)
    }

    /// Series for `place`, or zeros when the payload does not mention it.
    pub fn series_for(&self, place: &str) -> Vec<u32> {
        self.series_by_place
            .get(place)
            .cloned()
            .unwrap_or_else(|| vec![0; self.labels.len()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Mock,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub kind: &'static str,
    pub text: &'static str,
}

impl StatusView {
    pub fn from_source(source: Option<DataSource>) -> Self {
        match source {
            Some(DataSource::Live) => Self {
                kind: "live",
                text: "Live data",
            },
            Some(DataSource::Mock) => Self {
                kind: "mock",
                text: "Mock data (live source unavailable)",
            },
            None => Self {
                kind: "pending",
                text: "Waiting for first refresh",
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub mode: RenderMode,
    pub policy: &'static str,
    pub timezone: String,
    pub now: String,
    pub status: StatusView,
    pub mock_forced: bool,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub next_refresh_at: Option<DateTime<Utc>>,
    pub countdown_secs: Option<i64>,
    pub last_updated_utc: Option<String>,
    pub refresh_count: u64,
    pub total: u64,
    pub chart: Option<Chart>,
    pub chart_svg: String,
}

#[derive(Debug, Deserialize)]
pub struct MockToggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityEvent {
    Visible,
    Focus,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub event: VisibilityEvent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisibilityResponse {
    pub refreshed: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageParams {
    pub dev: Option<u8>,
    pub mock: Option<u8>,
}
