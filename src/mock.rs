use crate::config::{Config, PlaceConfig};
use crate::models::Snapshot;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::collections::BTreeMap;

/// Synthesizes plausible snapshots when the live source is unavailable.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    places: Vec<PlaceConfig>,
    opening_hour: u32,
    closing_hour: u32,
    timezone: Tz,
}

impl MockGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            places: config.places.clone(),
            opening_hour: config.opening_hour,
            closing_hour: config.closing_hour,
            timezone: config.timezone,
        }
    }

    pub fn generate(&self, now: DateTime<Utc>) -> Snapshot {
        self.generate_with(now, &mut rand::thread_rng())
    }

    /// One `HH:00` label per hour from opening up to the current hour, capped
    /// at the last hour before closing.
    pub fn generate_with<R: Rng>(&self, now: DateTime<Utc>, rng: &mut R) -> Snapshot {
        let current_hour = now.with_timezone(&self.timezone).hour();
        let last_hour = current_hour.min(self.closing_hour.saturating_sub(1));
        let labels: Vec<String> = (self.opening_hour..=last_hour)
            .map(|hour| format!("{hour:02}:00"))
            .collect();

        let series_by_place: BTreeMap<String, Vec<u32>> = self
            .places
            .iter()
            .map(|place| {
                let counts = labels
                    .iter()
                    .map(|_| rng.gen_range(place.low..=place.high))
                    .collect();
                (place.name.clone(), counts)
            })
            .collect();

        Snapshot {
            labels,
            places: self.places.iter().map(|place| place.name.clone()).collect(),
            series_by_place,
            last_updated_utc: now.to_rfc3339(),
        }
    }
}
