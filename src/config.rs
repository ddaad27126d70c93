use crate::chart::RenderMode;
use crate::schedule::RefreshPolicy;
use chrono_tz::Tz;
use std::{env, time::Duration};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api/hourly_breakdown";

/// Area groupings reported by the occupancy backend, in display order.
const DEFAULT_PLACES: [&str; 7] = [
    "Main Gym",
    "Weight Room",
    "Multipurpose Gym",
    "Track",
    "Aerobics Room",
    "Table Tennis",
    "Lobby",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("unknown timezone {0:?}")]
    Timezone(String),
    #[error("place {0:?} has an empty or inverted range")]
    PlaceRange(String),
    #[error("opening hour {opening} must be before closing hour {closing} (max 24)")]
    Hours { opening: u32, closing: u32 },
    #[error("no places configured")]
    NoPlaces,
}

/// A tracked area and the range its mock counts are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceConfig {
    pub name: String,
    pub low: u32,
    pub high: u32,
}

impl PlaceConfig {
    pub fn new(name: impl Into<String>, low: u32, high: u32) -> Self {
        Self {
            name: name.into(),
            low,
            high,
        }
    }

    fn with_default_range(name: &str) -> Self {
        let (low, high) = match name {
            "Main Gym" => (0, 40),
            "Weight Room" => (5, 45),
            "Multipurpose Gym" => (0, 30),
            "Track" => (0, 25),
            "Aerobics Room" => (0, 20),
            "Table Tennis" => (0, 8),
            "Lobby" => (0, 15),
            _ => (0, 20),
        };
        Self::new(name, low, high)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub api_url: String,
    pub title: String,
    pub timezone: Tz,
    pub mode: RenderMode,
    pub places: Vec<PlaceConfig>,
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub dev_mode: bool,
    pub dev_interval: Duration,
    pub force_mock: bool,
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            api_url: DEFAULT_API_URL.to_string(),
            title: "Facility Occupancy".to_string(),
            timezone: chrono_tz::America::Chicago,
            mode: RenderMode::Aggregate,
            places: default_places(),
            opening_hour: 6,
            closing_hour: 23,
            dev_mode: false,
            dev_interval: Duration::from_secs(30),
            force_mock: false,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mode = match get("DASHBOARD_MODE") {
            Some(value) => RenderMode::parse(&value).ok_or(ConfigError::Invalid {
                name: "DASHBOARD_MODE",
                value,
            })?,
            None => defaults.mode,
        };

        let timezone = match get("DASHBOARD_TIMEZONE") {
            Some(value) => value
                .parse::<Tz>()
                .map_err(|_| ConfigError::Timezone(value))?,
            None => defaults.timezone,
        };

        let places = match get("DASHBOARD_PLACES") {
            Some(value) => parse_places(&value)?,
            None => default_places(),
        };

        let config = Self {
            port: number(&get, "PORT")?.unwrap_or(defaults.port),
            api_url: get("OCCUPANCY_API_URL").unwrap_or(defaults.api_url),
            title: get("DASHBOARD_TITLE").unwrap_or(defaults.title),
            timezone,
            mode,
            places,
            opening_hour: number(&get, "OPENING_HOUR")?.unwrap_or(defaults.opening_hour),
            closing_hour: number(&get, "CLOSING_HOUR")?.unwrap_or(defaults.closing_hour),
            dev_mode: flag(&get, "DASHBOARD_DEV")?.unwrap_or(defaults.dev_mode),
            dev_interval: number(&get, "DEV_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.dev_interval),
            force_mock: flag(&get, "DASHBOARD_MOCK")?.unwrap_or(defaults.force_mock),
            fetch_timeout: number(&get, "FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.places.is_empty() {
            return Err(ConfigError::NoPlaces);
        }
        if self.opening_hour >= self.closing_hour || self.closing_hour > 24 {
            return Err(ConfigError::Hours {
                opening: self.opening_hour,
                closing: self.closing_hour,
            });
        }
        if self.dev_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "DEV_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn policy(&self) -> RefreshPolicy {
        if self.dev_mode {
            RefreshPolicy::FixedInterval(self.dev_interval)
        } else {
            RefreshPolicy::WallClock {
                timezone: self.timezone,
            }
        }
    }

    pub fn place_names(&self) -> Vec<String> {
        self.places.iter().map(|place| place.name.clone()).collect()
    }
}

pub fn default_places() -> Vec<PlaceConfig> {
    DEFAULT_PLACES
        .iter()
        .map(|name| PlaceConfig::with_default_range(name))
        .collect()
}

/// Parses `Name` or `Name=low-high` entries separated by commas.
pub fn parse_places(value: &str) -> Result<Vec<PlaceConfig>, ConfigError> {
    let mut places = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let place = match entry.rsplit_once('=') {
            None => PlaceConfig::with_default_range(entry),
            Some((name, range)) => {
                let name = name.trim();
                let (low, high) = range
                    .split_once('-')
                    .and_then(|(low, high)| {
                        Some((low.trim().parse::<u32>().ok()?, high.trim().parse::<u32>().ok()?))
                    })
                    .ok_or_else(|| ConfigError::PlaceRange(name.to_string()))?;
                if name.is_empty() || low > high {
                    return Err(ConfigError::PlaceRange(name.to_string()));
                }
                PlaceConfig::new(name, low, high)
            }
        };
        places.push(place);
    }
    if places.is_empty() {
        return Err(ConfigError::NoPlaces);
    }
    Ok(places)
}

fn number<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

fn flag(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    get(name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        })
        .transpose()
}
