use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bar colour used when every place is folded into one series.
pub const AGGREGATE_COLOR: &str = "rgba(69, 44, 99, 0.9)";
pub const AGGREGATE_RGB: (u8, u8, u8) = (69, 44, 99);
pub const BAR_ALPHA: f64 = 0.9;

const GOLDEN_ANGLE: f64 = 137.508;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// One bar per label holding the sum across places.
    Aggregate,
    /// One stacked segment per place in every bar.
    Stacked,
}

impl RenderMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "aggregate" | "total" => Some(Self::Aggregate),
            "stacked" | "per_place" => Some(Self::Stacked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<u64>,
    pub background_color: String,
    /// Index into the place list; `None` for the aggregate series.
    #[serde(skip)]
    pub place_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chart {
    pub mode: RenderMode,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    /// Tooltip footer per label; empty unless stacked.
    pub footers: Vec<String>,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub animated: bool,
}

impl Chart {
    fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            labels: Vec::new(),
            datasets: Vec::new(),
            footers: Vec::new(),
            x_title: "Hour",
            y_title: "People Present",
            animated: false,
        }
    }

    /// Bar height per label, summed over every dataset.
    pub fn totals(&self) -> Vec<u64> {
        (0..self.labels.len())
            .map(|index| {
                self.datasets
                    .iter()
                    .filter_map(|dataset| dataset.data.get(index))
                    .sum()
            })
            .collect()
    }
}

/// Deterministic hue in degrees for the place at `index`.
pub fn place_hue(index: usize) -> f64 {
    ((index as f64 * GOLDEN_ANGLE) % 360.0).round()
}

pub fn color_for(index: usize, alpha: f64) -> String {
    format!("hsla({}, 62%, 52%, {alpha})", place_hue(index) as u32)
}

/// "Hour" when every label reads as a clock time, "Area" otherwise.
pub fn axis_title(labels: &[String]) -> &'static str {
    let hourly = labels
        .iter()
        .all(|label| NaiveTime::parse_from_str(label, "%H:%M").is_ok());
    if hourly { "Hour" } else { "Area" }
}

/// Owns the single chart instance and rewrites it on every render.
#[derive(Debug)]
pub struct ChartRenderer {
    mode: RenderMode,
    chart: Option<Chart>,
    instances_created: usize,
}

impl ChartRenderer {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            chart: None,
            instances_created: 0,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref()
    }

    pub fn instances_created(&self) -> usize {
        self.instances_created
    }

    pub fn render(
        &mut self,
        labels: &[String],
        places: &[String],
        series_by_place: &BTreeMap<String, Vec<u32>>,
    ) -> &Chart {
        let datasets = match self.mode {
            RenderMode::Aggregate => vec![aggregate_dataset(labels, places, series_by_place)],
            RenderMode::Stacked => places
                .iter()
                .enumerate()
                .map(|(index, place)| Dataset {
                    label: place.clone(),
                    data: aligned(labels.len(), series_by_place.get(place)),
                    background_color: color_for(index, BAR_ALPHA),
                    place_index: Some(index),
                })
                .collect(),
        };

        let mode = self.mode;
        if self.chart.is_none() {
            self.instances_created += 1;
            tracing::debug!(?mode, "chart created");
        }
        let chart = self.chart.get_or_insert_with(|| Chart::new(mode));

        chart.labels.clear();
        chart.labels.extend_from_slice(labels);
        chart.x_title = axis_title(labels);
        chart.datasets = datasets;
        chart.footers = match mode {
            RenderMode::Aggregate => Vec::new(),
            RenderMode::Stacked => chart
                .totals()
                .into_iter()
                .map(|total| format!("Total: {total}"))
                .collect(),
        };
        chart
    }
}

fn aggregate_dataset(
    labels: &[String],
    places: &[String],
    series_by_place: &BTreeMap<String, Vec<u32>>,
) -> Dataset {
    let mut data = vec![0u64; labels.len()];
    for place in places {
        for (slot, value) in data
            .iter_mut()
            .zip(aligned(labels.len(), series_by_place.get(place)))
        {
            *slot = slot.saturating_add(value);
        }
    }
    Dataset {
        label: "People Present".to_string(),
        data,
        background_color: AGGREGATE_COLOR.to_string(),
        place_index: None,
    }
}

fn aligned(len: usize, series: Option<&Vec<u32>>) -> Vec<u64> {
    let mut data: Vec<u64> = series
        .map(|values| values.iter().map(|&value| u64::from(value)).collect())
        .unwrap_or_default();
    data.resize(len, 0);
    data
}
