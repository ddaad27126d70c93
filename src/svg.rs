//! Draws the chart model as a standalone SVG document with plotters.

use crate::chart::{AGGREGATE_RGB, BAR_ALPHA, Chart, RenderMode, place_hue};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

const WIDTH: u32 = 900;
const HEIGHT: u32 = 380;
const FONT: &str = "sans-serif";
const INK: RGBColor = RGBColor(108, 99, 119);
const GRID: RGBAColor = RGBAColor(108, 99, 119, 0.25);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("chart drawing failed: {0}")]
    Draw(#[from] DrawingAreaErrorKind<std::io::Error>),
}

pub fn render_chart(chart: Option<&Chart>) -> Result<String, RenderError> {
    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        match chart.filter(|chart| !chart.labels.is_empty()) {
            Some(chart) => draw_bars(&root, chart)?,
            None => {
                root.draw(&Text::new(
                    "No data yet",
                    (WIDTH as i32 / 2, HEIGHT as i32 / 2),
                    (FONT, 16)
                        .into_font()
                        .color(&INK)
                        .pos(Pos::new(HPos::Center, VPos::Center)),
                ))?;
            }
        }
        root.present()?;
    }
    Ok(buffer)
}

fn draw_bars(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    model: &Chart,
) -> Result<(), DrawingAreaErrorKind<std::io::Error>> {
    let totals = model.totals();
    let peak = totals.iter().copied().max().unwrap_or(0) as f64;
    let slots = model.labels.len() as f64;

    let mut chart = ChartBuilder::on(root)
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(56)
        .build_cartesian_2d(0f64..slots, 0f64..(peak * 1.15).max(5.0))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .y_labels(6)
        .light_line_style(TRANSPARENT)
        .bold_line_style(GRID)
        .axis_style(INK)
        .x_desc(model.x_title)
        .y_desc(model.y_title)
        .axis_desc_style((FONT, 14, &INK))
        .label_style((FONT, 12, &INK))
        .y_label_formatter(&|value| format!("{value:.0}"))
        .draw()?;

    let mut bottoms = vec![0f64; model.labels.len()];
    for dataset in &model.datasets {
        let fill = match dataset.place_index {
            Some(index) => HSLColor(place_hue(index) / 360.0, 0.62, 0.52).mix(BAR_ALPHA),
            None => {
                let (r, g, b) = AGGREGATE_RGB;
                RGBColor(r, g, b).mix(BAR_ALPHA)
            }
        };

        let mut bars = Vec::new();
        for (index, value) in dataset.data.iter().copied().enumerate() {
            let Some(bottom) = bottoms.get_mut(index) else {
                break;
            };
            if value == 0 {
                continue;
            }
            let top = *bottom + value as f64;
            let left = index as f64 + 0.15;
            bars.push(Rectangle::new([(left, *bottom), (left + 0.7, top)], fill.filled()));
            *bottom = top;
        }

        let series = chart.draw_series(bars)?;
        if model.mode == RenderMode::Stacked {
            series.label(dataset.label.as_str()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], fill.filled())
            });
        }
    }

    let below = (FONT, 12)
        .into_font()
        .color(&INK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    chart.draw_series(model.labels.iter().enumerate().map(|(index, label)| {
        EmptyElement::at((index as f64 + 0.5, 0.0))
            + Text::new(label.clone(), (0, 8), below.clone())
    }))?;

    let above = (FONT, 12)
        .into_font()
        .color(&INK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(totals.iter().enumerate().filter(|(_, total)| **total > 0).map(
        |(index, total)| {
            EmptyElement::at((index as f64 + 0.5, *total as f64))
                + Text::new(total.to_string(), (0, -4), above.clone())
        },
    ))?;

    if model.mode == RenderMode::Stacked {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font((FONT, 12, &INK))
            .background_style(WHITE.mix(0.6))
            .border_style(GRID)
            .draw()?;
    }
    Ok(())
}
