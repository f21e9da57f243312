//! Window visualization
//!
//! - **Terminal**: Unicode sparklines of steps and sleep, always available
//! - **PNG export**: side-by-side persona comparison chart (optional
//!   `plotters` feature)

use std::path::Path;

#[cfg(feature = "plotters")]
use plotters::coord::Shift;
#[cfg(feature = "plotters")]
use plotters::prelude::*;
#[cfg(feature = "plotters")]
use tracing::info;
#[cfg(not(feature = "plotters"))]
use tracing::warn;

use crate::error::PersonaError;
use crate::stats::descriptive::mean;
use crate::types::{Persona, Window};

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One character per value, scaled between the present min and max.
///
/// Missing values render as a space.
pub fn sparkline(values: &[Option<f64>]) -> String {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return " ".repeat(values.len());
    }

    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = (max - min).max(0.001);

    values
        .iter()
        .map(|value| match value {
            Some(v) => {
                let normalized = (v - min) / range;
                SPARK_CHARS[((normalized * 7.0).round() as usize).min(7)]
            }
            None => ' ',
        })
        .collect()
}

/// Two-line terminal summary of a selected window
pub fn window_sparklines(persona: Persona, window: &Window) -> String {
    let steps: Vec<Option<f64>> = window.days.iter().map(|d| d.record.steps).collect();
    let sleep: Vec<Option<f64>> = window.days.iter().map(|d| d.record.sleep_hours()).collect();

    let mean_steps = mean(&window.steps()).unwrap_or(0.0);
    let mean_sleep = mean(&window.sleep_minutes()).unwrap_or(0.0) / 60.0;

    format!(
        "Persona {persona} ({} from {})\n  steps {}  avg {mean_steps:.0}\n  sleep {}  avg {mean_sleep:.1}h",
        window.participant_id,
        window.start_date,
        sparkline(&steps),
        sparkline(&sleep),
    )
}

#[cfg(feature = "plotters")]
const STEPS_COLOR: RGBColor = RGBColor(0xFF, 0x6A, 0x2A);
#[cfg(feature = "plotters")]
const SLEEP_COLOR: RGBColor = RGBColor(0x00, 0x6B, 0x67);
#[cfg(feature = "plotters")]
const WEEKEND_SHADE: RGBColor = RGBColor(128, 128, 128);

#[cfg(feature = "plotters")]
fn plot_error(err: impl std::fmt::Display) -> PersonaError {
    PersonaError::PlotError(err.to_string())
}

/// Write a side-by-side steps/sleep chart with one panel per persona
#[cfg(feature = "plotters")]
pub fn plot_comparison(panels: &[(Persona, &Window)], output_path: &Path) -> Result<(), PersonaError> {
    if panels.is_empty() {
        return Ok(());
    }

    let width = 800 * panels.len() as u32;
    let root = BitMapBackend::new(output_path, (width, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let areas = root.split_evenly((1, panels.len()));
    for ((persona, window), area) in panels.iter().zip(areas.iter()) {
        draw_panel(area, *persona, window)?;
    }

    root.present().map_err(plot_error)?;
    info!(path = %output_path.display(), "saved comparison plot");
    Ok(())
}

#[cfg(feature = "plotters")]
fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    persona: Persona,
    window: &Window,
) -> Result<(), PersonaError> {
    let n = window.len();
    let x_range = -0.5..(n as f64 - 0.5);

    let steps: Vec<(f64, f64)> = window
        .days
        .iter()
        .enumerate()
        .filter_map(|(i, d)| Some((i as f64, d.record.steps?)))
        .collect();
    let sleep: Vec<(f64, f64)> = window
        .days
        .iter()
        .enumerate()
        .filter_map(|(i, d)| Some((i as f64, d.record.sleep_hours()?)))
        .collect();
    let labels: Vec<String> = window
        .days
        .iter()
        .map(|d| d.record.date.format("%m-%d").to_string())
        .collect();

    let max_steps = steps.iter().map(|(_, s)| *s).fold(1.0_f64, f64::max) * 1.1;
    let max_sleep = sleep.iter().map(|(_, h)| *h).fold(1.0_f64, f64::max) * 1.2;
    let mean_steps = mean(&window.steps()).unwrap_or(0.0);
    let mean_sleep = mean(&window.sleep_minutes()).unwrap_or(0.0) / 60.0;

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("Persona {persona}: avg {mean_steps:.0} steps | {mean_sleep:.1}h sleep"),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .right_y_label_area_size(50)
        .build_cartesian_2d(x_range.clone(), 0.0..max_steps)
        .map_err(plot_error)?
        .set_secondary_coord(x_range, 0.0..max_sleep);

    let label_for = |x: &f64| {
        let i = x.round();
        if i >= 0.0 && (i as usize) < labels.len() {
            labels[i as usize].clone()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&label_for)
        .y_desc("Steps")
        .draw()
        .map_err(plot_error)?;
    chart
        .configure_secondary_axes()
        .y_desc("Sleep (hours)")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(
            window
                .days
                .iter()
                .enumerate()
                .filter(|(_, d)| d.is_weekend)
                .map(|(i, _)| {
                    let x = i as f64;
                    Rectangle::new(
                        [(x - 0.5, 0.0), (x + 0.5, max_steps)],
                        WEEKEND_SHADE.mix(0.15).filled(),
                    )
                }),
        )
        .map_err(plot_error)?;

    chart
        .draw_series(steps.iter().map(|(x, s)| {
            Rectangle::new([(*x - 0.35, 0.0), (*x + 0.35, *s)], STEPS_COLOR.mix(0.8).filled())
        }))
        .map_err(plot_error)?;

    chart
        .draw_secondary_series(LineSeries::new(sleep.clone(), SLEEP_COLOR.stroke_width(2)))
        .map_err(plot_error)?;
    chart
        .draw_secondary_series(
            sleep
                .iter()
                .map(|(x, h)| Circle::new((*x, *h), 4, SLEEP_COLOR.filled())),
        )
        .map_err(plot_error)?;

    Ok(())
}

/// Stub when the plotters feature is disabled.
#[cfg(not(feature = "plotters"))]
pub fn plot_comparison(panels: &[(Persona, &Window)], output_path: &Path) -> Result<(), PersonaError> {
    warn!(
        panels = panels.len(),
        path = %output_path.display(),
        "comparison plot requires the plotters feature; skipping"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyRecord;
    use crate::window::{prepare_window, WindowConfig};
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_sparkline_scales_between_min_and_max() {
        let line = sparkline(&[Some(0.0), Some(5.0), None, Some(10.0)]);
        assert_eq!(line, "▁▅ █");
    }

    #[test]
    fn test_sparkline_constant_and_empty() {
        assert_eq!(sparkline(&[Some(3.0), Some(3.0)]), "▁▁");
        assert_eq!(sparkline(&[None, None]), "  ");
        assert_eq!(sparkline(&[]), "");
    }

    #[test]
    fn test_window_sparklines_mentions_participant() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let records: Vec<DailyRecord> = (0..14)
            .map(|i| {
                DailyRecord::new(
                    "p7",
                    start + Duration::days(i),
                    Some(5000.0 + 100.0 * i as f64),
                    Some(360.0),
                )
            })
            .collect();
        let window = prepare_window(&records, &WindowConfig::default()).unwrap();

        let text = window_sparklines(Persona::A, &window);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Persona A (p7 from 2024-01-15)"));
        assert!(lines[1].contains('▁') && lines[1].contains('█'));
        assert!(lines[2].ends_with("avg 6.0h"));
    }
}
