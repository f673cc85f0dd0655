//! ASCII bar charts for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - yearly totals: vertical `#` bars with year labels underneath
//! - cycle estimates: horizontal `#` bars, one line per category

use crate::metrics::CycleReport;
use crate::report::format::{fmt_won, pad_right};

/// Render yearly totals as vertical bars.
pub fn render_year_bars(series: &[(i32, f64)], width: usize, height: usize) -> String {
    if series.is_empty() {
        return "Plot: yearly total | (no data)\n".to_string();
    }

    let height = height.max(3);
    let slot = (width.max(10) / series.len()).max(1);
    let bar_width = if slot > 1 { slot - 1 } else { 1 };
    let width = slot * series.len();

    let y_max = series.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let scale_max = if y_max > 0.0 && y_max.is_finite() { y_max } else { 1.0 };

    let mut grid = vec![vec![' '; width]; height];
    for (i, &(_, v)) in series.iter().enumerate() {
        if !(v.is_finite() && v > 0.0) {
            continue;
        }
        let top = map_y(v, 0.0, scale_max, height);
        let x0 = i * slot;
        for row in grid.iter_mut().skip(top) {
            for cell in row.iter_mut().skip(x0).take(bar_width) {
                *cell = '#';
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!("Plot: yearly total | max={}\n", fmt_won(y_max)));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    let mut labels = String::new();
    for &(year, _) in series {
        let label = if slot >= 5 {
            year.to_string()
        } else {
            format!("{:02}", year.rem_euclid(100))
        };
        let label: String = label.chars().take(slot).collect();
        labels.push_str(&format!("{label:<slot$}"));
    }
    out.push_str(labels.trim_end());
    out.push('\n');

    out
}

/// Render cycle estimates as horizontal bars scaled to the longest cycle.
pub fn render_cycle_bars(report: &CycleReport, bar_width: usize) -> String {
    if report.estimates.is_empty() {
        return "Cycles: (no data)\n".to_string();
    }

    let bar_width = bar_width.max(5);
    let max_days = report
        .estimates
        .values()
        .map(|e| e.estimated_days)
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str("Cycles: estimated days between restocks\n");
    for estimate in report.estimates.values() {
        let len = if max_days == 0 {
            0
        } else {
            (estimate.estimated_days as f64 / max_days as f64 * bar_width as f64).round() as usize
        };
        let line = format!(
            "{} |{} {}",
            pad_right(estimate.category.column_name(), 8),
            "#".repeat(len),
            estimate.estimated_days
        );
        out.push_str(&line);
        out.push('\n');
    }

    out
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}
