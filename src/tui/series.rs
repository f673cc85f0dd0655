//! Chart data prep for the dashboard tabs.
//!
//! Pure functions of a [`Dashboard`]; the widget only draws what these return.

use plotters::style::RGBColor;

use crate::domain::Category;
use crate::metrics::{category_series, Dashboard};
use crate::tui::plotters_chart::{ChartSeries, SeriesStyle};

/// Which chart the body shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartTab {
    #[default]
    YearTotals,
    CategoryTrend,
    Cycles,
}

impl ChartTab {
    pub const ALL: [ChartTab; 3] = [ChartTab::YearTotals, ChartTab::CategoryTrend, ChartTab::Cycles];

    pub fn title(self) -> &'static str {
        match self {
            ChartTab::YearTotals => "연도별 구매금액",
            ChartTab::CategoryTrend => "품목군별 추이",
            ChartTab::Cycles => "품목군별 입고 주기 (추정, 일)",
        }
    }

    pub fn next(self) -> ChartTab {
        match self {
            ChartTab::YearTotals => ChartTab::CategoryTrend,
            ChartTab::CategoryTrend => ChartTab::Cycles,
            ChartTab::Cycles => ChartTab::YearTotals,
        }
    }

    pub fn prev(self) -> ChartTab {
        match self {
            ChartTab::YearTotals => ChartTab::Cycles,
            ChartTab::CategoryTrend => ChartTab::YearTotals,
            ChartTab::Cycles => ChartTab::CategoryTrend,
        }
    }
}

/// Series, bounds and tick labels for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub series: Vec<ChartSeries>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_ticks: Vec<(f64, String)>,
    pub y_ticks: Vec<(f64, String)>,
}

const TOTAL_COLOR: RGBColor = RGBColor(0, 255, 255);

/// High-contrast palette, one color per category in schema order.
pub fn category_color(category: Category) -> RGBColor {
    match category {
        Category::Etc => RGBColor(255, 215, 0),
        Category::Ch => RGBColor(0, 255, 0),
        Category::HealthFood => RGBColor(255, 105, 180),
        Category::Global => RGBColor(100, 149, 237),
        Category::Other => RGBColor(200, 200, 200),
    }
}

/// `None` when there is nothing to draw for `tab`.
pub fn chart_data(dashboard: &Dashboard, tab: ChartTab) -> Option<ChartData> {
    match tab {
        ChartTab::YearTotals => year_totals_chart(dashboard),
        ChartTab::CategoryTrend => category_trend_chart(dashboard),
        ChartTab::Cycles => cycles_chart(dashboard),
    }
}

fn year_totals_chart(dashboard: &Dashboard) -> Option<ChartData> {
    let points: Vec<(f64, f64)> = dashboard
        .year_totals
        .iter()
        .map(|&(year, total)| (year as f64, total))
        .collect();
    let years: Vec<i32> = dashboard.year_totals.iter().map(|&(y, _)| y).collect();
    let y_max = points.iter().map(|&(_, v)| v).fold(0.0, f64::max);
    let (x_bounds, x_ticks) = year_axis(&years)?;
    let y_bounds = [0.0, pad_top(y_max)];

    Some(ChartData {
        series: vec![ChartSeries {
            label: "전체 구매금액".to_string(),
            color: TOTAL_COLOR,
            style: SeriesStyle::Bars { half_width: 0.3 },
            points,
        }],
        x_bounds,
        y_bounds,
        x_ticks,
        y_ticks: amount_ticks(y_bounds),
    })
}

fn category_trend_chart(dashboard: &Dashboard) -> Option<ChartData> {
    let by_category = category_series(&dashboard.tidy);
    if by_category.is_empty() {
        return None;
    }

    let years: Vec<i32> = dashboard.filtered.iter().map(|r| r.year).collect();
    let (x_bounds, x_ticks) = year_axis(&years)?;
    let y_max = by_category
        .values()
        .flat_map(|pts| pts.iter().map(|&(_, v)| v))
        .fold(0.0, f64::max);
    let y_bounds = [0.0, pad_top(y_max)];

    let series = by_category
        .into_iter()
        .map(|(category, pts)| ChartSeries {
            label: category.column_name().to_string(),
            color: category_color(category),
            style: SeriesStyle::Line,
            points: pts.into_iter().map(|(y, v)| (y as f64, v)).collect(),
        })
        .collect();

    Some(ChartData {
        series,
        x_bounds,
        y_bounds,
        x_ticks,
        y_ticks: amount_ticks(y_bounds),
    })
}

/// Cycle bars sit at their category's schema position so colors and slots stay put.
fn cycles_chart(dashboard: &Dashboard) -> Option<ChartData> {
    let estimates = &dashboard.cycles.estimates;
    if estimates.is_empty() {
        return None;
    }

    let slot = |c: Category| Category::ALL.iter().position(|&a| a == c).unwrap_or(0) as f64;
    let series = estimates
        .values()
        .map(|e| ChartSeries {
            label: e.category.column_name().to_string(),
            color: category_color(e.category),
            style: SeriesStyle::Bars { half_width: 0.3 },
            points: vec![(slot(e.category), e.estimated_days as f64)],
        })
        .collect();
    let x_ticks = estimates
        .keys()
        .map(|&c| (slot(c), c.column_name().to_string()))
        .collect();

    let max_days = estimates.values().map(|e| e.estimated_days).max().unwrap_or(0) as f64;
    let y_bounds = [0.0, pad_top(max_days)];
    let y_ticks = even_ticks(y_bounds, 5, |v| format!("{v:.0}"));

    Some(ChartData {
        series,
        x_bounds: [-0.6, Category::ALL.len() as f64 - 0.4],
        y_bounds,
        x_ticks,
        y_ticks,
    })
}

/// Bounds with half a year of room on each side, and one tick per year
/// (thinned so at most eight labels are drawn).
fn year_axis(years: &[i32]) -> Option<([f64; 2], Vec<(f64, String)>)> {
    let first = *years.iter().min()?;
    let last = *years.iter().max()?;
    let span = (i64::from(last) - i64::from(first)) as usize + 1;
    let step = span.div_ceil(8).max(1);

    let ticks = (first..=last)
        .step_by(step)
        .map(|y| (y as f64, y.to_string()))
        .collect();
    Some(([first as f64 - 0.6, last as f64 + 0.6], ticks))
}

fn pad_top(max: f64) -> f64 {
    if max.is_finite() && max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn amount_ticks(bounds: [f64; 2]) -> Vec<(f64, String)> {
    even_ticks(bounds, 5, fmt_axis_amount)
}

fn even_ticks(bounds: [f64; 2], n: usize, fmt: impl Fn(f64) -> String) -> Vec<(f64, String)> {
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let v = bounds[0] + u * (bounds[1] - bounds[0]);
            (v, fmt(v))
        })
        .collect()
}

/// Axis amounts in millions of won (`12.5M`).
pub fn fmt_axis_amount(v: f64) -> String {
    let m = v / 1_000_000.0;
    if m.abs() >= 100.0 || m == 0.0 {
        format!("{m:.0}M")
    } else {
        format!("{m:.1}M")
    }
}
