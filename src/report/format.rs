//! Formatted terminal output for the `summary` command.
//!
//! We keep formatting code in one place so:
//! - the metrics code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use ratatui::text::Span;

use crate::domain::{Category, PurchaseRecord};
use crate::io::ingest::LoadedTable;
use crate::metrics::{CycleReport, Dashboard};
use crate::report::{kpi_cards, NO_DATA};

/// Format the run header, KPI block and all tables.
pub fn format_summary(table: &LoadedTable, dashboard: &Dashboard) -> String {
    let mut out = String::new();

    out.push_str("=== procure - 구매현황 대시보드 ===\n");
    out.push_str(&format!("Source: {}\n", table.source.display()));
    out.push_str(&format!(
        "Rows: read={} | used={} | no-year={} | issues={}\n",
        table.rows_read,
        table.records.len(),
        table.rows_without_year,
        table.row_issues.len(),
    ));
    out.push_str(&format!("Years: {}\n", fmt_year_list(&dashboard.selected_years)));
    out.push('\n');

    out.push_str("Key metrics:\n");
    out.push_str(&format_kpis(dashboard));
    out.push('\n');

    out.push_str("Yearly purchases:\n");
    out.push_str(&format_records_table(&dashboard.filtered, &table.categories));
    out.push('\n');

    out.push_str(&format!("Restocking cycles (estimated, model={}):\n", dashboard.cycles.model));
    out.push_str(&format_cycles_table(&dashboard.cycles));

    if !table.row_issues.is_empty() {
        out.push('\n');
        out.push_str("Skipped input:\n");
        for issue in &table.row_issues {
            out.push_str(&format!("  row {}: {}\n", issue.row, issue.message));
        }
    }

    out
}

/// One line per KPI card: `label  value  (delta)`.
pub fn format_kpis(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    for card in kpi_cards(&dashboard.kpis) {
        let mut line = format!("  {}  {}", pad_right(&card.label, 22), card.value);
        if let Some(delta) = &card.delta {
            line.push_str(&format!("  ({delta} YoY)"));
        }
        if let Some(note) = &card.note {
            line.push_str(&format!("  {note}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Wide table: year, total, one column per present category.
pub fn format_records_table(records: &[PurchaseRecord], categories: &[Category]) -> String {
    if records.is_empty() {
        return format!("  {NO_DATA} (no years selected)\n");
    }

    let mut header = format!("{} {}", pad_right("연", 6), pad_left("전체 구매금액", 16));
    let mut rule = format!("{:-<6} {:-<16}", "", "");
    for c in categories {
        header.push(' ');
        header.push_str(&pad_left(c.column_name(), 14));
        rule.push_str(&format!(" {:-<14}", ""));
    }

    let mut out = String::new();
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for r in records {
        let mut line = format!("{:<6} {:>16}", r.year, fmt_thousands(r.total_amount));
        for &c in categories {
            let cell = r.category_amount(c).map(fmt_thousands).unwrap_or_else(|| NO_DATA.to_string());
            line.push_str(&format!(" {cell:>14}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Category, mean spend, estimated days.
pub fn format_cycles_table(report: &CycleReport) -> String {
    if report.estimates.is_empty() {
        return format!("  {NO_DATA} (no category columns in source)\n");
    }

    let mut out = String::new();
    out.push_str(&format!("{} {} {:>6}\n", pad_right("품목군", 10), pad_left("평균 구매금액", 16), "days"));
    out.push_str(&format!("{:-<10} {:-<16} {:-<6}\n", "", "", ""));
    for estimate in report.estimates.values() {
        let days = if estimate.estimated_days == 0 {
            "0 (no activity)".to_string()
        } else {
            estimate.estimated_days.to_string()
        };
        out.push_str(&format!(
            "{} {:>16} {:>6}\n",
            pad_right(estimate.category.column_name(), 10),
            fmt_thousands(estimate.mean_amount),
            days,
        ));
    }
    if let Some(avg) = report.average_cycle_days {
        out.push_str(&format!("average: {avg:.1} days\n"));
    }
    out
}

/// `55000000` -> `55,000,000 원`.
pub fn fmt_won(v: f64) -> String {
    format!("{} 원", fmt_thousands(v))
}

/// Round to an integer and group thousands with commas.
pub fn fmt_thousands(v: f64) -> String {
    if !v.is_finite() {
        return NO_DATA.to_string();
    }
    let rounded = format!("{:.0}", v.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if v < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// `10.0` -> `+10.0%`.
pub fn fmt_delta_pct(pct: f64) -> String {
    format!("{pct:+.1}%")
}

pub fn fmt_year_list(years: &[i32]) -> String {
    if years.is_empty() {
        return "(none)".to_string();
    }
    years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(", ")
}

/// Terminal column width (Hangul occupies two cells).
fn display_width(s: &str) -> usize {
    Span::raw(s).width()
}

pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(s));
    format!("{s}{}", " ".repeat(pad))
}

pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(s));
    format!("{}{s}", " ".repeat(pad))
}
