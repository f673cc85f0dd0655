//! Export dashboard results to CSV/JSON.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts:
//! - `records` CSV: the filtered rows in wide form (one column per category)
//! - `tidy` CSV: the melted `(year, category, amount)` rows
//! - JSON: the whole dashboard plus run metadata

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::domain::{Category, PurchaseRecord, TidyRow};
use crate::error::AppError;
use crate::metrics::Dashboard;

/// Write filtered records in wide form.
///
/// Absent category values are written as empty cells, not zeros.
pub fn write_records_csv(path: &Path, records: &[PurchaseRecord], categories: &[Category]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec!["year".to_string(), "total_amount".to_string()];
    header.extend(categories.iter().map(|c| c.column_name().to_string()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in records {
        let mut row = vec![r.year.to_string(), fmt_amount(r.total_amount)];
        row.extend(
            categories
                .iter()
                .map(|&c| r.category_amount(c).map(fmt_amount).unwrap_or_default()),
        );
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Write melted rows (`year,category,amount`).
pub fn write_tidy_csv(path: &Path, rows: &[TidyRow]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create tidy CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write tidy CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush tidy CSV: {e}")))
}

#[derive(Debug, Serialize)]
struct DashboardFile<'a> {
    tool: &'static str,
    generated_at: DateTime<Local>,
    source: String,
    #[serde(flatten)]
    dashboard: &'a Dashboard,
}

/// Write the full dashboard snapshot as pretty JSON.
pub fn write_dashboard_json(path: &Path, source: &Path, dashboard: &Dashboard) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dashboard JSON '{}': {e}", path.display())))?;

    let doc = DashboardFile {
        tool: "procure",
        generated_at: Local::now(),
        source: source.display().to_string(),
        dashboard,
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::new(2, format!("Failed to write dashboard JSON: {e}")))
}

fn fmt_amount(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::metrics::{compute_dashboard, SpendHeuristic};

    fn records() -> Vec<PurchaseRecord> {
        vec![
            PurchaseRecord::new(2020, 50_000_000.0).with_category(Category::Etc, 10_000_000.0),
            PurchaseRecord::new(2021, 55_000_000.5)
                .with_category(Category::Etc, 11_000_000.0)
                .with_category(Category::Ch, 22_000_000.0),
        ]
    }

    #[test]
    fn records_csv_leaves_absent_categories_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        write_records_csv(&path, &records(), &[Category::Etc, Category::Ch]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "year,total_amount,ETC,CH");
        assert_eq!(lines[1], "2020,50000000,10000000,");
        assert_eq!(lines[2], "2021,55000000.5,11000000,22000000");
    }

    #[test]
    fn tidy_csv_has_header_and_one_row_per_observation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidy.csv");
        let rows = crate::metrics::melt(&records(), &Category::ALL);
        write_tidy_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "year,category,amount");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "2021,CH,22000000.0");
    }

    #[test]
    fn dashboard_json_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        let selected: BTreeSet<i32> = [2021].into_iter().collect();
        let dashboard = compute_dashboard(&records(), &Category::ALL, &selected, &SpendHeuristic::default());
        write_dashboard_json(&path, Path::new("ref/procurement.xlsx"), &dashboard).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "procure");
        assert_eq!(value["kpis"]["latest"]["year"], 2021);
        assert_eq!(value["kpis"]["latest"]["yoy_delta_pct"], 10.0);
        assert!(value["cycles"]["estimates"]["ETC"]["estimated_days"].is_number());
    }
}
