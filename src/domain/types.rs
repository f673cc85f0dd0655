//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the metrics engine
//! - exported to JSON/CSV
//! - rendered by the text report and the TUI

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A purchase category tracked by the procurement sheet.
///
/// Declaration order is the schema order; it drives table/chart ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ETC")]
    Etc,
    #[serde(rename = "CH")]
    Ch,
    /// Health functional foods (`건기식`).
    #[serde(rename = "건기식")]
    HealthFood,
    /// Global/export business (`글로벌`).
    #[serde(rename = "글로벌")]
    Global,
    /// Everything else (`기타`).
    #[serde(rename = "기타")]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Etc,
        Category::Ch,
        Category::HealthFood,
        Category::Global,
        Category::Other,
    ];

    /// Spreadsheet header for this category (also used as the display label).
    pub fn column_name(self) -> &'static str {
        match self {
            Category::Etc => "ETC",
            Category::Ch => "CH",
            Category::HealthFood => "건기식",
            Category::Global => "글로벌",
            Category::Other => "기타",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Column names and header position of the procurement sheet.
///
/// These are configuration constants, not discovered from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Zero-based row index of the header row (the sheet has two leading blank rows).
    pub header_row: usize,
    pub year_column: String,
    pub total_column: String,
    pub categories: Vec<Category>,
}

pub const DEFAULT_HEADER_ROW: usize = 2;
pub const YEAR_COLUMN: &str = "연";
pub const TOTAL_COLUMN: &str = "전체 구매금액";

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            year_column: YEAR_COLUMN.to_string(),
            total_column: TOTAL_COLUMN.to_string(),
            categories: Category::ALL.to_vec(),
        }
    }
}

/// One normalized row of the procurement sheet (one per year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub year: i32,
    pub total_amount: f64,
    /// Only categories that had a value in the source are present.
    pub category_amounts: BTreeMap<Category, f64>,
}

impl PurchaseRecord {
    pub fn new(year: i32, total_amount: f64) -> Self {
        Self {
            year,
            total_amount,
            category_amounts: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, category: Category, amount: f64) -> Self {
        self.category_amounts.insert(category, amount);
        self
    }

    pub fn category_amount(&self, category: Category) -> Option<f64> {
        self.category_amounts.get(&category).copied()
    }
}

/// Estimated restocking cycle for a single category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleEstimate {
    pub category: Category,
    /// Mean category spend over the full history (input to the heuristic).
    pub mean_amount: f64,
    /// Days between replenishments; `0` marks a category with no spend.
    pub estimated_days: u32,
}

/// A melted `(year, category, amount)` observation for multi-series charts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TidyRow {
    pub year: i32,
    pub category: Category,
    pub amount: f64,
}

/// Headline figure for the most recent selected year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatestYearMetric {
    pub year: i32,
    pub amount: f64,
    /// Percent change vs. `year - 1`, one decimal; absent when there is no
    /// prior-year record or its total is zero.
    pub yoy_delta_pct: Option<f64>,
}

/// The four KPI cards of the dashboard. `None` means "no data".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_amount: f64,
    pub latest: Option<LatestYearMetric>,
    pub average_amount: Option<f64>,
    pub average_cycle_days: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_order_like_the_sheet() {
        let mut shuffled = vec![Category::Other, Category::Etc, Category::Global];
        shuffled.sort();
        assert_eq!(shuffled, vec![Category::Etc, Category::Global, Category::Other]);
    }

    #[test]
    fn category_serializes_as_header_name() {
        let json = serde_json::to_string(&Category::Global).unwrap();
        assert_eq!(json, "\"글로벌\"");
    }
}
