//! Metrics engine: KPIs over the selected years, cycle estimates over the
//! full history.
//!
//! Note the asymmetry: KPIs see only the filtered view, while cycle estimates
//! always use every loaded record. Changing the year selection therefore never
//! changes the cycle figures.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::domain::{Category, KpiSummary, PurchaseRecord, TidyRow};

pub mod cycle;
pub mod kpi;

pub use cycle::*;
pub use kpi::*;

/// Everything a front-end needs to render one year selection.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub selected_years: Vec<i32>,
    pub filtered: Vec<PurchaseRecord>,
    pub kpis: KpiSummary,
    pub cycles: CycleReport,
    pub tidy: Vec<TidyRow>,
    pub year_totals: Vec<(i32, f64)>,
}

/// Recompute the dashboard for `selected` years.
pub fn compute_dashboard(
    records: &[PurchaseRecord],
    categories: &[Category],
    selected: &BTreeSet<i32>,
    model: &dyn CycleModel,
) -> Dashboard {
    let filtered = filter_by_years(records, selected);
    let cycles = model.estimate(records, categories);

    let kpis = KpiSummary {
        total_amount: total_amount(&filtered),
        latest: latest_year_metric(&filtered, records),
        average_amount: average_amount(&filtered),
        average_cycle_days: cycles.average_cycle_days,
    };
    debug!(
        selected = selected.len(),
        matched = filtered.len(),
        model = model.name(),
        "computed dashboard"
    );

    Dashboard {
        selected_years: selected.iter().copied().collect(),
        tidy: melt(&filtered, categories),
        year_totals: year_totals(&filtered),
        filtered,
        kpis,
        cycles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_records() -> Vec<PurchaseRecord> {
        vec![
            PurchaseRecord::new(2020, 50.0).with_category(Category::Etc, 10.0),
            PurchaseRecord::new(2021, 55.0).with_category(Category::Etc, 30.0),
        ]
    }

    #[test]
    fn cycles_ignore_the_year_filter() {
        let records = demo_records();
        let model = SpendHeuristic::default();
        let only_2020: BTreeSet<i32> = [2020].into_iter().collect();
        let all: BTreeSet<i32> = [2020, 2021].into_iter().collect();

        let a = compute_dashboard(&records, &[Category::Etc], &only_2020, &model);
        let b = compute_dashboard(&records, &[Category::Etc], &all, &model);
        assert_eq!(a.cycles, b.cycles);
        assert_eq!(a.cycles.get(Category::Etc).unwrap().mean_amount, 20.0);
        assert_eq!(a.kpis.total_amount, 50.0);
        assert_eq!(b.kpis.total_amount, 105.0);
    }

    #[test]
    fn empty_selection_renders_as_no_data() {
        let records = demo_records();
        let d = compute_dashboard(&records, &[Category::Etc], &BTreeSet::new(), &SpendHeuristic::default());
        assert!(d.filtered.is_empty());
        assert!(d.tidy.is_empty());
        assert_eq!(d.kpis.latest, None);
        assert_eq!(d.kpis.average_amount, None);
        assert!(d.kpis.average_cycle_days.is_some());
    }
}
