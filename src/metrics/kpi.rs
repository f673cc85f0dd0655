//! KPI computations over the year-filtered record view.
//!
//! Everything here is a small, pure function over record slices so the text
//! report, the exports and the TUI all derive their numbers the same way.
//! "No data" is always `None`, never `0.0` or `NaN`.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Category, LatestYearMetric, PurchaseRecord, TidyRow};

/// Keep records whose year is selected, preserving source order.
pub fn filter_by_years(records: &[PurchaseRecord], selected: &BTreeSet<i32>) -> Vec<PurchaseRecord> {
    records
        .iter()
        .filter(|r| selected.contains(&r.year))
        .cloned()
        .collect()
}

/// Sum of yearly totals (`0.0` for an empty view).
pub fn total_amount(records: &[PurchaseRecord]) -> f64 {
    records.iter().map(|r| r.total_amount).sum()
}

/// Mean of yearly totals, `None` for an empty view.
pub fn average_amount(records: &[PurchaseRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    Some(total_amount(records) / records.len() as f64)
}

/// Latest selected year, its total, and the change vs. the prior year.
///
/// The prior year is looked up in `full` (not `filtered`), so deselecting
/// `year - 1` does not hide the comparison.
pub fn latest_year_metric(filtered: &[PurchaseRecord], full: &[PurchaseRecord]) -> Option<LatestYearMetric> {
    let latest = filtered.iter().max_by_key(|r| r.year)?;
    let prev_year = latest.year.checked_sub(1);
    let yoy_delta_pct = prev_year
        .and_then(|y| full.iter().find(|r| r.year == y))
        .and_then(|prev| yoy_delta_pct(latest.total_amount, prev.total_amount));

    Some(LatestYearMetric {
        year: latest.year,
        amount: latest.total_amount,
        yoy_delta_pct,
    })
}

/// `(current - prev) / prev * 100`, rounded to one decimal.
///
/// Returns `None` when `prev` is zero (or the result is not finite).
pub fn yoy_delta_pct(current: f64, prev: f64) -> Option<f64> {
    if prev == 0.0 {
        return None;
    }
    let pct = (current - prev) / prev * 100.0;
    pct.is_finite().then(|| round_to(pct, 1))
}

/// Melt records into `(year, category, amount)` rows.
///
/// Order: record order, then `categories` order. Categories a record does not
/// carry produce no row.
pub fn melt(records: &[PurchaseRecord], categories: &[Category]) -> Vec<TidyRow> {
    let mut out = Vec::with_capacity(records.len() * categories.len());
    for r in records {
        for &category in categories {
            if let Some(amount) = r.category_amount(category) {
                out.push(TidyRow {
                    year: r.year,
                    category,
                    amount,
                });
            }
        }
    }
    out
}

/// `(year, total)` pairs sorted by year, for the yearly trend chart.
pub fn year_totals(records: &[PurchaseRecord]) -> Vec<(i32, f64)> {
    let mut out: Vec<(i32, f64)> = records.iter().map(|r| (r.year, r.total_amount)).collect();
    out.sort_by_key(|(year, _)| *year);
    out
}

/// Per-category series keyed by category, each sorted by year.
pub fn category_series(rows: &[TidyRow]) -> BTreeMap<Category, Vec<(i32, f64)>> {
    let mut out: BTreeMap<Category, Vec<(i32, f64)>> = BTreeMap::new();
    for row in rows {
        out.entry(row.category).or_default().push((row.year, row.amount));
    }
    for series in out.values_mut() {
        series.sort_by_key(|(year, _)| *year);
    }
    out
}

/// Sorted, de-duplicated years present in `records`.
pub fn all_years(records: &[PurchaseRecord]) -> Vec<i32> {
    records
        .iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub(crate) fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(year: i32, total: f64) -> PurchaseRecord {
        PurchaseRecord::new(year, total)
    }

    fn years(list: &[i32]) -> BTreeSet<i32> {
        list.iter().copied().collect()
    }

    #[test]
    fn latest_year_with_yoy_from_full_set() {
        let full = vec![rec(2020, 50_000_000.0), rec(2021, 55_000_000.0)];
        let filtered = filter_by_years(&full, &years(&[2021]));

        let m = latest_year_metric(&filtered, &full).unwrap();
        assert_eq!(m.year, 2021);
        assert_eq!(m.amount, 55_000_000.0);
        assert_eq!(m.yoy_delta_pct, Some(10.0));
    }

    #[test]
    fn yoy_absent_without_prior_year_or_with_zero_prior() {
        let full = vec![rec(2019, 0.0), rec(2020, 50.0), rec(2022, 70.0)];

        let gap = latest_year_metric(&filter_by_years(&full, &years(&[2022])), &full).unwrap();
        assert_eq!(gap.yoy_delta_pct, None);

        let zero_prev = latest_year_metric(&filter_by_years(&full, &years(&[2020])), &full).unwrap();
        assert_eq!(zero_prev.yoy_delta_pct, None);
    }

    #[test]
    fn yoy_rounds_to_one_decimal() {
        // (58 - 60) / 60 * 100 = -3.333...
        assert_eq!(yoy_delta_pct(58.0, 60.0), Some(-3.3));
        assert_eq!(yoy_delta_pct(70.0, 58.0), Some(20.7));
    }

    #[test]
    fn empty_selection_is_no_data() {
        let full = vec![rec(2020, 50.0)];
        let filtered = filter_by_years(&full, &BTreeSet::new());
        assert!(filtered.is_empty());
        assert_eq!(total_amount(&filtered), 0.0);
        assert_eq!(average_amount(&filtered), None);
        assert_eq!(latest_year_metric(&filtered, &full), None);
    }

    #[test]
    fn latest_is_max_year_not_last_row() {
        let full = vec![rec(2023, 58.0), rec(2021, 55.0), rec(2022, 60.0)];
        let m = latest_year_metric(&full, &full).unwrap();
        assert_eq!(m.year, 2023);
        assert_eq!(m.yoy_delta_pct, Some(-3.3));
    }

    #[test]
    fn melt_skips_absent_categories() {
        let records = vec![
            rec(2020, 30.0)
                .with_category(Category::Etc, 10.0)
                .with_category(Category::Ch, 20.0),
            rec(2021, 11.0).with_category(Category::Etc, 11.0),
        ];
        let rows = melt(&records, &[Category::Etc, Category::Ch]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], TidyRow { year: 2021, category: Category::Etc, amount: 11.0 });

        let series = category_series(&rows);
        assert_eq!(series[&Category::Etc], vec![(2020, 10.0), (2021, 11.0)]);
        assert_eq!(series[&Category::Ch], vec![(2020, 20.0)]);
    }

    #[test]
    fn year_totals_sorted_by_year() {
        let records = vec![rec(2022, 3.0), rec(2020, 1.0)];
        assert_eq!(year_totals(&records), vec![(2020, 1.0), (2022, 3.0)]);
        assert_eq!(all_years(&records), vec![2020, 2022]);
    }

    fn arb_records() -> impl Strategy<Value = Vec<PurchaseRecord>> {
        prop::collection::btree_map(1990i32..2040, 0u32..1_000_000, 0..12).prop_map(|m| {
            m.into_iter()
                .map(|(year, total)| rec(year, total as f64))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn filter_is_an_order_preserving_subsequence(
            records in arb_records(),
            selected in prop::collection::btree_set(1990i32..2040, 0..8),
        ) {
            let filtered = filter_by_years(&records, &selected);

            let mut cursor = records.iter();
            for r in &filtered {
                prop_assert!(selected.contains(&r.year));
                prop_assert!(cursor.any(|x| x == r));
            }

            let present: BTreeSet<i32> = records.iter().map(|r| r.year).collect();
            let empty_expected = selected.is_disjoint(&present);
            prop_assert_eq!(filtered.is_empty(), empty_expected);
        }

        #[test]
        fn selecting_every_year_keeps_the_sum(records in arb_records()) {
            let every: BTreeSet<i32> = all_years(&records).into_iter().collect();
            prop_assert_eq!(total_amount(&filter_by_years(&records, &every)), total_amount(&records));
        }
    }
}
