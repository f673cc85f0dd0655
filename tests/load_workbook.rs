use std::collections::BTreeSet;

use procurement_dashboard::data::sample::{demo_records, random_records, write_sample};
use procurement_dashboard::domain::{Category, TableSchema};
use procurement_dashboard::io::{load_table, LoadError, TableCache};
use procurement_dashboard::metrics::{compute_dashboard, SpendHeuristic};

#[test]
fn xlsx_and_csv_load_to_the_same_records() {
    let dir = tempfile::tempdir().unwrap();
    let schema = TableSchema::default();
    let records = random_records(6, 11).unwrap();

    let xlsx = dir.path().join("procurement.xlsx");
    let csv = dir.path().join("procurement.csv");
    write_sample(&xlsx, &records, &schema).unwrap();
    write_sample(&csv, &records, &schema).unwrap();

    let from_xlsx = load_table(&xlsx, &schema).unwrap();
    let from_csv = load_table(&csv, &schema).unwrap();

    assert_eq!(from_xlsx.records, records);
    assert_eq!(from_csv.records, records);
    assert_eq!(from_xlsx.categories, Category::ALL.to_vec());
    assert!(from_xlsx.row_issues.is_empty());
}

#[test]
fn demo_workbook_reproduces_reference_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("procurement.xlsx");
    let schema = TableSchema::default();
    write_sample(&path, &demo_records(), &schema).unwrap();

    let table = load_table(&path, &schema).unwrap();
    assert_eq!(table.years(), vec![2020, 2021, 2022, 2023, 2024]);

    let selected: BTreeSet<i32> = [2020, 2021].into_iter().collect();
    let dashboard = compute_dashboard(&table.records, &table.categories, &selected, &SpendHeuristic::default());

    assert_eq!(dashboard.kpis.total_amount, 105_000_000.0);
    let latest = dashboard.kpis.latest.as_ref().unwrap();
    assert_eq!(latest.year, 2021);
    assert_eq!(latest.yoy_delta_pct, Some(10.0));
    assert_eq!(dashboard.kpis.average_amount, Some(52_500_000.0));

    let days: Vec<u32> = dashboard.cycles.estimates.values().map(|e| e.estimated_days).collect();
    assert_eq!(days, vec![30, 15, 59, 31, 58]);
    let avg = dashboard.kpis.average_cycle_days.unwrap();
    assert!((avg - 38.6).abs() < 1e-9);
}

#[test]
fn cache_serves_one_load_per_file_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("procurement.xlsx");
    let schema = TableSchema::default();
    write_sample(&path, &demo_records(), &schema).unwrap();

    let mut cache = TableCache::new(schema.clone());
    let a = cache.get(&path).unwrap();
    let b = cache.get(&path).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(cache.loads(), 1);

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(cache.get(&path), Err(LoadError::NotFound { .. })));
}
