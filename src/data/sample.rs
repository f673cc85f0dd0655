//! Sample procurement workbooks.
//!
//! Two flavours:
//! - the fixed 2020–2024 demo table (what a fresh checkout ships with)
//! - a seeded random walk for any number of years
//!
//! Both are written in the same layout the loader expects: two blank rows,
//! then the header row, then one row per year.

use std::fs::File;
use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use thiserror::Error;
use tracing::info;

use crate::domain::{Category, PurchaseRecord, TableSchema};

/// First year of generated random-walk data.
pub const SAMPLE_START_YEAR: i32 = 2015;

/// Category shares of the total, in `Category::ALL` order (sums to 1).
const BASE_SHARES: [f64; 5] = [0.2, 0.4, 0.1, 0.2, 0.1];

/// Amounts are rounded to this unit so the sheet looks hand-entered.
const AMOUNT_UNIT: f64 = 100_000.0;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("sample year count must be > 0")]
    NoYears,
    #[error("unsupported sample format for '{}' (expected .xlsx or .csv)", .path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("noise distribution error: {0}")]
    Distribution(#[from] rand_distr::NormalError),
    #[error("failed to write workbook '{}': {source}", .path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// The fixed demo dataset (categories sum to the total each year).
pub fn demo_records() -> Vec<PurchaseRecord> {
    const ROWS: [(i32, f64, [f64; 5]); 5] = [
        (2020, 50_000_000.0, [10_000_000.0, 20_000_000.0, 5_000_000.0, 10_000_000.0, 5_000_000.0]),
        (2021, 55_000_000.0, [11_000_000.0, 22_000_000.0, 5_500_000.0, 11_000_000.0, 5_500_000.0]),
        (2022, 60_000_000.0, [12_000_000.0, 24_000_000.0, 6_000_000.0, 12_000_000.0, 6_000_000.0]),
        (2023, 58_000_000.0, [11_500_000.0, 23_000_000.0, 6_500_000.0, 11_000_000.0, 6_000_000.0]),
        (2024, 70_000_000.0, [14_000_000.0, 28_000_000.0, 7_000_000.0, 13_000_000.0, 8_000_000.0]),
    ];

    ROWS.iter()
        .map(|(year, total, amounts)| {
            Category::ALL
                .iter()
                .zip(amounts)
                .fold(PurchaseRecord::new(*year, *total), |r, (&c, &v)| r.with_category(c, v))
        })
        .collect()
}

/// Seeded random walk: yearly growth ~ N(5%, 8%), shares jittered per year.
pub fn random_records(years: usize, seed: u64) -> Result<Vec<PurchaseRecord>, SampleError> {
    if years == 0 {
        return Err(SampleError::NoYears);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let growth = Normal::<f64>::new(0.05, 0.08)?;
    let jitter = Normal::<f64>::new(0.0, 0.15)?;

    let mut total = 50_000_000.0_f64;
    let mut out = Vec::with_capacity(years);
    for i in 0..years {
        if i > 0 {
            // Floor keeps a bad draw from wiping out the series.
            total *= (1.0 + growth.sample(&mut rng)).max(0.5);
        }

        let weights: Vec<f64> = BASE_SHARES
            .iter()
            .map(|s| s * (1.0 + jitter.sample(&mut rng)).max(0.1))
            .collect();
        let weight_sum: f64 = weights.iter().sum();

        let amounts: Vec<f64> = weights
            .iter()
            .map(|w| round_unit(total * w / weight_sum))
            .collect();
        let year_total: f64 = amounts.iter().sum();

        let record = Category::ALL
            .iter()
            .zip(&amounts)
            .fold(PurchaseRecord::new(SAMPLE_START_YEAR + i as i32, year_total), |r, (&c, &v)| {
                r.with_category(c, v)
            });
        out.push(record);
    }

    Ok(out)
}

/// Write `records` to `path`; the extension picks xlsx or csv.
pub fn write_sample(path: &Path, records: &[PurchaseRecord], schema: &TableSchema) -> Result<(), SampleError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("xlsx") => write_xlsx(path, records, schema),
        Some("csv") => write_csv(path, records, schema),
        _ => Err(SampleError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }?;

    info!(path = %path.display(), rows = records.len(), "wrote sample workbook");
    Ok(())
}

fn header(schema: &TableSchema) -> Vec<String> {
    let mut cols = vec![schema.year_column.clone(), schema.total_column.clone()];
    cols.extend(schema.categories.iter().map(|c| c.column_name().to_string()));
    cols
}

fn write_xlsx(path: &Path, records: &[PurchaseRecord], schema: &TableSchema) -> Result<(), SampleError> {
    let xlsx_err = |source| SampleError::Xlsx {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();

    let header_row = schema.header_row as u32;
    for (col, name) in header(schema).iter().enumerate() {
        sheet.write_string(header_row, col as u16, name).map_err(xlsx_err)?;
    }

    for (i, r) in records.iter().enumerate() {
        let row = header_row + 1 + i as u32;
        sheet.write_number(row, 0, r.year as f64).map_err(xlsx_err)?;
        sheet.write_number(row, 1, r.total_amount).map_err(xlsx_err)?;
        for (j, &c) in schema.categories.iter().enumerate() {
            if let Some(v) = r.category_amount(c) {
                sheet.write_number(row, 2 + j as u16, v).map_err(xlsx_err)?;
            }
        }
    }

    workbook.save(path).map_err(xlsx_err)
}

fn write_csv(path: &Path, records: &[PurchaseRecord], schema: &TableSchema) -> Result<(), SampleError> {
    let csv_err = |source| SampleError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(|source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);

    let cols = header(schema);
    let blank = vec![String::new(); cols.len()];
    for _ in 0..schema.header_row {
        writer.write_record(&blank).map_err(csv_err)?;
    }
    writer.write_record(&cols).map_err(csv_err)?;

    for r in records {
        let mut row = vec![r.year.to_string(), format!("{:.0}", r.total_amount)];
        row.extend(
            schema
                .categories
                .iter()
                .map(|&c| r.category_amount(c).map(|v| format!("{v:.0}")).unwrap_or_default()),
        );
        writer.write_record(&row).map_err(csv_err)?;
    }

    writer
        .flush()
        .map_err(|source| SampleError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn round_unit(v: f64) -> f64 {
    (v / AMOUNT_UNIT).round() * AMOUNT_UNIT
}
