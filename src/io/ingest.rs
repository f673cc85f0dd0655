//! Spreadsheet ingest and normalization.
//!
//! This module is responsible for turning the procurement sheet into a clean,
//! ordered set of `PurchaseRecord`s that the metrics engine can trust.
//!
//! Design goals:
//! - **Fixed schema**: only the year, total and known category columns are read
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **All-or-nothing loads**: structural problems fail the whole load
//! - **Separation of concerns**: no metric logic here
//!
//! Both workbooks (via calamine) and CSV files are normalized into the same
//! absolute-position cell grid before interpretation, so the header offset means
//! the same thing for every source type.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Category, PurchaseRecord, TableSchema};

/// Why a source could not be turned into a record set.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to open '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "unsupported source '{}' (expected .xlsx, .xlsm, .xls, .ods or .csv)",
        .path.display()
    )]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to read workbook '{}': {source}", .path.display())]
    Workbook {
        path: PathBuf,
        source: calamine::Error,
    },

    #[error("workbook '{}' contains no sheets", .path.display())]
    NoSheets { path: PathBuf },

    #[error("failed to parse CSV '{}': {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("header row {} not found (source has {rows} row(s))", .header_row + 1)]
    MissingHeaderRow { header_row: usize, rows: usize },

    #[error("missing required column `{column}` in the header row")]
    MissingColumn { column: String },

    #[error("row {row}: year value '{value}' is not an integer")]
    InvalidYear { row: usize, value: String },

    #[error("row {row}: duplicate year {year} (already defined on row {first_row})")]
    DuplicateYear {
        row: usize,
        year: i32,
        first_row: usize,
    },
}

/// A single spreadsheet cell, reduced to what ingest cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    fn from_text(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// A row-level problem that caused a row (or one of its cells) to be skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    /// 1-based physical row number in the source.
    pub row: usize,
    pub year: Option<i32>,
    pub message: String,
}

/// Ingest output: normalized records + what was skipped along the way.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub source: PathBuf,
    /// Records in source row order.
    pub records: Vec<PurchaseRecord>,
    /// Known categories whose column exists in the source (schema order).
    pub categories: Vec<Category>,
    pub row_issues: Vec<RowIssue>,
    /// Non-blank data rows below the header.
    pub rows_read: usize,
    /// Rows dropped because the year cell was blank.
    pub rows_without_year: usize,
}

impl LoadedTable {
    pub fn years(&self) -> Vec<i32> {
        crate::metrics::all_years(&self.records)
    }
}

/// Load the procurement sheet at `path` using `schema`.
pub fn load_table(path: &Path, schema: &TableSchema) -> Result<LoadedTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let grid = match SourceKind::from_path(path) {
        Some(SourceKind::Workbook) => read_workbook_grid(path)?,
        Some(SourceKind::Csv) => read_csv_grid(path)?,
        None => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    let parsed = parse_grid(&grid, schema)?;
    info!(
        source = %path.display(),
        records = parsed.records.len(),
        rows_read = parsed.rows_read,
        skipped = parsed.row_issues.len(),
        "loaded procurement table"
    );
    for issue in &parsed.row_issues {
        warn!(row = issue.row, year = ?issue.year, "{}", issue.message);
    }

    Ok(LoadedTable {
        source: path.to_path_buf(),
        records: parsed.records,
        categories: parsed.categories,
        row_issues: parsed.row_issues,
        rows_read: parsed.rows_read,
        rows_without_year: parsed.rows_without_year,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Workbook,
    Csv,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<SourceKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceKind::Workbook),
            "csv" => Some(SourceKind::Csv),
            _ => None,
        }
    }
}

fn read_workbook_grid(path: &Path) -> Result<Vec<Vec<Cell>>, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| LoadError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::NoSheets {
            path: path.to_path_buf(),
        })?
        .map_err(|source| LoadError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(range_to_grid(&range))
}

/// Convert a calamine range into an absolute-position grid.
///
/// calamine trims leading empty rows/columns from the used range, so we pad them
/// back in; otherwise the fixed header offset would point at the wrong row.
fn range_to_grid(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((row0, col0)) = range.start() else {
        return Vec::new();
    };

    let mut grid = vec![Vec::new(); row0 as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col0 as usize];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }
    grid
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::from_text(s),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}

fn read_csv_grid(path: &Path) -> Result<Vec<Vec<Cell>>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut grid: Vec<Vec<Cell>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        // The csv reader skips fully empty lines; use the physical line number so
        // the header offset still lines up with the file as a human sees it.
        let row = record
            .position()
            .map(|p| (p.line() as usize).saturating_sub(1))
            .unwrap_or(grid.len());
        while grid.len() < row {
            grid.push(Vec::new());
        }
        grid.push(record.iter().map(Cell::from_text).collect());
    }

    Ok(grid)
}

/// Output of interpreting a cell grid against the schema.
#[derive(Debug, Clone)]
pub struct ParsedRows {
    pub records: Vec<PurchaseRecord>,
    pub categories: Vec<Category>,
    pub row_issues: Vec<RowIssue>,
    pub rows_read: usize,
    pub rows_without_year: usize,
}

/// Interpret an absolute-position cell grid using `schema`.
pub fn parse_grid(grid: &[Vec<Cell>], schema: &TableSchema) -> Result<ParsedRows, LoadError> {
    let header = grid
        .get(schema.header_row)
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .ok_or(LoadError::MissingHeaderRow {
            header_row: schema.header_row,
            rows: grid.len(),
        })?;

    let header_map = build_header_map(header);
    let year_col = required_column(&header_map, &schema.year_column)?;
    let total_col = required_column(&header_map, &schema.total_column)?;

    let category_cols: Vec<(Category, usize)> = schema
        .categories
        .iter()
        .filter_map(|&cat| header_map.get(cat.column_name()).map(|&idx| (cat, idx)))
        .collect();
    for &cat in &schema.categories {
        if !category_cols.iter().any(|(c, _)| *c == cat) {
            debug!(category = %cat, "category column not present in source");
        }
    }

    let mut records = Vec::new();
    let mut row_issues = Vec::new();
    let mut first_row_by_year: HashMap<i32, usize> = HashMap::new();
    let mut rows_read = 0usize;
    let mut rows_without_year = 0usize;

    for (idx, row) in grid.iter().enumerate().skip(schema.header_row + 1) {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        rows_read += 1;
        let line = idx + 1;

        let year_cell = cell_at(row, year_col);
        if year_cell.is_empty() {
            rows_without_year += 1;
            debug!(row = line, "dropping row without a year");
            continue;
        }
        let year = coerce_year(year_cell).ok_or_else(|| LoadError::InvalidYear {
            row: line,
            value: year_cell.display(),
        })?;

        if let Some(&first_row) = first_row_by_year.get(&year) {
            return Err(LoadError::DuplicateYear {
                row: line,
                year,
                first_row,
            });
        }
        first_row_by_year.insert(year, line);

        let total_amount = match parse_amount(cell_at(row, total_col)) {
            Ok(Some(v)) => v,
            Ok(None) => {
                row_issues.push(RowIssue {
                    row: line,
                    year: Some(year),
                    message: format!("Missing `{}` value; row skipped.", schema.total_column),
                });
                continue;
            }
            Err(e) => {
                row_issues.push(RowIssue {
                    row: line,
                    year: Some(year),
                    message: format!("Invalid `{}`: {e}; row skipped.", schema.total_column),
                });
                continue;
            }
        };

        let mut record = PurchaseRecord::new(year, total_amount);
        for &(cat, col) in &category_cols {
            match parse_amount(cell_at(row, col)) {
                Ok(Some(v)) => {
                    record.category_amounts.insert(cat, v);
                }
                Ok(None) => {}
                Err(e) => row_issues.push(RowIssue {
                    row: line,
                    year: Some(year),
                    message: format!("Invalid `{cat}`: {e}; value ignored."),
                }),
            }
        }
        records.push(record);
    }

    Ok(ParsedRows {
        records,
        categories: category_cols.iter().map(|(c, _)| *c).collect(),
        row_issues,
        rows_read,
        rows_without_year,
    })
}

fn build_header_map(header: &[Cell]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, cell) in header.iter().enumerate() {
        let Cell::Text(name) = cell else { continue };
        // First occurrence wins, like a column lookup by name would.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    name.trim_start_matches('\u{feff}').trim().to_string()
}

fn required_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, LoadError> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| LoadError::MissingColumn {
            column: name.to_string(),
        })
}

fn cell_at(row: &[Cell], idx: usize) -> &Cell {
    const EMPTY: &Cell = &Cell::Empty;
    row.get(idx).unwrap_or(EMPTY)
}

/// Integer-cast semantics: numeric cells truncate, text must be integral.
fn coerce_year(cell: &Cell) -> Option<i32> {
    let value = match cell {
        Cell::Empty => return None,
        Cell::Number(n) => *n,
        Cell::Text(s) => {
            if let Ok(y) = s.parse::<i32>() {
                return Some(y);
            }
            let v = s.parse::<f64>().ok()?;
            if v.fract() != 0.0 {
                return None;
            }
            v
        }
    };
    if !value.is_finite() || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i32)
}

/// Parse a non-negative amount. `Ok(None)` means the cell was blank.
fn parse_amount(cell: &Cell) -> Result<Option<f64>, String> {
    let value = match cell {
        Cell::Empty => return Ok(None),
        Cell::Number(n) => *n,
        Cell::Text(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            cleaned
                .parse::<f64>()
                .map_err(|_| format!("'{s}' is not a number"))?
        }
    };
    if !value.is_finite() {
        return Err("non-finite value".to_string());
    }
    if value < 0.0 {
        return Err(format!("negative amount {value}"));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn header(names: &[&str]) -> Vec<Cell> {
        names.iter().map(|n| text(n)).collect()
    }

    fn grid_with(rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
        let mut grid = vec![Vec::new(), vec![Cell::Empty, Cell::Empty]];
        grid.extend(rows);
        grid
    }

    #[test]
    fn keeps_known_columns_and_source_order() {
        let grid = grid_with(vec![
            header(&["연", "전체 구매금액", "ETC", "비고", "CH"]),
            vec![num(2022.0), num(60.0), num(12.0), text("memo"), num(24.0)],
            vec![num(2020.0), num(50.0), num(10.0), Cell::Empty, num(20.0)],
        ]);

        let parsed = parse_grid(&grid, &TableSchema::default()).unwrap();
        assert_eq!(parsed.categories, vec![Category::Etc, Category::Ch]);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].year, 2022);
        assert_eq!(parsed.records[1].year, 2020);
        assert_eq!(parsed.records[0].category_amount(Category::Ch), Some(24.0));
        assert_eq!(parsed.records[0].category_amount(Category::Global), None);
        assert!(parsed.row_issues.is_empty());
    }

    #[test]
    fn drops_exactly_the_rows_without_year() {
        let grid = grid_with(vec![
            header(&["연", "전체 구매금액"]),
            vec![num(2020.0), num(50.0)],
            vec![Cell::Empty, num(99.0)],
            vec![num(2021.0), num(55.0)],
        ]);

        let parsed = parse_grid(&grid, &TableSchema::default()).unwrap();
        let years: Vec<i32> = parsed.records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2020, 2021]);
        assert_eq!(parsed.rows_without_year, 1);
        assert_eq!(parsed.rows_read, 3);
    }

    #[test]
    fn blank_category_cell_is_absent_not_zero() {
        let grid = grid_with(vec![
            header(&["연", "전체 구매금액", "기타"]),
            vec![num(2020.0), num(50.0), Cell::Empty],
        ]);
        let parsed = parse_grid(&grid, &TableSchema::default()).unwrap();
        assert!(parsed.records[0].category_amounts.is_empty());
    }

    #[test]
    fn year_coercion_follows_integer_cast() {
        assert_eq!(coerce_year(&num(2021.0)), Some(2021));
        assert_eq!(coerce_year(&num(2021.7)), Some(2021));
        assert_eq!(coerce_year(&text("2023")), Some(2023));
        assert_eq!(coerce_year(&text("2023.0")), Some(2023));
        assert_eq!(coerce_year(&text("2023.5")), None);
        assert_eq!(coerce_year(&text("FY23")), None);
    }

    #[test]
    fn unparseable_year_fails_the_load() {
        let grid = grid_with(vec![
            header(&["연", "전체 구매금액"]),
            vec![text("합계"), num(50.0)],
        ]);
        let err = parse_grid(&grid, &TableSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidYear { row: 4, .. }));
    }

    #[test]
    fn duplicate_year_fails_the_load() {
        let grid = grid_with(vec![
            header(&["연", "전체 구매금액"]),
            vec![num(2020.0), num(50.0)],
            vec![num(2020.0), num(51.0)],
        ]);
        let err = parse_grid(&grid, &TableSchema::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DuplicateYear { year: 2020, row: 5, first_row: 4 }
        ));
    }

    #[test]
    fn duplicate_year_with_blank_total_still_fails() {
        let grid = grid_with(vec![
            header(&["연", "전체 구매금액"]),
            vec![num(2020.0), num(50.0)],
            vec![num(2020.0), Cell::Empty],
            vec![num(2020.0), text("n/a")],
        ]);
        let err = parse_grid(&grid, &TableSchema::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DuplicateYear { year: 2020, row: 5, first_row: 4 }
        ));
    }

    #[test]
    fn bad_totals_are_reported_and_skipped() {
        let grid = grid_with(vec![
            header(&["연", "전체 구매금액", "ETC"]),
            vec![num(2020.0), Cell::Empty, num(1.0)],
            vec![num(2021.0), num(-5.0), num(1.0)],
            vec![num(2022.0), text("1,200,000"), text("n/a")],
        ]);
        let parsed = parse_grid(&grid, &TableSchema::default()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].total_amount, 1_200_000.0);
        assert!(parsed.records[0].category_amounts.is_empty());
        assert_eq!(parsed.row_issues.len(), 3);
        assert_eq!(parsed.row_issues[0].year, Some(2020));
    }

    #[test]
    fn missing_header_row_or_required_column() {
        let short = vec![Vec::new(), vec![text("x")]];
        assert!(matches!(
            parse_grid(&short, &TableSchema::default()),
            Err(LoadError::MissingHeaderRow { .. })
        ));

        let no_total = grid_with(vec![header(&["연", "ETC"])]);
        match parse_grid(&no_total, &TableSchema::default()) {
            Err(LoadError::MissingColumn { column }) => assert_eq!(column, "전체 구매금액"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_table(Path::new("does/not/exist.xlsx"), &TableSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "hello").unwrap();
        let err = load_table(file.path(), &TableSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn csv_with_blank_leading_lines() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        // One truly empty line and one line of empty fields before the header.
        write!(
            file,
            "\n,,,\n\u{feff}연,전체 구매금액,ETC,CH\n2020,50000000,10000000,20000000\n,1,2,3\n2021,55000000,11000000,\n"
        )
        .unwrap();

        let table = load_table(file.path(), &TableSchema::default()).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.rows_without_year, 1);
        assert_eq!(table.records[1].total_amount, 55_000_000.0);
        assert_eq!(table.records[1].category_amount(Category::Ch), None);
        assert_eq!(table.categories, vec![Category::Etc, Category::Ch]);
    }
}
