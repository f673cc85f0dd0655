//! Command-line parsing for the procurement dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/metrics code.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "procure", version, about = "Procurement dashboard (구매현황 대시보드)")]
pub struct Cli {
    /// Enable debug logging on stderr for summary/export/sample (overridden by RUST_LOG).
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the sheet, print KPIs, tables and an ASCII chart.
    Summary(SummaryArgs),
    /// Write the filtered records, tidy rows and/or the dashboard JSON.
    Export(ExportArgs),
    /// Write a sample procurement workbook.
    Sample(SampleArgs),
    /// Launch the interactive dashboard.
    ///
    /// This uses the same load + metrics pipeline as `procure summary`, but renders
    /// results in a terminal UI using Ratatui.
    Tui(SourceArgs),
}

/// Where to read from and which years to include.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Spreadsheet to load (.xlsx/.xls/.ods/.csv). Defaults to $PROCURE_SOURCE, then ref/procurement.xlsx.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Years to include, e.g. `2021,2023-2024` (default: all years in the sheet).
    #[arg(short = 'y', long, value_name = "YEARS", value_parser = parse_year_list)]
    pub years: Option<YearList>,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 12)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Filtered records in wide form (one column per category).
    #[arg(long, value_name = "CSV")]
    pub records: Option<PathBuf>,

    /// Melted `year,category,amount` rows.
    #[arg(long, value_name = "CSV")]
    pub tidy: Option<PathBuf>,

    /// Full dashboard snapshot (KPIs, cycles, series).
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output path (.xlsx or .csv).
    #[arg(short = 'o', long, default_value = "ref/procurement.xlsx")]
    pub out: PathBuf,

    /// Generate a random walk over this many years instead of the fixed demo table.
    #[arg(long)]
    pub years: Option<usize>,

    /// Random seed for `--years`.
    #[arg(long, default_value_t = 42, requires = "years")]
    pub seed: u64,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// A parsed `-y` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearList(pub BTreeSet<i32>);

/// Largest span a single `a-b` range may cover.
const MAX_RANGE_SPAN: i64 = 1000;

/// Parse `2021,2023-2024` into a year set.
pub fn parse_year_list(raw: &str) -> Result<YearList, String> {
    let mut years = BTreeSet::new();

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        // Split on the dash after the first char so a leading minus stays a sign.
        let dash = part.char_indices().skip(1).find(|&(_, c)| c == '-').map(|(i, _)| i);
        match dash {
            Some(i) => {
                let start = parse_year(&part[..i])?;
                let end = parse_year(&part[i + 1..])?;
                if end < start {
                    return Err(format!("range '{part}' is reversed"));
                }
                if i64::from(end) - i64::from(start) > MAX_RANGE_SPAN {
                    return Err(format!("range '{part}' spans more than {MAX_RANGE_SPAN} years"));
                }
                years.extend(start..=end);
            }
            None => {
                years.insert(parse_year(part)?);
            }
        }
    }

    if years.is_empty() {
        return Err("expected at least one year".to_string());
    }
    Ok(YearList(years))
}

fn parse_year(s: &str) -> Result<i32, String> {
    s.trim()
        .parse::<i32>()
        .map_err(|_| format!("'{}' is not a year", s.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn years(v: &[i32]) -> YearList {
        YearList(v.iter().copied().collect())
    }

    #[test]
    fn year_lists_and_ranges() {
        assert_eq!(parse_year_list("2022").unwrap(), years(&[2022]));
        assert_eq!(parse_year_list("2021, 2023-2024").unwrap(), years(&[2021, 2023, 2024]));
        assert_eq!(parse_year_list("2024,2020-2021,2020").unwrap(), years(&[2020, 2021, 2024]));
    }

    #[test]
    fn bad_year_lists() {
        assert!(parse_year_list("").is_err());
        assert!(parse_year_list("twenty").is_err());
        assert!(parse_year_list("2024-2020").is_err());
        assert!(parse_year_list("1-5000").is_err());
        assert!(parse_year_list("-2147483648-2147483647").is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["procure", "summary", "-f", "a.csv", "-y", "2020-2021", "--no-plot"]).unwrap();
        match cli.command {
            Command::Summary(args) => {
                assert_eq!(args.source.file, Some(PathBuf::from("a.csv")));
                assert_eq!(args.source.years, Some(years(&[2020, 2021])));
                assert!(args.no_plot);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["procure", "-v", "sample", "--years", "6", "--seed", "9"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Sample(SampleArgs { years: Some(6), seed: 9, .. })));

        assert!(Cli::try_parse_from(["procure", "sample", "--seed", "9"]).is_err());
    }
}
