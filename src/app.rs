//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves the source sheet
//! - runs the load + metrics pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing::info;

use crate::cli::{Command, ExportArgs, SampleArgs, SourceArgs, SummaryArgs};
use crate::domain::TableSchema;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `procure` binary.
pub fn run() -> Result<(), AppError> {
    // We want `procure` and `procure -f data.xlsx` to behave like `procure tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let interactive = matches!(cli.command, Command::Tui(_));
    crate::logging::init_logging(crate::logging::default_level(interactive, cli.verbose));

    match cli.command {
        Command::Summary(args) => handle_summary(args),
        Command::Export(args) => handle_export(args),
        Command::Sample(args) => handle_sample(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let run = run_for(&args.source)?;

    println!("{}", crate::report::format_summary(&run.table, &run.dashboard));

    if !args.no_plot {
        println!(
            "{}",
            crate::plot::render_year_bars(&run.dashboard.year_totals, args.width, args.height)
        );
        println!("{}", crate::plot::render_cycle_bars(&run.dashboard.cycles, args.width / 2));
    }

    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    if args.records.is_none() && args.tidy.is_none() && args.json.is_none() {
        return Err(AppError::new(
            2,
            "Nothing to export. Pass at least one of --records, --tidy or --json.",
        ));
    }

    let run = run_for(&args.source)?;
    let dashboard = &run.dashboard;

    if let Some(path) = &args.records {
        crate::io::export::write_records_csv(path, &dashboard.filtered, &run.table.categories)?;
        println!("Wrote {} record(s) to {}", dashboard.filtered.len(), path.display());
    }
    if let Some(path) = &args.tidy {
        crate::io::export::write_tidy_csv(path, &dashboard.tidy)?;
        println!("Wrote {} tidy row(s) to {}", dashboard.tidy.len(), path.display());
    }
    if let Some(path) = &args.json {
        crate::io::export::write_dashboard_json(path, &run.table.source, dashboard)?;
        println!("Wrote dashboard to {}", path.display());
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    use crate::data::sample;

    if args.out.exists() && !args.force {
        return Err(AppError::new(
            2,
            format!("{} already exists (use --force to overwrite).", args.out.display()),
        ));
    }
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create {}: {e}", parent.display())))?;
    }

    let records = match args.years {
        Some(years) => sample::random_records(years, args.seed),
        None => Ok(sample::demo_records()),
    }
    .map_err(|e| AppError::new(2, format!("Failed to generate sample: {e}")))?;

    sample::write_sample(&args.out, &records, &TableSchema::default())
        .map_err(|e| AppError::new(2, format!("Failed to write sample: {e}")))?;

    info!(years = records.len(), "sample generated");
    println!("Wrote {} year(s) of sample data to {}", records.len(), args.out.display());
    Ok(())
}

fn handle_tui(args: SourceArgs) -> Result<(), AppError> {
    let source = pipeline::resolve_source(args.file.as_deref())?;
    crate::tui::run(source, args.years.map(|y| y.0))
}

fn run_for(args: &SourceArgs) -> Result<pipeline::RunOutput, AppError> {
    let source = pipeline::resolve_source(args.file.as_deref())?;
    pipeline::run_once(source, args.years.as_ref().map(|y| &y.0))
}

/// Rewrite argv so `procure` defaults to `procure tui`.
///
/// Rules:
/// - `procure`                      -> `procure tui`
/// - `procure -f x.xlsx ...`        -> `procure tui -f x.xlsx ...`
/// - `procure --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "summary" | "export" | "sample" | "tui");
    if is_subcommand {
        return argv;
    }

    // A leading global flag may precede the subcommand (`procure -v summary`).
    if matches!(arg1.as_str(), "-v" | "--verbose") {
        let mut rest = vec![argv[0].clone()];
        rest.extend(argv.into_iter().skip(2));
        let mut out = rewrite_args(rest);
        out.insert(1, arg1);
        return out;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_the_dashboard() {
        assert_eq!(rewrite_args(argv(&["procure"])), argv(&["procure", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["procure", "-f", "a.xlsx"])),
            argv(&["procure", "tui", "-f", "a.xlsx"])
        );
    }

    #[test]
    fn explicit_subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(argv(&["procure", "summary"])), argv(&["procure", "summary"]));
        assert_eq!(rewrite_args(argv(&["procure", "--help"])), argv(&["procure", "--help"]));
    }

    #[test]
    fn verbose_flag_keeps_its_place() {
        assert_eq!(rewrite_args(argv(&["procure", "-v"])), argv(&["procure", "-v", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["procure", "-v", "summary"])),
            argv(&["procure", "-v", "summary"])
        );
        assert_eq!(
            rewrite_args(argv(&["procure", "--verbose", "-f", "a.csv"])),
            argv(&["procure", "--verbose", "tui", "-f", "a.csv"])
        );
    }
}
