//! Interactive spreadsheet picker.
//!
//! This is intentionally kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the picker provides the "run `procure` and choose a sheet" UX
//!
//! The picker searches for loadable sheets (`.xlsx`, `.xls`, `.ods`, `.csv`, ...)
//! under the current working directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::io::ingest::SourceKind;

/// Default directory recursion depth for finding sheets.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Prompt the user to select a sheet from the current directory tree.
///
/// Behavior:
/// - list discovered sheets
/// - accept either a number (from the list) or an explicit path
/// - `q` cancels
pub fn prompt_for_source_path() -> Result<PathBuf, AppError> {
    let files = discover_source_files();
    if files.is_empty() {
        return Err(AppError::new(
            2,
            "No spreadsheets found. Provide one with `procure -f <file.xlsx>` or create one with `procure sample`.",
        ));
    }

    println!("Found {} spreadsheet(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::new(
                2,
                "No input received. Provide a spreadsheet with `procure -f <file.xlsx>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_source_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_source_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate the provided path points to a loadable sheet.
pub fn validate_source_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::new(
            2,
            format!("Spreadsheet not found: {}", path.display()),
        ));
    }
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    if SourceKind::from_path(path).is_none() {
        return Err(AppError::new(
            2,
            format!(
                "Expected an .xlsx/.xls/.ods/.csv file (got: {}).",
                path.display()
            ),
        ));
    }

    Ok(path.to_path_buf())
}

/// Discover loadable sheets under the current directory (deterministic order).
pub fn discover_source_files() -> Vec<PathBuf> {
    find_source_files(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_source_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_source_files_inner(root, 0, max_depth, &mut out);
    out.sort_by(|a, b| pretty_path(a).cmp(&pretty_path(b)));
    out
}

fn find_source_files_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            find_source_files_inner(&path, depth + 1, max_depth, out);
            continue;
        }

        // Excel lock files (`~$name.xlsx`) are not workbooks.
        let is_lock_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("~$"));
        if file_type.is_file() && !is_lock_file && SourceKind::from_path(&path).is_some() {
            out.push(path);
        }
    }
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules" | "examples")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}
