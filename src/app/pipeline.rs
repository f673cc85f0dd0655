//! Shared "dashboard pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! source resolution -> cached load -> year selection -> metrics
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::TableSchema;
use crate::error::AppError;
use crate::io::cache::TableCache;
use crate::io::ingest::LoadedTable;
use crate::metrics::{compute_dashboard, CycleModel, Dashboard, SpendHeuristic};

/// Source used when neither `-f` nor `PROCURE_SOURCE` is given.
pub const DEFAULT_SOURCE: &str = "ref/procurement.xlsx";

/// Environment variable (also read from `.env`) overriding [`DEFAULT_SOURCE`].
pub const SOURCE_ENV: &str = "PROCURE_SOURCE";

/// Where the input sheet should come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChoice {
    Path(PathBuf),
    /// Nothing configured and the default is missing: ask the user.
    Prompt,
}

/// Precedence: `-f` flag, then `PROCURE_SOURCE`, then the default path if it exists.
pub fn choose_source(flag: Option<&Path>, env_value: Option<String>, default_exists: bool) -> SourceChoice {
    if let Some(path) = flag {
        return SourceChoice::Path(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return SourceChoice::Path(PathBuf::from(value.trim()));
    }
    if default_exists {
        SourceChoice::Path(PathBuf::from(DEFAULT_SOURCE))
    } else {
        SourceChoice::Prompt
    }
}

/// Resolve the input path, loading `.env` and falling back to the picker.
pub fn resolve_source(flag: Option<&Path>) -> Result<PathBuf, AppError> {
    dotenvy::dotenv().ok();
    let env_value = std::env::var(SOURCE_ENV).ok();
    let choice = choose_source(flag, env_value, Path::new(DEFAULT_SOURCE).exists());
    debug!(?choice, "resolved source");

    match choice {
        SourceChoice::Path(path) => Ok(path),
        SourceChoice::Prompt => crate::cli::picker::prompt_for_source_path(),
    }
}

/// The effective year selection: the requested years, or every loaded year.
///
/// Requested years that are not in the table are kept (they simply match nothing).
pub fn effective_selection(table: &LoadedTable, requested: Option<&BTreeSet<i32>>) -> BTreeSet<i32> {
    match requested {
        Some(years) => {
            let known: BTreeSet<i32> = table.years().into_iter().collect();
            let unknown: Vec<i32> = years.difference(&known).copied().collect();
            if !unknown.is_empty() {
                warn!(?unknown, "requested years are not in the source");
            }
            years.clone()
        }
        None => table.years().into_iter().collect(),
    }
}

/// A loaded table plus the dashboard computed for one selection.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub table: Arc<LoadedTable>,
    pub dashboard: Dashboard,
}

/// Owns the table cache and the cycle model for one source.
///
/// The TUI keeps one of these for its lifetime; the CLI commands use it once.
pub struct Session {
    source: PathBuf,
    cache: TableCache,
    model: Box<dyn CycleModel>,
}

impl Session {
    pub fn new(source: PathBuf) -> Self {
        Self::with_model(source, Box::new(SpendHeuristic::default()))
    }

    pub fn with_model(source: PathBuf, model: Box<dyn CycleModel>) -> Self {
        Self {
            source,
            cache: TableCache::new(TableSchema::default()),
            model,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Load (or reuse) the table for this session's source.
    pub fn table(&mut self) -> Result<Arc<LoadedTable>, AppError> {
        Ok(self.cache.get(&self.source)?)
    }

    /// Drop the cached table so the next [`Session::table`] rereads the file.
    pub fn reload(&mut self) -> Result<Arc<LoadedTable>, AppError> {
        self.cache.invalidate();
        self.table()
    }

    pub fn dashboard(&self, table: &LoadedTable, selected: &BTreeSet<i32>) -> Dashboard {
        compute_dashboard(&table.records, &table.categories, selected, self.model.as_ref())
    }

    /// Load + compute in one step.
    pub fn run(&mut self, requested: Option<&BTreeSet<i32>>) -> Result<RunOutput, AppError> {
        let table = self.table()?;
        let selected = effective_selection(&table, requested);
        let dashboard = self.dashboard(&table, &selected);
        Ok(RunOutput { table, dashboard })
    }
}

/// Load and compute for the one-shot CLI commands, rejecting empty sources.
pub fn run_once(source: PathBuf, requested: Option<&BTreeSet<i32>>) -> Result<RunOutput, AppError> {
    let mut session = Session::new(source);
    let run = session.run(requested)?;
    if run.table.records.is_empty() {
        return Err(AppError::new(
            3,
            format!("No usable rows in {}.", run.table.source.display()),
        ));
    }
    Ok(run)
}
