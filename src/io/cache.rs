//! Memoized table loads keyed by source identity.
//!
//! A load is reused while the file's canonical path, byte length and
//! modification time are unchanged. The cache is an explicit object owned by
//! the caller (the TUI keeps one for its lifetime); there is no global state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::domain::TableSchema;
use crate::io::ingest::{load_table, LoadError, LoadedTable};

/// What makes two loads of a source interchangeable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceIdentity {
    pub fn of(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let open_err = |source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        };
        let canonical = path.canonicalize().map_err(open_err)?;
        let meta = std::fs::metadata(&canonical).map_err(open_err)?;
        Ok(Self {
            path: canonical,
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct CacheEntry {
    identity: SourceIdentity,
    table: Arc<LoadedTable>,
}

pub struct TableCache {
    schema: TableSchema,
    entries: HashMap<PathBuf, CacheEntry>,
    loads: usize,
}

impl TableCache {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            entries: HashMap::new(),
            loads: 0,
        }
    }

    /// Return the cached table for `path`, reloading if the source changed.
    ///
    /// A failed reload evicts the stale entry; no outdated table is served.
    pub fn get(&mut self, path: &Path) -> Result<Arc<LoadedTable>, LoadError> {
        let identity = match SourceIdentity::of(path) {
            Ok(identity) => identity,
            Err(err) => {
                self.evict(path);
                return Err(err);
            }
        };

        if let Some(entry) = self.entries.get(&identity.path) {
            if entry.identity == identity {
                debug!(source = %identity.path.display(), "table cache hit");
                return Ok(Arc::clone(&entry.table));
            }
        }

        debug!(source = %identity.path.display(), "table cache miss");
        let key = identity.path.clone();
        let loaded = match load_table(path, &self.schema) {
            Ok(table) => Arc::new(table),
            Err(err) => {
                self.entries.remove(&key);
                return Err(err);
            }
        };
        self.loads += 1;
        self.entries.insert(
            key,
            CacheEntry {
                identity,
                table: Arc::clone(&loaded),
            },
        );
        Ok(loaded)
    }

    /// Drop every cached table (forces the next `get` to reload).
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    /// Number of loads actually performed (cache misses).
    pub fn loads(&self) -> usize {
        self.loads
    }

    fn evict(&mut self, path: &Path) {
        self.entries.retain(|key, _| !key.ends_with(path));
    }
}
