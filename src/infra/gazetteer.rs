//! Suburb reference set (gazetteer)
//!
//! Loaded once from a semicolon-delimited file and then only read. Names are
//! stored trimmed and upper-cased, in first-seen file order; the fuzzy matcher
//! relies on that order for tie-breaking.
//!
//! The only mutation path is `reload()`, used as a recovery action when the
//! set turns out to be empty.

use crate::infra::error::{Result, StrataError};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Default)]
struct Names {
    ordered: Vec<String>,
    index: FxHashSet<String>,
}

impl Names {
    fn insert(&mut self, name: String) -> bool {
        if self.index.insert(name.clone()) {
            self.ordered.push(name);
            true
        } else {
            false
        }
    }
}

pub struct SuburbReferenceSet {
    source: Option<PathBuf>,
    name_column: String,
    names: RwLock<Names>,
}

impl SuburbReferenceSet {
    /// Create an empty set backed by a gazetteer file. Call `load()` to populate.
    pub fn new(path: impl Into<PathBuf>, name_column: &str) -> Self {
        Self {
            source: Some(path.into()),
            name_column: name_column.to_string(),
            names: RwLock::new(Names::default()),
        }
    }

    /// Build an in-memory set with no backing file
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Names::default();
        for name in names {
            let name = name.as_ref().trim().to_uppercase();
            if !name.is_empty() {
                set.insert(name);
            }
        }
        Self { source: None, name_column: String::new(), names: RwLock::new(set) }
    }

    /// Populate from the backing file if the set is still empty.
    ///
    /// Returns the number of names held afterwards.
    pub fn load(&self) -> Result<usize> {
        if !self.is_empty() {
            return Ok(self.len());
        }
        self.reload()
    }

    /// Read the backing file again, adding any names not yet present
    pub fn reload(&self) -> Result<usize> {
        let Some(path) = self.source.as_deref() else {
            return Err(StrataError::reference_set_unavailable("no gazetteer file configured"));
        };

        let loaded = read_suburb_names(path, &self.name_column).map_err(|e| {
            error!(path = %path.display(), error = %e, "gazetteer_load_failed");
            StrataError::reference_set_unavailable(e)
        })?;

        let mut names = self.names.write();
        let mut added = 0usize;
        for name in loaded {
            if names.insert(name) {
                added += 1;
            }
        }
        let total = names.ordered.len();
        drop(names);

        info!(path = %path.display(), added = %added, total = %total, "gazetteer_loaded");
        Ok(total)
    }

    /// Make sure there is something to match against, reloading once if empty
    pub fn ensure_loaded(&self) -> Result<()> {
        if !self.is_empty() {
            return Ok(());
        }
        warn!("gazetteer_empty_reloading");
        match self.reload() {
            Ok(n) if n > 0 => Ok(()),
            Ok(_) => Err(StrataError::reference_set_unavailable("gazetteer contains no suburbs")),
            Err(e) => Err(e),
        }
    }

    pub fn contains(&self, suburb_upper: &str) -> bool {
        self.names.read().index.contains(suburb_upper)
    }

    pub fn len(&self) -> usize {
        self.names.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().ordered.is_empty()
    }

    /// Visit every name in load order while holding the read lock
    pub fn for_each<F: FnMut(&str)>(&self, mut f: F) {
        let names = self.names.read();
        for name in &names.ordered {
            f(name);
        }
    }
}

/// Read the name column of a semicolon-delimited gazetteer file
fn read_suburb_names(path: &Path, name_column: &str) -> std::result::Result<Vec<String>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("cannot open {}: {e}", path.display()))?;

    let headers = reader.headers().map_err(|e| format!("cannot read header row: {e}"))?;
    let column = headers
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}') == name_column)
        .ok_or_else(|| format!("column '{name_column}' not found"))?;

    let mut names = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| format!("malformed row: {e}"))?;
        if let Some(name) = row.get(column) {
            let name = name.trim().to_uppercase();
            if !name.is_empty() {
                names.push(name);
            }
        }
    }
    Ok(names)
}
