//! Persisted contact cache
//!
//! A JSON array of [`CacheEntry`] objects. Loading never fails: a missing
//! or corrupt file is an empty cache. Saving replaces the file atomically
//! and is the one failure a reconciliation pass reports.

use crate::contact::CacheEntry;
use crate::error::{AlmanacError, Result};
use crate::reconcile::{reconcile, ReconcileReport};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// In-memory cache bound to its file
pub struct ContactCache {
    path: PathBuf,
    entries: Vec<CacheEntry>,
}

impl ContactCache {
    /// Empty cache that will be written to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Load the cache, falling back to empty on any failure
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match Self::read(&path) {
            Ok(entries) => {
                info!("Loaded {} cached contact entries from {:?}", entries.len(), path);
                entries
            }
            Err(e) => {
                if path.exists() {
                    warn!("Ignoring unreadable contact cache: {}", e);
                } else {
                    debug!("No contact cache at {:?}", path);
                }
                Vec::new()
            }
        };

        Self { path, entries }
    }

    /// Read and parse a cache file
    pub fn read(path: &Path) -> Result<Vec<CacheEntry>> {
        let content = fs::read_to_string(path).map_err(|e| AlmanacError::CacheLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| AlmanacError::CacheLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write the cache: temp file in the same directory, fsync, rename
    pub fn save(&self) -> Result<()> {
        self.write(&self.entries)
    }

    fn write(&self, entries: &[CacheEntry]) -> Result<()> {
        let persist_err = |source| AlmanacError::CachePersist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }

        let content = serde_json::to_vec_pretty(entries)
            .map_err(|e| persist_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let tmp = self.path.with_extension("json.tmp");
        let written = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)
            .and_then(|mut file| {
                file.write_all(&content)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&tmp, &self.path));

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(persist_err(e));
        }

        debug!("Wrote {} contact entries to {:?}", entries.len(), self.path);
        Ok(())
    }

    /// Reconcile an observation into the cache and persist the result.
    ///
    /// An empty observation is skipped without touching the file. The
    /// in-memory entries only change once the file has been written.
    pub fn apply(&mut self, observed: &[CacheEntry]) -> Result<ReconcileReport> {
        let mut entries = self.entries.clone();
        let report = reconcile(&mut entries, observed);

        if report.skipped {
            warn!("No contacts observed; keeping existing cache");
            return Ok(report);
        }

        self.write(&entries)?;
        self.entries = entries;
        Ok(report)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
