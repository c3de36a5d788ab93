//! Avatar storage
//!
//! Avatars arrive either as a file the aggregator already has on disk or
//! as raw image bytes. Bytes are written to `<dir>/<name>.jpeg`, where the
//! name is a digest of the individual's id.

use crate::aggregator::Avatar;
use crate::error::Result;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Hex digits of the id digest kept in file names
const FILE_STEM_LEN: usize = 32;

pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path to use for an individual's avatar, writing bytes out if needed
    pub fn resolve(&self, id: Option<&str>, avatar: Avatar) -> Result<PathBuf> {
        match avatar {
            Avatar::File(path) => Ok(path),
            Avatar::Bytes(bytes) => self.store(id, &bytes),
        }
    }

    /// Write image bytes under a name derived from `id` (random when absent
    /// or empty)
    pub fn store(&self, id: Option<&str>, bytes: &[u8]) -> Result<PathBuf> {
        let stem = match id.filter(|id| !id.is_empty()) {
            Some(id) => file_stem(id),
            None => uuid::Uuid::new_v4().to_string(),
        };

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.jpeg", stem));
        fs::write(&path, bytes)?;

        debug!("Stored {} byte avatar at {:?}", bytes.len(), path);
        Ok(path)
    }
}

/// Distinct ids always get distinct names
fn file_stem(id: &str) -> String {
    blake3::hash(id.as_bytes()).to_hex().as_str()[..FILE_STEM_LEN].to_string()
}
