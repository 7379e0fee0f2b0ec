//! JSON status records.
//!
//! Every binary structure keeps a small `*.stat` file with the sizing needed to
//! reopen it. Saves replace the file atomically: the record is written to a
//! temporary file in the same directory and renamed over the old one.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::{PlumeError, Result};

/// Read and decode a status record.
pub fn load_stat<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encode and atomically replace a status record.
pub fn save_stat<T: Serialize>(path: &Path, stat: &T) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        PlumeError::invalid_argument(format!("stat path {} has no parent", path.display()))
    })?;

    let bytes = serde_json::to_vec_pretty(stat)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.persist(path).map_err(|e| PlumeError::Io(e.error))?;
    Ok(())
}
