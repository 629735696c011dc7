//! Flat-file JSON array store.
//!
//! Each data file (Q&A table, corpus, exchange log) is a single top-level
//! JSON array. [`load_array`] reports every failure as a [`StoreError`];
//! [`load_or_empty`] layers the default recovery policy on top of it:
//! warn and carry on with an empty collection.
//!
//! Saves overwrite the file in place. There is no atomic rename and no
//! locking, so a crash mid-write can leave a truncated file behind; the next
//! load then recovers with an empty collection.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::error::StoreError;

/// Loads the JSON array stored at `path`.
///
/// A missing file is created containing `[]`. An empty (or whitespace-only)
/// file reads as an empty array. Records are returned as raw JSON values;
/// their shape is not checked here.
pub fn load_array(path: &Path) -> Result<Vec<Value>, StoreError> {
    if !path.exists() {
        save_array::<Value>(path, &[])?;
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(records) => Ok(records),
        _ => Err(StoreError::NotArray {
            path: path.to_path_buf(),
        }),
    }
}

/// [`load_array`] with the default recovery policy: any error is logged as a
/// warning and an empty collection is returned.
pub fn load_or_empty(path: &Path) -> Vec<Value> {
    match load_array(path) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load data file, continuing with empty collection");
            Vec::new()
        }
    }
}

/// Overwrites `path` with `records` as a pretty-printed JSON array.
///
/// Parent directories are created as needed. Non-ASCII text is written
/// verbatim.
pub fn save_array<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    let json = serde_json::to_string_pretty(records).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Converts raw records into `T`, dropping the ones that do not fit.
pub fn decode_records<T: DeserializeOwned>(records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match serde_json::from_value(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!(index = i, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}
