// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Durable storage for the timestamp of the newest hang already turned into a report.

use crate::error::CollectorError;
use crate::shared::constants::DD_HANG_WATERMARK_KEY;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait WatermarkStore: Send + Sync {
    /// Epoch millis of the last handled hang, 0 if none was ever recorded.
    fn get(&self) -> Result<i64, CollectorError>;
    fn set(&self, timestamp_ms: i64) -> Result<(), CollectorError>;
}

/// Watermark kept in a small JSON key/value file.
///
/// Writes go through a temporary file in the same directory which is then renamed over the
/// previous one, so a crash mid-write leaves either the old or the new value.
#[derive(Debug)]
pub struct FileWatermarkStore {
    path: PathBuf,
    key: String,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: DD_HANG_WATERMARK_KEY.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries written by others are kept as-is, whatever their type.
    fn load(&self) -> Result<Map<String, Value>, CollectorError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(CollectorError::io(&self.path, e)),
        }
    }

    fn store(&self, entries: &Map<String, Value>) -> Result<(), CollectorError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| CollectorError::io(&dir, e))?;
        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| CollectorError::io(&dir, e))?;
        serde_json::to_writer(&mut tmp, entries)?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| CollectorError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| CollectorError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn get(&self) -> Result<i64, CollectorError> {
        match self.load()?.get(&self.key) {
            None => Ok(0),
            Some(value) => value.as_i64().ok_or_else(|| {
                CollectorError::Json(serde::de::Error::custom(format!(
                    "{} is not an integer: {value}",
                    self.key
                )))
            }),
        }
    }

    fn set(&self, timestamp_ms: i64) -> Result<(), CollectorError> {
        // Other entries of the file are preserved.
        let mut entries = self.load()?;
        entries.insert(self.key.clone(), Value::from(timestamp_ms));
        self.store(&entries)
    }
}

/// Non-durable watermark, for hosts without writable storage and for tests.
#[derive(Debug, Default)]
pub struct InMemoryWatermarkStore {
    value: Mutex<i64>,
}

impl InMemoryWatermarkStore {
    pub fn new(initial: i64) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }
}

impl WatermarkStore for InMemoryWatermarkStore {
    fn get(&self) -> Result<i64, CollectorError> {
        // A poisoned lock still holds a valid i64.
        Ok(*self.value.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn set(&self, timestamp_ms: i64) -> Result<(), CollectorError> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = timestamp_ms;
        Ok(())
    }
}
