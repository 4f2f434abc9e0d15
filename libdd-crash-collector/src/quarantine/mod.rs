// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The on-disk holding area shared by both collectors.
//!
//! Two directories make up the store:
//! - the quarantine proper, holding dumps, their `_log.json` sidecars and hang records until the
//!   upload scheduler is done with them;
//! - a scratch area for the dump the intake is currently copying. It is only ever written while
//!   the intake gate is held and may be wiped at any other time.
//!
//! Dumps and hang records use disjoint naming schemes (see [`naming`]), so the collectors never
//! need to coordinate.

mod crash_log;
pub mod naming;

pub use crash_log::{CrashLogRecord, CrashMetadata};
#[cfg(feature = "intake")]
pub(crate) use crash_log::epoch_millis;

use crate::error::CollectorError;
use crate::shared::configuration::CollectorConfiguration;
use crate::shared::constants::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct QuarantineStore {
    dump_file_prefix: String,
    quarantine_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl QuarantineStore {
    pub fn new(config: &CollectorConfiguration) -> Self {
        Self {
            dump_file_prefix: config.dump_file_prefix().to_string(),
            quarantine_dir: config.quarantine_dir().to_path_buf(),
            scratch_dir: config.scratch_dir().to_path_buf(),
        }
    }

    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Creates both directories if needed.
    pub fn ensure_dirs(&self) -> Result<(), CollectorError> {
        for dir in [&self.quarantine_dir, &self.scratch_dir] {
            fs::create_dir_all(dir).map_err(|e| CollectorError::io(dir, e))?;
        }
        Ok(())
    }

    /// A fresh path in the quarantine for a dump received from `caller_id`.
    pub fn new_minidump_path(&self, caller_id: u32) -> PathBuf {
        self.quarantine_dir
            .join(naming::minidump_file_name(&self.dump_file_prefix, caller_id))
    }

    /// Deletes every file currently in the scratch area.
    ///
    /// Every entry is attempted even if some fail; the first failure is returned.
    /// PRECONDITIONS:
    ///     No intake may be copying, i.e. the caller holds the intake gate or intake is not running.
    pub fn clear_scratch(&self) -> Result<usize, CollectorError> {
        let entries = match fs::read_dir(&self.scratch_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CollectorError::io(&self.scratch_dir, e)),
        };

        let mut removed = 0;
        let mut first_error = None;
        for entry in entries {
            let result = entry.and_then(|entry| {
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                }
            });
            match result {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(dir = ?self.scratch_dir, error = %e, "Failed to clear scratch entry");
                    if first_error.is_none() {
                        first_error = Some(CollectorError::io(&self.scratch_dir, e));
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Quarantined dumps, sorted by file name. Sidecars and hang records are excluded.
    pub fn quarantined_dumps(&self) -> Result<Vec<PathBuf>, CollectorError> {
        self.list(naming::is_minidump_file_name)
    }

    pub fn crash_log_path(&self, dump: &Path) -> Result<PathBuf, CollectorError> {
        let file_name = dump
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| naming::is_minidump_file_name(n))
            .ok_or_else(|| CollectorError::NotAMinidump(dump.to_path_buf()))?;
        Ok(dump.with_file_name(naming::crash_log_file_name(file_name)))
    }

    /// Reads the sidecar of `dump`. `Ok(None)` if the dump has none.
    pub fn read_crash_log(&self, dump: &Path) -> Result<Option<CrashLogRecord>, CollectorError> {
        let path = self.crash_log_path(dump)?;
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CollectorError::io(&path, e)),
        };
        Ok(Some(serde_json::from_reader(file)?))
    }

    /// Deletes `dump` together with its sidecar, if any.
    pub fn remove_dump(&self, dump: &Path) -> Result<(), CollectorError> {
        let log = self.crash_log_path(dump)?;
        fs::remove_file(dump).map_err(|e| CollectorError::io(dump, e))?;
        match fs::remove_file(&log) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(CollectorError::io(&log, e)),
            _ => Ok(()),
        }
    }

    fn list(&self, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>, CollectorError> {
        let entries = match fs::read_dir(&self.quarantine_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(CollectorError::io(&self.quarantine_dir, e)),
        };
        let mut paths = vec![];
        for entry in entries {
            let entry = entry.map_err(|e| CollectorError::io(&self.quarantine_dir, e))?;
            let keep_entry = entry
                .file_name()
                .to_str()
                .is_some_and(|name| keep(name));
            if keep_entry && entry.path().is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(feature = "hang")]
impl QuarantineStore {
    /// Writes `record` to a new, uniquely named file in the quarantine.
    pub fn write_hang_record(
        &self,
        record: &crate::hang::HangRecord,
    ) -> Result<PathBuf, CollectorError> {
        use prost::Message;
        use std::io::Write;

        let mut buf = Vec::with_capacity(record.encoded_len());
        record.encode(&mut buf)?;

        let mut file = tempfile::Builder::new()
            .prefix(DD_HANG_RECORD_PREFIX)
            .suffix(DD_HANG_RECORD_SUFFIX)
            .tempfile_in(&self.quarantine_dir)
            .map_err(|e| CollectorError::io(&self.quarantine_dir, e))?;
        file.write_all(&buf)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| CollectorError::io(file.path(), e))?;
        let (_, path) = file
            .keep()
            .map_err(|e| CollectorError::io(&self.quarantine_dir, e.error))?;
        Ok(path)
    }

    pub fn read_hang_record(&self, path: &Path) -> Result<crate::hang::HangRecord, CollectorError> {
        use prost::Message;

        let bytes = fs::read(path).map_err(|e| CollectorError::io(path, e))?;
        Ok(crate::hang::HangRecord::decode(bytes.as_slice())?)
    }

    /// Hang records currently in the quarantine.
    pub fn hang_records(&self) -> Result<Vec<PathBuf>, CollectorError> {
        self.list(|name| {
            name.starts_with(DD_HANG_RECORD_PREFIX) && name.ends_with(DD_HANG_RECORD_SUFFIX)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &Path) -> QuarantineStore {
        let config = CollectorConfiguration::with_base_dir(base).unwrap();
        let store = QuarantineStore::new(&config);
        store.ensure_dirs().unwrap();
        store
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_clear_scratch() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());
        fs::write(store.scratch_dir().join("a"), b"partial")?;
        fs::write(store.scratch_dir().join("b"), b"partial")?;
        fs::create_dir(store.scratch_dir().join("c"))?;
        fs::write(store.scratch_dir().join("c").join("d"), b"partial")?;
        // Quarantined artifacts are left alone.
        fs::write(store.quarantine_dir().join("keep"), b"dump")?;

        assert_eq!(store.clear_scratch()?, 3);
        assert_eq!(fs::read_dir(store.scratch_dir())?.count(), 0);
        assert!(store.quarantine_dir().join("keep").exists());
        assert_eq!(store.clear_scratch()?, 0);
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_clear_missing_scratch() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let config = CollectorConfiguration::with_base_dir(tmp.path())?;
        assert_eq!(QuarantineStore::new(&config).clear_scratch()?, 0);
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_listing_and_removal() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());
        let dump = store.new_minidump_path(42);
        fs::write(&dump, b"MDMP")?;
        let log = store.crash_log_path(&dump)?;
        CrashLogRecord::from_metadata("id".to_string(), 1, &CrashMetadata::new()).to_file(&log)?;
        fs::write(store.quarantine_dir().join("unrelated.txt"), b"")?;

        assert_eq!(store.quarantined_dumps()?, vec![dump.clone()]);
        assert_eq!(
            store.read_crash_log(&dump)?.map(|r| r.local_id),
            Some("id".to_string())
        );

        store.remove_dump(&dump)?;
        assert!(!dump.exists());
        assert!(!log.exists());
        assert!(store.quarantined_dumps()?.is_empty());
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_dump_without_sidecar() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());
        let dump = store.new_minidump_path(1);
        fs::write(&dump, b"MDMP")?;
        assert_eq!(store.read_crash_log(&dump)?, None);
        store.remove_dump(&dump)?;
        assert!(!dump.exists());
        Ok(())
    }

    #[test]
    fn test_crash_log_path_rejects_other_files() {
        let store = QuarantineStore::new(
            &CollectorConfiguration::with_base_dir(Path::new("/data")).unwrap(),
        );
        assert!(matches!(
            store.crash_log_path(Path::new("/data/Crash Reports/hang_report_x.tmp")),
            Err(CollectorError::NotAMinidump(_))
        ));
    }
}
