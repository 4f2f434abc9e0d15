// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Intake of minidumps handed over by another process.
//!
//! Each dump is copied to the scratch area first and renamed into the quarantine once complete,
//! so the quarantine never exposes a partially written dump. The scratch area is wiped after
//! every handle, which is only sound because intakes are serialized by a single gate and the
//! handles of a batch are processed one after the other.

mod gate;

use crate::counters::{CollectorIssue, DiagnosticCounters};
use crate::quarantine::{epoch_millis, naming, QuarantineStore};
use crate::scheduler::{ArtifactKind, UploadScheduler};
use anyhow::Context;
use gate::IntakeGate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use crate::quarantine::{CrashLogRecord, CrashMetadata};

/// A readable dump received from another process. Consumed by the intake.
pub struct CrashDumpHandle {
    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl CrashDumpHandle {
    pub fn new(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    /// Wraps a file (e.g. built from a received file descriptor).
    pub fn from_std_file(file: std::fs::File) -> Self {
        Self::new(tokio::fs::File::from_std(file))
    }
}

impl fmt::Debug for CrashDumpHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrashDumpHandle").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct MinidumpIntake {
    counters: Arc<DiagnosticCounters>,
    gate: Arc<IntakeGate>,
    quarantine: QuarantineStore,
    scheduler: Arc<dyn UploadScheduler>,
}

impl MinidumpIntake {
    /// All intakes created this way share one process-wide gate.
    pub fn new(
        quarantine: QuarantineStore,
        scheduler: Arc<dyn UploadScheduler>,
        counters: Arc<DiagnosticCounters>,
    ) -> Self {
        Self {
            counters,
            gate: IntakeGate::process_wide(),
            quarantine,
            scheduler,
        }
    }

    pub fn counters(&self) -> &Arc<DiagnosticCounters> {
        &self.counters
    }

    /// Copies the dumps of `handles` into the quarantine, waiting for any intake in progress
    /// to finish first.
    ///
    /// `None` handles are skipped. A dump that fails to copy is logged and skipped without
    /// affecting the rest of the batch. If `metadata` is given, entry `i` describes `handles[i]`
    /// and a sidecar record is written for each dump copied.
    ///
    /// Returns true iff at least one dump was copied, in which case the upload scheduler has
    /// been notified once. If `cancel` fires while waiting for the gate, nothing is copied and
    /// false is returned.
    ///
    /// # Panics
    /// If `metadata` is not the same length as `handles`. Nothing is copied in that case.
    pub async fn intake(
        &self,
        caller_id: u32,
        handles: Vec<Option<CrashDumpHandle>>,
        metadata: Option<Vec<CrashMetadata>>,
        cancel: &CancellationToken,
    ) -> bool {
        if let Some(metadata) = &metadata {
            assert_eq!(
                metadata.len(),
                handles.len(),
                "Crash metadata must be index-aligned with the dump handles"
            );
        }

        let Some(guard) = self.gate.enter(cancel).await else {
            warn!(
                caller_id,
                dumps = handles.len(),
                "Interrupted while waiting to copy minidumps, dropping them"
            );
            self.counters.record(CollectorIssue::IntakeCancelled);
            return false;
        };

        let quarantine = self.quarantine.clone();
        if let Err(e) = run_blocking(move || Ok(quarantine.ensure_dirs()?)).await {
            warn!(error = %e, "Failed to create the quarantine directories");
        }

        let mut copied = 0usize;
        for (index, handle) in handles.into_iter().enumerate() {
            let Some(handle) = handle else {
                debug!(caller_id, index, "Skipping null minidump handle");
                continue;
            };

            match self.copy_to_quarantine(caller_id, handle).await {
                Ok(dump) => {
                    copied += 1;
                    if let Some(entry) = metadata.as_ref().and_then(|m| m.get(index)) {
                        if let Err(e) = self.write_crash_log(&dump, entry).await {
                            warn!(path = ?dump, error = %e, "Failed to write crash log");
                        }
                    }
                }
                Err(e) => {
                    warn!(caller_id, index, error = %e, "Failed to copy minidump");
                    self.counters.record(CollectorIssue::DumpCopyFailure);
                }
            }

            // Whatever happened above, nothing may linger in scratch for the next dump.
            let quarantine = self.quarantine.clone();
            if let Err(e) = run_blocking(move || Ok(quarantine.clear_scratch()?)).await {
                warn!(error = %e, "Failed to clear the minidump scratch directory");
            }
        }
        drop(guard);

        if copied == 0 {
            return false;
        }
        info!(caller_id, copied, "Quarantined minidumps");
        self.scheduler.schedule_upload(ArtifactKind::Minidump);
        true
    }

    async fn copy_to_quarantine(
        &self,
        caller_id: u32,
        mut handle: CrashDumpHandle,
    ) -> anyhow::Result<PathBuf> {
        let destination = self.quarantine.new_minidump_path(caller_id);
        let file_name = destination
            .file_name()
            .context("Generated minidump path has no file name")?;
        let scratch = self.quarantine.scratch_dir().join(file_name);

        let mut file = tokio::fs::File::create(&scratch)
            .await
            .with_context(|| format!("Failed to create {}", scratch.display()))?;
        let size = tokio::io::copy(&mut handle.reader, &mut file)
            .await
            .with_context(|| format!("Failed to copy minidump to {}", scratch.display()))?;
        anyhow::ensure!(size > 0, "Received an empty minidump");
        file.flush().await?;
        file.sync_all()
            .await
            .with_context(|| format!("Failed to sync {}", scratch.display()))?;
        drop(file);

        tokio::fs::rename(&scratch, &destination)
            .await
            .with_context(|| format!("Failed to move minidump to {}", destination.display()))?;
        debug!(caller_id, size, path = ?destination, "Copied minidump");
        Ok(destination)
    }

    async fn write_crash_log(&self, dump: &Path, metadata: &CrashMetadata) -> anyhow::Result<()> {
        let Some(local_id) = dump
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(naming::local_id_from_file_name)
        else {
            warn!(path = ?dump, "No local id in minidump name, not writing its crash log");
            self.counters.record(CollectorIssue::DumpMissingLocalId);
            return Ok(());
        };

        let modified = tokio::fs::metadata(dump)
            .await
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to stat {}", dump.display()))?;
        let record =
            CrashLogRecord::from_metadata(local_id.to_string(), epoch_millis(modified), metadata);
        let path = self.quarantine.crash_log_path(dump)?;
        run_blocking(move || record.to_file(&path)).await
    }
}

/// Runs a synchronous quarantine operation off the async worker threads.
async fn run_blocking<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Quarantine task panicked or was cancelled")?
}
