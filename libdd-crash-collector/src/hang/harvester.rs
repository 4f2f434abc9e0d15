// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::exit_history::{ExitEvent, ExitHistorySource, ExitReason};
use super::parser::parse_hang_report;
use super::report::HangRecord;
use crate::counters::{CollectorIssue, DiagnosticCounters};
use crate::quarantine::QuarantineStore;
use crate::scheduler::{ArtifactKind, UploadScheduler};
use crate::watermark::WatermarkStore;
use anyhow::Context;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A hang record that made it to the quarantine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantinedHangReport {
    pub path: PathBuf,
    pub version_tag: Vec<u8>,
    pub timestamp_ms: i64,
}

/// Turns the hangs of the OS exit history into quarantined [`HangRecord`]s.
///
/// Meant to be driven from a single background task; concurrent passes don't corrupt anything
/// but may write the same hang twice.
pub struct HangHarvester {
    counters: Arc<DiagnosticCounters>,
    exit_history: Arc<dyn ExitHistorySource>,
    quarantine: QuarantineStore,
    scheduler: Arc<dyn UploadScheduler>,
    watermark: Arc<dyn WatermarkStore>,
}

impl HangHarvester {
    pub fn new(
        exit_history: Arc<dyn ExitHistorySource>,
        watermark: Arc<dyn WatermarkStore>,
        quarantine: QuarantineStore,
        scheduler: Arc<dyn UploadScheduler>,
        counters: Arc<DiagnosticCounters>,
    ) -> Self {
        Self {
            counters,
            exit_history,
            quarantine,
            scheduler,
            watermark,
        }
    }

    pub fn counters(&self) -> &Arc<DiagnosticCounters> {
        &self.counters
    }

    /// Runs one harvest pass and returns the reports written by it.
    ///
    /// The watermark is moved to the newest hang considered by this pass, including hangs that
    /// were dropped because their dump was unreadable or they carried no version. Otherwise an
    /// entry that can never be processed would be retried on every pass for as long as the OS
    /// retains it.
    pub fn harvest(&self) -> Vec<QuarantinedHangReport> {
        let last_seen = match self.watermark.get() {
            Ok(last_seen) => last_seen,
            Err(e) => {
                // Without a watermark the whole history would be reprocessed.
                error!(error = %e, "Failed to read the hang watermark, skipping this pass");
                return vec![];
            }
        };

        let history = match self.exit_history.exit_history() {
            Ok(history) => history,
            Err(e) => {
                error!(error = %e, "Failed to query the exit history");
                return vec![];
            }
        };

        let mut hangs: Vec<ExitEvent> = history
            .into_iter()
            .filter(|event| event.reason == ExitReason::Hang && event.timestamp_ms > last_seen)
            .collect();
        if hangs.is_empty() {
            debug!(last_seen, "No new hangs");
            return vec![];
        }

        let mut newest = last_seen;
        let mut records = Vec::with_capacity(hangs.len());
        for event in hangs.iter_mut() {
            newest = newest.max(event.timestamp_ms);
            if let Some(record) = self.collect(event) {
                records.push(record);
            }
        }

        if let Err(e) = self.watermark.set(newest) {
            error!(error = %e, newest, "Failed to advance the hang watermark");
        }

        let written = self.write_records(records);
        info!(
            considered = hangs.len(),
            written = written.len(),
            watermark = newest,
            "Hang harvest pass done"
        );
        if !written.is_empty() {
            self.scheduler.schedule_upload(ArtifactKind::HangReport);
        }
        written
    }

    fn collect(&self, event: &mut ExitEvent) -> Option<HangRecord> {
        let timestamp_ms = event.timestamp_ms;
        let raw = match read_trace(event) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(timestamp_ms, error = %e, "Failed to read hang thread dump, dropping it");
                self.counters.record(CollectorIssue::HangReadFailure);
                return None;
            }
        };
        let report = parse_hang_report(&raw);

        let Some(version_tag) = event.attributable_version() else {
            debug!(timestamp_ms, "Hang has no version tag, dropping it");
            self.counters.record(CollectorIssue::HangUnattributable);
            return None;
        };

        Some(HangRecord {
            report: Some(report),
            version_tag: version_tag.to_vec(),
            timestamp_ms,
        })
    }

    fn write_records(&self, records: Vec<HangRecord>) -> Vec<QuarantinedHangReport> {
        if records.is_empty() {
            return vec![];
        }
        if let Err(e) = self.quarantine.ensure_dirs() {
            warn!(error = %e, "Failed to create the quarantine directories");
        }

        let mut written = Vec::with_capacity(records.len());
        for record in records {
            match self.quarantine.write_hang_record(&record) {
                Ok(path) => written.push(QuarantinedHangReport {
                    path,
                    version_tag: record.version_tag,
                    timestamp_ms: record.timestamp_ms,
                }),
                Err(e) => {
                    warn!(
                        timestamp_ms = record.timestamp_ms,
                        error = %e,
                        "Failed to write hang record"
                    );
                    self.counters.record(CollectorIssue::HangWriteFailure);
                }
            }
        }
        written
    }
}

fn read_trace(event: &mut ExitEvent) -> anyhow::Result<String> {
    let mut trace = event.open_trace().context("Failed to open thread dump")?;
    let mut bytes = vec![];
    trace
        .read_to_end(&mut bytes)
        .context("Failed to read thread dump")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
