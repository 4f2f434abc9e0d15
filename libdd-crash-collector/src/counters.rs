// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering::SeqCst};

/// Reasons an input was dropped, or an operation skipped, without failing the surrounding call.
///
/// None of these reach the caller. They are counted so that the rate of useless or broken input
/// stays observable.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CollectorIssue {
    /// The thread dump of a hang could not be opened or read.
    HangReadFailure = 0,
    /// The hang carried no version tag, so it can't be attributed to a release.
    HangUnattributable,
    /// A parsed hang report could not be written to the quarantine.
    HangWriteFailure,
    /// Copying one dump of an intake batch failed.
    DumpCopyFailure,
    /// A dump was quarantined but its name yielded no local id, so no sidecar was written.
    DumpMissingLocalId,
    /// An intake call was cancelled while waiting for the gate.
    IntakeCancelled,
    /// Dummy value to allow easier iteration
    SIZE,
}

impl CollectorIssue {
    pub const ALL: [CollectorIssue; CollectorIssue::SIZE as usize] = [
        CollectorIssue::HangReadFailure,
        CollectorIssue::HangUnattributable,
        CollectorIssue::HangWriteFailure,
        CollectorIssue::DumpCopyFailure,
        CollectorIssue::DumpMissingLocalId,
        CollectorIssue::IntakeCancelled,
    ];

    /// A static string giving the name of the issue.
    /// We implement this, rather than `to_string`, to avoid the memory
    /// allocation associated with `String`.
    pub fn name(&self) -> &'static str {
        match self {
            CollectorIssue::HangReadFailure => "hang_read_failure",
            CollectorIssue::HangUnattributable => "hang_unattributable",
            CollectorIssue::HangWriteFailure => "hang_write_failure",
            CollectorIssue::DumpCopyFailure => "dump_copy_failure",
            CollectorIssue::DumpMissingLocalId => "dump_missing_local_id",
            CollectorIssue::IntakeCancelled => "intake_cancelled",
            CollectorIssue::SIZE => "size",
        }
    }
}

// In this case, we actually WANT multiple copies of the interior mutable struct
#[allow(clippy::declare_interior_mutable_const)]
const ATOMIC_ZERO: AtomicI64 = AtomicI64::new(0);

/// One counter per [`CollectorIssue`], shared by the collectors of a process.
#[derive(Debug)]
pub struct DiagnosticCounters {
    counters: [AtomicI64; CollectorIssue::SIZE as usize],
}

impl Default for DiagnosticCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticCounters {
    pub const fn new() -> Self {
        Self {
            counters: [ATOMIC_ZERO; CollectorIssue::SIZE as usize],
        }
    }

    /// ATOMICITY: This function is atomic.
    pub fn record(&self, issue: CollectorIssue) {
        if let Some(counter) = self.counters.get(issue as usize) {
            counter.fetch_add(1, SeqCst);
        }
    }

    pub fn get(&self, issue: CollectorIssue) -> i64 {
        self.counters
            .get(issue as usize)
            .map(|c| c.load(SeqCst))
            .unwrap_or_default()
    }

    /// ATOMICITY:
    ///     Each counter is read atomically. Iterating over them is not.
    pub fn snapshot(&self) -> HashMap<String, i64> {
        CollectorIssue::ALL
            .iter()
            .map(|issue| (issue.name().to_string(), self.get(*issue)))
            .collect()
    }

    /// Resets all counters to 0.
    /// ATOMICITY:
    ///     This is NOT ATOMIC.
    pub fn reset(&self) {
        for c in self.counters.iter() {
            c.store(0, SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let counters = DiagnosticCounters::new();
        counters.record(CollectorIssue::HangUnattributable);
        counters.record(CollectorIssue::HangUnattributable);
        counters.record(CollectorIssue::DumpCopyFailure);

        assert_eq!(counters.get(CollectorIssue::HangUnattributable), 2);
        assert_eq!(counters.get(CollectorIssue::DumpCopyFailure), 1);
        assert_eq!(counters.get(CollectorIssue::HangReadFailure), 0);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.len(), CollectorIssue::SIZE as usize);
        assert_eq!(snapshot["hang_unattributable"], 2);
        assert_eq!(snapshot["intake_cancelled"], 0);

        counters.reset();
        assert!(counters.snapshot().values().all(|v| *v == 0));
    }

    #[test]
    fn test_size_is_not_counted() {
        let counters = DiagnosticCounters::new();
        counters.record(CollectorIssue::SIZE);
        assert_eq!(counters.get(CollectorIssue::SIZE), 0);
    }
}
