// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! This crate collects diagnostic artifacts and parks them in a local quarantine
//! until an external scheduler uploads them.
//!
//! Architecturally, it consists of two independent collectors that share one
//! quarantine directory:
//! 1. The minidump intake receives a batch of crash-dump handles (and, optionally,
//!    an index-aligned list of per-dump metadata) from another process. Intake is
//!    single-flight: concurrent callers queue on a gate, so the scratch area used
//!    for in-flight copies only ever holds one dump at a time. Each dump is copied
//!    into the scratch area, renamed into the quarantine, and described by a JSON
//!    sidecar (`<dump file name>_log.json`).
//! 2. The hang harvester queries the OS history of process exits, keeps the hangs
//!    newer than a persisted watermark, parses their thread dumps into
//!    [`HangReport`]s, pairs each with the version tag set by the application at
//!    hang time, and writes them as protobuf records into the quarantine. The
//!    watermark always advances past every event considered, so entries the OS
//!    keeps replaying are handled at most once.
//!
//! Neither collector surfaces per-item failures to its caller. Failures are
//! logged through `tracing` and counted in [`DiagnosticCounters`].

mod counters;
mod error;
pub mod quarantine;
mod scheduler;
mod shared;
pub mod watermark;

#[cfg(feature = "hang")]
pub mod hang;
#[cfg(feature = "intake")]
pub mod intake;

pub use counters::{CollectorIssue, DiagnosticCounters};
pub use error::CollectorError;
pub use quarantine::{CrashLogRecord, CrashMetadata, QuarantineStore};
pub use scheduler::{ArtifactKind, NoopUploadScheduler, UploadScheduler};
pub use shared::configuration::CollectorConfiguration;
pub use shared::constants::*;
pub use watermark::{FileWatermarkStore, InMemoryWatermarkStore, WatermarkStore};

#[cfg(feature = "hang")]
pub use hang::{
    parse_hang_report, ExitEvent, ExitHistorySource, ExitReason, HangHarvester, HangRecord,
    HangReport, QuarantinedHangReport,
};
#[cfg(feature = "intake")]
pub use intake::{CrashDumpHandle, MinidumpIntake};
