// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// The kind of artifact that just landed in the quarantine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Minidump,
    HangReport,
}

/// Hook into whatever uploads the quarantine.
///
/// Each collector calls this at most once per operation, and only when that operation actually
/// wrote a new artifact. Implementations are expected to return quickly, e.g. by enqueueing a job.
pub trait UploadScheduler: Send + Sync {
    fn schedule_upload(&self, kind: ArtifactKind);
}

/// Scheduler for hosts that poll the quarantine on their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUploadScheduler;

impl UploadScheduler for NoopUploadScheduler {
    fn schedule_upload(&self, _kind: ArtifactKind) {}
}
