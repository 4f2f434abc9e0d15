// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The seam to the OS history of process exits.
//!
//! The OS keeps a bounded ring of recent exits and returns all of it on every query, so the
//! same entries show up again and again until they are overwritten. There is no cursor or
//! acknowledgement; deduplication is entirely up to the watermark kept by the harvester.

use std::fmt;
use std::io::{self, Read};

/// Why the OS says a process exited. Only [`ExitReason::Hang`] is harvested.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// The process stopped responding and was killed by the OS.
    Hang,
    Crash,
    NativeCrash,
    LowMemory,
    ExitSelf,
    Signaled,
    Other,
}

type TraceOpener = Box<dyn FnOnce() -> io::Result<Box<dyn Read + Send>> + Send>;

/// One entry of the exit history.
pub struct ExitEvent {
    pub timestamp_ms: i64,
    pub reason: ExitReason,
    /// Whatever the application attached to its process before exiting. `None` if it exited
    /// before setting one.
    pub version_tag: Option<Vec<u8>>,
    trace: Option<TraceOpener>,
}

impl ExitEvent {
    /// `open_trace` is only called if the event is harvested, and at most once.
    pub fn new<F>(
        timestamp_ms: i64,
        reason: ExitReason,
        version_tag: Option<Vec<u8>>,
        open_trace: F,
    ) -> Self
    where
        F: FnOnce() -> io::Result<Box<dyn Read + Send>> + Send + 'static,
    {
        Self {
            timestamp_ms,
            reason,
            version_tag,
            trace: Some(Box::new(open_trace)),
        }
    }

    /// An event whose thread dump is not available.
    pub fn without_trace(
        timestamp_ms: i64,
        reason: ExitReason,
        version_tag: Option<Vec<u8>>,
    ) -> Self {
        Self {
            timestamp_ms,
            reason,
            version_tag,
            trace: None,
        }
    }

    /// Opens the raw thread dump. Fails if there is none, or it was already opened.
    pub fn open_trace(&mut self) -> io::Result<Box<dyn Read + Send>> {
        match self.trace.take() {
            Some(open) => open(),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "No trace available for this exit",
            )),
        }
    }

    /// The version tag, if present and non-empty.
    pub fn attributable_version(&self) -> Option<&[u8]> {
        self.version_tag.as_deref().filter(|tag| !tag.is_empty())
    }
}

impl fmt::Debug for ExitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitEvent")
            .field("timestamp_ms", &self.timestamp_ms)
            .field("reason", &self.reason)
            .field("version_tag", &self.version_tag)
            .field("has_trace", &self.trace.is_some())
            .finish()
    }
}

/// Queries the OS exit history.
///
/// Every call returns the full history currently retained, including entries returned by
/// previous calls.
pub trait ExitHistorySource: Send + Sync {
    fn exit_history(&self) -> anyhow::Result<Vec<ExitEvent>>;
}

impl<F> ExitHistorySource for F
where
    F: Fn() -> anyhow::Result<Vec<ExitEvent>> + Send + Sync,
{
    fn exit_history(&self) -> anyhow::Result<Vec<ExitEvent>> {
        self()
    }
}
