// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Quarantined dumps are named `<prefix>-minidump-<local id>.dmp<caller id>`.
//!
//! The name is the only place the local id and caller id are kept, so these helpers must
//! stay in sync with each other. The names can derive from cross-process input and are parsed
//! defensively: anything unexpected yields `None`.

use crate::shared::constants::*;
use uuid::Uuid;

/// Builds a fresh, unique dump file name for `caller_id`.
pub fn minidump_file_name(prefix: &str, caller_id: u32) -> String {
    let local_id = Uuid::new_v4().simple();
    format!("{prefix}{DD_CRASH_MINIDUMP_INFIX}{local_id}{DD_CRASH_MINIDUMP_EXTENSION}{caller_id}")
}

/// Returns true if `file_name` looks like a quarantined dump (and not a sidecar of one).
pub fn is_minidump_file_name(file_name: &str) -> bool {
    file_name.contains(DD_CRASH_MINIDUMP_INFIX)
        && caller_id_from_file_name(file_name).is_some()
}

/// Extracts the local id: the segment after the last `-` that precedes the first `.`.
pub fn local_id_from_file_name(file_name: &str) -> Option<&str> {
    let (stem, _) = file_name.split_once('.')?;
    let (_, local_id) = stem.rsplit_once('-')?;
    if local_id.is_empty() || local_id.contains(',') {
        return None;
    }
    Some(local_id)
}

/// Extracts the caller id, i.e. the decimal number right after `.dmp`.
pub fn caller_id_from_file_name(file_name: &str) -> Option<u32> {
    let (_, suffix) = file_name.rsplit_once(DD_CRASH_MINIDUMP_EXTENSION)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Name of the sidecar record written next to the dump `dump_file_name`.
pub fn crash_log_file_name(dump_file_name: &str) -> String {
    format!("{dump_file_name}{DD_CRASH_LOG_SUFFIX}")
}
