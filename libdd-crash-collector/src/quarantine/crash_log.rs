// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::shared::constants::*;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::File, path::Path, time::SystemTime};

/// Free-form description of one crash, as handed over alongside its dump.
pub type CrashMetadata = HashMap<String, String>;

/// Sidecar record describing one quarantined dump, stored as `<dump file name>_log.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashLogRecord {
    pub local_id: String,
    /// Epoch millis
    pub capture_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<Vec<String>>,
}

impl CrashLogRecord {
    /// Picks the known keys out of `metadata`. Unknown keys are ignored.
    pub fn from_metadata(local_id: String, capture_time: i64, metadata: &CrashMetadata) -> Self {
        let package_name = metadata.get(DD_CRASH_METADATA_PACKAGE_NAME).cloned();
        let variations = metadata.get(DD_CRASH_METADATA_VARIATIONS).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        });
        Self {
            local_id,
            capture_time,
            package_name,
            variations,
        }
    }

    /// Emit the record as structured json in file `path`, replacing any previous content.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)
            .with_context(|| format!("Failed to write json to {}", path.display()))?;
        Ok(())
    }
}

/// Converts a file timestamp to epoch millis.
#[cfg_attr(not(feature = "intake"), allow(dead_code))]
pub(crate) fn epoch_millis(time: SystemTime) -> i64 {
    chrono::DateTime::<chrono::Utc>::from(time).timestamp_millis()
}
