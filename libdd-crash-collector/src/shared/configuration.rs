// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use crate::shared::constants::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the collectors keep their state.
///
/// The quarantine holds finished artifacts and must survive restarts. The scratch area only ever
/// holds the dump currently being copied by the intake, and is wiped after every copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfiguration {
    // Product prefix used when naming quarantined dumps
    dump_file_prefix: String,
    quarantine_dir: PathBuf,
    scratch_dir: PathBuf,
    watermark_path: PathBuf,
}

impl CollectorConfiguration {
    pub fn new(
        quarantine_dir: PathBuf,
        scratch_dir: PathBuf,
        watermark_path: PathBuf,
        dump_file_prefix: Option<String>,
    ) -> anyhow::Result<Self> {
        // Clearing the scratch area must never be able to touch a quarantined artifact.
        anyhow::ensure!(
            quarantine_dir != scratch_dir,
            "The quarantine and scratch directories must differ, both are {quarantine_dir:?}"
        );
        anyhow::ensure!(
            !scratch_dir.starts_with(&quarantine_dir) && !quarantine_dir.starts_with(&scratch_dir),
            "The scratch directory ({scratch_dir:?}) and quarantine directory ({quarantine_dir:?}) \
             can't be nested in one another"
        );
        let dump_file_prefix =
            dump_file_prefix.unwrap_or_else(|| DD_CRASH_DEFAULT_DUMP_PREFIX.to_string());
        anyhow::ensure!(!dump_file_prefix.is_empty(), "Empty dump file prefix");
        // The local id is recovered from the last '-' before the first '.'. The infix always
        // supplies that '-', but a '.' in the prefix would end the stem early.
        anyhow::ensure!(
            !dump_file_prefix.contains(&['.', '/', '\\'][..]),
            "Invalid dump file prefix {dump_file_prefix:?}"
        );

        Ok(Self {
            dump_file_prefix,
            quarantine_dir,
            scratch_dir,
            watermark_path,
        })
    }

    /// Lays everything out under `base`, using the default dump prefix.
    pub fn with_base_dir(base: &Path) -> anyhow::Result<Self> {
        Self::new(
            base.join(DD_CRASH_QUARANTINE_DIR_NAME),
            base.join(DD_CRASH_SCRATCH_DIR_NAME),
            base.join(DD_HANG_WATERMARK_FILE_NAME),
            None,
        )
    }

    pub fn dump_file_prefix(&self) -> &str {
        &self.dump_file_prefix
    }

    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn watermark_path(&self) -> &Path {
        &self.watermark_path
    }
}
