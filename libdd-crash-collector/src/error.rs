// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the quarantine and watermark stores.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to encode hang record: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("Failed to decode hang record: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Not a quarantined minidump: {0:?}")]
    NotAMinidump(PathBuf),
}

impl CollectorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectorError::Io {
            path: path.into(),
            source,
        }
    }
}
