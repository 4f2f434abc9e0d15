// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Names and keys that make up the on-disk contract of the quarantine.
//!
//! The upload scheduler reads the quarantine without linking against this crate, so changing any
//! of these values changes the format it has to understand.

// Crash metadata keys, as sent by the process handing over the dumps

/// Package name of the application the crashing process belonged to.
pub const DD_CRASH_METADATA_PACKAGE_NAME: &str = "app-package-name";
/// Comma-separated list of the experiment variations active in the crashing process.
pub const DD_CRASH_METADATA_VARIATIONS: &str = "variations";

// Quarantine file naming

/// Default product prefix of quarantined dump names.
pub const DD_CRASH_DEFAULT_DUMP_PREFIX: &str = "crash-collector";
/// Infix between the product prefix and the local id of a quarantined dump.
pub const DD_CRASH_MINIDUMP_INFIX: &str = "-minidump-";
/// Extension of a quarantined dump, followed directly by the decimal caller id.
pub const DD_CRASH_MINIDUMP_EXTENSION: &str = ".dmp";
/// Suffix appended to a dump's file name to get the name of its sidecar record.
pub const DD_CRASH_LOG_SUFFIX: &str = "_log.json";
/// Prefix of hang record files.
pub const DD_HANG_RECORD_PREFIX: &str = "hang_report_";
/// Suffix of hang record files.
pub const DD_HANG_RECORD_SUFFIX: &str = ".tmp";

// Hang reports

/// The thread dumps handed out by the OS do not carry the hang cause, every report uses this.
pub const DD_HANG_CAUSE_PLACEHOLDER: &str = "Crash_Collector_Hang_Cause";
/// Key of the watermark entry in the watermark store.
pub const DD_HANG_WATERMARK_KEY: &str = "hang_collector_last_seen_time";

// Default layout under a single base directory

pub const DD_CRASH_QUARANTINE_DIR_NAME: &str = "Crash Reports";
pub const DD_CRASH_SCRATCH_DIR_NAME: &str = "tmp";
pub const DD_HANG_WATERMARK_FILE_NAME: &str = "hang_watermark.json";
