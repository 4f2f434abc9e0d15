// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::report::HangReport;
use crate::shared::constants::DD_HANG_CAUSE_PLACEHOLDER;
use regex::Regex;
use std::sync::LazyLock;

// e.g. `"Signal Catcher" daemon prio=10 tid=6 Runnable`
static THREAD_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^"(.*)".*prio=\d+ tid=\d+ \w+$"#).expect("thread header regex is valid")
});

const MAIN_THREAD_NAME: &str = "main";

/// The thread dump is read top to bottom; each header line switches the section the following
/// lines (header included) are appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    MainThread,
    OtherThreads,
}

/// Splits a raw thread dump into a [`HangReport`].
///
/// This never fails: input without any thread header ends up entirely in the preamble, and
/// empty input gives an empty report. Every line is kept with a trailing `\n`.
pub fn parse_hang_report(raw: &str) -> HangReport {
    let mut report = HangReport {
        cause: DD_HANG_CAUSE_PLACEHOLDER.to_string(),
        ..Default::default()
    };
    let mut section = Section::Preamble;

    for line in raw.lines() {
        if let Some(captures) = THREAD_HEADER.captures(line) {
            section = if &captures[1] == MAIN_THREAD_NAME {
                Section::MainThread
            } else {
                Section::OtherThreads
            };
        }
        let target = match section {
            Section::Preamble => &mut report.preamble,
            Section::MainThread => &mut report.main_thread_stack,
            Section::OtherThreads => &mut report.other_thread_stacks,
        };
        target.push_str(line);
        target.push('\n');
    }
    report
}
