// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod exit_history;
mod harvester;
mod parser;
mod report;

pub use exit_history::*;
pub use harvester::*;
pub use parser::parse_hang_report;
pub use report::*;
