// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! This module holds constants/structures that are shared between the minidump intake and the
//! hang harvester

pub(crate) mod configuration;
pub(crate) mod constants;
