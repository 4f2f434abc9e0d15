// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Protobuf records written to the quarantine for each harvested hang.

/// A thread dump split into the parts the backend cares about.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HangReport {
    /// Always the placeholder, the thread dump does not say why the process hung.
    #[prost(string, tag = "1")]
    pub cause: ::prost::alloc::string::String,
    /// Everything before the first thread header.
    #[prost(string, tag = "2")]
    pub preamble: ::prost::alloc::string::String,
    /// The `"main"` thread, header line included.
    #[prost(string, tag = "3")]
    pub main_thread_stack: ::prost::alloc::string::String,
    /// All other threads, concatenated in dump order.
    #[prost(string, tag = "4")]
    pub other_thread_stacks: ::prost::alloc::string::String,
}

/// What actually lands on disk: the report plus what is needed to attribute it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HangRecord {
    #[prost(message, optional, tag = "1")]
    pub report: ::core::option::Option<HangReport>,
    /// Opaque tag the application attached to its process before hanging.
    #[prost(bytes = "vec", tag = "2")]
    pub version_tag: ::prost::alloc::vec::Vec<u8>,
    /// When the OS recorded the hang, epoch millis.
    #[prost(int64, tag = "3")]
    pub timestamp_ms: i64,
}
