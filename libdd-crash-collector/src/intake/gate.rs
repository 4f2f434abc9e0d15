// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, LazyLock};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

static PROCESS_GATE: LazyLock<Arc<IntakeGate>> = LazyLock::new(|| Arc::new(IntakeGate::new()));

/// Lets one intake run at a time. Later callers wait for the current one to finish, then run
/// in turn; nothing is skipped or merged. Waiters are not woken in any guaranteed order.
#[derive(Debug, Default)]
pub(crate) struct IntakeGate {
    lock: Arc<Mutex<()>>,
}

/// Held for the whole duration of an intake. Dropping it lets the next caller in.
#[derive(Debug)]
pub(crate) struct IntakeGuard {
    _guard: OwnedMutexGuard<()>,
}

impl IntakeGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The gate shared by every intake of this process.
    pub(crate) fn process_wide() -> Arc<IntakeGate> {
        Arc::clone(&PROCESS_GATE)
    }

    /// Waits until the gate is free. Returns `None` if `cancel` fires first, or has already fired.
    pub(crate) async fn enter(&self, cancel: &CancellationToken) -> Option<IntakeGuard> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            guard = Arc::clone(&self.lock).lock_owned() => Some(IntakeGuard { _guard: guard }),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
