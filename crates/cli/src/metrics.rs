// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters the host keeps about one payload: trap traffic and the wall time
/// spent inside the entry routine.
#[derive(Debug, Default)]
pub struct HostMetrics {
    trap_calls: AtomicU64,
    trap_bytes: AtomicU64,
    entry_nanos: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsReport {
    pub trap_calls: u64,
    pub trap_bytes: u64,
    pub entry_ms: f64,
}

impl HostMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_trap(&self, bytes: usize) {
        self.trap_calls.fetch_add(1, Ordering::SeqCst);
        self.trap_bytes.fetch_add(bytes as u64, Ordering::SeqCst);
    }

    pub fn on_entry_finished(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.entry_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    pub fn get_trap_calls(&self) -> u64 {
        self.trap_calls.load(Ordering::SeqCst)
    }

    pub fn get_trap_bytes(&self) -> u64 {
        self.trap_bytes.load(Ordering::SeqCst)
    }

    pub fn get_entry_time(&self) -> Duration {
        Duration::from_nanos(self.entry_nanos.load(Ordering::SeqCst))
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            trap_calls: self.get_trap_calls(),
            trap_bytes: self.get_trap_bytes(),
            entry_ms: self.get_entry_time().as_secs_f64() * 1000.0,
        }
    }
}
