//! Shared runtime state for scan-operator.
//!
//! Held in an `Arc` by the probe router and the controller loop.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

/// Static build metadata included in probe responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Probe state. Boots not-ready; the controller flips it once its scan
/// cache has synced and back when it shuts down.
#[derive(Debug)]
pub struct OperatorState {
    pub build: BuildInfo,
    ready: AtomicBool,
}

impl Default for OperatorState {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorState {
    pub fn new() -> Self {
        Self {
            build: BuildInfo {
                service: "scan-operator",
                version: env!("CARGO_PKG_VERSION"),
            },
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }
}
