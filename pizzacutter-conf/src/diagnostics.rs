// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Warning sink handed to every stage that can hit a missing optional input.
//!
//! Components never talk to a process-wide logger directly. They receive a
//! `&dyn Diagnostics` so tests can capture warnings and assert on them.

use std::cell::RefCell;

use tracing::warn;

/// Receives non-fatal findings. Processing always continues after a call.
pub trait Diagnostics {
    /// Reports a warning.
    fn warn(&self, message: &str);
}

/// Forwards warnings to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, message: &str) {
        warn!("{message}");
    }
}

/// Collects warnings in memory.
///
/// # Example
///
/// ```
/// use pizzacutter_conf::{Diagnostics, MemoryDiagnostics};
///
/// let diagnostics = MemoryDiagnostics::default();
/// diagnostics.warn("MYPYPATH \"/nope\" does not exist, skipping");
/// assert_eq!(diagnostics.warnings().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    warnings: RefCell<Vec<String>>
}

impl MemoryDiagnostics {
    /// Returns a snapshot of the collected warnings in emission order.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    /// Returns `true` when any collected warning contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.warnings
            .borrow()
            .iter()
            .any(|warning| warning.contains(needle))
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_owned());
    }
}
