use std::fmt::Write;

use serde::Serialize;

use crate::error::SchedulerError;
use crate::snapshot::PerformanceSnapshot;

/// Index of a core in the row-major grid
pub type CoreId = usize;

/// Flat rows x columns many-core grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
}

impl Grid {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    pub fn core_count(&self) -> usize {
        self.rows * self.columns
    }

    pub fn core_at(&self, row: usize, column: usize) -> CoreId {
        row * self.columns + column
    }

    pub fn check_core(&self, core: CoreId) -> Result<(), SchedulerError> {
        if core < self.core_count() {
            Ok(())
        } else {
            Err(SchedulerError::CoreOutOfRange {
                core,
                cores: self.core_count(),
            })
        }
    }

    /// Renders the temperatures of available cores, one grid row per line;
    /// unavailable cores show as `-`.
    pub fn render_temperatures(
        &self,
        snapshot: &impl PerformanceSnapshot,
        available: &[bool],
    ) -> String {
        let mut out = String::new();
        for row in 0..self.rows {
            for column in 0..self.columns {
                if column > 0 {
                    out.push(' ');
                }
                let core = self.core_at(row, column);
                if available.get(core).copied().unwrap_or(false) {
                    let _ = write!(out, "{:5.1}", snapshot.temperature(core));
                } else {
                    out.push_str("    -");
                }
            }
            out.push('\n');
        }
        out
    }
}
