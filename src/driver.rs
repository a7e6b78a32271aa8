//! Trace replay standing in for the simulator.
//!
//! The driver owns the authoritative task map: it admits and retires tasks,
//! asks both policies for their decision and applies the migrations in the
//! order they were returned.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::constants::UNASSIGNED;
use crate::dvfs::{DvfsGovernor, DvfsPolicy};
use crate::error::{SchedulerError, check_len};
use crate::grid::Grid;
use crate::hot_potato::{HotPotato, MigrationRecord, Migrator};
use crate::placement::Placer;
use crate::snapshot::{PerformanceSnapshot, Snapshot};

/// A task asking for cores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    pub task: i32,
    pub cores: usize,
}

/// One interval of the input trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub time_ns: u64,
    pub cores: Snapshot,
    /// Defaults to the cores that run a task.
    #[serde(default)]
    pub active: Option<Vec<bool>>,
    /// Replaces the driver's task map when present.
    #[serde(default)]
    pub tasks: Option<Vec<i32>>,
    #[serde(default)]
    pub departures: Vec<i32>,
    #[serde(default)]
    pub arrivals: Vec<Arrival>,
}

/// What the policies decided for one interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub time_ns: u64,
    pub frequencies: Vec<u32>,
    pub migrations: Vec<MigrationRecord>,
    /// Arrivals that did not fit on the free cores.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<i32>,
}

pub struct Driver {
    grid: Grid,
    governor: DvfsGovernor,
    hot_potato: HotPotato,
    tasks: Vec<i32>,
}

impl Driver {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            grid: config.grid,
            governor: DvfsGovernor::new(config.grid, config.dvfs),
            hot_potato: HotPotato::new(config.grid, config.rotation),
            tasks: vec![UNASSIGNED; config.grid.core_count()],
        }
    }

    pub fn tasks(&self) -> &[i32] {
        &self.tasks
    }

    pub fn hot_potato(&self) -> &HotPotato {
        &self.hot_potato
    }

    /// Places `arrival` on free cores; false when there are not enough.
    pub fn admit(&mut self, arrival: Arrival) -> bool {
        let available: Vec<bool> = self.tasks.iter().map(|&t| t == UNASSIGNED).collect();
        let cores = self.hot_potato.place(arrival.cores, &available);
        if cores.len() < arrival.cores {
            tracing::warn!(
                "task {} needs {} cores, only {} free",
                arrival.task,
                arrival.cores,
                cores.len()
            );
            return false;
        }
        tracing::info!("task {} placed on cores {:?}", arrival.task, cores);
        for core in cores {
            self.tasks[core] = arrival.task;
        }
        true
    }

    pub fn retire(&mut self, task: i32) {
        for slot in self.tasks.iter_mut().filter(|t| **t == task) {
            *slot = UNASSIGNED;
        }
    }

    /// Applies migrations in order: a swap exchanges both tasks, a move
    /// leaves the source core unassigned.
    pub fn apply(&mut self, migrations: &[MigrationRecord]) -> Result<(), SchedulerError> {
        for m in migrations {
            self.grid.check_core(m.from_core)?;
            self.grid.check_core(m.to_core)?;
            if m.swap {
                self.tasks.swap(m.from_core, m.to_core);
            } else {
                self.tasks[m.to_core] = self.tasks[m.from_core];
                self.tasks[m.from_core] = UNASSIGNED;
            }
        }
        Ok(())
    }

    /// Rejects a frame the policies would refuse, before anything changes.
    fn check_frame(&self, frame: &TraceFrame) -> Result<(), SchedulerError> {
        let cores = self.grid.core_count();
        check_len("snapshot", cores, frame.cores.core_count())?;
        if let Some(active) = &frame.active {
            check_len("active mask", cores, active.len())?;
        }
        if let Some(tasks) = &frame.tasks {
            check_len("task assignment", cores, tasks.len())?;
        }
        let peak = frame.cores.peak_temperature();
        if !peak.is_finite() {
            return Err(SchedulerError::NonFiniteTemperature(peak));
        }
        Ok(())
    }

    /// Runs one interval. A frame that fails validation leaves the task map
    /// and both policies untouched.
    pub fn step(&mut self, frame: &TraceFrame) -> Result<Decision, SchedulerError> {
        self.check_frame(frame)?;
        if let Some(tasks) = &frame.tasks {
            self.tasks.clone_from(tasks);
        }
        for &task in &frame.departures {
            self.retire(task);
        }
        let rejected = frame
            .arrivals
            .iter()
            .filter(|&&arrival| !self.admit(arrival))
            .map(|arrival| arrival.task)
            .collect();

        let active = match &frame.active {
            Some(active) => active.clone(),
            None => self.tasks.iter().map(|&t| t != UNASSIGNED).collect(),
        };
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                "temperatures of active cores:\n{}",
                self.grid.render_temperatures(&frame.cores, &active)
            );
        }

        let frequencies = self.governor.next_frequencies(&frame.cores, &active)?;
        let now = Duration::from_nanos(frame.time_ns);
        let migrations = self
            .hot_potato
            .next_migrations(now, &frame.cores, &self.tasks, &active)?;
        self.apply(&migrations)?;

        Ok(Decision {
            time_ns: frame.time_ns,
            frequencies,
            migrations,
            rejected,
        })
    }
}
