use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{SchedulerError, check_len};
use crate::grid::{CoreId, Grid};
use crate::hysteresis::ThermalThresholds;
use crate::placement::{GreedyPlacer, Placer};
use crate::snapshot::PerformanceSnapshot;

/// One unit of work for the placement layer. With `swap` set the
/// destination already runs a task and both workloads trade places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub from_core: CoreId,
    pub to_core: CoreId,
    pub swap: bool,
}

/// A policy that moves running tasks between cores
pub trait Migrator {
    /// Returns the migrations to apply, in order, for the interval at `now`.
    fn next_migrations(
        &mut self,
        now: Duration,
        snapshot: &impl PerformanceSnapshot,
        tasks: &[i32],
        active: &[bool],
    ) -> Result<Vec<MigrationRecord>, SchedulerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RotationConfig {
    pub start_interval: Duration,
    pub min_interval: Duration,
    pub increment_step: Duration,
    pub thermal: ThermalThresholds,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            start_interval: Duration::from_nanos(ROTATION_START_INTERVAL_NS),
            min_interval: Duration::from_nanos(ROTATION_MIN_INTERVAL_NS),
            increment_step: Duration::from_nanos(ROTATION_INCREMENT_STEP_NS),
            thermal: ThermalThresholds::default(),
        }
    }
}

/// Rotates the "hot edge" of every running task through its own cores.
///
/// Each tracked task group owns one master core in a FIFO queue. On every
/// pass a master hands over to the next active core of the same task, so
/// the heat of the busiest thread walks around the task's allocation. The
/// pass period shrinks while the chip runs above the critical temperature
/// and snaps back to its start value once it has recovered.
#[derive(Debug, Clone)]
pub struct MasterRotationMigrator {
    grid: Grid,
    config: RotationConfig,
    current_interval: Duration,
    last_migration: Duration,
    masters: VecDeque<CoreId>,
    total_masters: usize,
}

impl MasterRotationMigrator {
    pub fn new(grid: Grid, config: RotationConfig) -> Self {
        Self {
            grid,
            config,
            current_interval: config.start_interval,
            last_migration: Duration::ZERO,
            masters: VecDeque::from([0]),
            total_masters: 1,
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    pub fn last_migration(&self) -> Duration {
        self.last_migration
    }

    pub fn total_masters(&self) -> usize {
        self.total_masters
    }

    /// Masters in the order the next pass will visit them.
    pub fn masters(&self) -> impl Iterator<Item = CoreId> + '_ {
        self.masters.iter().copied()
    }

    fn adapt_interval(&mut self, peak: f64) {
        if peak > self.config.thermal.critical {
            let next = self
                .current_interval
                .saturating_sub(self.config.increment_step)
                .max(self.config.min_interval);
            if next != self.current_interval {
                tracing::info!(
                    "[hot-potato] decreasing rotation interval to {:?} due to thermal violation",
                    next
                );
            }
            self.current_interval = next;
        } else if peak <= self.config.thermal.recovered {
            if self.current_interval != self.config.start_interval {
                tracing::info!(
                    "[hot-potato] resuming rotation interval {:?} due to thermal recovery",
                    self.config.start_interval
                );
            }
            self.current_interval = self.config.start_interval;
        }
    }

    /// Grows or shrinks the master queue by one to follow the group count.
    fn adapt_masters(&mut self, groups: usize) {
        let cores = self.grid.core_count();
        if groups > self.total_masters {
            let first = self.masters.front().copied().unwrap_or(0);
            let master = (first + cores / groups) % cores;
            tracing::debug!("[hot-potato] new task group, synthesized master {}", master);
            self.total_masters += 1;
            self.masters.push_back(master);
        } else if groups < self.total_masters {
            // TODO: drops the oldest master, which is not necessarily the one
            // of the departed task; track masters per task id to fix.
            let dropped = self.masters.pop_front();
            tracing::debug!("[hot-potato] task group left, dropped master {:?}", dropped);
            self.total_masters -= 1;
        }
    }

    /// First active core after `master`, wrapping, that runs the same task.
    fn next_master(&self, master: CoreId, tasks: &[i32], active: &[bool]) -> CoreId {
        let cores = self.grid.core_count();
        (1..=cores)
            .map(|offset| (master + offset) % cores)
            .find(|&core| active[core] && tasks[core] == tasks[master])
            .unwrap_or(master)
    }
}

/// Number of contiguous runs of assigned cores, counting a run whenever the
/// task id changes from the left neighbour. Core 0 has no left neighbour,
/// so a task wrapping around it is counted twice.
pub fn count_task_groups(tasks: &[i32]) -> usize {
    let mut groups = 0;
    let mut previous = UNASSIGNED;
    for &task in tasks {
        if task != previous && task != UNASSIGNED {
            groups += 1;
        }
        previous = task;
    }
    groups
}

impl Migrator for MasterRotationMigrator {
    fn next_migrations(
        &mut self,
        now: Duration,
        snapshot: &impl PerformanceSnapshot,
        tasks: &[i32],
        active: &[bool],
    ) -> Result<Vec<MigrationRecord>, SchedulerError> {
        let cores = self.grid.core_count();
        check_len("snapshot", cores, snapshot.core_count())?;
        check_len("task assignment", cores, tasks.len())?;
        check_len("active mask", cores, active.len())?;

        if now.saturating_sub(self.last_migration) < self.current_interval {
            return Ok(Vec::new());
        }
        let peak = snapshot.peak_temperature();
        if !peak.is_finite() {
            return Err(SchedulerError::NonFiniteTemperature(peak));
        }

        self.last_migration = now;
        self.adapt_interval(peak);
        self.adapt_masters(count_task_groups(tasks));

        tracing::debug!("[hot-potato] number of masters is {}", self.masters.len());
        if self.masters.is_empty() {
            return Ok(Vec::new());
        }

        let mut migrations = Vec::with_capacity(self.total_masters);
        let mut dropped = 0;
        for _ in 0..self.total_masters {
            let Some(current) = self.masters.pop_front() else {
                break;
            };
            if !active[current] {
                tracing::debug!("[hot-potato] master {} is inactive, dropping it", current);
                dropped += 1;
                continue;
            }

            let next = self.next_master(current, tasks, active);
            self.masters.push_back(next);
            if next != current {
                tracing::debug!("[hot-potato] core {} migrate to core {}", current, next);
                migrations.push(MigrationRecord {
                    from_core: current,
                    to_core: next,
                    swap: tasks[next] != UNASSIGNED,
                });
            }
        }
        self.total_masters -= dropped;

        Ok(migrations)
    }
}

/// Placement and rotation policy in one configured object
#[derive(Debug, Clone)]
pub struct HotPotato {
    placer: GreedyPlacer,
    migrator: MasterRotationMigrator,
}

impl HotPotato {
    pub fn new(grid: Grid, config: RotationConfig) -> Self {
        Self {
            placer: GreedyPlacer,
            migrator: MasterRotationMigrator::new(grid, config),
        }
    }

    pub fn migrator(&self) -> &MasterRotationMigrator {
        &self.migrator
    }
}

impl Placer for HotPotato {
    fn place(&mut self, required: usize, available: &[bool]) -> Vec<CoreId> {
        self.placer.place(required, available)
    }
}

impl Migrator for HotPotato {
    fn next_migrations(
        &mut self,
        now: Duration,
        snapshot: &impl PerformanceSnapshot,
        tasks: &[i32],
        active: &[bool],
    ) -> Result<Vec<MigrationRecord>, SchedulerError> {
        self.migrator.next_migrations(now, snapshot, tasks, active)
    }
}
