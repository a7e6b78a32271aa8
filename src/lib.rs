// Public modules
pub mod config;
pub mod driver;
pub mod dvfs;
pub mod error;
pub mod grid;
pub mod hot_potato;
pub mod hysteresis;
pub mod placement;
pub mod snapshot;

pub use dvfs::{DvfsGovernor, DvfsPolicy, GovernorConfig};
pub use error::{ConfigError, SchedulerError};
pub use grid::{CoreId, Grid};
pub use hot_potato::{HotPotato, MasterRotationMigrator, MigrationRecord, Migrator, RotationConfig};
pub use hysteresis::{ThermalHysteresis, ThermalThresholds, ThrottleState};
pub use placement::{GreedyPlacer, Placer};
pub use snapshot::{CoreReading, PerformanceSnapshot, Snapshot};

// Re-export constants commonly used
pub mod constants {
    /// Task id of a core that runs nothing.
    pub const UNASSIGNED: i32 = -1;

    pub const DEFAULT_ROWS: usize = 4;
    pub const DEFAULT_COLUMNS: usize = 4;

    pub const MIN_FREQ_MHZ: u32 = 1000;
    pub const MAX_FREQ_MHZ: u32 = 4000;
    // GHz
    pub const FREQ_STEP_GHZ: f64 = 0.1;

    pub const UP_THRESHOLD: f64 = 0.8;
    pub const DOWN_THRESHOLD: f64 = 0.3;

    pub const CRITICAL_TEMPERATURE_C: f64 = 80.0;
    pub const RECOVERED_TEMPERATURE_C: f64 = 78.0;

    // ns
    pub const ROTATION_START_INTERVAL_NS: u64 = 1_000_000;
    pub const ROTATION_MIN_INTERVAL_NS: u64 = 100_000;
    pub const ROTATION_INCREMENT_STEP_NS: u64 = 100_000;
}
