use serde::{Deserialize, Serialize};

/// Readings of a single core for one scheduling interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreReading {
    // MHz
    pub frequency: u32,
    // W
    pub power: f64,
    // °C
    pub temperature: f64,
    // fraction of the interval spent busy, 0.0-1.0
    pub utilization: f64,
}

impl CoreReading {
    pub fn new(frequency: u32, power: f64, temperature: f64, utilization: f64) -> Self {
        Self {
            frequency,
            power,
            temperature,
            utilization,
        }
    }
}

/// Read-only view of the sensors for one interval.
///
/// Core indices must be below [`core_count`](Self::core_count); the policies
/// check the count against their grid before reading anything.
pub trait PerformanceSnapshot {
    fn core_count(&self) -> usize;
    fn frequency(&self, core: usize) -> u32;
    fn power(&self, core: usize) -> f64;
    fn temperature(&self, core: usize) -> f64;
    fn utilization(&self, core: usize) -> f64;

    /// Hottest reading over every core, active or not. A NaN reading wins
    /// so that a faulty sensor cannot hide behind a healthy one.
    fn peak_temperature(&self) -> f64 {
        (0..self.core_count())
            .map(|core| self.temperature(core))
            .fold(f64::NEG_INFINITY, |peak, t| {
                if t.is_nan() || t > peak { t } else { peak }
            })
    }
}

/// Owned snapshot backed by one [`CoreReading`] per core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub cores: Vec<CoreReading>,
}

impl Snapshot {
    pub fn new(cores: Vec<CoreReading>) -> Self {
        Self { cores }
    }

    /// Every core at the same frequency, temperature and utilization.
    pub fn uniform(count: usize, frequency: u32, temperature: f64, utilization: f64) -> Self {
        Self::new(vec![
            CoreReading::new(frequency, 0.0, temperature, utilization);
            count
        ])
    }
}

impl PerformanceSnapshot for Snapshot {
    fn core_count(&self) -> usize {
        self.cores.len()
    }

    fn frequency(&self, core: usize) -> u32 {
        self.cores[core].frequency
    }

    fn power(&self, core: usize) -> f64 {
        self.cores[core].power
    }

    fn temperature(&self, core: usize) -> f64 {
        self.cores[core].temperature
    }

    fn utilization(&self, core: usize) -> f64 {
        self.cores[core].utilization
    }
}
