use serde::Serialize;

use crate::constants::*;
use crate::error::{SchedulerError, check_len};
use crate::grid::Grid;
use crate::hysteresis::{ThermalHysteresis, ThermalThresholds};
use crate::snapshot::PerformanceSnapshot;

/// A policy that picks the next per-core frequencies once per interval
pub trait DvfsPolicy {
    /// Returns one frequency (MHz) per core.
    fn next_frequencies(
        &mut self,
        snapshot: &impl PerformanceSnapshot,
        active: &[bool],
    ) -> Result<Vec<u32>, SchedulerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GovernorConfig {
    // MHz
    pub min_frequency: u32,
    // MHz
    pub max_frequency: u32,
    // GHz
    pub frequency_step: f64,
    // utilization fraction
    pub up_threshold: f64,
    // utilization fraction
    pub down_threshold: f64,
    pub thermal: ThermalThresholds,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_frequency: MIN_FREQ_MHZ,
            max_frequency: MAX_FREQ_MHZ,
            frequency_step: FREQ_STEP_GHZ,
            up_threshold: UP_THRESHOLD,
            down_threshold: DOWN_THRESHOLD,
            thermal: ThermalThresholds::default(),
        }
    }
}

/// Thermally gated gradient governor.
///
/// While the chip is throttled every core runs at the minimum frequency.
/// Otherwise each active core follows a gradient law: busy cores move by
/// `100 * (recovered - temperature)` MHz, capped at one frequency step
/// upwards and amplified fourfold downwards, idle cores halve their
/// frequency, and everything in between stays put.
#[derive(Debug, Clone)]
pub struct DvfsGovernor {
    grid: Grid,
    config: GovernorConfig,
    // MHz
    freq_step: i64,
    hysteresis: ThermalHysteresis,
}

impl DvfsGovernor {
    pub fn new(grid: Grid, config: GovernorConfig) -> Self {
        let freq_step = (1000.0 * config.frequency_step).round() as i64;
        tracing::debug!(
            "[dvfs] initialized for {}x{} cores, step {} MHz",
            grid.rows,
            grid.columns,
            freq_step
        );
        Self {
            grid,
            config,
            freq_step,
            hysteresis: ThermalHysteresis::new("dvfs", config.thermal),
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    pub fn hysteresis(&self) -> &ThermalHysteresis {
        &self.hysteresis
    }

    pub fn frequency_step_mhz(&self) -> i64 {
        self.freq_step
    }

    /// Gradient law for one active core.
    fn scale(&self, frequency: u32, temperature: f64, utilization: f64) -> u32 {
        let min = i64::from(self.config.min_frequency);
        let max = i64::from(self.config.max_frequency);
        let mut frequency = i64::from(frequency);

        if utilization > self.config.up_threshold {
            let mut change = (100.0 * (self.config.thermal.recovered - temperature)).round() as i64;
            if change < 0 {
                // already warmer than the recovery line: back off hard
                change *= 4;
            } else if change > self.freq_step {
                change = self.freq_step;
            }
            frequency = (frequency + change).min(max);
        } else if utilization < self.config.down_threshold {
            if frequency == min {
                tracing::trace!("[dvfs] utilization < down threshold but already at min frequency");
            } else {
                frequency = (frequency / 2).max(min);
            }
        }

        frequency.clamp(min, max) as u32
    }
}

impl DvfsPolicy for DvfsGovernor {
    fn next_frequencies(
        &mut self,
        snapshot: &impl PerformanceSnapshot,
        active: &[bool],
    ) -> Result<Vec<u32>, SchedulerError> {
        let cores = self.grid.core_count();
        check_len("snapshot", cores, snapshot.core_count())?;
        check_len("active mask", cores, active.len())?;
        let peak = snapshot.peak_temperature();
        if !peak.is_finite() {
            return Err(SchedulerError::NonFiniteTemperature(peak));
        }

        if self.hysteresis.observe(peak).is_throttled() {
            tracing::debug!("[dvfs] in throttle mode -> return min. frequencies");
            return Ok(vec![self.config.min_frequency; cores]);
        }

        let frequencies = (0..cores)
            .map(|core| {
                if !active[core] {
                    return self.config.min_frequency;
                }
                let frequency = snapshot.frequency(core);
                let temperature = snapshot.temperature(core);
                let utilization = snapshot.utilization(core);
                let next = self.scale(frequency, temperature, utilization);
                tracing::debug!(
                    "[dvfs] core {:2}: P={:.3} W f={} MHz T={:.1} C utilization={:.3} -> {} MHz",
                    core,
                    snapshot.power(core),
                    frequency,
                    temperature,
                    utilization,
                    next
                );
                next
            })
            .collect();
        Ok(frequencies)
    }
}
