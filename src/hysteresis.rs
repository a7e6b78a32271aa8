use serde::Serialize;

use crate::constants::{CRITICAL_TEMPERATURE_C, RECOVERED_TEMPERATURE_C};

/// Critical/recovery temperature pair; the gap between them is the
/// hysteresis band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThermalThresholds {
    // °C
    pub critical: f64,
    // °C, strictly below critical
    pub recovered: f64,
}

impl ThermalThresholds {
    pub fn new(critical: f64, recovered: f64) -> Self {
        Self {
            critical,
            recovered,
        }
    }
}

impl Default for ThermalThresholds {
    fn default() -> Self {
        Self::new(CRITICAL_TEMPERATURE_C, RECOVERED_TEMPERATURE_C)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThrottleState {
    #[default]
    Normal,
    Throttled,
}

impl ThrottleState {
    pub fn is_throttled(self) -> bool {
        self == ThrottleState::Throttled
    }
}

/// Normal/Throttled state machine driven by the chip peak temperature
#[derive(Debug, Clone)]
pub struct ThermalHysteresis {
    thresholds: ThermalThresholds,
    state: ThrottleState,
    // owner name, only used in log lines
    label: &'static str,
}

impl ThermalHysteresis {
    pub fn new(label: &'static str, thresholds: ThermalThresholds) -> Self {
        Self {
            thresholds,
            state: ThrottleState::Normal,
            label,
        }
    }

    pub fn thresholds(&self) -> ThermalThresholds {
        self.thresholds
    }

    pub fn state(&self) -> ThrottleState {
        self.state
    }

    pub fn is_throttled(&self) -> bool {
        self.state.is_throttled()
    }

    /// Feeds one peak temperature and returns the resulting state.
    ///
    /// Only a reading above `critical` throttles and only a reading below
    /// `recovered` releases; anything in between, NaN included, keeps the
    /// current state.
    pub fn observe(&mut self, peak_temperature: f64) -> ThrottleState {
        match self.state {
            ThrottleState::Normal if peak_temperature > self.thresholds.critical => {
                tracing::info!(
                    "[{}] thermal violation detected: {:.1} °C > {:.1} °C",
                    self.label,
                    peak_temperature,
                    self.thresholds.critical
                );
                self.state = ThrottleState::Throttled;
            }
            ThrottleState::Throttled if peak_temperature < self.thresholds.recovered => {
                tracing::info!(
                    "[{}] thermal violation ended: {:.1} °C < {:.1} °C",
                    self.label,
                    peak_temperature,
                    self.thresholds.recovered
                );
                self.state = ThrottleState::Normal;
            }
            _ => {}
        }
        self.state
    }
}
