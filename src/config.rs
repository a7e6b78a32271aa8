use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use toml::{Table, Value};

use crate::constants::*;
use crate::dvfs::GovernorConfig;
use crate::error::ConfigError;
use crate::grid::Grid;
use crate::hot_potato::RotationConfig;
use crate::hysteresis::ThermalThresholds;

/// Everything the scheduler needs at construction, immutable afterwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchedulerConfig {
    pub grid: Grid,
    pub dvfs: GovernorConfig,
    pub rotation: RotationConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            grid: Grid::new(DEFAULT_ROWS, DEFAULT_COLUMNS),
            dvfs: GovernorConfig::default(),
            rotation: RotationConfig::default(),
        }
    }
}

/// `$XDG_CONFIG_HOME/hot-potato-governor/config.toml`, or `/etc` without one
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("/etc"));
    path.push("hot-potato-governor");
    path.push("config.toml");
    path
}

fn section<'a>(table: Option<&'a Table>, key: &str) -> Option<&'a Table> {
    table.and_then(|t| t.get(key)).and_then(|t| t.as_table())
}

fn number(v: &Value) -> Result<f64, &'static str> {
    v.as_float()
        .or_else(|| v.as_integer().map(|v| v as f64))
        .ok_or("must be a number")
}

fn positive_integer(table: Option<&Table>, key: &str) -> Result<u64, &'static str> {
    table
        .and_then(|t| t.get(key))
        .ok_or("is missing")
        .and_then(|v| v.as_integer().ok_or("must be an integer"))
        .and_then(|v| v.is_positive().then_some(v).ok_or("must be positive"))
        .map(|v| v as u64)
}

/// Missing or malformed falls back to `default`; zero or negative is an error.
fn grid_dimension(table: Option<&Table>, key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = table
        .and_then(|t| t.get(key))
        .ok_or("is missing")
        .and_then(|v| v.as_integer().ok_or("must be an integer"));
    match value {
        Ok(v) if v > 0 => Ok(v as usize),
        Ok(v) => Err(ConfigError::Invalid(format!(
            "grid.{key} ({v}) must be positive"
        ))),
        Err(s) => {
            tracing::warn!("grid.{key} {s}, replaced with the default of {default}");
            Ok(default)
        }
    }
}

fn temperature(table: Option<&Table>, key: &str) -> Result<f64, &'static str> {
    table
        .and_then(|t| t.get(key))
        .ok_or("is missing")
        .and_then(number)
        .and_then(|v| v.is_finite().then_some(v).ok_or("must be finite"))
}

fn thermal(
    table: Option<&Table>,
    prefix: &str,
) -> Result<ThermalThresholds, ConfigError> {
    let critical = temperature(table, "critical").unwrap_or_else(|s| {
        tracing::warn!(
            "{prefix}.critical {s}, replaced with the default value of {CRITICAL_TEMPERATURE_C} °C"
        );
        CRITICAL_TEMPERATURE_C
    });
    let recovered = temperature(table, "recovered").unwrap_or_else(|s| {
        let fallback = critical - (CRITICAL_TEMPERATURE_C - RECOVERED_TEMPERATURE_C);
        tracing::warn!(
            "{prefix}.recovered {s}, replaced with the default value of {fallback} °C"
        );
        fallback
    });
    if recovered >= critical {
        return Err(ConfigError::Invalid(format!(
            "{prefix}.recovered ({recovered} °C) must be below {prefix}.critical ({critical} °C)"
        )));
    }
    Ok(ThermalThresholds::new(critical, recovered))
}

impl FromStr for SchedulerConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Self::from_table(&content.parse::<Table>()?)
    }
}

impl SchedulerConfig {
    /// Loads `path`, or the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!("{} not found, using defaults", path.display());
            return Self::from_table(&Table::new());
        }
        std::fs::read_to_string(path)?.parse()
    }

    /// Resolves every key, falling back to its default with a warning when it
    /// is missing or malformed. Inconsistent combinations are errors.
    pub fn from_table(config: &Table) -> Result<Self, ConfigError> {
        let grid = section(Some(config), "grid");
        let rows = grid_dimension(grid, "rows", DEFAULT_ROWS)?;
        let columns = grid_dimension(grid, "columns", DEFAULT_COLUMNS)?;

        let dvfs = section(Some(config), "dvfs");
        // MHz
        let min_frequency = positive_integer(dvfs, "min-frequency")
            .and_then(|v| u32::try_from(v).map_err(|_| "cannot exceed u32::MAX"))
            .unwrap_or_else(|s| {
                tracing::warn!(
                    "dvfs.min-frequency {s}, replaced with the default of {MIN_FREQ_MHZ} MHz"
                );
                MIN_FREQ_MHZ
            });
        // MHz
        let max_frequency = positive_integer(dvfs, "max-frequency")
            .and_then(|v| u32::try_from(v).map_err(|_| "cannot exceed u32::MAX"))
            .unwrap_or_else(|s| {
                tracing::warn!(
                    "dvfs.max-frequency {s}, replaced with the default of {MAX_FREQ_MHZ} MHz"
                );
                MAX_FREQ_MHZ
            });
        if min_frequency > max_frequency {
            return Err(ConfigError::Invalid(format!(
                "dvfs.min-frequency ({min_frequency} MHz) is above dvfs.max-frequency ({max_frequency} MHz)"
            )));
        }
        // GHz
        let frequency_step = dvfs
            .and_then(|t| t.get("frequency-step"))
            .ok_or("is missing")
            .and_then(number)
            .and_then(|v| (v.is_finite() && v > 0.0).then_some(v).ok_or("must be positive"))
            .unwrap_or_else(|s| {
                tracing::warn!(
                    "dvfs.frequency-step {s}, replaced with the default of {FREQ_STEP_GHZ} GHz"
                );
                FREQ_STEP_GHZ
            });
        // fraction (0-1)
        let up_threshold = dvfs
            .and_then(|t| t.get("up-threshold"))
            .ok_or("is missing")
            .and_then(number)
            .and_then(|v| {
                (0.0..=1.0)
                    .contains(&v)
                    .then_some(v)
                    .ok_or("must be between 0 and 1")
            })
            .unwrap_or_else(|s| {
                tracing::warn!(
                    "dvfs.up-threshold {s}, replaced with the default value of {UP_THRESHOLD}"
                );
                UP_THRESHOLD
            });
        // fraction (0-1)
        let down_threshold = dvfs
            .and_then(|t| t.get("down-threshold"))
            .ok_or("is missing")
            .and_then(number)
            .and_then(|v| {
                (0.0..=1.0)
                    .contains(&v)
                    .then_some(v)
                    .ok_or("must be between 0 and 1")
            })
            .unwrap_or_else(|s| {
                tracing::warn!(
                    "dvfs.down-threshold {s}, replaced with the default value of {DOWN_THRESHOLD}"
                );
                DOWN_THRESHOLD
            });
        let down_threshold = if down_threshold > up_threshold {
            tracing::warn!("dvfs.down-threshold can't be greater than dvfs.up-threshold, clamping");
            up_threshold
        } else {
            down_threshold
        };
        let dvfs_thermal = thermal(section(dvfs, "thermal"), "dvfs.thermal")?;

        let hot_potato = section(Some(config), "hot-potato");
        let rotation = section(hot_potato, "rotation");
        // ns
        let start_interval = positive_integer(rotation, "start-interval").unwrap_or_else(|s| {
            tracing::warn!(
                "hot-potato.rotation.start-interval {s}, replaced with the default of \
                {ROTATION_START_INTERVAL_NS} ns"
            );
            ROTATION_START_INTERVAL_NS
        });
        // ns
        let min_interval = positive_integer(rotation, "min-interval")
            .and_then(|v| {
                (v <= start_interval)
                    .then_some(v)
                    .ok_or("must not exceed hot-potato.rotation.start-interval")
            })
            .unwrap_or_else(|s| {
                tracing::warn!(
                    "hot-potato.rotation.min-interval {s}, replaced with \
                    hot-potato.rotation.start-interval / 10"
                );
                (start_interval / 10).max(1)
            });
        // ns
        let increment_step = positive_integer(rotation, "increment-step").unwrap_or_else(|s| {
            tracing::warn!(
                "hot-potato.rotation.increment-step {s}, replaced with \
                hot-potato.rotation.min-interval"
            );
            min_interval
        });
        let rotation_thermal = thermal(section(hot_potato, "thermal"), "hot-potato.thermal")?;

        Ok(Self {
            grid: Grid::new(rows, columns),
            dvfs: GovernorConfig {
                min_frequency,
                max_frequency,
                frequency_step,
                up_threshold,
                down_threshold,
                thermal: dvfs_thermal,
            },
            rotation: RotationConfig {
                start_interval: Duration::from_nanos(start_interval),
                min_interval: Duration::from_nanos(min_interval),
                increment_step: Duration::from_nanos(increment_step),
                thermal: rotation_thermal,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SchedulerConfig::from_str("").unwrap();
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = SchedulerConfig::from_str(
            r#"
            [grid]
            rows = 2
            columns = 8

            [dvfs]
            min-frequency = 500
            max-frequency = 3500
            frequency-step = 0.25
            up-threshold = 0.7
            down-threshold = 0.2

            [dvfs.thermal]
            critical = 85
            recovered = 80.5

            [hot-potato.thermal]
            critical = 75.0
            recovered = 70.0

            [hot-potato.rotation]
            start-interval = 2000000
            min-interval = 500000
            increment-step = 250000
            "#,
        )
        .unwrap();
        assert_eq!(config.grid.core_count(), 16);
        assert_eq!(config.dvfs.min_frequency, 500);
        assert_eq!(config.dvfs.max_frequency, 3500);
        assert_eq!(config.dvfs.frequency_step, 0.25);
        assert_eq!(config.dvfs.down_threshold, 0.2);
        assert_eq!(config.dvfs.thermal, ThermalThresholds::new(85.0, 80.5));
        assert_eq!(config.rotation.thermal, ThermalThresholds::new(75.0, 70.0));
        assert_eq!(config.rotation.start_interval, Duration::from_millis(2));
        assert_eq!(config.rotation.min_interval, Duration::from_micros(500));
        assert_eq!(config.rotation.increment_step, Duration::from_micros(250));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = SchedulerConfig::from_str(
            r#"
            [grid]
            columns = "four"

            [dvfs]
            up-threshold = 1.5
            down-threshold = 0.9

            [hot-potato.rotation]
            start-interval = 1000
            min-interval = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.grid, Grid::new(DEFAULT_ROWS, DEFAULT_COLUMNS));
        assert_eq!(config.dvfs.up_threshold, UP_THRESHOLD);
        // clamped to the upper threshold
        assert_eq!(config.dvfs.down_threshold, UP_THRESHOLD);
        assert_eq!(config.rotation.min_interval, Duration::from_nanos(100));
        assert_eq!(config.rotation.increment_step, Duration::from_nanos(100));
    }

    #[test]
    fn test_empty_grid_rejected() {
        for content in ["[grid]\nrows = 0", "[grid]\ncolumns = -2"] {
            let err = SchedulerConfig::from_str(content).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
        }
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = SchedulerConfig::from_str(
            r#"
            [hot-potato.thermal]
            critical = 70
            recovered = 75
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_inverted_frequencies_rejected() {
        let err = SchedulerConfig::from_str(
            r#"
            [dvfs]
            min-frequency = 3000
            max-frequency = 2000
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SchedulerConfig::from_str("[grid"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = SchedulerConfig::load(Path::new("/nonexistent/hot-potato.toml")).unwrap();
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn test_default_path() {
        assert!(default_config_path().ends_with("hot-potato-governor/config.toml"));
    }
}
