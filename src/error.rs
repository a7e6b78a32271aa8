use thiserror::Error;

/// Precondition violations raised by the policies.
///
/// All of them point at a misconfigured driver; a policy that returns one
/// has not changed any of its state.
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("{what} has {actual} entries, expected one per core ({expected})")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("core {core} is outside the {cores}-core grid")]
    CoreOutOfRange { core: usize, cores: usize },

    #[error("peak temperature {0} is not a finite reading")]
    NonFiniteTemperature(f64),
}

/// Errors raised while loading the scheduler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Checks that a per-core vector has exactly `expected` entries.
pub(crate) fn check_len(
    what: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), SchedulerError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SchedulerError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}
