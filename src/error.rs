use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by mining, merging and compression.
///
/// Everything except [`Error::Config`] and [`Error::ThreadPool`] signals a broken
/// structural invariant: the computation that hit it is aborted rather than patched.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A group-end was found with no open group.
    #[error("unmatched group end at position {position}")]
    UnmatchedGroupEnd { position: usize },

    /// A linear sequence ended with groups still open.
    #[error("{open} group(s) left open at end of linear sequence")]
    UnclosedGroup { open: usize },

    /// A group-begin was emitted during a merge with no group-end to close.
    #[error("unmatched group begin at position {position}")]
    UnmatchedGroupBegin { position: usize },

    /// Border management was invoked on a sequence that does not end in a border.
    #[error("border management expected a group border, found {found}")]
    BorderExpected { found: String },

    /// An episode pattern has no events.
    #[error("episode pattern is empty")]
    EmptyPattern,

    /// The worker pool used for parallel overlap resolution could not be built.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    /// Text form could not be parsed.
    #[error("parse error at {position}: {reason}")]
    Parse { position: usize, reason: String },
}

/// Configuration range violations, reported when a [`Config`](crate::Config) is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `k` must retain at least one episode.
    #[error("k must be positive")]
    ZeroK,

    /// A weight was outside `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },

    /// The gap ratio was negative or not finite.
    #[error("gap_ratio must be a finite non-negative number, got {0}")]
    InvalidGapRatio(f64),

    /// The worker pool must have at least one thread.
    #[error("workers must be positive")]
    ZeroWorkers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: Error = ConfigError::ZeroK.into();
        assert!(matches!(err, Error::Config(ConfigError::ZeroK)));
        assert_eq!(err.to_string(), "k must be positive");
    }

    #[test]
    fn test_messages_carry_context() {
        let err = Error::UnmatchedGroupEnd { position: 7 };
        assert_eq!(err.to_string(), "unmatched group end at position 7");

        let err = ConfigError::WeightOutOfRange {
            name: "weight_support",
            value: 1.5,
        };
        assert!(err.to_string().contains("weight_support"));
    }
}
