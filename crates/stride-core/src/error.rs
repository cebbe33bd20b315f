//! Error types for Stride

use thiserror::Error;

/// The main error type for Stride operations
#[derive(Debug, Error)]
pub enum StrideError {
    #[error("Invalid step rate: expected a finite rate above 0 Hz, got {0}")]
    InvalidStepRate(f64),

    #[error("Invalid delay clamp: expected a finite bound above 0 ms, got {0}")]
    InvalidDelayClamp(f64),

    /// A step function failed. The cycle that ran it is abandoned.
    #[error(transparent)]
    Step(#[from] anyhow::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for Stride operations
pub type Result<T> = std::result::Result<T, StrideError>;

impl From<toml::de::Error> for StrideError {
    fn from(err: toml::de::Error) -> Self {
        StrideError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for StrideError {
    fn from(err: toml::ser::Error) -> Self {
        StrideError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_is_transparent() {
        let err: StrideError = anyhow::anyhow!("physics exploded").into();
        assert_eq!(err.to_string(), "physics exploded");
        assert!(matches!(err, StrideError::Step(_)));
    }

    #[test]
    fn toml_errors_become_config_errors() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("= broken");
        let err: StrideError = parsed.unwrap_err().into();
        assert!(matches!(err, StrideError::Config(_)));
    }
}
