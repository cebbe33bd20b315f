//! Loop options
//!
//! Options can be built in code or read from a TOML table such as:
//!
//! ```toml
//! delay_clamp_ms = 250.0
//! ```

use crate::{Result, StrideError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Backlog ceiling used when no clamp is configured.
pub const DEFAULT_DELAY_CLAMP_MS: f64 = 200.0;

/// Tunables for a fixed-step loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopOptions {
    /// Upper bound on unprocessed wall-clock time (ms) carried between
    /// cycles. Anything above it is discarded and reported.
    #[serde(default = "default_delay_clamp_ms")]
    pub delay_clamp_ms: f64,
}

fn default_delay_clamp_ms() -> f64 {
    DEFAULT_DELAY_CLAMP_MS
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            delay_clamp_ms: default_delay_clamp_ms(),
        }
    }
}

impl LoopOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style override of the delay clamp
    pub fn with_delay_clamp_ms(mut self, delay_clamp_ms: f64) -> Self {
        self.delay_clamp_ms = delay_clamp_ms;
        self
    }

    /// Reject values that would make the clamp meaningless
    pub fn validate(&self) -> Result<()> {
        if !self.delay_clamp_ms.is_finite() || self.delay_clamp_ms <= 0.0 {
            return Err(StrideError::InvalidDelayClamp(self.delay_clamp_ms));
        }
        Ok(())
    }

    /// Parse options from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: LoopOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize options to pretty TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_200ms() {
        let options = LoopOptions::default();
        assert_eq!(options.delay_clamp_ms, 200.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let options = LoopOptions::from_toml_str("").unwrap();
        assert_eq!(options, LoopOptions::default());
    }

    #[test]
    fn parses_clamp_from_toml() {
        let options = LoopOptions::from_toml_str("delay_clamp_ms = 30.0").unwrap();
        assert_eq!(options.delay_clamp_ms, 30.0);
    }

    #[test]
    fn rejects_negative_clamp() {
        let err = LoopOptions::from_toml_str("delay_clamp_ms = -5.0").unwrap_err();
        assert!(matches!(err, StrideError::InvalidDelayClamp(v) if v == -5.0));
    }

    #[test]
    fn rejects_zero_and_nan_clamp() {
        assert!(LoopOptions::new().with_delay_clamp_ms(0.0).validate().is_err());
        assert!(LoopOptions::new()
            .with_delay_clamp_ms(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn toml_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!(
            "stride-options-{}.toml",
            std::process::id()
        ));
        let options = LoopOptions::new().with_delay_clamp_ms(125.0);
        std::fs::write(&path, options.to_toml_string().unwrap()).unwrap();

        let loaded = LoopOptions::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, options);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LoopOptions::load_from_file(Path::new("/nonexistent/stride.toml")).unwrap_err();
        assert!(matches!(err, StrideError::IoError(_)));
    }
}
