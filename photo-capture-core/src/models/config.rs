use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// Hard cap on the number of captures a single session may hold.
pub const MAX_CAPTURES_PER_SESSION: usize = 250;

/// Maximum number of capture requests in flight at the same time.
pub const MAX_IN_FLIGHT_CAPTURES: usize = 2;

/// Advisory lower bound on captures per session. Never enforced.
pub const RECOMMENDED_MIN_CAPTURES: usize = 30;

/// Advisory upper bound on captures per session. Never enforced.
pub const RECOMMENDED_MAX_CAPTURES: usize = 200;

/// Interval used when switching to automatic mode without an explicit one.
pub const DEFAULT_AUTOMATIC_INTERVAL_SECS: f64 = 3.0;

/// Countdown refresh cadence of the automatic capture timer (30 Hz).
pub const AUTOMATIC_UPDATE_INTERVAL_SECS: f64 = 1.0 / 30.0;

/// Upper bound for any timer interval (one hour).
pub const MAX_INTERVAL_SECS: f64 = 3600.0;

/// Name of the directory that holds every session folder.
pub const CAPTURES_FOLDER_NAME: &str = "Captures";

/// Configuration for a capture session manager.
///
/// Defaults match the fixed limits above. Can be loaded from a JSON file;
/// missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Root location under which one folder per session is created.
    pub captures_root: PathBuf,

    /// Maximum captures in one session (default: 250).
    pub max_captures: usize,

    /// Maximum concurrent capture requests (default: 2).
    pub max_in_flight: usize,

    pub recommended_min_captures: usize,
    pub recommended_max_captures: usize,

    /// Interval used by `advance_to_next_mode` (default: 3.0 seconds).
    pub default_interval_secs: f64,

    /// Countdown update period of the automatic timer (default: 1/30 s).
    pub update_interval_secs: f64,
}

impl SessionConfig {
    pub fn with_root(captures_root: impl Into<PathBuf>) -> Self {
        Self {
            captures_root: captures_root.into(),
            ..Default::default()
        }
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let json = fs::read_to_string(path).map_err(|e| {
            SessionError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: SessionConfig = serde_json::from_str(&json)
            .map_err(|e| SessionError::ConfigurationFailed(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.max_captures == 0 {
            return Err(SessionError::ConfigurationFailed("max captures must be positive".into()));
        }
        if self.max_in_flight == 0 {
            return Err(SessionError::ConfigurationFailed("max in-flight captures must be positive".into()));
        }
        if self.recommended_min_captures > self.recommended_max_captures {
            return Err(SessionError::ConfigurationFailed(format!(
                "recommended range is inverted: {} > {}",
                self.recommended_min_captures, self.recommended_max_captures
            )));
        }
        check_interval_secs("automatic interval", self.default_interval_secs)?;
        check_interval_secs("update interval", self.update_interval_secs)?;
        Ok(())
    }

    /// Whether `count` falls inside the advisory capture range.
    pub fn is_within_recommended_range(&self, count: usize) -> bool {
        (self.recommended_min_captures..=self.recommended_max_captures).contains(&count)
    }
}

/// Timer intervals must be finite, positive and at most `MAX_INTERVAL_SECS`.
pub fn check_interval_secs(what: &str, secs: f64) -> Result<f64, SessionError> {
    if !secs.is_finite() || secs <= 0.0 || secs > MAX_INTERVAL_SECS {
        return Err(SessionError::ConfigurationFailed(format!(
            "{} must be in (0, {}] seconds: {}",
            what, MAX_INTERVAL_SECS, secs
        )));
    }
    Ok(secs)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            captures_root: PathBuf::from(CAPTURES_FOLDER_NAME),
            max_captures: MAX_CAPTURES_PER_SESSION,
            max_in_flight: MAX_IN_FLIGHT_CAPTURES,
            recommended_min_captures: RECOMMENDED_MIN_CAPTURES,
            recommended_max_captures: RECOMMENDED_MAX_CAPTURES,
            default_interval_secs: DEFAULT_AUTOMATIC_INTERVAL_SECS,
            update_interval_secs: AUTOMATIC_UPDATE_INTERVAL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_limits() {
        let config = SessionConfig::default();
        assert_eq!(config.max_captures, 250);
        assert_eq!(config.max_in_flight, 2);
        assert_eq!(config.default_interval_secs, 3.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn recommended_range_is_advisory() {
        let config = SessionConfig::default();
        assert!(!config.is_within_recommended_range(10));
        assert!(config.is_within_recommended_range(30));
        assert!(config.is_within_recommended_range(200));
        assert!(!config.is_within_recommended_range(201));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = SessionConfig {
            default_interval_secs: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SessionError::ConfigurationFailed(_))));

        let config = SessionConfig {
            recommended_min_captures: 300,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            max_in_flight: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{ "captures_root": "/tmp/shots", "max_captures": 40 }"#).unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.captures_root, PathBuf::from("/tmp/shots"));
        assert_eq!(config.max_captures, 40);
        assert_eq!(config.max_in_flight, MAX_IN_FLIGHT_CAPTURES);
    }

    #[test]
    fn intervals_must_be_finite_and_bounded() {
        for secs in [f64::INFINITY, f64::NAN, -1.0, 1e20, MAX_INTERVAL_SECS + 1.0] {
            let config = SessionConfig {
                update_interval_secs: secs,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(SessionError::ConfigurationFailed(_))), "{}", secs);

            let config = SessionConfig {
                default_interval_secs: secs,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(SessionError::ConfigurationFailed(_))), "{}", secs);
        }
        assert_eq!(check_interval_secs("interval", MAX_INTERVAL_SECS), Ok(MAX_INTERVAL_SECS));
    }

    #[test]
    fn load_rejects_huge_update_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{ "update_interval_secs": 1e20 }"#).unwrap();

        assert!(matches!(
            SessionConfig::load(&path),
            Err(SessionError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            SessionConfig::load(&path),
            Err(SessionError::ConfigurationFailed(_))
        ));
    }
}
