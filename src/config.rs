//! Analysis configuration
//!
//! Every constant the pipeline depends on (sampling rate, contact distance,
//! filter window, tag cycle) is carried here instead of being embedded in the
//! stages. Configurations can be loaded from JSON; missing fields fall back to
//! the defaults.

use crate::error::AnalysisError;
use crate::reconciler::CyclePattern;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default ranging sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 10.0;

/// Default distance below which two tags are in contact (meters)
pub const DEFAULT_CONTACT_THRESHOLD_M: f64 = 1.5;

/// Default moving average window (samples)
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// How a distance is compared against the contact threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdComparison {
    /// `distance < threshold`
    Exclusive,
    /// `distance <= threshold`
    Inclusive,
}

impl ThresholdComparison {
    pub fn is_within(&self, distance: f64, threshold: f64) -> bool {
        match self {
            ThresholdComparison::Exclusive => distance < threshold,
            ThresholdComparison::Inclusive => distance <= threshold,
        }
    }
}

/// Configuration shared by all pipeline stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Expected tags and the order in which the logger cycles through them
    pub cycle: CyclePattern,
    /// Ranging sample rate used to convert sample counts to seconds
    pub sample_rate_hz: f64,
    /// Contact distance (meters)
    pub contact_threshold_m: f64,
    /// Reference distance for the cross-validation percentage (meters)
    pub nominal_threshold_m: f64,
    /// Moving average window for position smoothing (samples)
    pub window_size: usize,
    /// Predicate used to open and close contact intervals
    pub segment_comparison: ThresholdComparison,
    /// Predicate used to select contact records
    pub record_comparison: ThresholdComparison,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cycle: CyclePattern::alphabetical(["A", "B"]),
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            contact_threshold_m: DEFAULT_CONTACT_THRESHOLD_M,
            nominal_threshold_m: DEFAULT_CONTACT_THRESHOLD_M,
            window_size: DEFAULT_WINDOW_SIZE,
            segment_comparison: ThresholdComparison::Exclusive,
            record_comparison: ThresholdComparison::Inclusive,
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        if !path.exists() {
            return Err(AnalysisError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_cycle(mut self, cycle: CyclePattern) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate_hz: f64) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    pub fn with_contact_threshold(mut self, threshold_m: f64) -> Self {
        self.contact_threshold_m = threshold_m;
        self
    }

    pub fn with_nominal_threshold(mut self, threshold_m: f64) -> Self {
        self.nominal_threshold_m = threshold_m;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if !(self.contact_threshold_m.is_finite() && self.contact_threshold_m > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "contact threshold must be positive, got {}",
                self.contact_threshold_m
            )));
        }
        if !(self.nominal_threshold_m.is_finite() && self.nominal_threshold_m > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "nominal threshold must be positive, got {}",
                self.nominal_threshold_m
            )));
        }
        if self.window_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }
        self.cycle.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.sample_rate_hz, 10.0);
        assert_eq!(config.contact_threshold_m, 1.5);
        assert_eq!(config.window_size, 10);
        assert_eq!(
            config.cycle.identifiers(),
            &["A".to_string(), "B".to_string()]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AnalysisConfig::from_json(r#"{"contact_threshold_m": 2.0}"#).unwrap();
        assert_eq!(config.contact_threshold_m, 2.0);
        assert_eq!(config.sample_rate_hz, DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(config.segment_comparison, ThresholdComparison::Exclusive);
        assert_eq!(config.record_comparison, ThresholdComparison::Inclusive);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AnalysisConfig::default()
            .with_cycle(CyclePattern::alphabetical(["A", "B", "C"]))
            .with_window_size(5);
        let parsed = AnalysisConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AnalysisConfig::default().with_window_size(0).validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));
        assert!(AnalysisConfig::default()
            .with_sample_rate(0.0)
            .validate()
            .is_err());
        assert!(AnalysisConfig::default()
            .with_contact_threshold(f64::NAN)
            .validate()
            .is_err());
        assert!(AnalysisConfig::from_json(r#"{"cycle": []}"#).is_err());
    }

    #[test]
    fn test_threshold_comparison() {
        assert!(!ThresholdComparison::Exclusive.is_within(1.5, 1.5));
        assert!(ThresholdComparison::Inclusive.is_within(1.5, 1.5));
        assert!(ThresholdComparison::Exclusive.is_within(1.49, 1.5));
    }

    #[test]
    fn test_missing_config_file() {
        let result = AnalysisConfig::from_path(Path::new("/nonexistent/tag-contact.json"));
        assert!(matches!(result, Err(AnalysisError::FileNotFound { .. })));
    }
}
