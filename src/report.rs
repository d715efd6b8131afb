//! Report encoding
//!
//! This module wraps a session analysis into a serializable report carrying
//! producer metadata and the configuration it was computed with. Per-step
//! cross-validation series and positions are left out; the contact records are
//! kept for the presentation layer.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::{
    AnalysisReport, CrossValidationOutcome, CrossValidationSummary, ReportProducer,
    SessionAnalysis,
};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Encoder producing [`AnalysisReport`] payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build the report of one analysis run
    pub fn encode(&self, config: &AnalysisConfig, analysis: &SessionAnalysis) -> AnalysisReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let cross_validation = analysis
            .cross_validation
            .iter()
            .map(|outcome| match outcome {
                CrossValidationOutcome::Compared(report) => CrossValidationSummary {
                    pair: report.pair.to_string(),
                    samples: report.comparisons.len(),
                    mean_difference: report.mean_difference,
                    mean_difference_pct: report.mean_difference_pct,
                    nominal_threshold_m: report.nominal_threshold_m,
                    skipped: None,
                },
                CrossValidationOutcome::Skipped { reason } => CrossValidationSummary {
                    pair: analysis.pair.to_string(),
                    samples: 0,
                    mean_difference: None,
                    mean_difference_pct: None,
                    nominal_threshold_m: config.nominal_threshold_m,
                    skipped: Some(reason.clone()),
                },
            })
            .collect();

        AnalysisReport {
            producer,
            computed_at_utc: Utc::now().to_rfc3339(),
            config: config.clone(),
            verification: analysis.verification.clone(),
            reconciliation: analysis.reconciliation.clone(),
            cross_validation,
            contacts: analysis.contacts.clone(),
        }
    }

    /// Encode to a compact JSON string
    pub fn encode_to_json(
        &self,
        config: &AnalysisConfig,
        analysis: &SessionAnalysis,
    ) -> Result<String, AnalysisError> {
        serde_json::to_string(&self.encode(config, analysis)).map_err(AnalysisError::Json)
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json_pretty(
        &self,
        config: &AnalysisConfig,
        analysis: &SessionAnalysis,
    ) -> Result<String, AnalysisError> {
        serde_json::to_string_pretty(&self.encode(config, analysis)).map_err(AnalysisError::Json)
    }
}
