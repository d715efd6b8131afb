//! Pipeline orchestration
//!
//! This module provides the public API for tag contact analysis.
//! It runs the full pipeline from loaded position and ranging series to
//! contact intervals and statistics.

use crate::config::AnalysisConfig;
use crate::cross_validation::compare_distances;
use crate::error::AnalysisError;
use crate::filter::NoiseFilter;
use crate::reconciler::reconcile_tag_ids;
use crate::segmenter::ContactSegmenter;
use crate::table::{load_position_table, load_ranging_table};
use crate::types::{
    CrossValidationOutcome, CrossValidationReport, EntityPair, PositionSeries, RangingSeries,
    ReconcileReport, SessionAnalysis, VerificationReport,
};
use crate::verification::verify_identifiers;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Analyse one recorded session with the default pipeline.
///
/// # Arguments
/// * `config` - Analysis configuration (tags, thresholds, sample rate)
/// * `positions` - Raw position series of both tags
/// * `ranging` - One ranging series per tag file
///
/// # Example
/// ```ignore
/// let analysis = analyze_session(&AnalysisConfig::default(), positions, &[tag_a, tag_b])?;
/// ```
pub fn analyze_session(
    config: &AnalysisConfig,
    positions: PositionSeries,
    ranging: &[RangingSeries],
) -> Result<SessionAnalysis, AnalysisError> {
    ContactAnalyzer::new(config.clone())?.analyze(positions, ranging)
}

/// Reusable analyzer holding a validated configuration.
///
/// Pipeline stages:
/// 1. Verification - Check that every expected tag id is present
/// 2. Reconciler - Repair tag ids when the check fails
/// 3. NoiseFilter - Smooth the position traces
/// 4. Cross-validation - Compare implied and measured distances
/// 5. ContactSegmenter - Extract contact intervals and records
#[derive(Debug, Clone)]
pub struct ContactAnalyzer {
    config: AnalysisConfig,
    filter: NoiseFilter,
    segmenter: ContactSegmenter,
}

impl ContactAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            filter: NoiseFilter::new(config.window_size)?,
            segmenter: ContactSegmenter::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The analysed pair of tags
    pub fn pair(&self) -> Result<EntityPair, AnalysisError> {
        match self.config.cycle.identifiers() {
            [a, b] => EntityPair::new(a.as_str(), b.as_str())
                .ok_or_else(|| AnalysisError::InvalidConfig(format!("tag {a} listed twice"))),
            ids => Err(AnalysisError::InvalidConfig(format!(
                "contact analysis needs exactly two tags, got {}",
                ids.len()
            ))),
        }
    }

    /// Run verification, repair and smoothing on a position series
    pub fn prepare_positions(
        &self,
        positions: &mut PositionSeries,
    ) -> Result<(VerificationReport, Option<ReconcileReport>), AnalysisError> {
        let required = self.config.cycle.identifiers();

        let verification = verify_identifiers(required, positions);
        let reconciliation = if verification.complete {
            info!("No missing tag ids");
            None
        } else {
            warn!(missing = ?verification.missing, "Tag ids missing in position data");
            Some(reconcile_tag_ids(
                &self.config.cycle,
                &verification.missing,
                positions,
            )?)
        };

        self.filter.smooth(required, positions);

        Ok((verification, reconciliation))
    }

    /// Analyse a session: one position series and the ranging series of each tag
    pub fn analyze(
        &self,
        mut positions: PositionSeries,
        ranging: &[RangingSeries],
    ) -> Result<SessionAnalysis, AnalysisError> {
        let pair = self.pair()?;
        info!(
            pair = %pair,
            positions = positions.len(),
            ranging_series = ranging.len(),
            "Starting contact analysis"
        );

        let (verification, reconciliation) = self.prepare_positions(&mut positions)?;

        let cross_validation = ranging
            .iter()
            .map(|series| self.cross_validate(&pair, &positions, series))
            .collect::<Result<Vec<_>, _>>()?;

        let contacts = ranging
            .iter()
            .map(|series| self.segmenter.analyze(&pair, series, &positions))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SessionAnalysis {
            pair,
            verification,
            reconciliation,
            cross_validation,
            contacts,
            positions,
        })
    }

    /// Cross-validate one ranging series.
    ///
    /// Series that are not index-aligned with the positions are skipped; the
    /// contact analysis does not depend on them.
    fn cross_validate(
        &self,
        pair: &EntityPair,
        positions: &PositionSeries,
        series: &RangingSeries,
    ) -> Result<CrossValidationOutcome, AnalysisError> {
        match compare_distances(pair, positions, series, self.config.nominal_threshold_m) {
            Ok(report) => Ok(CrossValidationOutcome::Compared(report)),
            Err(e @ AnalysisError::LengthMismatch { .. }) => {
                warn!(pair = %pair, error = %e, "Skipping distance cross-validation");
                Ok(CrossValidationOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Load the tables from disk and analyse them
    pub fn analyze_files<P: AsRef<Path>>(
        &self,
        positions_path: &Path,
        ranging_paths: &[P],
    ) -> Result<SessionAnalysis, AnalysisError> {
        let positions = load_position_table(positions_path)?;
        let ranging = ranging_paths
            .iter()
            .map(|p| load_ranging_table(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        self.analyze(positions, &ranging)
    }

    /// Cross-validate every pair of configured tags that has a ranging series.
    ///
    /// `positions` is expected to be prepared already (see
    /// [`ContactAnalyzer::prepare_positions`]).
    pub fn cross_validate_all(
        &self,
        positions: &PositionSeries,
        ranging_by_pair: &BTreeMap<EntityPair, RangingSeries>,
    ) -> Result<Vec<CrossValidationReport>, AnalysisError> {
        let mut reports = Vec::new();

        for pair in EntityPair::all(self.config.cycle.identifiers()) {
            match ranging_by_pair.get(&pair) {
                Some(series) => reports.push(compare_distances(
                    &pair,
                    positions,
                    series,
                    self.config.nominal_threshold_m,
                )?),
                None => debug!(pair = %pair, "No ranging series for pair"),
            }
        }

        Ok(reports)
    }
}
