//! Tag id reconciliation
//!
//! Some position loggers stamp every record with the same tag id instead of
//! rotating through the real tags. This module repairs that case by assigning
//! ids back from their position in the logging cycle.
//!
//! Assumptions (not checked):
//! - records are interleaved in the fixed order described by the
//!   [`CyclePattern`], one record per tag per time step,
//! - no tag of the cycle is absent from the raw interleaving (no gaps).
//!
//! The repair is a heuristic for a single defective identifier. When several
//! ids are missing in a pattern that is not a clean substitution the result is
//! undefined.

use crate::error::AnalysisError;
use crate::types::{PositionSeries, ReconcileReport, TagRepair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Ordered tag ids in the order the logger writes them within one time step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CyclePattern {
    identifiers: Vec<String>,
}

impl CyclePattern {
    /// Cycle in the given order
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    /// Cycle in alphabetical order of the ids
    pub fn alphabetical<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pattern = Self::new(identifiers);
        pattern.identifiers.sort();
        pattern
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Zero-based rank of a tag within the cycle
    pub fn offset_of(&self, entity_id: &str) -> Option<usize> {
        self.identifiers.iter().position(|id| id == entity_id)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.identifiers.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "tag cycle must contain at least one id".to_string(),
            ));
        }
        let unique: BTreeSet<&String> = self.identifiers.iter().collect();
        if unique.len() != self.identifiers.len() {
            return Err(AnalysisError::InvalidConfig(format!(
                "tag cycle contains duplicate ids: {:?}",
                self.identifiers
            )));
        }
        Ok(())
    }
}

/// Reassign missing tag ids at their cyclic record positions.
///
/// For a missing id at rank `r` in a cycle of length `k`, records
/// `r, r + k, r + 2k, ...` are relabeled to that id.
pub fn reconcile_tag_ids(
    pattern: &CyclePattern,
    missing: &BTreeSet<String>,
    positions: &mut PositionSeries,
) -> Result<ReconcileReport, AnalysisError> {
    pattern.validate()?;

    let cycle_length = pattern.len();
    let mut repairs = Vec::with_capacity(missing.len());

    if missing.len() > 1 {
        warn!(
            missing = ?missing,
            "Repairing more than one tag id, result relies on a clean cycle"
        );
    }

    for entity_id in missing {
        let offset = pattern
            .offset_of(entity_id)
            .ok_or_else(|| AnalysisError::UnknownIdentifier(entity_id.clone()))?;

        let mut relabeled = 0;
        for index in (offset..positions.len()).step_by(cycle_length) {
            positions.samples[index].entity_id = entity_id.clone();
            relabeled += 1;
        }

        debug!(tag = %entity_id, offset, relabeled, "Relabeled position records");
        repairs.push(TagRepair {
            entity_id: entity_id.clone(),
            offset,
            relabeled,
        });
    }

    info!(repaired = repairs.len(), cycle_length, "Tag ids reconciled");

    Ok(ReconcileReport {
        cycle_length,
        repairs,
    })
}
