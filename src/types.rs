//! Core types for the contact analysis pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: position and ranging series, contact intervals and records, and the
//! per-stage results handed back to the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single reading of the absolute positioning system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Tag identifier stamped on the record
    pub entity_id: String,
    /// Timestamp (seconds)
    pub time: f64,
    /// X coordinate (meters)
    pub x: f64,
    /// Y coordinate (meters)
    pub y: f64,
}

impl PositionSample {
    pub fn new(entity_id: impl Into<String>, time: f64, x: f64, y: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            time,
            x,
            y,
        }
    }
}

/// Position records of every tag in a session, in file order.
///
/// Records of different tags are interleaved; the records of one tag are
/// expected to be in time order. Per-tag sequences are aligned by index, not by
/// timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSeries {
    pub samples: Vec<PositionSample>,
}

impl PositionSeries {
    pub fn new(samples: Vec<PositionSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct tag ids present in the series
    pub fn entity_ids(&self) -> BTreeSet<String> {
        self.samples.iter().map(|s| s.entity_id.clone()).collect()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.samples.iter().any(|s| s.entity_id == entity_id)
    }

    /// Record indices belonging to one tag, in file order
    pub fn indices_of(&self, entity_id: &str) -> Vec<usize> {
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.entity_id == entity_id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Records belonging to one tag, in file order
    pub fn for_entity<'a>(
        &'a self,
        entity_id: &'a str,
    ) -> impl Iterator<Item = &'a PositionSample> + 'a {
        self.samples.iter().filter(move |s| s.entity_id == entity_id)
    }

    /// Position of a tag at an exact timestamp, if one was recorded
    pub fn position_at(&self, entity_id: &str, time: f64) -> Option<(f64, f64)> {
        self.for_entity(entity_id)
            .find(|s| s.time == time)
            .map(|s| (s.x, s.y))
    }
}

/// A single reading of the inter-tag ranging system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangingSample {
    /// Timestamp (seconds)
    pub time: f64,
    /// Measured distance between the tags (meters)
    pub distance: f64,
    /// Identifier of the tag on the other end of the measurement
    pub observer_id: String,
}

impl RangingSample {
    pub fn new(time: f64, distance: f64, observer_id: impl Into<String>) -> Self {
        Self {
            time,
            distance,
            observer_id: observer_id.into(),
        }
    }
}

/// Ranging readings recorded by one tag, in time order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangingSeries {
    pub samples: Vec<RangingSample>,
}

impl RangingSeries {
    pub fn new(samples: Vec<RangingSample>) -> Self {
        Self { samples }
    }

    /// Build a series with a fixed observer and a fixed sample period
    pub fn from_distances(distances: &[f64], observer_id: &str, sample_rate_hz: f64) -> Self {
        let samples = distances
            .iter()
            .enumerate()
            .map(|(i, &d)| RangingSample::new(i as f64 / sample_rate_hz, d, observer_id))
            .collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Observer id of the first reading, which names the series
    pub fn observer_id(&self) -> Option<&str> {
        self.samples.first().map(|s| s.observer_id.as_str())
    }

    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.distance)
    }
}

/// Unordered pair of distinct tags, stored with `first < second`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityPair {
    pub first: String,
    pub second: String,
}

impl EntityPair {
    /// Returns `None` when both ids are equal
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Option<Self> {
        let (a, b) = (a.into(), b.into());
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { first: a, second: b }),
            std::cmp::Ordering::Greater => Some(Self { first: b, second: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Every unordered pair of the given tags, in lexicographic order
    pub fn all<S: AsRef<str>>(entity_ids: &[S]) -> Vec<EntityPair> {
        let ids: BTreeSet<&str> = entity_ids.iter().map(|s| s.as_ref()).collect();
        let ids: Vec<&str> = ids.into_iter().collect();

        let mut pairs = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                pairs.push(EntityPair {
                    first: (*a).to_string(),
                    second: (*b).to_string(),
                });
            }
        }
        pairs
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.first == entity_id || self.second == entity_id
    }

    /// The member of the pair that is not `entity_id`
    pub fn other(&self, entity_id: &str) -> Option<&str> {
        if self.first == entity_id {
            Some(&self.second)
        } else if self.second == entity_id {
            Some(&self.first)
        } else {
            None
        }
    }
}

impl std::fmt::Display for EntityPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

/// Maximal run of in-contact ranging samples (inclusive indices)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInterval {
    pub start_index: usize,
    pub end_index: usize,
}

impl ContactInterval {
    pub fn new(start_index: usize, end_index: usize) -> Self {
        debug_assert!(start_index <= end_index);
        Self {
            start_index,
            end_index,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn duration_s(&self, sample_rate_hz: f64) -> f64 {
        self.sample_count() as f64 / sample_rate_hz
    }
}

/// Ranging sample within contact distance, joined with the wearer's position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub time: f64,
    pub distance: f64,
    /// X of the wearing tag at `time` (absent when no position shares the timestamp)
    pub x: Option<f64>,
    /// Y of the wearing tag at `time`
    pub y: Option<f64>,
}

/// Summary statistics of one contact analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactStatistics {
    /// Number of ranging samples analysed
    pub observation_samples: usize,
    /// Observed time (seconds)
    pub observation_duration_s: f64,
    /// Number of contact records
    pub contact_samples: usize,
    /// Time within contact distance (seconds)
    pub contact_duration_s: f64,
    /// Sum of the sample counts of all intervals
    pub interval_samples: usize,
    /// Number of discrete contact intervals
    pub interval_count: usize,
    /// Mean interval duration (seconds), absent without intervals
    pub mean_interval_duration_s: Option<f64>,
    /// Longest interval duration (seconds)
    pub longest_interval_duration_s: Option<f64>,
    /// Smallest measured distance (meters)
    pub min_distance_m: Option<f64>,
}

impl ContactStatistics {
    /// Mean interval duration, or `EmptyIntervalSet` when no contact occurred
    pub fn mean_interval_duration(&self) -> Result<f64, crate::error::AnalysisError> {
        self.mean_interval_duration_s
            .ok_or(crate::error::AnalysisError::EmptyIntervalSet)
    }
}

/// Result of segmenting one ranging series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactAnalysis {
    /// Tag on the other end of the ranging series
    pub observer_id: Option<String>,
    /// Tag wearing the ranging device, whose positions enrich the records
    pub self_id: Option<String>,
    pub intervals: Vec<ContactInterval>,
    pub records: Vec<ContactRecord>,
    pub statistics: ContactStatistics,
}

/// Position-derived versus measured distance at one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceComparison {
    pub dx: f64,
    pub dy: f64,
    pub implied_distance: f64,
    /// `implied_distance - measured distance`
    pub difference: f64,
}

/// Cross-validation result for one pair of tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub pair: EntityPair,
    pub comparisons: Vec<DistanceComparison>,
    /// Mean signed difference (meters)
    pub mean_difference: Option<f64>,
    /// Mean difference as a percentage of the nominal threshold
    pub mean_difference_pct: Option<f64>,
    /// Threshold the percentage refers to (meters)
    pub nominal_threshold_m: f64,
}

/// Cross-validation of one ranging series, or why it could not run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CrossValidationOutcome {
    Compared(CrossValidationReport),
    Skipped { reason: String },
}

impl CrossValidationOutcome {
    pub fn report(&self) -> Option<&CrossValidationReport> {
        match self {
            CrossValidationOutcome::Compared(report) => Some(report),
            CrossValidationOutcome::Skipped { .. } => None,
        }
    }
}

/// Tag id repair applied to the position series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRepair {
    pub entity_id: String,
    /// Rank of the tag in the cycle
    pub offset: usize,
    /// Number of records relabeled
    pub relabeled: usize,
}

/// Outcome of the tag id reconciliation stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub cycle_length: usize,
    pub repairs: Vec<TagRepair>,
}

/// Outcome of the verification gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub complete: bool,
    pub present: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

/// Everything produced by one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub pair: EntityPair,
    pub verification: VerificationReport,
    /// Present only when the gate failed and ids were repaired
    pub reconciliation: Option<ReconcileReport>,
    /// One entry per ranging series, in input order
    pub cross_validation: Vec<CrossValidationOutcome>,
    pub contacts: Vec<ContactAnalysis>,
    /// Filtered (and repaired) positions, for presentation
    #[serde(skip)]
    pub positions: PositionSeries,
}

/// Producer metadata of a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Serializable analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub config: crate::config::AnalysisConfig,
    pub verification: VerificationReport,
    pub reconciliation: Option<ReconcileReport>,
    pub cross_validation: Vec<CrossValidationSummary>,
    pub contacts: Vec<ContactAnalysis>,
}

/// Cross-validation report without the per-step series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub pair: String,
    pub samples: usize,
    pub mean_difference: Option<f64>,
    pub mean_difference_pct: Option<f64>,
    pub nominal_threshold_m: f64,
    /// Why the series was not compared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entity_pair_normalizes_order() {
        let pair = EntityPair::new("B", "A").unwrap();
        assert_eq!(pair.first, "A");
        assert_eq!(pair.second, "B");
        assert!(EntityPair::new("A", "A").is_none());
        assert_eq!(pair.other("A"), Some("B"));
        assert_eq!(pair.other("C"), None);
    }

    #[test]
    fn test_all_pairs() {
        let pairs = EntityPair::all(&["C", "A", "B", "A"]);
        let names: Vec<String> = pairs.iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["A-B", "A-C", "B-C"]);
        assert!(EntityPair::all(&["A"]).is_empty());
    }

    #[test]
    fn test_position_series_queries() {
        let series = PositionSeries::new(vec![
            PositionSample::new("A", 0.0, 1.0, 1.0),
            PositionSample::new("B", 0.0, 2.0, 2.0),
            PositionSample::new("A", 0.1, 1.5, 1.5),
        ]);

        assert_eq!(series.indices_of("A"), vec![0, 2]);
        assert_eq!(series.position_at("A", 0.1), Some((1.5, 1.5)));
        assert_eq!(series.position_at("B", 0.1), None);
        assert!(!series.contains("C"));
    }

    #[test]
    fn test_interval_duration() {
        let interval = ContactInterval::new(3, 7);
        assert_eq!(interval.sample_count(), 5);
        assert!((interval.duration_s(10.0) - 0.5).abs() < 1e-12);
    }
}
