//! Contact segmentation
//!
//! Scans a ranging series against the contact distance and cuts it into
//! discrete contact intervals. Two predicates are involved:
//! - the segment predicate opens and closes intervals (`<` by default),
//! - the record predicate selects the contact records (`<=` by default).
//!
//! Both are configurable; the defaults keep the two conventions distinct, so a
//! sample exactly at the threshold is a contact record but does not extend an
//! interval.

use crate::config::{AnalysisConfig, ThresholdComparison};
use crate::error::AnalysisError;
use crate::types::{
    ContactAnalysis, ContactInterval, ContactRecord, ContactStatistics, EntityPair,
    PositionSeries, RangingSeries,
};
use tracing::{debug, info};

/// Segmentation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactState {
    OutOfContact,
    InContact { start_index: usize },
}

/// Contact interval extraction over ranging series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSegmenter {
    threshold_m: f64,
    sample_rate_hz: f64,
    segment_comparison: ThresholdComparison,
    record_comparison: ThresholdComparison,
}

impl Default for ContactSegmenter {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl ContactSegmenter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            threshold_m: config.contact_threshold_m,
            sample_rate_hz: config.sample_rate_hz,
            segment_comparison: config.segment_comparison,
            record_comparison: config.record_comparison,
        }
    }

    /// Segmenter with default comparisons and sample rate
    pub fn with_threshold(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            ..Self::default()
        }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Cut a distance sequence into contact intervals
    pub fn segment<I>(&self, distances: I) -> Vec<ContactInterval>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut state = ContactState::OutOfContact;
        let mut intervals = Vec::new();
        let mut len = 0;

        for (index, distance) in distances.into_iter().enumerate() {
            len = index + 1;
            let within = self.segment_comparison.is_within(distance, self.threshold_m);

            state = match (state, within) {
                (ContactState::OutOfContact, true) => {
                    ContactState::InContact { start_index: index }
                }
                (ContactState::InContact { start_index }, false) => {
                    intervals.push(ContactInterval::new(start_index, index - 1));
                    ContactState::OutOfContact
                }
                (state, _) => state,
            };
        }

        if let ContactState::InContact { start_index } = state {
            intervals.push(ContactInterval::new(start_index, len - 1));
        }

        intervals
    }

    /// Ranging samples within contact distance, joined with `self_id`'s position
    pub fn contact_records(
        &self,
        ranging: &RangingSeries,
        positions: &PositionSeries,
        self_id: &str,
    ) -> Vec<ContactRecord> {
        ranging
            .samples
            .iter()
            .filter(|s| self.record_comparison.is_within(s.distance, self.threshold_m))
            .map(|s| {
                let position = positions.position_at(self_id, s.time);
                ContactRecord {
                    time: s.time,
                    distance: s.distance,
                    x: position.map(|(x, _)| x),
                    y: position.map(|(_, y)| y),
                }
            })
            .collect()
    }

    /// Summary statistics of a segmentation
    pub fn statistics(
        &self,
        ranging: &RangingSeries,
        intervals: &[ContactInterval],
        records: &[ContactRecord],
    ) -> ContactStatistics {
        let contact_duration_s = records.len() as f64 / self.sample_rate_hz;
        let mean_interval_duration_s = if intervals.is_empty() {
            None
        } else {
            Some(contact_duration_s / intervals.len() as f64)
        };

        ContactStatistics {
            observation_samples: ranging.len(),
            observation_duration_s: ranging.len() as f64 / self.sample_rate_hz,
            contact_samples: records.len(),
            contact_duration_s,
            interval_samples: intervals.iter().map(ContactInterval::sample_count).sum(),
            interval_count: intervals.len(),
            mean_interval_duration_s,
            longest_interval_duration_s: intervals
                .iter()
                .map(|i| i.duration_s(self.sample_rate_hz))
                .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d)))),
            min_distance_m: ranging
                .distances()
                .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d)))),
        }
    }

    /// Full analysis of one ranging series recorded within `pair`.
    ///
    /// The observer id of the series names the contacted tag; records are
    /// enriched with the positions of the other tag of the pair.
    pub fn analyze(
        &self,
        pair: &EntityPair,
        ranging: &RangingSeries,
        positions: &PositionSeries,
    ) -> Result<ContactAnalysis, AnalysisError> {
        let observer_id = ranging.observer_id().map(str::to_string);
        let self_id = match &observer_id {
            Some(observer) => Some(
                pair.other(observer)
                    .ok_or_else(|| AnalysisError::UnknownIdentifier(observer.clone()))?
                    .to_string(),
            ),
            None => None,
        };

        let intervals = self.segment(ranging.distances());
        let records = match &self_id {
            Some(id) => self.contact_records(ranging, positions, id),
            None => Vec::new(),
        };
        let statistics = self.statistics(ranging, &intervals, &records);

        debug!(intervals = ?intervals, "Contact intervals");
        match statistics.mean_interval_duration_s {
            Some(mean) => info!(
                tag = self_id.as_deref().unwrap_or("-"),
                "For {} s out of {} s, tags were within contact distance; {} contact moment(s) \
                 with an average duration of {:.1} s",
                statistics.contact_duration_s,
                statistics.observation_duration_s,
                statistics.interval_count,
                mean
            ),
            None => info!(
                tag = self_id.as_deref().unwrap_or("-"),
                "No contact moments in {} s of ranging data",
                statistics.observation_duration_s
            ),
        }

        Ok(ContactAnalysis {
            observer_id,
            self_id,
            intervals,
            records,
            statistics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PositionSample, RangingSample};
    use pretty_assertions::assert_eq;

    fn intervals(pairs: &[(usize, usize)]) -> Vec<ContactInterval> {
        pairs.iter().map(|&(s, e)| ContactInterval::new(s, e)).collect()
    }

    #[test]
    fn test_reference_scenario() {
        let segmenter = ContactSegmenter::with_threshold(1.5);
        let result = segmenter.segment([2.0, 1.0, 0.5, 1.0, 2.0, 2.0, 0.9, 2.0]);
        assert_eq!(result, intervals(&[(1, 3), (6, 6)]));
    }

    #[test]
    fn test_all_below_threshold() {
        let segmenter = ContactSegmenter::with_threshold(1.5);
        assert_eq!(segmenter.segment([0.1, 0.2, 1.4, 0.3]), intervals(&[(0, 3)]));
    }

    #[test]
    fn test_all_at_or_above_threshold() {
        let segmenter = ContactSegmenter::with_threshold(1.5);
        assert!(segmenter.segment([1.5, 2.0, 1.5, 9.0]).is_empty());
        assert!(segmenter.segment(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_contact_until_end_of_stream() {
        let segmenter = ContactSegmenter::with_threshold(1.5);
        assert_eq!(
            segmenter.segment([2.0, 1.0, 2.0, 1.0, 1.0]),
            intervals(&[(1, 1), (3, 4)])
        );
    }

    #[test]
    fn test_interval_samples_match_predicate_count() {
        let segmenter = ContactSegmenter::with_threshold(1.5);
        let distances: Vec<f64> = (0..200)
            .map(|i| 1.5 + ((i as f64) * 0.37).sin() * 1.2)
            .collect();

        let result = segmenter.segment(distances.iter().copied());

        let contact_count = distances.iter().filter(|&&d| d < 1.5).count();
        let covered: usize = result.iter().map(ContactInterval::sample_count).sum();
        assert_eq!(covered, contact_count);

        for window in result.windows(2) {
            assert!(window[0].end_index < window[1].start_index);
            assert!(window[0].start_index < window[1].start_index);
        }
    }

    #[test]
    fn test_threshold_tie_break() {
        let segmenter = ContactSegmenter::with_threshold(1.5);
        let ranging = RangingSeries::from_distances(&[1.5, 1.0, 1.5], "B", 10.0);

        let result = segmenter.segment(ranging.distances());
        let records = segmenter.contact_records(&ranging, &PositionSeries::default(), "A");

        assert_eq!(result, intervals(&[(1, 1)]));
        assert_eq!(records.len(), 3);

        let config = AnalysisConfig {
            segment_comparison: ThresholdComparison::Inclusive,
            ..AnalysisConfig::default()
        };
        let inclusive = ContactSegmenter::from_config(&config);
        assert_eq!(inclusive.segment(ranging.distances()), intervals(&[(0, 2)]));
    }

    #[test]
    fn test_records_use_self_position() {
        let positions = PositionSeries::new(vec![
            PositionSample::new("A", 0.0, 1.0, 2.0),
            PositionSample::new("B", 0.0, 8.0, 8.0),
            PositionSample::new("A", 0.1, 1.1, 2.1),
            PositionSample::new("B", 0.1, 8.1, 8.1),
        ]);
        let ranging = RangingSeries::new(vec![
            RangingSample::new(0.0, 1.0, "B"),
            RangingSample::new(0.1, 3.0, "B"),
            RangingSample::new(0.2, 0.5, "B"),
        ]);
        let pair = EntityPair::new("A", "B").unwrap();

        let analysis = ContactSegmenter::default()
            .analyze(&pair, &ranging, &positions)
            .unwrap();

        assert_eq!(analysis.self_id.as_deref(), Some("A"));
        assert_eq!(
            analysis.records,
            vec![
                ContactRecord {
                    time: 0.0,
                    distance: 1.0,
                    x: Some(1.0),
                    y: Some(2.0),
                },
                ContactRecord {
                    time: 0.2,
                    distance: 0.5,
                    x: None,
                    y: None,
                },
            ]
        );
    }

    #[test]
    fn test_statistics() {
        let segmenter = ContactSegmenter::with_threshold(1.5);
        let ranging = RangingSeries::from_distances(
            &[2.0, 1.0, 0.5, 1.0, 2.0, 2.0, 0.9, 2.0, 1.5, 2.0],
            "B",
            10.0,
        );
        let pair = EntityPair::new("A", "B").unwrap();

        let stats = segmenter
            .analyze(&pair, &ranging, &PositionSeries::default())
            .unwrap()
            .statistics;

        assert_eq!(stats.observation_samples, 10);
        assert!((stats.observation_duration_s - 1.0).abs() < 1e-12);
        // four samples below plus one exactly at the threshold
        assert_eq!(stats.contact_samples, 5);
        assert_eq!(stats.interval_samples, 4);
        assert_eq!(stats.interval_count, 2);
        assert!((stats.mean_interval_duration().unwrap() - 0.25).abs() < 1e-12);
        assert!((stats.longest_interval_duration_s.unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(stats.min_distance_m, Some(0.5));
    }

    #[test]
    fn test_no_contact_statistics_undefined() {
        let segmenter = ContactSegmenter::with_threshold(1.5);
        let ranging = RangingSeries::from_distances(&[3.0, 4.0, 5.0], "B", 10.0);
        let pair = EntityPair::new("A", "B").unwrap();

        let analysis = segmenter
            .analyze(&pair, &ranging, &PositionSeries::default())
            .unwrap();

        assert!(analysis.intervals.is_empty());
        assert_eq!(analysis.statistics.mean_interval_duration_s, None);
        assert_eq!(analysis.statistics.longest_interval_duration_s, None);
        assert!(matches!(
            analysis.statistics.mean_interval_duration(),
            Err(AnalysisError::EmptyIntervalSet)
        ));
    }

    #[test]
    fn test_observer_outside_pair() {
        let ranging = RangingSeries::from_distances(&[1.0], "C", 10.0);
        let pair = EntityPair::new("A", "B").unwrap();

        let result =
            ContactSegmenter::default().analyze(&pair, &ranging, &PositionSeries::default());
        assert!(matches!(result, Err(AnalysisError::UnknownIdentifier(id)) if id == "C"));
    }

    #[test]
    fn test_empty_ranging_series() {
        let pair = EntityPair::new("A", "B").unwrap();
        let analysis = ContactSegmenter::default()
            .analyze(&pair, &RangingSeries::default(), &PositionSeries::default())
            .unwrap();

        assert_eq!(analysis.observer_id, None);
        assert_eq!(analysis.statistics.observation_samples, 0);
        assert_eq!(analysis.statistics.min_distance_m, None);
    }
}
