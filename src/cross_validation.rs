//! Distance cross-validation
//!
//! Compares the distance implied by two tags' (filtered) positions against the
//! distance measured directly by the ranging system. Samples are paired by
//! index; only the mean discrepancy is reported, no sample is flagged.

use crate::error::AnalysisError;
use crate::types::{
    CrossValidationReport, DistanceComparison, EntityPair, PositionSeries, RangingSeries,
};
use tracing::info;

/// Compare position-derived and measured distances for one pair of tags
pub fn compare_distances(
    pair: &EntityPair,
    positions: &PositionSeries,
    ranging: &RangingSeries,
    nominal_threshold_m: f64,
) -> Result<CrossValidationReport, AnalysisError> {
    let first: Vec<_> = positions.for_entity(&pair.first).collect();
    let second: Vec<_> = positions.for_entity(&pair.second).collect();

    if first.len() != second.len() {
        return Err(AnalysisError::LengthMismatch {
            context: format!("positions of {} and {}", pair.first, pair.second),
            left: first.len(),
            right: second.len(),
        });
    }
    if first.len() != ranging.len() {
        return Err(AnalysisError::LengthMismatch {
            context: format!("positions of {} and ranging series", pair),
            left: first.len(),
            right: ranging.len(),
        });
    }

    let comparisons: Vec<DistanceComparison> = first
        .iter()
        .zip(&second)
        .zip(&ranging.samples)
        .map(|((a, b), r)| {
            let dx = a.x - b.x;
            let dy = a.y - b.y;
            let implied_distance = (dx * dx + dy * dy).sqrt();
            DistanceComparison {
                dx,
                dy,
                implied_distance,
                difference: implied_distance - r.distance,
            }
        })
        .collect();

    let mean_difference = if comparisons.is_empty() {
        None
    } else {
        let sum: f64 = comparisons.iter().map(|c| c.difference).sum();
        Some(sum / comparisons.len() as f64)
    };
    let mean_difference_pct = mean_difference.map(|m| m / nominal_threshold_m * 100.0);

    if let (Some(mean), Some(pct)) = (mean_difference, mean_difference_pct) {
        info!(
            pair = %pair,
            "Average distance difference between (filtered) position data and ranging data is \
             {mean:.3} m, which is {pct:.1}% of the {nominal_threshold_m} m contact distance"
        );
    }

    Ok(CrossValidationReport {
        pair: pair.clone(),
        comparisons,
        mean_difference,
        mean_difference_pct,
        nominal_threshold_m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PositionSample, RangingSample};

    fn pair() -> EntityPair {
        EntityPair::new("A", "B").unwrap()
    }

    #[test]
    fn test_single_step_difference() {
        let positions = PositionSeries::new(vec![
            PositionSample::new("A", 0.0, 0.0, 0.0),
            PositionSample::new("B", 0.0, 1.6, 0.0),
        ]);
        let ranging = RangingSeries::new(vec![RangingSample::new(0.0, 1.5, "B")]);

        let report = compare_distances(&pair(), &positions, &ranging, 1.5).unwrap();

        let step = report.comparisons[0];
        assert!((step.dx + 1.6).abs() < 1e-12);
        assert!((step.implied_distance - 1.6).abs() < 1e-12);
        assert!((step.difference - 0.1).abs() < 1e-9);
        assert!((report.mean_difference.unwrap() - 0.1).abs() < 1e-9);
        let pct = report.mean_difference_pct.unwrap();
        assert!((pct - 6.6667).abs() < 1e-3);
        assert_eq!(format!("{pct:.1}"), "6.7");
    }

    #[test]
    fn test_mean_is_signed() {
        let positions = PositionSeries::new(vec![
            PositionSample::new("A", 0.0, 0.0, 0.0),
            PositionSample::new("B", 0.0, 3.0, 4.0),
            PositionSample::new("A", 0.1, 0.0, 0.0),
            PositionSample::new("B", 0.1, 0.0, 2.0),
        ]);
        let ranging = RangingSeries::new(vec![
            RangingSample::new(0.0, 4.0, "B"),
            RangingSample::new(0.1, 3.0, "B"),
        ]);

        let report = compare_distances(&pair(), &positions, &ranging, 1.5).unwrap();
        // +1.0 and -1.0
        assert!(report.mean_difference.unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let positions = PositionSeries::new(vec![
            PositionSample::new("A", 0.0, 0.0, 0.0),
            PositionSample::new("B", 0.0, 1.0, 0.0),
        ]);
        let ranging = RangingSeries::from_distances(&[1.0, 1.0], "B", 10.0);

        let result = compare_distances(&pair(), &positions, &ranging, 1.5);
        assert!(matches!(
            result,
            Err(AnalysisError::LengthMismatch { left: 1, right: 2, .. })
        ));
    }

    #[test]
    fn test_empty_series() {
        let report = compare_distances(
            &pair(),
            &PositionSeries::default(),
            &RangingSeries::default(),
            1.5,
        )
        .unwrap();
        assert!(report.comparisons.is_empty());
        assert_eq!(report.mean_difference, None);
    }
}
