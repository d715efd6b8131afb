//! Tag presence verification
//!
//! Pre-flight check run before any analysis: every required tag id must appear
//! at least once in the position data. A failing check is recoverable through
//! the reconciler.

use crate::error::AnalysisError;
use crate::types::{PositionSeries, VerificationReport};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Required tag ids absent from the position series
pub fn find_missing_identifiers<S: AsRef<str>>(
    required: &[S],
    positions: &PositionSeries,
) -> BTreeSet<String> {
    let present = positions.entity_ids();
    required
        .iter()
        .map(|id| id.as_ref())
        .filter(|id| !present.contains(*id))
        .map(str::to_string)
        .collect()
}

/// Build the presence report without failing
pub fn verify_identifiers<S: AsRef<str>>(
    required: &[S],
    positions: &PositionSeries,
) -> VerificationReport {
    let present = positions.entity_ids();
    let missing = find_missing_identifiers(required, positions);

    VerificationReport {
        complete: missing.is_empty(),
        present,
        missing,
    }
}

/// Check that every required tag id is present.
///
/// Returns `MissingIdentifier` listing the absent ids otherwise.
pub fn check_required_identifiers<S: AsRef<str>>(
    required: &[S],
    positions: &PositionSeries,
) -> Result<VerificationReport, AnalysisError> {
    let report = verify_identifiers(required, positions);

    if report.complete {
        info!("No missing tag ids");
        Ok(report)
    } else {
        warn!(missing = ?report.missing, "Tag ids missing in position data");
        Err(AnalysisError::MissingIdentifier {
            missing: report.missing,
        })
    }
}
