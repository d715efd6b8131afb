//! Position noise filtering
//!
//! Trailing moving average over the x and y coordinates of each tag. The first
//! `window_size - 1` records of every tag have no full window and keep their
//! raw values, so the series never shrinks but starts with a short unsmoothed
//! warm-up period.

use crate::config::DEFAULT_WINDOW_SIZE;
use crate::error::AnalysisError;
use crate::types::PositionSeries;
use tracing::debug;

/// Moving average filter for position series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseFilter {
    window_size: usize,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl NoiseFilter {
    pub fn new(window_size: usize) -> Result<Self, AnalysisError> {
        if window_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }
        Ok(Self { window_size })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Smooth the positions of the given tags in place
    pub fn smooth<S: AsRef<str>>(&self, entity_ids: &[S], positions: &mut PositionSeries) {
        for entity_id in entity_ids {
            let entity_id = entity_id.as_ref();
            let indices = positions.indices_of(entity_id);

            let xs: Vec<f64> = indices.iter().map(|&i| positions.samples[i].x).collect();
            let ys: Vec<f64> = indices.iter().map(|&i| positions.samples[i].y).collect();

            let filtered_x = trailing_mean(&xs, self.window_size);
            let filtered_y = trailing_mean(&ys, self.window_size);

            for (k, &index) in indices.iter().enumerate() {
                positions.samples[index].x = filtered_x[k];
                positions.samples[index].y = filtered_y[k];
            }

            debug!(
                tag = entity_id,
                samples = indices.len(),
                window = self.window_size,
                "Smoothed position trace"
            );
        }
    }
}

/// Trailing mean of `window` values, raw values where the window is incomplete
fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut output = values.to_vec();
    if window <= 1 || values.len() < window {
        return output;
    }

    for end in window - 1..values.len() {
        let sum: f64 = values[end + 1 - window..=end].iter().sum();
        output[end] = sum / window as f64;
    }
    output
}
