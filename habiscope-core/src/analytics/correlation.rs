//! Pairwise habit correlation
//!
//! Computes the Pearson correlation coefficient between two habits'
//! day-by-day completion rate series over a shared date range, then
//! classifies the relationship. The result is symmetric under habit swap.

use crate::analytics::aggregate::CompletionAggregator;
use crate::error::{Error, Result};
use crate::types::{CompletionEvent, CorrelationKind, DateRange};
use serde::{Deserialize, Serialize};

/// Coefficient magnitude below which a pair is considered unrelated.
const NEUTRAL_BAND: f64 = 0.2;

/// Overlapping days needed for full confidence.
const FULL_CONFIDENCE_DAYS: f64 = 30.0;

/// Classified statistical relationship between two habits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub user_id: String,
    pub habit1_id: String,
    pub habit2_id: String,
    /// Pearson coefficient in [-1, 1]; 0.0 when either series is flat
    pub coefficient: f64,
    pub kind: CorrelationKind,
    /// Grows with the number of overlapping days, capped at 1.0
    pub confidence: f64,
}

/// Analyzer for pairwise habit relationships.
#[derive(Debug, Clone, Copy, Default)]
pub struct HabitCorrelationAnalyzer {
    aggregator: CompletionAggregator,
}

impl HabitCorrelationAnalyzer {
    pub fn new(aggregator: CompletionAggregator) -> Self {
        Self { aggregator }
    }

    /// Correlate two habits' completion series over the same range.
    ///
    /// Rejects `habit1_id == habit2_id` at the boundary. A zero-variance
    /// series yields a neutral result with zero confidence instead of a
    /// division by zero.
    pub fn correlate(
        &self,
        user_id: &str,
        habit1_id: &str,
        habit1_records: &[CompletionEvent],
        habit2_id: &str,
        habit2_records: &[CompletionEvent],
        range: &DateRange,
    ) -> Result<CorrelationResult> {
        if habit1_id == habit2_id {
            return Err(Error::IdenticalHabits(habit1_id.to_string()));
        }

        let series1 = self.daily_rates(habit1_records, range);
        let series2 = self.daily_rates(habit2_records, range);

        let (coefficient, confidence) = match pearson(&series1, &series2) {
            Some(r) => (
                r.clamp(-1.0, 1.0),
                (series1.len() as f64 / FULL_CONFIDENCE_DAYS).min(1.0),
            ),
            None => (0.0, 0.0),
        };

        let kind = classify(coefficient);

        tracing::debug!(
            user_id,
            habit1_id,
            habit2_id,
            coefficient,
            kind = kind.as_str(),
            "Correlated habit pair"
        );

        Ok(CorrelationResult {
            user_id: user_id.to_string(),
            habit1_id: habit1_id.to_string(),
            habit2_id: habit2_id.to_string(),
            coefficient,
            kind,
            confidence,
        })
    }

    /// Day-by-day completion rate series over the range.
    fn daily_rates(&self, records: &[CompletionEvent], range: &DateRange) -> Vec<f64> {
        self.aggregator
            .daily(records, range)
            .days
            .into_iter()
            .map(|d| d.completion_rate)
            .collect()
    }
}

/// Classify a coefficient into a relationship kind.
///
/// `Causal`/`InverseCausal` need a lag-based classifier that does not exist
/// yet, so plain correlation only emits the three basic kinds.
fn classify(coefficient: f64) -> CorrelationKind {
    if coefficient.abs() < NEUTRAL_BAND {
        CorrelationKind::Neutral
    } else if coefficient > 0.0 {
        CorrelationKind::Positive
    } else {
        CorrelationKind::Negative
    }
}

/// Pearson correlation coefficient of two equal-length series.
///
/// Returns `None` when either series has zero variance (or fewer than two
/// points), which the caller must treat as "no relationship measurable".
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let xs = &xs[..n];
    let ys = &ys[..n];

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series(entity: &str, pattern: &[bool]) -> Vec<CompletionEvent> {
        pattern
            .iter()
            .enumerate()
            .map(|(i, &done)| {
                let date = d(i as u32 + 1);
                if done {
                    CompletionEvent::completed(entity, "u1", date)
                } else {
                    CompletionEvent::missed(entity, "u1", date)
                }
            })
            .collect()
    }

    fn analyzer() -> HabitCorrelationAnalyzer {
        HabitCorrelationAnalyzer::new(CompletionAggregator::new())
    }

    #[test]
    fn test_identical_pair_rejected() {
        let range = DateRange::new(d(1), d(5)).unwrap();
        let result = analyzer().correlate("u1", "h1", &[], "h1", &[], &range);
        assert!(matches!(result, Err(Error::IdenticalHabits(_))));
    }

    #[test]
    fn test_perfectly_aligned_series() {
        let pattern = [true, false, true, true, false, true];
        let a = series("h1", &pattern);
        let b = series("h2", &pattern);
        let range = DateRange::new(d(1), d(6)).unwrap();

        let result = analyzer()
            .correlate("u1", "h1", &a, "h2", &b, &range)
            .unwrap();
        assert!((result.coefficient - 1.0).abs() < 1e-9);
        assert_eq!(result.kind, CorrelationKind::Positive);
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn test_opposed_series_negative() {
        let a = series("h1", &[true, false, true, false, true, false]);
        let b = series("h2", &[false, true, false, true, false, true]);
        let range = DateRange::new(d(1), d(6)).unwrap();

        let result = analyzer()
            .correlate("u1", "h1", &a, "h2", &b, &range)
            .unwrap();
        assert!((result.coefficient + 1.0).abs() < 1e-9);
        assert_eq!(result.kind, CorrelationKind::Negative);
    }

    #[test]
    fn test_zero_variance_is_neutral_with_zero_confidence() {
        // Habit 1 completed every day: flat series, variance 0
        let a = series("h1", &[true, true, true, true]);
        let b = series("h2", &[true, false, true, false]);
        let range = DateRange::new(d(1), d(4)).unwrap();

        let result = analyzer()
            .correlate("u1", "h1", &a, "h2", &b, &range)
            .unwrap();
        assert_eq!(result.coefficient, 0.0);
        assert_eq!(result.kind, CorrelationKind::Neutral);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_symmetric_under_swap() {
        let a = series("h1", &[true, false, true, true, false, false, true]);
        let b = series("h2", &[true, true, false, true, false, true, false]);
        let range = DateRange::new(d(1), d(7)).unwrap();

        let forward = analyzer()
            .correlate("u1", "h1", &a, "h2", &b, &range)
            .unwrap();
        let backward = analyzer()
            .correlate("u1", "h2", &b, "h1", &a, &range)
            .unwrap();
        assert_eq!(forward.coefficient, backward.coefficient);
        assert_eq!(forward.kind, backward.kind);
        assert_eq!(forward.confidence, backward.confidence);
    }

    #[test]
    fn test_confidence_scales_with_days() {
        let range_short = DateRange::new(d(1), d(6)).unwrap();
        let range_long = DateRange::new(d(1), d(30)).unwrap();
        let a = series("h1", &[true, false, true, false, true, false]);
        let b = series("h2", &[true, false, false, false, true, true]);

        let short = analyzer()
            .correlate("u1", "h1", &a, "h2", &b, &range_short)
            .unwrap();
        let long = analyzer()
            .correlate("u1", "h1", &a, "h2", &b, &range_long)
            .unwrap();
        assert!(long.confidence >= short.confidence);
        assert!(long.confidence <= 1.0);
    }

    #[test]
    fn test_classify_bands() {
        assert_eq!(classify(0.1), CorrelationKind::Neutral);
        assert_eq!(classify(-0.19), CorrelationKind::Neutral);
        assert_eq!(classify(0.2), CorrelationKind::Positive);
        assert_eq!(classify(-0.2), CorrelationKind::Negative);
        assert_eq!(classify(0.9), CorrelationKind::Positive);
    }
}
