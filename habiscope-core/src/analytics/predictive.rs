//! Predictive habit analytics
//!
//! Builds on the aggregator's output to produce trend estimates, multi-day
//! forecasts, anomaly lists, and habit-formation-stage predictions. Every
//! operation degrades on insufficient data: a short history yields a
//! neutral trend, an empty anomaly list, or a low fixed confidence rather
//! than an error. Only genuinely malformed requests (a zero-day forecast
//! horizon) fail, and they fail before any computation starts.

use crate::analytics::aggregate::CompletionAggregator;
use crate::error::{Error, Result};
use crate::source::SnapshotStore;
use crate::types::{week_start, AnomalyKind, CompletionEvent, FormationStage};
use chrono::{Datelike, Duration, NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Records required before a trend is estimated.
const TREND_MIN_RECORDS: usize = 7;
/// Chronological bucket width for trend regression.
const TREND_BUCKET_SIZE: usize = 7;
/// Exponential decay horizon (days) applied to the trend in forecasts.
const FORECAST_DECAY_DAYS: f64 = 30.0;
/// Success-rate multiplier for Saturday and Sunday forecasts.
const WEEKEND_MULTIPLIER: f64 = 0.85;
/// Success-rate multiplier for Monday forecasts.
const MONDAY_MULTIPLIER: f64 = 0.9;
/// Records required before weekly rate anomalies are reported.
const RATE_ANOMALY_MIN_RECORDS: usize = 14;
/// Weekly rate deviation that counts as anomalous.
const RATE_DEVIATION_THRESHOLD: f64 = 0.3;
/// Timestamped completions required before timing anomalies are reported.
const TIMING_ANOMALY_MIN_RECORDS: usize = 10;
/// Hours of deviation from the mean completion hour that count as anomalous.
const TIMING_DEVIATION_HOURS: f64 = 6.0;
/// Streak length beyond which a streak is exceptional.
const EXCEPTIONAL_STREAK_DAYS: u32 = 21;
/// Records required before forecast confidence leaves its low fixed value.
const CONFIDENCE_MIN_RECORDS: usize = 14;
/// Fixed confidence for histories below `CONFIDENCE_MIN_RECORDS`.
const LOW_SAMPLE_CONFIDENCE: f64 = 0.3;
/// Records at which the data-volume confidence term saturates (n / 30).
const CONFIDENCE_VOLUME_SCALE: f64 = 30.0;

/// One forecasted day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Predicted completion probability, clamped to [0, 1]
    pub predicted_success_rate: f64,
    /// Per-day confidence in [0.1, 0.9], non-increasing over the horizon
    pub confidence: f64,
}

/// Multi-day forecast for one habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitForecast {
    pub habit_id: String,
    pub start: NaiveDate,
    pub horizon_days: u32,
    /// Exactly `horizon_days` points, one per day from `start`
    pub points: Vec<ForecastPoint>,
    /// Confidence in the forecast as a whole, in [0, 1]
    pub overall_confidence: f64,
    /// The trend slope the forecast was built from
    pub trend: f64,
}

/// A flagged deviation from the habit's usual pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub kind: AnomalyKind,
    /// Magnitude of the deviation; unit depends on the kind
    pub severity: f64,
    pub description: String,
}

/// Predicted formation-stage transition for one habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationPrediction {
    pub habit_id: String,
    pub stage: FormationStage,
    /// Estimated days until the next stage; 0 for mastery or unknown
    pub days_to_next_stage: i64,
    /// Probability the habit fully forms, in [0, 1]
    pub formation_probability: f64,
}

/// Predictive engine over one habit's completion history.
///
/// The aggregator is passed in explicitly so the engine stays
/// framework-agnostic and independently testable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictiveAnalytics {
    aggregator: CompletionAggregator,
}

impl PredictiveAnalytics {
    pub fn new(aggregator: CompletionAggregator) -> Self {
        Self { aggregator }
    }

    /// Historical success rate: completed over total, 0.0 when empty.
    pub fn success_rate(&self, records: &[CompletionEvent]) -> f64 {
        if records.is_empty() {
            return 0.0;
        }
        let completed = records.iter().filter(|r| r.completed).count();
        completed as f64 / records.len() as f64
    }

    /// Least-squares slope of bucketed success rates over time.
    ///
    /// Records are sorted chronologically and split into consecutive groups
    /// of seven; the slope regresses each bucket's success rate against its
    /// index. Histories under seven records, or with fewer than two
    /// buckets, yield a flat 0.0 trend.
    pub fn trend(&self, records: &[CompletionEvent]) -> f64 {
        if records.len() < TREND_MIN_RECORDS {
            return 0.0;
        }

        let mut sorted: Vec<&CompletionEvent> = records.iter().collect();
        sorted.sort_by_key(|r| r.date);

        let rates: Vec<f64> = sorted
            .chunks(TREND_BUCKET_SIZE)
            .map(|bucket| {
                let completed = bucket.iter().filter(|r| r.completed).count();
                completed as f64 / bucket.len() as f64
            })
            .collect();

        ols_slope(&rates)
    }

    /// Forecast completion probability for each day of the horizon.
    ///
    /// The trend's effect decays exponentially over the horizon, the
    /// prediction is clamped to [0, 1], and weekday multipliers damp
    /// weekends and Mondays. Per-day confidence shrinks linearly from 0.9
    /// towards 0.4, floored at 0.1, so it never increases along the horizon.
    pub fn forecast(
        &self,
        habit_id: &str,
        records: &[CompletionEvent],
        start: NaiveDate,
        horizon_days: u32,
    ) -> Result<HabitForecast> {
        if horizon_days == 0 {
            return Err(Error::EmptyHorizon);
        }

        let base_rate = self.success_rate(records);
        let trend = self.trend(records);
        let overall_confidence = self.forecast_confidence(records, trend);

        let points = (1..=horizon_days)
            .map(|i| {
                let date = start + Duration::days(i as i64 - 1);
                let trend_effect = trend * (-(i as f64) / FORECAST_DECAY_DAYS).exp();
                let predicted = (base_rate + trend_effect).clamp(0.0, 1.0);
                let adjusted = (predicted * weekday_multiplier(date.weekday())).clamp(0.0, 1.0);
                let confidence =
                    (0.9 - (i as f64 / horizon_days as f64) * 0.5).max(0.1);
                ForecastPoint {
                    date,
                    predicted_success_rate: adjusted,
                    confidence,
                }
            })
            .collect();

        tracing::debug!(
            habit_id,
            horizon_days,
            base_rate,
            trend,
            overall_confidence,
            "Built habit forecast"
        );

        Ok(HabitForecast {
            habit_id: habit_id.to_string(),
            start,
            horizon_days,
            points,
            overall_confidence,
            trend,
        })
    }

    /// Confidence in a forecast built from this history.
    ///
    /// Short histories get a fixed low confidence; otherwise the score
    /// averages a data-volume term with a trend-stability term (a steep
    /// trend means the habit is still moving, so predictions are shakier).
    pub fn forecast_confidence(&self, records: &[CompletionEvent], trend: f64) -> f64 {
        if records.len() < CONFIDENCE_MIN_RECORDS {
            return LOW_SAMPLE_CONFIDENCE;
        }
        let volume = (records.len() as f64 / CONFIDENCE_VOLUME_SCALE).min(0.8);
        let stability = (1.0 - 2.0 * trend.abs()).max(0.2);
        (volume + stability) / 2.0
    }

    /// Run all anomaly passes over one habit's history.
    ///
    /// Histories under fourteen records produce nothing at all, and each
    /// pass additionally requires its own minimum sample, so sparse data
    /// yields an empty list rather than spurious flags.
    pub fn detect_anomalies(&self, habit_id: &str, records: &[CompletionEvent]) -> Vec<Anomaly> {
        if records.len() < RATE_ANOMALY_MIN_RECORDS {
            return Vec::new();
        }

        let mut anomalies = Vec::new();
        anomalies.extend(self.rate_anomalies(records));
        anomalies.extend(self.timing_anomalies(records));
        anomalies.extend(self.streak_anomalies(habit_id, records));
        anomalies.sort_by_key(|a| a.date);

        tracing::debug!(
            habit_id,
            records = records.len(),
            anomalies = anomalies.len(),
            "Detected anomalies"
        );
        anomalies
    }

    /// Weeks whose completion rate deviates sharply from the overall rate.
    fn rate_anomalies(&self, records: &[CompletionEvent]) -> Vec<Anomaly> {
        if records.len() < RATE_ANOMALY_MIN_RECORDS {
            return Vec::new();
        }

        let overall = self.success_rate(records);

        let mut weeks: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
        for record in records {
            let entry = weeks.entry(week_start(record.date)).or_insert((0, 0));
            entry.0 += 1;
            if record.completed {
                entry.1 += 1;
            }
        }

        weeks
            .into_iter()
            .filter_map(|(monday, (total, completed))| {
                let week_rate = completed as f64 / total as f64;
                let deviation = week_rate - overall;
                if deviation.abs() <= RATE_DEVIATION_THRESHOLD {
                    return None;
                }
                let kind = if deviation > 0.0 {
                    AnomalyKind::UnusuallyHigh
                } else {
                    AnomalyKind::UnusuallyLow
                };
                Some(Anomaly {
                    date: monday,
                    kind,
                    severity: deviation.abs(),
                    description: format!(
                        "week of {} completed at {:.0}% against a typical {:.0}%",
                        monday,
                        week_rate * 100.0,
                        overall * 100.0
                    ),
                })
            })
            .collect()
    }

    /// Completions logged far from the habit's usual hour.
    fn timing_anomalies(&self, records: &[CompletionEvent]) -> Vec<Anomaly> {
        let timestamped: Vec<(&CompletionEvent, f64)> = records
            .iter()
            .filter(|r| r.completed)
            .filter_map(|r| r.completed_at.map(|ts| (r, ts.hour() as f64)))
            .collect();
        if timestamped.len() < TIMING_ANOMALY_MIN_RECORDS {
            return Vec::new();
        }

        let mean_hour =
            timestamped.iter().map(|(_, h)| h).sum::<f64>() / timestamped.len() as f64;

        timestamped
            .into_iter()
            .filter_map(|(record, hour)| {
                let deviation = (hour - mean_hour).abs();
                if deviation <= TIMING_DEVIATION_HOURS {
                    return None;
                }
                Some(Anomaly {
                    date: record.date,
                    kind: AnomalyKind::UnusualTiming,
                    severity: deviation,
                    description: format!(
                        "completed around {}:00, {:.1}h from the usual {:.0}:00",
                        hour as u32, deviation, mean_hour
                    ),
                })
            })
            .collect()
    }

    /// Streaks long enough to stand out on their own.
    fn streak_anomalies(&self, habit_id: &str, records: &[CompletionEvent]) -> Vec<Anomaly> {
        self.aggregator
            .streaks(records, habit_id)
            .streaks
            .into_iter()
            .filter(|s| s.length > EXCEPTIONAL_STREAK_DAYS)
            .map(|s| Anomaly {
                date: s.start,
                kind: AnomalyKind::ExceptionalStreak,
                severity: s.length as f64,
                description: format!("{}-day streak starting {}", s.length, s.start),
            })
            .collect()
    }

    /// Predict the habit's next formation-stage transition.
    ///
    /// A habit with no stored snapshot yields an `Unknown` stage with zero
    /// probability; missing analytics are not an error.
    pub fn predict_formation(
        &self,
        store: &dyn SnapshotStore,
        user_id: &str,
        habit_id: &str,
    ) -> Result<FormationPrediction> {
        let snapshot = match store.habit_snapshot(user_id, habit_id)? {
            Some(snapshot) => snapshot,
            None => {
                return Ok(FormationPrediction {
                    habit_id: habit_id.to_string(),
                    stage: FormationStage::Unknown,
                    days_to_next_stage: 0,
                    formation_probability: 0.0,
                })
            }
        };

        let stage = snapshot.stage.unwrap_or(FormationStage::Unknown);
        let sr = snapshot.success_rate;
        let consistency = snapshot.consistency;

        let days = match stage {
            FormationStage::Initiation => 21.0 - sr * 14.0,
            FormationStage::Learning => 45.0 - consistency * 24.0,
            FormationStage::Stability => 30.0 - sr * consistency * 20.0,
            FormationStage::Mastery | FormationStage::Unknown => 0.0,
        };

        let formation_probability =
            (0.4 * sr + 0.4 * consistency + 0.2 * snapshot.habit_strength).clamp(0.0, 1.0);

        Ok(FormationPrediction {
            habit_id: habit_id.to_string(),
            stage,
            days_to_next_stage: days.round().max(0.0) as i64,
            formation_probability,
        })
    }
}

/// Forecast damping for the day of week.
fn weekday_multiplier(weekday: Weekday) -> f64 {
    match weekday {
        Weekday::Sat | Weekday::Sun => WEEKEND_MULTIPLIER,
        Weekday::Mon => MONDAY_MULTIPLIER,
        _ => 1.0,
    }
}

/// Ordinary least-squares slope of values against their index.
///
/// Fewer than two points, or a degenerate denominator, yield 0.0.
fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let n = n as f64;
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::types::HabitSnapshot;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn day_n(n: u32) -> NaiveDate {
        d(1) + Duration::days(n as i64)
    }

    /// `total` daily records starting 2024-01-01 where day `i` is completed
    /// when `pattern(i)` holds.
    fn history(total: u32, pattern: impl Fn(u32) -> bool) -> Vec<CompletionEvent> {
        (0..total)
            .map(|i| {
                if pattern(i) {
                    CompletionEvent::completed("h1", "u1", day_n(i))
                } else {
                    CompletionEvent::missed("h1", "u1", day_n(i))
                }
            })
            .collect()
    }

    fn engine() -> PredictiveAnalytics {
        PredictiveAnalytics::new(CompletionAggregator::new())
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(engine().success_rate(&[]), 0.0);
        let records = history(10, |i| i < 7);
        assert!((engine().success_rate(&records) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_trend_requires_seven_records() {
        let records = history(6, |_| true);
        assert_eq!(engine().trend(&records), 0.0);
    }

    #[test]
    fn test_trend_flat_series_is_zero() {
        // 49 records in 7 buckets, every bucket at the same rate
        let records = history(49, |i| i % 7 < 4);
        let trend = engine().trend(&records);
        assert!(trend.abs() < 1e-9);
    }

    #[test]
    fn test_trend_single_bucket_is_zero() {
        // Exactly 7 records form one bucket: no slope to fit
        let records = history(7, |i| i % 2 == 0);
        assert_eq!(engine().trend(&records), 0.0);
    }

    #[test]
    fn test_trend_improving_series_positive() {
        // First two weeks mostly missed, last two mostly completed
        let records = history(28, |i| i >= 14);
        let trend = engine().trend(&records);
        assert!(trend > 0.0);

        let declining = history(28, |i| i < 14);
        assert!(engine().trend(&declining) < 0.0);
    }

    #[test]
    fn test_forecast_rejects_zero_horizon() {
        let result = engine().forecast("h1", &[], d(1), 0);
        assert!(matches!(result, Err(Error::EmptyHorizon)));
    }

    #[test]
    fn test_forecast_shape_and_bounds() {
        let records = history(30, |i| i % 3 != 0);
        let forecast = engine().forecast("h1", &records, d(31), 14).unwrap();

        assert_eq!(forecast.points.len(), 14);
        assert_eq!(forecast.points[0].date, d(31));
        for point in &forecast.points {
            assert!((0.0..=1.0).contains(&point.predicted_success_rate));
            assert!((0.1..=0.9).contains(&point.confidence));
        }
    }

    #[test]
    fn test_forecast_confidence_non_increasing() {
        let records = history(30, |i| i % 2 == 0);
        let forecast = engine().forecast("h1", &records, d(31), 10).unwrap();
        for pair in forecast.points.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_forecast_weekend_damping() {
        // Perfect completion history: base rate 1.0, flat trend
        let records = history(14, |_| true);
        // 2024-01-15 is a Monday
        let forecast = engine().forecast("h1", &records, d(15), 7).unwrap();

        let monday = &forecast.points[0];
        let tuesday = &forecast.points[1];
        let saturday = &forecast.points[5];
        assert!((monday.predicted_success_rate - 0.9).abs() < 1e-9);
        assert!((tuesday.predicted_success_rate - 1.0).abs() < 1e-9);
        assert!((saturday.predicted_success_rate - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_forecast_confidence_low_sample() {
        assert_eq!(engine().forecast_confidence(&history(13, |_| true), 0.5), 0.3);
    }

    #[test]
    fn test_forecast_confidence_blends_volume_and_stability() {
        let records = history(30, |_| true);
        // Flat trend: volume min(0.8, 1.0) = 0.8, stability 1.0 -> 0.9
        let confidence = engine().forecast_confidence(&records, 0.0);
        assert!((confidence - 0.9).abs() < 1e-9);

        // Steep trend drags stability to its 0.2 floor -> (0.8 + 0.2) / 2
        let shaky = engine().forecast_confidence(&records, 0.6);
        assert!((shaky - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_anomalies_empty_below_minimum() {
        // 13 records with wild variance still produce nothing
        let records = history(13, |i| i < 2);
        assert!(engine().detect_anomalies("h1", &records).is_empty());
    }

    #[test]
    fn test_rate_anomaly_flags_outlier_week() {
        // Three perfect weeks then one empty week: overall 0.75
        let records = history(28, |i| i < 21);
        let anomalies = engine().detect_anomalies("h1", &records);

        let low: Vec<&Anomaly> = anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::UnusuallyLow)
            .collect();
        assert_eq!(low.len(), 1);
        assert!((low[0].severity - 0.75).abs() < 1e-9);
        assert_eq!(low[0].date, week_start(day_n(21)));
    }

    #[test]
    fn test_timing_anomaly_flags_offset_completion() {
        let mut records: Vec<CompletionEvent> = (0..13)
            .map(|i| {
                let date = day_n(i);
                CompletionEvent::completed("h1", "u1", date)
                    .at(date.and_hms_opt(8, 0, 0).unwrap())
            })
            .collect();
        // One completion near midnight, far from the 8am routine
        let late = day_n(13);
        records.push(
            CompletionEvent::completed("h1", "u1", late).at(late.and_hms_opt(23, 0, 0).unwrap()),
        );

        let anomalies = engine().detect_anomalies("h1", &records);
        let timing: Vec<&Anomaly> = anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::UnusualTiming)
            .collect();
        assert_eq!(timing.len(), 1);
        assert_eq!(timing[0].date, late);
        assert!(timing[0].severity > TIMING_DEVIATION_HOURS);
    }

    #[test]
    fn test_streak_anomaly_needs_22_days() {
        let ordinary = history(21, |_| true);
        let anomalies = engine().detect_anomalies("h1", &ordinary);
        assert!(anomalies
            .iter()
            .all(|a| a.kind != AnomalyKind::ExceptionalStreak));

        let exceptional = history(22, |_| true);
        let anomalies = engine().detect_anomalies("h1", &exceptional);
        let streaks: Vec<&Anomaly> = anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::ExceptionalStreak)
            .collect();
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].severity, 22.0);
    }

    #[test]
    fn test_formation_missing_snapshot() {
        let store = MemorySource::new();
        let prediction = engine().predict_formation(&store, "u1", "h1").unwrap();
        assert_eq!(prediction.stage, FormationStage::Unknown);
        assert_eq!(prediction.days_to_next_stage, 0);
        assert_eq!(prediction.formation_probability, 0.0);
    }

    #[test]
    fn test_formation_stage_formulas() {
        let mut store = MemorySource::new();
        store.set_snapshot(
            "u1",
            "h1",
            HabitSnapshot {
                success_rate: 0.5,
                consistency: 0.75,
                habit_strength: 0.5,
                stage: Some(FormationStage::Initiation),
            },
        );
        let prediction = engine().predict_formation(&store, "u1", "h1").unwrap();
        assert_eq!(prediction.stage, FormationStage::Initiation);
        // 21 - 0.5 * 14 = 14
        assert_eq!(prediction.days_to_next_stage, 14);
        // 0.4 * 0.5 + 0.4 * 0.75 + 0.2 * 0.5 = 0.6
        assert!((prediction.formation_probability - 0.6).abs() < 1e-9);

        store.set_snapshot(
            "u1",
            "h2",
            HabitSnapshot {
                success_rate: 0.8,
                consistency: 0.5,
                habit_strength: 0.9,
                stage: Some(FormationStage::Learning),
            },
        );
        let prediction = engine().predict_formation(&store, "u1", "h2").unwrap();
        // 45 - 0.5 * 24 = 33
        assert_eq!(prediction.days_to_next_stage, 33);

        store.set_snapshot(
            "u1",
            "h3",
            HabitSnapshot {
                success_rate: 0.9,
                consistency: 0.9,
                habit_strength: 0.9,
                stage: Some(FormationStage::Mastery),
            },
        );
        let prediction = engine().predict_formation(&store, "u1", "h3").unwrap();
        assert_eq!(prediction.days_to_next_stage, 0);
    }

    #[test]
    fn test_formation_null_stage_maps_to_unknown() {
        let mut store = MemorySource::new();
        store.set_snapshot(
            "u1",
            "h1",
            HabitSnapshot {
                success_rate: 0.6,
                consistency: 0.6,
                habit_strength: 0.6,
                stage: None,
            },
        );
        let prediction = engine().predict_formation(&store, "u1", "h1").unwrap();
        assert_eq!(prediction.stage, FormationStage::Unknown);
        assert_eq!(prediction.days_to_next_stage, 0);
        // Probability still reflects the stored scores
        assert!((prediction.formation_probability - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_ols_slope() {
        assert_eq!(ols_slope(&[]), 0.0);
        assert_eq!(ols_slope(&[0.5]), 0.0);
        assert!((ols_slope(&[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((ols_slope(&[0.6, 0.6, 0.6, 0.6, 0.6, 0.6, 0.6])).abs() < 1e-9);
        assert!(ols_slope(&[0.9, 0.5, 0.1]) < 0.0);
    }
}
