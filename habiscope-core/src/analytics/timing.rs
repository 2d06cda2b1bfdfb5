//! Optimal timing analysis
//!
//! Buckets timestamped completions by hour of day and day of week, then
//! searches for the contiguous hour window with the best aggregate success
//! rate. Buckets with fewer attempts than the configured floor are excluded
//! from window selection but still reported in the stats.

use crate::analytics::aggregate::{CompletionAggregator, HourlyStat};
use crate::config::AnalyticsConfig;
use crate::types::CompletionEvent;
use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

/// Attempt counts for one day-of-week bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStat {
    pub weekday: Weekday,
    pub total_attempts: u32,
    pub successful_attempts: u32,
    pub success_rate: f64,
}

/// A contiguous range of hours with its aggregate success rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First hour of the window, 0-23
    pub start_hour: u8,
    /// Last hour of the window, inclusive
    pub end_hour: u8,
    /// Completions over attempts across the window's buckets
    pub success_rate: f64,
    /// Total attempts across the window's buckets
    pub sample_size: u32,
}

/// Full timing analysis for one habit's completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingAnalysis {
    /// All 24 hour buckets, including empty ones
    pub hourly: Vec<HourlyStat>,
    /// All 7 weekday buckets, Monday first
    pub weekdays: Vec<WeekdayStat>,
    /// Best candidate window, `None` when no window meets the sample floor
    pub optimal_window: Option<TimeWindow>,
    /// Every candidate window, best first
    pub best_windows: Vec<TimeWindow>,
}

/// Analyzer for per-hour and per-weekday completion patterns.
#[derive(Debug, Clone)]
pub struct OptimalTimingAnalyzer {
    aggregator: CompletionAggregator,
    /// Minimum attempts an hour bucket needs to join a window
    sample_floor: u32,
    /// Widest window considered, in hours
    max_window_hours: u32,
}

impl OptimalTimingAnalyzer {
    pub fn new(aggregator: CompletionAggregator, sample_floor: u32, max_window_hours: u32) -> Self {
        Self {
            aggregator,
            sample_floor: sample_floor.max(1),
            max_window_hours: max_window_hours.clamp(1, 24),
        }
    }

    /// Build an analyzer from the analytics configuration.
    pub fn from_config(aggregator: CompletionAggregator, config: &AnalyticsConfig) -> Self {
        Self::new(
            aggregator,
            config.timing_sample_floor,
            config.max_window_hours,
        )
    }

    /// Analyze hour-of-day and day-of-week success patterns.
    pub fn analyze(&self, records: &[CompletionEvent]) -> TimingAnalysis {
        let hourly = self.aggregator.time_patterns(records).hours;
        let weekdays = weekday_stats(records);
        let best_windows = self.candidate_windows(&hourly);
        let optimal_window = best_windows.first().cloned();

        tracing::debug!(
            records = records.len(),
            candidates = best_windows.len(),
            "Analyzed completion timing"
        );

        TimingAnalysis {
            hourly,
            weekdays,
            optimal_window,
            best_windows,
        }
    }

    /// Enumerate contiguous hour windows whose buckets all meet the floor,
    /// ranked by success rate descending, ties broken by larger sample.
    fn candidate_windows(&self, hourly: &[HourlyStat]) -> Vec<TimeWindow> {
        let mut windows = Vec::new();
        for len in 1..=self.max_window_hours as usize {
            for start in 0..=(24 - len) {
                let buckets = &hourly[start..start + len];
                if buckets.iter().any(|b| b.total_attempts < self.sample_floor) {
                    continue;
                }
                let attempts: u32 = buckets.iter().map(|b| b.total_attempts).sum();
                let successes: u32 = buckets.iter().map(|b| b.successful_attempts).sum();
                windows.push(TimeWindow {
                    start_hour: start as u8,
                    end_hour: (start + len - 1) as u8,
                    success_rate: successes as f64 / attempts as f64,
                    sample_size: attempts,
                });
            }
        }

        windows.sort_by(|a, b| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.sample_size.cmp(&a.sample_size))
                .then(a.start_hour.cmp(&b.start_hour))
        });
        windows
    }
}

/// Bucket events by the weekday of their calendar date.
fn weekday_stats(records: &[CompletionEvent]) -> Vec<WeekdayStat> {
    let mut buckets = [(0u32, 0u32); 7];
    for record in records {
        let idx = record.date.weekday().num_days_from_monday() as usize;
        buckets[idx].0 += 1;
        if record.completed {
            buckets[idx].1 += 1;
        }
    }

    const WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    WEEKDAYS
        .iter()
        .zip(buckets.iter())
        .map(|(&weekday, &(total, successful))| WeekdayStat {
            weekday,
            total_attempts: total,
            successful_attempts: successful,
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64
            },
        })
        .collect()
}
