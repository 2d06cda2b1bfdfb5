//! Completion data aggregation
//!
//! Turns raw per-day completion events into daily, weekly, and hourly
//! aggregates plus streak (consecutive-run) analyses. Everything here is a
//! pure function of its inputs: identical records always produce identical
//! aggregates, and empty input degrades to zero-valued stats instead of
//! erroring.
//!
//! ## Aggregates Produced
//!
//! | Output | Description |
//! |--------|-------------|
//! | [`DailyAggregation`] | One [`DailyStat`] per calendar day in range |
//! | [`WeeklyAggregation`] | Monday-aligned weeks with 7 weekday rate slots |
//! | [`TimePatternAggregation`] | Hour-of-day success buckets, all 24 present |
//! | [`StreakAnalysis`] | Current/max streak plus every streak period |
//! | [`GroupAggregation`] | Daily stats fanned in across group-habit entities |

use crate::types::{week_start, CompletionEvent, DateRange};
use chrono::{Datelike, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Completion counts and rate for a single calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    /// Number of habit attempts recorded that day
    pub total_habits: u32,
    /// How many of those attempts were completed
    pub completed_habits: u32,
    /// `completed / total`, 0.0 for a day with no records
    pub completion_rate: f64,
}

/// Per-day stats for a date range plus their mean rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregation {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// One entry per calendar day in `[start, end]`, in order
    pub days: Vec<DailyStat>,
    /// Mean of the per-day rates, 0.0 when the range is empty
    pub average_rate: f64,
}

/// Completion rates for one Monday-aligned week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStat {
    /// Monday of the week
    pub week_start: NaiveDate,
    /// Mean rate over the week's days that fall inside the queried range
    pub completion_rate: f64,
    /// Rate per weekday, Monday first; days outside the range stay 0.0
    pub daily_rates: [f64; 7],
}

/// Weekly stats for a date range, ascending by week start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAggregation {
    pub weeks: Vec<WeeklyStat>,
}

/// Attempt counts for one hour-of-day bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyStat {
    /// Hour of day, 0-23
    pub hour: u8,
    pub total_attempts: u32,
    pub successful_attempts: u32,
    /// `successful / total`, 0.0 for an empty bucket
    pub success_rate: f64,
}

/// Hour-of-day aggregation over timestamped events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePatternAggregation {
    /// Exactly 24 entries, hour 0 through 23
    pub hours: Vec<HourlyStat>,
    /// Hour with the highest success rate; `None` when no event carried a
    /// timestamp
    pub peak_hour: Option<u8>,
}

/// A maximal run of consecutive completed calendar dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Number of consecutive completed dates, always > 0
    pub length: u32,
}

/// Streak summary for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakAnalysis {
    /// Length of the run ending at the most recent completed date, but only
    /// when no later (gap-introducing) date exists in the input
    pub current_streak: u32,
    /// Longest run observed
    pub max_streak: u32,
    /// Every streak period, ascending by start date, non-overlapping
    pub streaks: Vec<StreakPeriod>,
}

/// Daily aggregation fanned in across a group's habit entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregation {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Group-wide daily stats, one per calendar day in range
    pub days: Vec<DailyStat>,
    /// Mean of the per-day group rates
    pub average_rate: f64,
    /// Per-entity attempt counts per day; only days with activity appear
    pub participation: BTreeMap<String, BTreeMap<NaiveDate, u32>>,
}

/// Stateless aggregator over completion events.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionAggregator;

impl CompletionAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate records into one [`DailyStat`] per calendar day.
    ///
    /// Days without records get zero counts and a 0.0 rate; the overall
    /// average is the mean of the per-day rates.
    pub fn daily(&self, records: &[CompletionEvent], range: &DateRange) -> DailyAggregation {
        let mut per_day: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
        for record in records {
            if !range.contains(record.date) {
                continue;
            }
            let entry = per_day.entry(record.date).or_insert((0, 0));
            entry.0 += 1;
            if record.completed {
                entry.1 += 1;
            }
        }

        let days: Vec<DailyStat> = range
            .days()
            .map(|date| {
                let (total, completed) = per_day.get(&date).copied().unwrap_or((0, 0));
                DailyStat {
                    date,
                    total_habits: total,
                    completed_habits: completed,
                    completion_rate: rate(completed, total),
                }
            })
            .collect();

        let average_rate = mean(days.iter().map(|d| d.completion_rate));

        DailyAggregation {
            start: range.start(),
            end: range.end(),
            days,
            average_rate,
        }
    }

    /// Partition the range's days into Monday-aligned weeks.
    ///
    /// Each week carries all 7 weekday slots; slots for days outside the
    /// queried range stay 0.0. The week rate averages only the days that are
    /// actually inside the range.
    pub fn weekly(&self, records: &[CompletionEvent], range: &DateRange) -> WeeklyAggregation {
        let daily = self.daily(records, range);

        let mut weeks: BTreeMap<NaiveDate, (Vec<f64>, [f64; 7])> = BTreeMap::new();
        for stat in &daily.days {
            let monday = week_start(stat.date);
            let entry = weeks.entry(monday).or_insert_with(|| (Vec::new(), [0.0; 7]));
            entry.0.push(stat.completion_rate);
            entry.1[stat.date.weekday().num_days_from_monday() as usize] = stat.completion_rate;
        }

        let weeks = weeks
            .into_iter()
            .map(|(monday, (rates, daily_rates))| WeeklyStat {
                week_start: monday,
                completion_rate: mean(rates.iter().copied()),
                daily_rates,
            })
            .collect();

        WeeklyAggregation { weeks }
    }

    /// Bucket timestamped events by hour of day.
    ///
    /// Events without a `completed_at` timestamp are skipped. Every hour is
    /// present in the output even with zero attempts; `peak_hour` picks the
    /// non-empty bucket with the highest success rate.
    pub fn time_patterns(&self, records: &[CompletionEvent]) -> TimePatternAggregation {
        let mut buckets = [(0u32, 0u32); 24];
        for record in records {
            if let Some(ts) = record.completed_at {
                let hour = ts.hour() as usize;
                buckets[hour].0 += 1;
                if record.completed {
                    buckets[hour].1 += 1;
                }
            }
        }

        let hours: Vec<HourlyStat> = buckets
            .iter()
            .enumerate()
            .map(|(hour, &(total, successful))| HourlyStat {
                hour: hour as u8,
                total_attempts: total,
                successful_attempts: successful,
                success_rate: rate(successful, total),
            })
            .collect();

        let mut peak_hour = None;
        let mut peak_rate = f64::NEG_INFINITY;
        for stat in &hours {
            if stat.total_attempts > 0 && stat.success_rate > peak_rate {
                peak_rate = stat.success_rate;
                peak_hour = Some(stat.hour);
            }
        }

        TimePatternAggregation { hours, peak_hour }
    }

    /// Extract every streak of consecutive completed dates for one entity.
    ///
    /// Records for other entities are ignored. The current streak only
    /// counts when the final run ends at the latest date present in the
    /// entity's input, completed or not: a trailing missed day breaks it.
    pub fn streaks(&self, records: &[CompletionEvent], entity_id: &str) -> StreakAnalysis {
        let mut completed_dates: Vec<NaiveDate> = records
            .iter()
            .filter(|r| r.entity_id == entity_id && r.completed)
            .map(|r| r.date)
            .collect();
        completed_dates.sort();
        completed_dates.dedup();

        let latest_input_date = records
            .iter()
            .filter(|r| r.entity_id == entity_id)
            .map(|r| r.date)
            .max();

        let mut streaks: Vec<StreakPeriod> = Vec::new();
        for &date in &completed_dates {
            match streaks.last_mut() {
                Some(run) if date == run.end + chrono::Duration::days(1) => {
                    run.end = date;
                    run.length += 1;
                }
                _ => streaks.push(StreakPeriod {
                    start: date,
                    end: date,
                    length: 1,
                }),
            }
        }

        let max_streak = streaks.iter().map(|s| s.length).max().unwrap_or(0);
        let current_streak = match (streaks.last(), latest_input_date) {
            (Some(last_run), Some(latest)) if last_run.end == latest => last_run.length,
            _ => 0,
        };

        StreakAnalysis {
            current_streak,
            max_streak,
            streaks,
        }
    }

    /// Daily aggregation fanning in every entity of a group.
    ///
    /// Totals sum across entities per day; `participation` additionally
    /// tracks how many attempts each entity saw on each day.
    pub fn group_daily(
        &self,
        records_by_entity: &BTreeMap<String, Vec<CompletionEvent>>,
        range: &DateRange,
    ) -> GroupAggregation {
        let mut per_day: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
        let mut participation: BTreeMap<String, BTreeMap<NaiveDate, u32>> = BTreeMap::new();

        for (entity_id, records) in records_by_entity {
            for record in records {
                if !range.contains(record.date) {
                    continue;
                }
                let entry = per_day.entry(record.date).or_insert((0, 0));
                entry.0 += 1;
                if record.completed {
                    entry.1 += 1;
                }
                *participation
                    .entry(entity_id.clone())
                    .or_default()
                    .entry(record.date)
                    .or_insert(0) += 1;
            }
        }

        let days: Vec<DailyStat> = range
            .days()
            .map(|date| {
                let (total, completed) = per_day.get(&date).copied().unwrap_or((0, 0));
                DailyStat {
                    date,
                    total_habits: total,
                    completed_habits: completed,
                    completion_rate: rate(completed, total),
                }
            })
            .collect();

        let average_rate = mean(days.iter().map(|d| d.completion_rate));

        GroupAggregation {
            start: range.start(),
            end: range.end(),
            days,
            average_rate,
            participation,
        }
    }
}

/// `completed / total` guarded against an empty denominator.
fn rate(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

/// Mean of an iterator of values, 0.0 when empty.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
