//! Group dynamics scoring
//!
//! Consumes a group's completion events over a date range and produces
//! momentum, cohesion, and synergy scores, the group streak, ranked key
//! contributors, and participation metrics. All scores are bounded to
//! [0, 1] regardless of input.
//!
//! ## Scores
//!
//! | Score | Meaning |
//! |-------|---------|
//! | momentum | Recency-weighted level of recent collective activity |
//! | cohesion | How uniformly members participate (low dispersion = high) |
//! | synergy | Excess of observed group rate over the member-rate baseline |

use crate::analytics::aggregate::CompletionAggregator;
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::types::{CompletionEvent, ContributorKind, DateRange};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days at the end of the range that count as "recent" for contributors.
const RECENCY_WINDOW_DAYS: i64 = 7;
/// Completion rate at or above which a high-volume member leads.
const LEADER_RATE_THRESHOLD: f64 = 0.75;
/// Volume factor a leader additionally needs.
const LEADER_VOLUME_THRESHOLD: f64 = 0.5;
/// Completion rate at or above which a member is consistent.
const CONSISTENT_RATE_THRESHOLD: f64 = 0.5;

/// One member's contribution summary, ranked within the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyContributor {
    pub user_id: String,
    pub total_attempts: u32,
    pub successful_completions: u32,
    pub completion_rate: f64,
    /// Blend of rate, volume, and recency used for ranking
    pub contribution_score: f64,
    pub kind: ContributorKind,
}

/// Membership and volume metrics for the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationMetrics {
    pub total_members: u32,
    /// Members with at least one event in range
    pub active_members: u32,
    /// `active / total`, 0.0 for an empty roster
    pub participation_rate: f64,
    pub total_attempts: u32,
    pub total_completions: u32,
    /// `completions / attempts`, 0.0 with no attempts
    pub completion_rate: f64,
}

/// Full dynamics result for one group and range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDynamicsResult {
    pub group_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Recency-weighted activity score in [0, 1]
    pub momentum_score: f64,
    /// Participation uniformity score in [0, 1]
    pub cohesion_score: f64,
    /// Collective over-performance score in [0, 1]
    pub synergy_score: f64,
    /// Longest run of consecutive days above the rate floor
    pub group_streak: u32,
    /// Members ranked by contribution score, best first
    pub key_contributors: Vec<KeyContributor>,
    pub participation: ParticipationMetrics,
}

/// Engine computing collective scores for a group.
#[derive(Debug, Clone)]
pub struct GroupDynamicsEngine {
    aggregator: CompletionAggregator,
    /// Exponential decay constant (days) for momentum weighting
    momentum_decay_days: f64,
    /// Daily rate a day must exceed to extend the group streak
    rate_floor: f64,
}

impl GroupDynamicsEngine {
    pub fn new(aggregator: CompletionAggregator, momentum_decay_days: f64, rate_floor: f64) -> Self {
        Self {
            aggregator,
            momentum_decay_days: momentum_decay_days.max(f64::EPSILON),
            rate_floor,
        }
    }

    /// Build an engine from the analytics configuration.
    pub fn from_config(aggregator: CompletionAggregator, config: &AnalyticsConfig) -> Self {
        Self::new(
            aggregator,
            config.momentum_decay_days,
            config.group_rate_floor,
        )
    }

    /// Score a group's dynamics over a range.
    ///
    /// `members` is the group roster; events from users outside it still
    /// count toward collective totals but the roster drives participation
    /// metrics. Empty input degrades to all-zero scores.
    pub fn analyze(
        &self,
        group_id: &str,
        members: &[String],
        records: &[CompletionEvent],
        range: &DateRange,
    ) -> Result<GroupDynamicsResult> {
        let daily = self.aggregator.daily(records, range);
        let daily_rates: Vec<f64> = daily.days.iter().map(|d| d.completion_rate).collect();

        let per_member = tally_members(records);
        let momentum_score = self.momentum(&daily_rates);
        let cohesion_score = cohesion(&per_member, range);
        let synergy_score = synergy(&per_member, records);
        let group_streak = streak_above_floor(&daily_rates, self.rate_floor);
        let key_contributors = self.rank_contributors(&per_member, range);
        let participation = participation_metrics(members, &per_member, records);

        tracing::debug!(
            group_id,
            members = members.len(),
            records = records.len(),
            momentum_score,
            cohesion_score,
            synergy_score,
            "Scored group dynamics"
        );

        Ok(GroupDynamicsResult {
            group_id: group_id.to_string(),
            start: range.start(),
            end: range.end(),
            momentum_score,
            cohesion_score,
            synergy_score,
            group_streak,
            key_contributors,
            participation,
        })
    }

    /// Exponentially recency-weighted mean of the daily rates.
    ///
    /// The most recent day carries full weight and each earlier day decays
    /// by `e^(-age/decay)`; the weighted mean keeps the score in [0, 1].
    fn momentum(&self, daily_rates: &[f64]) -> f64 {
        if daily_rates.is_empty() {
            return 0.0;
        }
        let last = daily_rates.len() - 1;
        let mut weighted = 0.0;
        let mut weights = 0.0;
        for (i, rate) in daily_rates.iter().enumerate() {
            let age = (last - i) as f64;
            let weight = (-age / self.momentum_decay_days).exp();
            weighted += weight * rate;
            weights += weight;
        }
        (weighted / weights).clamp(0.0, 1.0)
    }

    /// Rank members by contribution score, best first.
    fn rank_contributors(
        &self,
        per_member: &BTreeMap<String, MemberTally>,
        range: &DateRange,
    ) -> Vec<KeyContributor> {
        let range_days = range.len_days() as f64;
        let recent_cutoff = range.end() - Duration::days(RECENCY_WINDOW_DAYS - 1);

        let mut contributors: Vec<KeyContributor> = per_member
            .iter()
            .map(|(user_id, tally)| {
                let rate = if tally.attempts == 0 {
                    0.0
                } else {
                    tally.completions as f64 / tally.attempts as f64
                };
                let volume = (tally.attempts as f64 / range_days).min(1.0);
                let recent = tally
                    .completion_dates
                    .iter()
                    .filter(|d| **d >= recent_cutoff)
                    .count();
                let recency = if tally.completions == 0 {
                    0.0
                } else {
                    recent as f64 / tally.completions as f64
                };
                let contribution_score = 0.5 * rate + 0.3 * volume + 0.2 * recency;

                let kind = if rate >= LEADER_RATE_THRESHOLD && volume >= LEADER_VOLUME_THRESHOLD {
                    ContributorKind::Leader
                } else if rate >= CONSISTENT_RATE_THRESHOLD {
                    ContributorKind::Consistent
                } else {
                    ContributorKind::Occasional
                };

                KeyContributor {
                    user_id: user_id.clone(),
                    total_attempts: tally.attempts,
                    successful_completions: tally.completions,
                    completion_rate: rate,
                    contribution_score,
                    kind,
                }
            })
            .collect();

        contributors.sort_by(|a, b| {
            b.contribution_score
                .partial_cmp(&a.contribution_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        contributors
    }
}

/// Per-member attempt/completion tally.
#[derive(Debug, Default)]
struct MemberTally {
    attempts: u32,
    completions: u32,
    active_dates: Vec<NaiveDate>,
    completion_dates: Vec<NaiveDate>,
}

fn tally_members(records: &[CompletionEvent]) -> BTreeMap<String, MemberTally> {
    let mut per_member: BTreeMap<String, MemberTally> = BTreeMap::new();
    for record in records {
        let tally = per_member.entry(record.user_id.clone()).or_default();
        tally.attempts += 1;
        tally.active_dates.push(record.date);
        if record.completed {
            tally.completions += 1;
            tally.completion_dates.push(record.date);
        }
    }
    per_member
}

/// Inverse dispersion of member participation rates.
///
/// Participation rate is the fraction of range days a member was active on.
/// Rates live in [0, 1], so twice their population standard deviation spans
/// [0, 1] and `1 - 2σ` lands back in [0, 1] after clamping.
fn cohesion(per_member: &BTreeMap<String, MemberTally>, range: &DateRange) -> f64 {
    if per_member.is_empty() {
        return 0.0;
    }
    let range_days = range.len_days() as f64;
    let rates: Vec<f64> = per_member
        .values()
        .map(|tally| {
            let mut dates = tally.active_dates.clone();
            dates.sort();
            dates.dedup();
            dates.len() as f64 / range_days
        })
        .collect();

    let mean = rates.iter().sum::<f64>() / rates.len() as f64;
    let variance =
        rates.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / rates.len() as f64;
    (1.0 - 2.0 * variance.sqrt()).clamp(0.0, 1.0)
}

/// Observed collective rate against the independent member-rate baseline.
///
/// The baseline is the unweighted mean of member completion rates; the
/// observed value is event-weighted, so members who over-perform at volume
/// push the score above the neutral 0.5.
fn synergy(per_member: &BTreeMap<String, MemberTally>, records: &[CompletionEvent]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let observed =
        records.iter().filter(|r| r.completed).count() as f64 / records.len() as f64;
    let member_rates: Vec<f64> = per_member
        .values()
        .filter(|t| t.attempts > 0)
        .map(|t| t.completions as f64 / t.attempts as f64)
        .collect();
    if member_rates.is_empty() {
        return 0.0;
    }
    let expected = member_rates.iter().sum::<f64>() / member_rates.len() as f64;
    (0.5 + observed - expected).clamp(0.0, 1.0)
}

/// Longest run of consecutive days whose rate exceeds the floor.
fn streak_above_floor(daily_rates: &[f64], floor: f64) -> u32 {
    let mut longest = 0u32;
    let mut current = 0u32;
    for &rate in daily_rates {
        if rate > floor {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn participation_metrics(
    members: &[String],
    per_member: &BTreeMap<String, MemberTally>,
    records: &[CompletionEvent],
) -> ParticipationMetrics {
    let active_members = per_member.len() as u32;
    let total_members = (members.len() as u32).max(active_members);
    let total_attempts = records.len() as u32;
    let total_completions = records.iter().filter(|r| r.completed).count() as u32;

    ParticipationMetrics {
        total_members,
        active_members,
        participation_rate: if total_members == 0 {
            0.0
        } else {
            active_members as f64 / total_members as f64
        },
        total_attempts,
        total_completions,
        completion_rate: if total_attempts == 0 {
            0.0
        } else {
            total_completions as f64 / total_attempts as f64
        },
    }
}
