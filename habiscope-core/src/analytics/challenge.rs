//! Team challenge generation
//!
//! Synthesizes a challenge specification from a group's dynamics result:
//! the weakest dimension picks the challenge kind, member-performance
//! dispersion sets the difficulty, and the target is always strictly above
//! the group's current measured value on the chosen metric.

use crate::analytics::group::GroupDynamicsResult;
use crate::types::{ChallengeKind, ChallengeStatus, Difficulty, Priority};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Cohesion below which the group needs a participation challenge.
const LOW_COHESION_THRESHOLD: f64 = 0.4;
/// Momentum below which the group needs a streak challenge.
const LOW_MOMENTUM_THRESHOLD: f64 = 0.5;
/// Rate ceiling above which a rate-based target cannot meaningfully stretch.
const RATE_SATURATION: f64 = 0.95;
/// Momentum below which a challenge is high priority.
const HIGH_PRIORITY_MOMENTUM: f64 = 0.35;
/// Momentum below which a challenge is normal priority.
const NORMAL_PRIORITY_MOMENTUM: f64 = 0.65;

/// The numeric goal of a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeTarget {
    /// Metric the group is asked to move, e.g. "completion_rate"
    pub metric: String,
    pub target_value: f64,
    /// Unit of the target value, e.g. "ratio" or "days"
    pub unit: String,
}

/// A generated team challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSpec {
    pub group_id: String,
    pub title: String,
    pub description: String,
    pub kind: ChallengeKind,
    pub target: ChallengeTarget,
    pub duration_days: u32,
    pub difficulty: Difficulty,
    pub priority: Priority,
    pub rewards: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ChallengeStatus,
}

/// Generator calibrating challenges to a group's current dynamics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamChallengeGenerator;

impl TeamChallengeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Build a challenge from a dynamics result, starting on `start_date`.
    pub fn generate(&self, dynamics: &GroupDynamicsResult, start_date: NaiveDate) -> ChallengeSpec {
        let difficulty = difficulty_for(dynamics.cohesion_score);
        let kind = self.pick_kind(dynamics);
        let target = self.target_for(kind, dynamics, difficulty);
        let duration_days = duration_for(difficulty);
        let priority = priority_for(dynamics.momentum_score);
        let (title, description) = copy_for(kind, &target);

        tracing::debug!(
            group_id = %dynamics.group_id,
            kind = kind.as_str(),
            difficulty = difficulty.as_str(),
            target_value = target.target_value,
            "Generated team challenge"
        );

        ChallengeSpec {
            group_id: dynamics.group_id.clone(),
            title,
            description,
            kind,
            target,
            duration_days,
            difficulty,
            priority,
            rewards: rewards_for(difficulty),
            start_date,
            end_date: start_date + Duration::days(duration_days as i64 - 1),
            status: ChallengeStatus::Pending,
        }
    }

    /// The weakest dimension decides what the group should work on.
    ///
    /// Rate-based kinds fall back to the streak challenge when the current
    /// rate is already saturated, so the target can stay strictly above the
    /// measured value.
    fn pick_kind(&self, dynamics: &GroupDynamicsResult) -> ChallengeKind {
        let kind = if dynamics.cohesion_score < LOW_COHESION_THRESHOLD {
            ChallengeKind::Participation
        } else if dynamics.momentum_score < LOW_MOMENTUM_THRESHOLD {
            ChallengeKind::GroupStreak
        } else {
            ChallengeKind::CompletionRate
        };

        let current_rate = match kind {
            ChallengeKind::CompletionRate => dynamics.participation.completion_rate,
            ChallengeKind::Participation => dynamics.participation.participation_rate,
            ChallengeKind::GroupStreak => return kind,
        };
        if current_rate > RATE_SATURATION {
            ChallengeKind::GroupStreak
        } else {
            kind
        }
    }

    fn target_for(
        &self,
        kind: ChallengeKind,
        dynamics: &GroupDynamicsResult,
        difficulty: Difficulty,
    ) -> ChallengeTarget {
        match kind {
            ChallengeKind::CompletionRate => ChallengeTarget {
                metric: "completion_rate".to_string(),
                target_value: stretch_rate(
                    dynamics.participation.completion_rate,
                    rate_stretch(difficulty),
                ),
                unit: "ratio".to_string(),
            },
            ChallengeKind::Participation => ChallengeTarget {
                metric: "participation_rate".to_string(),
                target_value: stretch_rate(
                    dynamics.participation.participation_rate,
                    rate_stretch(difficulty),
                ),
                unit: "ratio".to_string(),
            },
            ChallengeKind::GroupStreak => ChallengeTarget {
                metric: "group_streak".to_string(),
                target_value: (dynamics.group_streak + streak_stretch(difficulty)) as f64,
                unit: "days".to_string(),
            },
        }
    }
}

/// A tight group can take a harder stretch.
fn difficulty_for(cohesion_score: f64) -> Difficulty {
    if cohesion_score >= 0.75 {
        Difficulty::Hard
    } else if cohesion_score >= 0.45 {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    }
}

fn rate_stretch(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 0.05,
        Difficulty::Medium => 0.10,
        Difficulty::Hard => 0.15,
    }
}

fn streak_stretch(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 3,
        Difficulty::Medium => 5,
        Difficulty::Hard => 7,
    }
}

/// Raise a rate by the stretch, capped at 1.0 but strictly above `current`.
///
/// Callers guarantee `current` is below the saturation ceiling, so the cap
/// never collapses the target onto the current value.
fn stretch_rate(current: f64, stretch: f64) -> f64 {
    (current + stretch).min(1.0).max(current + 0.01)
}

fn duration_for(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 7,
        Difficulty::Medium => 14,
        Difficulty::Hard => 21,
    }
}

fn priority_for(momentum_score: f64) -> Priority {
    if momentum_score < HIGH_PRIORITY_MOMENTUM {
        Priority::High
    } else if momentum_score < NORMAL_PRIORITY_MOMENTUM {
        Priority::Normal
    } else {
        Priority::Low
    }
}

fn rewards_for(difficulty: Difficulty) -> Vec<String> {
    let rewards: &[&str] = match difficulty {
        Difficulty::Easy => &["momentum badge"],
        Difficulty::Medium => &["momentum badge", "team spotlight"],
        Difficulty::Hard => &["momentum badge", "team spotlight", "champion trophy"],
    };
    rewards.iter().map(|r| r.to_string()).collect()
}

fn copy_for(kind: ChallengeKind, target: &ChallengeTarget) -> (String, String) {
    match kind {
        ChallengeKind::CompletionRate => (
            "Raise the bar".to_string(),
            format!(
                "Push the group completion rate to {:.0}% together.",
                target.target_value * 100.0
            ),
        ),
        ChallengeKind::GroupStreak => (
            "Keep the chain alive".to_string(),
            format!(
                "Hit the group goal {} days in a row.",
                target.target_value as u32
            ),
        ),
        ChallengeKind::Participation => (
            "Everyone in".to_string(),
            format!(
                "Get {:.0}% of members checking in during the challenge.",
                target.target_value * 100.0
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::group::{GroupDynamicsResult, ParticipationMetrics};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
    }

    fn dynamics(momentum: f64, cohesion: f64, completion_rate: f64) -> GroupDynamicsResult {
        GroupDynamicsResult {
            group_id: "g1".to_string(),
            start: d(1),
            end: d(28),
            momentum_score: momentum,
            cohesion_score: cohesion,
            synergy_score: 0.5,
            group_streak: 4,
            key_contributors: vec![],
            participation: ParticipationMetrics {
                total_members: 5,
                active_members: 4,
                participation_rate: 0.8,
                total_attempts: 100,
                total_completions: (completion_rate * 100.0) as u32,
                completion_rate,
            },
        }
    }

    #[test]
    fn test_healthy_group_gets_rate_challenge() {
        let spec = TeamChallengeGenerator::new().generate(&dynamics(0.7, 0.8, 0.6), d(1));

        assert_eq!(spec.kind, ChallengeKind::CompletionRate);
        assert_eq!(spec.difficulty, Difficulty::Hard);
        assert_eq!(spec.priority, Priority::Low);
        assert_eq!(spec.duration_days, 21);
        assert_eq!(spec.status, ChallengeStatus::Pending);
        assert_eq!(spec.end_date, d(21));
        // Hard stretch: 0.6 + 0.15
        assert!((spec.target.target_value - 0.75).abs() < 1e-9);
        assert!(spec.target.target_value > 0.6);
        assert_eq!(spec.rewards.len(), 3);
    }

    #[test]
    fn test_scattered_group_gets_participation_challenge() {
        let spec = TeamChallengeGenerator::new().generate(&dynamics(0.7, 0.3, 0.6), d(1));

        assert_eq!(spec.kind, ChallengeKind::Participation);
        assert_eq!(spec.difficulty, Difficulty::Easy);
        assert_eq!(spec.duration_days, 7);
        // Easy stretch over the 0.8 participation rate
        assert!((spec.target.target_value - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_stalled_group_gets_streak_challenge() {
        let spec = TeamChallengeGenerator::new().generate(&dynamics(0.3, 0.6, 0.6), d(1));

        assert_eq!(spec.kind, ChallengeKind::GroupStreak);
        assert_eq!(spec.priority, Priority::High);
        assert_eq!(spec.difficulty, Difficulty::Medium);
        // Streak of 4 plus the medium stretch of 5
        assert_eq!(spec.target.target_value, 9.0);
        assert_eq!(spec.target.unit, "days");
    }

    #[test]
    fn test_saturated_rate_falls_back_to_streak() {
        let spec = TeamChallengeGenerator::new().generate(&dynamics(0.7, 0.8, 0.99), d(1));

        assert_eq!(spec.kind, ChallengeKind::GroupStreak);
        assert!(spec.target.target_value > 4.0);
    }

    #[test]
    fn test_target_strictly_above_current() {
        for rate in [0.0, 0.2, 0.5, 0.9, 0.94] {
            let spec = TeamChallengeGenerator::new().generate(&dynamics(0.7, 0.8, rate), d(1));
            assert_eq!(spec.kind, ChallengeKind::CompletionRate);
            assert!(
                spec.target.target_value > rate,
                "target {} not above current {}",
                spec.target.target_value,
                rate
            );
            assert!(spec.target.target_value <= 1.0);
        }
    }

    #[test]
    fn test_stretch_rate_caps_at_one() {
        assert!((stretch_rate(0.92, 0.15) - 1.0).abs() < 1e-9);
        assert!(stretch_rate(0.92, 0.15) > 0.92);
    }
}
