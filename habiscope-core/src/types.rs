//! Core domain types for habiscope
//!
//! These types form the input contract of the analytics engines: plain
//! immutable value records with no persistence lifecycle. The (out-of-scope)
//! API layer owns how they are stored and served; the engines only read them.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Entity** | A habit or a group habit, identified by an opaque id |
//! | **CompletionEvent** | One user's completion record for an entity on one day |
//! | **Snapshot** | Stored per-user-per-habit analytics (success rate, stage, ...) |
//! | **Streak** | A maximal run of consecutive calendar dates with a completion |
//! | **Formation stage** | Behavioral progression of habit entrenchment |

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================
// Completion events
// ============================================

/// A raw completion record for one entity, user, and day.
///
/// Produced by the external record source and immutable once supplied.
/// Under normal operation there is one event per entity/user/date; duplicates
/// are tolerated by the engines but not deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Habit or group-habit id
    pub entity_id: String,
    /// User who attempted the habit
    pub user_id: String,
    /// Calendar day the attempt belongs to
    pub date: NaiveDate,
    /// Whether the habit was completed that day
    pub completed: bool,
    /// Exact completion time, when the client recorded one
    pub completed_at: Option<NaiveDateTime>,
}

impl CompletionEvent {
    /// Create a completed event without a timestamp.
    pub fn completed(entity_id: &str, user_id: &str, date: NaiveDate) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            user_id: user_id.to_string(),
            date,
            completed: true,
            completed_at: None,
        }
    }

    /// Create a missed (not completed) event.
    pub fn missed(entity_id: &str, user_id: &str, date: NaiveDate) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            user_id: user_id.to_string(),
            date,
            completed: false,
            completed_at: None,
        }
    }

    /// Attach a completion timestamp.
    pub fn at(mut self, ts: NaiveDateTime) -> Self {
        self.completed_at = Some(ts);
        self
    }
}

// ============================================
// Date ranges
// ============================================

/// An inclusive calendar date range.
///
/// The only way to build one is [`DateRange::new`], which rejects ranges
/// where the end precedes the start. Every engine that takes a range can
/// therefore assume it is well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, failing fast when `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> crate::Result<Self> {
        if end < start {
            return Err(crate::Error::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day of the range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, always at least 1.
    pub fn len_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    /// Whether a date falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterate every calendar date in the range, inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

// ============================================
// Stored analytics snapshots
// ============================================

/// Stored per-user-per-habit analytics consumed by formation prediction.
///
/// Maintained by the (out-of-scope) persistence layer; the engines only
/// look one up through [`crate::source::SnapshotStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitSnapshot {
    /// Historical completion rate, 0.0 to 1.0
    pub success_rate: f64,
    /// Day-to-day consistency score, 0.0 to 1.0
    pub consistency: f64,
    /// Aggregate habit strength score, 0.0 to 1.0
    pub habit_strength: f64,
    /// Last classified formation stage, if one was stored
    pub stage: Option<FormationStage>,
}

// ============================================
// Tagged enums
// ============================================

/// Behavioral formation stage of a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationStage {
    /// No stored analytics to classify from
    Unknown,
    /// First days of building the habit
    Initiation,
    /// Repetition is forming but still effortful
    Learning,
    /// The habit holds with occasional lapses
    Stability,
    /// The habit is automatic
    Mastery,
}

impl FormationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormationStage::Unknown => "unknown",
            FormationStage::Initiation => "initiation",
            FormationStage::Learning => "learning",
            FormationStage::Stability => "stability",
            FormationStage::Mastery => "mastery",
        }
    }
}

impl std::str::FromStr for FormationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(FormationStage::Unknown),
            "initiation" => Ok(FormationStage::Initiation),
            "learning" => Ok(FormationStage::Learning),
            "stability" => Ok(FormationStage::Stability),
            "mastery" => Ok(FormationStage::Mastery),
            _ => Err(format!("unknown formation stage: {}", s)),
        }
    }
}

/// Kind of detected anomaly.
///
/// `PatternBreak` is part of the closed model but no detection pass
/// currently emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    UnusuallyHigh,
    UnusuallyLow,
    UnusualTiming,
    ExceptionalStreak,
    PatternBreak,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::UnusuallyHigh => "unusually_high",
            AnomalyKind::UnusuallyLow => "unusually_low",
            AnomalyKind::UnusualTiming => "unusual_timing",
            AnomalyKind::ExceptionalStreak => "exceptional_streak",
            AnomalyKind::PatternBreak => "pattern_break",
        }
    }
}

/// Classified relationship between two habits.
///
/// `Causal` and `InverseCausal` are reserved for a lag-based classifier
/// that does not exist yet; plain correlation never produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    Positive,
    Negative,
    Neutral,
    Causal,
    InverseCausal,
}

impl CorrelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationKind::Positive => "positive",
            CorrelationKind::Negative => "negative",
            CorrelationKind::Neutral => "neutral",
            CorrelationKind::Causal => "causal",
            CorrelationKind::InverseCausal => "inverse_causal",
        }
    }
}

/// Classification of a group member's contribution profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributorKind {
    /// High completion rate with sustained volume
    Leader,
    /// Reliable completion rate
    Consistent,
    /// Sporadic participation
    Occasional,
}

impl ContributorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributorKind::Leader => "leader",
            ContributorKind::Consistent => "consistent",
            ContributorKind::Occasional => "occasional",
        }
    }
}

/// What a team challenge asks the group to improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    /// Raise the collective completion rate
    CompletionRate,
    /// Extend the group streak
    GroupStreak,
    /// Get more members participating
    Participation,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::CompletionRate => "completion_rate",
            ChallengeKind::GroupStreak => "group_streak",
            ChallengeKind::Participation => "participation",
        }
    }
}

/// Lifecycle status of a generated challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    Active,
    Completed,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Active => "active",
            ChallengeStatus::Completed => "completed",
        }
    }
}

/// Challenge difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Challenge priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        let result = DateRange::new(d(2024, 3, 10), d(2024, 3, 1));
        assert!(matches!(
            result,
            Err(crate::Error::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_date_range_days() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 5)).unwrap();
        assert_eq!(range.len_days(), 5);
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(days.len(), 5);
        assert_eq!(days[0], d(2024, 1, 1));
        assert_eq!(days[4], d(2024, 1, 5));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 1)).unwrap();
        assert_eq!(range.len_days(), 1);
        assert!(range.contains(d(2024, 1, 1)));
        assert!(!range.contains(d(2024, 1, 2)));
    }

    #[test]
    fn test_week_start_is_monday() {
        use chrono::{Datelike, Weekday};
        // 2024-01-10 is a Wednesday
        let monday = week_start(d(2024, 1, 10));
        assert_eq!(monday, d(2024, 1, 8));
        assert_eq!(monday.weekday(), Weekday::Mon);
        // A Monday maps to itself
        assert_eq!(week_start(d(2024, 1, 8)), d(2024, 1, 8));
    }

    #[test]
    fn test_formation_stage_round_trip() {
        for stage in [
            FormationStage::Unknown,
            FormationStage::Initiation,
            FormationStage::Learning,
            FormationStage::Stability,
            FormationStage::Mastery,
        ] {
            assert_eq!(FormationStage::from_str(stage.as_str()), Ok(stage));
        }
        assert!(FormationStage::from_str("bogus").is_err());
    }

    #[test]
    fn test_enum_serde_strings() {
        let json = serde_json::to_string(&AnomalyKind::UnusuallyHigh).unwrap();
        assert_eq!(json, "\"unusually_high\"");
        let kind: CorrelationKind = serde_json::from_str("\"inverse_causal\"").unwrap();
        assert_eq!(kind, CorrelationKind::InverseCausal);
    }
}
