//! Orchestration facade over a completion source
//!
//! Fans one habit or one group through the analytics engines and bundles
//! the results into a single report. This is the seam the (out-of-scope)
//! API layer and the external scheduler call: hourly incremental runs,
//! daily recomputes, and weekly 90-day recomputes all land here, and
//! identical source contents always produce identical reports.

use crate::analytics::aggregate::{
    CompletionAggregator, DailyAggregation, StreakAnalysis, WeeklyAggregation,
};
use crate::analytics::challenge::{ChallengeSpec, TeamChallengeGenerator};
use crate::analytics::group::{GroupDynamicsEngine, GroupDynamicsResult};
use crate::analytics::predictive::{
    Anomaly, FormationPrediction, HabitForecast, PredictiveAnalytics,
};
use crate::analytics::timing::{OptimalTimingAnalyzer, TimingAnalysis};
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::source::{CompletionSource, SnapshotStore};
use crate::types::{CompletionEvent, DateRange};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Everything the analytics engines can say about one habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitReport {
    pub user_id: String,
    pub habit_id: String,
    pub daily: DailyAggregation,
    pub weekly: WeeklyAggregation,
    pub streaks: StreakAnalysis,
    pub timing: TimingAnalysis,
    pub forecast: HabitForecast,
    pub anomalies: Vec<Anomaly>,
    pub formation: FormationPrediction,
}

/// Group dynamics plus the challenge generated from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    pub dynamics: GroupDynamicsResult,
    pub challenge: ChallengeSpec,
}

/// Facade wiring a completion source into the analytics engines.
///
/// The source is injected explicitly; swapping it for a different backend
/// never touches the computation code.
pub struct HabitAnalyticsService<S> {
    source: S,
    aggregator: CompletionAggregator,
    predictive: PredictiveAnalytics,
    timing: OptimalTimingAnalyzer,
    group: GroupDynamicsEngine,
    challenges: TeamChallengeGenerator,
}

impl<S> HabitAnalyticsService<S>
where
    S: CompletionSource + SnapshotStore,
{
    /// Build a service with default analytics configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, &AnalyticsConfig::default())
    }

    /// Build a service with explicit analytics configuration.
    pub fn with_config(source: S, config: &AnalyticsConfig) -> Self {
        let aggregator = CompletionAggregator::new();
        Self {
            source,
            aggregator,
            predictive: PredictiveAnalytics::new(aggregator),
            timing: OptimalTimingAnalyzer::from_config(aggregator, config),
            group: GroupDynamicsEngine::from_config(aggregator, config),
            challenges: TeamChallengeGenerator::new(),
        }
    }

    /// Full analytics report for one user's habit over a range.
    ///
    /// The forecast starts the day after the range ends and covers
    /// `forecast_days` days.
    pub fn habit_report(
        &self,
        user_id: &str,
        habit_id: &str,
        range: &DateRange,
        forecast_days: u32,
    ) -> Result<HabitReport> {
        tracing::info!(user_id, habit_id, forecast_days, "Computing habit report");

        let records = self.source.habit_completions(user_id, habit_id, range)?;
        let forecast_start = range.end() + Duration::days(1);

        Ok(HabitReport {
            user_id: user_id.to_string(),
            habit_id: habit_id.to_string(),
            daily: self.aggregator.daily(&records, range),
            weekly: self.aggregator.weekly(&records, range),
            streaks: self.aggregator.streaks(&records, habit_id),
            timing: self.timing.analyze(&records),
            forecast: self
                .predictive
                .forecast(habit_id, &records, forecast_start, forecast_days)?,
            anomalies: self.predictive.detect_anomalies(habit_id, &records),
            formation: self
                .predictive
                .predict_formation(&self.source, user_id, habit_id)?,
        })
    }

    /// Correlate two of a user's habits over a range.
    pub fn habit_correlation(
        &self,
        user_id: &str,
        habit1_id: &str,
        habit2_id: &str,
        range: &DateRange,
    ) -> Result<crate::analytics::correlation::CorrelationResult> {
        let analyzer = crate::analytics::HabitCorrelationAnalyzer::new(self.aggregator);
        let records1 = self.source.habit_completions(user_id, habit1_id, range)?;
        let records2 = self.source.habit_completions(user_id, habit2_id, range)?;
        analyzer.correlate(user_id, habit1_id, &records1, habit2_id, &records2, range)
    }

    /// Dynamics scores and a freshly generated challenge for one group.
    ///
    /// The challenge starts the day after the analyzed range ends.
    pub fn group_report(&self, group_id: &str, range: &DateRange) -> Result<GroupReport> {
        tracing::info!(group_id, "Computing group report");

        let by_entity = self.source.group_completions(group_id, range)?;
        let members = self.source.group_members(group_id)?;
        let records: Vec<CompletionEvent> =
            by_entity.into_values().flatten().collect();

        let dynamics = self.group.analyze(group_id, &members, &records, range)?;
        let challenge_start: NaiveDate = range.end() + Duration::days(1);
        let challenge = self.challenges.generate(&dynamics, challenge_start);

        Ok(GroupReport {
            dynamics,
            challenge,
        })
    }
}
