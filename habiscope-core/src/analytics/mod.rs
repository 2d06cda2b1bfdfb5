//! Analytics engines for habiscope
//!
//! Stateless transformations from raw completion events to derived
//! statistics:
//! - Daily/weekly/hourly aggregation and streak analysis
//! - Pairwise habit correlation
//! - Optimal-timing windows
//! - Trends, forecasts, anomalies, and formation predictions
//! - Group dynamics scores and team challenges
//!
//! Data flows one way: raw records feed the aggregator, the higher engines
//! build on its output, and the challenge generator consumes the group
//! engine's result. Every entry point is a pure function of its inputs and
//! may be invoked concurrently for different entities without coordination.

pub mod aggregate;
pub mod challenge;
pub mod correlation;
pub mod group;
pub mod predictive;
pub mod timing;

pub use aggregate::{
    CompletionAggregator, DailyAggregation, DailyStat, GroupAggregation, HourlyStat,
    StreakAnalysis, StreakPeriod, TimePatternAggregation, WeeklyAggregation, WeeklyStat,
};
pub use challenge::{ChallengeSpec, ChallengeTarget, TeamChallengeGenerator};
pub use correlation::{CorrelationResult, HabitCorrelationAnalyzer};
pub use group::{
    GroupDynamicsEngine, GroupDynamicsResult, KeyContributor, ParticipationMetrics,
};
pub use predictive::{
    Anomaly, ForecastPoint, FormationPrediction, HabitForecast, PredictiveAnalytics,
};
pub use timing::{OptimalTimingAnalyzer, TimeWindow, TimingAnalysis, WeekdayStat};
