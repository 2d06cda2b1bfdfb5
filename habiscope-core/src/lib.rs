//! # habiscope-core
//!
//! Core analytics engine for habiscope - a habit tracker for people and
//! groups.
//!
//! This library provides:
//! - Domain types for completion events and derived statistics
//! - Aggregation of raw events into daily/weekly/hourly stats and streaks
//! - Correlation, timing, predictive, and group-dynamics engines
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows one way through the engines:
//! - **Records:** Immutable completion events supplied by a read interface
//! - **Aggregates:** Daily/weekly/hourly stats and streaks (regenerable)
//! - **Derived:** Forecasts, anomalies, correlations, group scores, challenges
//!
//! Everything is a pure, synchronous function of its inputs: the surrounding
//! application decides when to recompute and where results are cached.
//!
//! ## Example
//!
//! ```rust
//! use habiscope_core::{
//!     CompletionEvent, DateRange, HabitAnalyticsService, MemorySource,
//! };
//! use chrono::NaiveDate;
//!
//! let mut source = MemorySource::new();
//! let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! source.push_event(CompletionEvent::completed("read", "ada", day));
//!
//! let service = HabitAnalyticsService::new(source);
//! let range = DateRange::new(day, day + chrono::Duration::days(6)).unwrap();
//! let report = service.habit_report("ada", "read", &range, 7).unwrap();
//! assert_eq!(report.daily.days.len(), 7);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use service::{GroupReport, HabitAnalyticsService, HabitReport};
pub use source::{CompletionSource, MemorySource, SnapshotStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod source;
pub mod types;
