//! Read interfaces over stored completion data
//!
//! The engines never talk to storage directly. They receive already
//! materialized [`CompletionEvent`] collections, or query one of the two
//! traits here when a service-level entry point needs to fan data in.
//! Implementations are supplied by the caller (explicit dependency passing,
//! no framework container), which keeps every engine independently testable.

use crate::error::Result;
use crate::types::{CompletionEvent, DateRange, HabitSnapshot};
use std::collections::BTreeMap;

/// Read access to raw completion events.
pub trait CompletionSource {
    /// Completion events for one user and habit inside a date range,
    /// ordered by date ascending.
    fn habit_completions(
        &self,
        user_id: &str,
        habit_id: &str,
        range: &DateRange,
    ) -> Result<Vec<CompletionEvent>>;

    /// Completion events for every group-habit entity of a group inside a
    /// date range, keyed by entity id.
    fn group_completions(
        &self,
        group_id: &str,
        range: &DateRange,
    ) -> Result<BTreeMap<String, Vec<CompletionEvent>>>;

    /// User ids belonging to a group. Unknown groups yield an empty roster.
    fn group_members(&self, group_id: &str) -> Result<Vec<String>>;
}

/// Lookup of stored per-user-per-habit analytics snapshots.
pub trait SnapshotStore {
    /// Stored snapshot for a user/habit pair, `None` when nothing was stored.
    fn habit_snapshot(&self, user_id: &str, habit_id: &str) -> Result<Option<HabitSnapshot>>;
}

/// In-memory reference implementation of both read traits.
///
/// Backs the test suite and doubles as the seam for callers that already
/// hold the relevant events in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    events: Vec<CompletionEvent>,
    groups: BTreeMap<String, GroupEntry>,
    snapshots: BTreeMap<(String, String), HabitSnapshot>,
}

#[derive(Debug, Default)]
struct GroupEntry {
    entity_ids: Vec<String>,
    member_ids: Vec<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single completion event.
    pub fn push_event(&mut self, event: CompletionEvent) {
        self.events.push(event);
    }

    /// Add a batch of completion events.
    pub fn extend_events(&mut self, events: impl IntoIterator<Item = CompletionEvent>) {
        self.events.extend(events);
    }

    /// Register a group with its habit entities and member roster.
    pub fn register_group(&mut self, group_id: &str, entity_ids: &[&str], member_ids: &[&str]) {
        self.groups.insert(
            group_id.to_string(),
            GroupEntry {
                entity_ids: entity_ids.iter().map(|s| s.to_string()).collect(),
                member_ids: member_ids.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    /// Store an analytics snapshot for a user/habit pair.
    pub fn set_snapshot(&mut self, user_id: &str, habit_id: &str, snapshot: HabitSnapshot) {
        self.snapshots
            .insert((user_id.to_string(), habit_id.to_string()), snapshot);
    }
}

impl CompletionSource for MemorySource {
    fn habit_completions(
        &self,
        user_id: &str,
        habit_id: &str,
        range: &DateRange,
    ) -> Result<Vec<CompletionEvent>> {
        let mut events: Vec<CompletionEvent> = self
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.entity_id == habit_id && range.contains(e.date))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    fn group_completions(
        &self,
        group_id: &str,
        range: &DateRange,
    ) -> Result<BTreeMap<String, Vec<CompletionEvent>>> {
        let mut out = BTreeMap::new();
        if let Some(group) = self.groups.get(group_id) {
            for entity_id in &group.entity_ids {
                let mut events: Vec<CompletionEvent> = self
                    .events
                    .iter()
                    .filter(|e| &e.entity_id == entity_id && range.contains(e.date))
                    .cloned()
                    .collect();
                events.sort_by_key(|e| e.date);
                out.insert(entity_id.clone(), events);
            }
        }
        Ok(out)
    }

    fn group_members(&self, group_id: &str) -> Result<Vec<String>> {
        Ok(self
            .groups
            .get(group_id)
            .map(|g| g.member_ids.clone())
            .unwrap_or_default())
    }
}

impl SnapshotStore for MemorySource {
    fn habit_snapshot(&self, user_id: &str, habit_id: &str) -> Result<Option<HabitSnapshot>> {
        Ok(self
            .snapshots
            .get(&(user_id.to_string(), habit_id.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_habit_completions_filters_and_sorts() {
        let mut source = MemorySource::new();
        source.push_event(CompletionEvent::completed("h1", "u1", d(3)));
        source.push_event(CompletionEvent::completed("h1", "u1", d(1)));
        source.push_event(CompletionEvent::completed("h2", "u1", d(2)));
        source.push_event(CompletionEvent::completed("h1", "u2", d(2)));

        let range = DateRange::new(d(1), d(5)).unwrap();
        let events = source.habit_completions("u1", "h1", &range).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].date, d(1));
        assert_eq!(events[1].date, d(3));
    }

    #[test]
    fn test_group_completions_keyed_by_entity() {
        let mut source = MemorySource::new();
        source.register_group("g1", &["gh1", "gh2"], &["u1", "u2"]);
        source.push_event(CompletionEvent::completed("gh1", "u1", d(1)));
        source.push_event(CompletionEvent::completed("gh2", "u2", d(1)));
        source.push_event(CompletionEvent::completed("other", "u1", d(1)));

        let range = DateRange::new(d(1), d(7)).unwrap();
        let by_entity = source.group_completions("g1", &range).unwrap();
        assert_eq!(by_entity.len(), 2);
        assert_eq!(by_entity["gh1"].len(), 1);
        assert_eq!(by_entity["gh2"].len(), 1);

        assert_eq!(source.group_members("g1").unwrap(), vec!["u1", "u2"]);
        assert!(source.group_members("missing").unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_lookup() {
        let mut source = MemorySource::new();
        assert!(source.habit_snapshot("u1", "h1").unwrap().is_none());

        source.set_snapshot(
            "u1",
            "h1",
            HabitSnapshot {
                success_rate: 0.8,
                consistency: 0.7,
                habit_strength: 0.6,
                stage: None,
            },
        );
        let snapshot = source.habit_snapshot("u1", "h1").unwrap().unwrap();
        assert_eq!(snapshot.success_rate, 0.8);
    }
}
