use crate::model::TaskId;
use std::collections::BTreeMap;
use time::{Duration, OffsetDateTime};

/// Two half-open intervals `[s1, s1 + d1)` and `[s2, s2 + d2)` conflict iff
/// each starts before the other ends. Touching endpoints do not conflict.
pub fn overlaps(s1: OffsetDateTime, d1: Duration, s2: OffsetDateTime, d2: Duration) -> bool {
    s1 < s2 + d2 && s2 < s1 + d1
}

/// Ordered index of every scheduled task and subtask. Keys are
/// `(start_time, id)`: entries sort by start time, equal starts break by
/// ascending id. Untimed entities are never inserted; epics are never
/// inserted.
#[derive(Debug, Default, Clone)]
pub struct OverlapIndex {
    entries: BTreeMap<(OffsetDateTime, TaskId), Duration>,
}

impl OverlapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// First scheduled entry conflicting with the candidate interval, if
    /// any. The candidate's own id is skipped so an update is only checked
    /// against the rest of the schedule.
    pub fn find_conflict(
        &self,
        id: TaskId,
        start: OffsetDateTime,
        duration: Duration,
    ) -> Option<TaskId> {
        let end = start + duration;
        for (&(entry_start, entry_id), &entry_duration) in &self.entries {
            if entry_start >= end {
                // Entries are ordered by start; nothing later can reach back.
                break;
            }
            if entry_id == id {
                continue;
            }
            if overlaps(start, duration, entry_start, entry_duration) {
                return Some(entry_id);
            }
        }
        None
    }

    pub fn insert(&mut self, id: TaskId, start: OffsetDateTime, duration: Duration) {
        self.entries.insert((start, id), duration);
    }

    /// Removes the entry keyed by the entity's previous start time. A miss
    /// is a no-op (the entity was untimed).
    pub fn remove(&mut self, id: TaskId, start: OffsetDateTime) {
        self.entries.remove(&(start, id));
    }

    /// All scheduled ids, ascending by start time then id.
    pub fn ordered_ids(&self) -> Vec<TaskId> {
        self.entries.keys().map(|&(_, id)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
