use crate::model::{Epic, Subtask, TaskStatus};
use time::{Duration, OffsetDateTime};

/// Derived view of an epic over its current subtasks. Produced fresh on
/// every subtask mutation and swapped into the store wholesale; stored
/// epics are never patched in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpicSnapshot {
    pub status: TaskStatus,
    pub start_time: Option<OffsetDateTime>,
    pub duration: Duration,
    pub end_time: Option<OffsetDateTime>,
}

impl EpicSnapshot {
    pub fn empty() -> Self {
        Self {
            status: TaskStatus::New,
            start_time: None,
            duration: Duration::ZERO,
            end_time: None,
        }
    }

    /// Builds the epic record that replaces `epic` in the store.
    pub fn apply(self, epic: &Epic) -> Epic {
        Epic {
            status: self.status,
            start_time: self.start_time,
            duration: self.duration,
            end_time: self.end_time,
            ..epic.clone()
        }
    }
}

pub fn aggregate(subtasks: &[&Subtask]) -> EpicSnapshot {
    if subtasks.is_empty() {
        return EpicSnapshot::empty();
    }

    let all_new = subtasks
        .iter()
        .all(|subtask| subtask.status == TaskStatus::New);
    let all_done = subtasks
        .iter()
        .all(|subtask| subtask.status == TaskStatus::Done);
    let status = if all_new {
        TaskStatus::New
    } else if all_done {
        TaskStatus::Done
    } else {
        TaskStatus::InProgress
    };

    // Subtasks without a start time carry no schedule and are excluded from
    // the time window entirely.
    let mut start_time: Option<OffsetDateTime> = None;
    let mut end_time: Option<OffsetDateTime> = None;
    let mut duration = Duration::ZERO;

    for subtask in subtasks {
        let Some(start) = subtask.start_time else {
            continue;
        };
        let end = start + subtask.duration;

        start_time = Some(match start_time {
            Some(current) => current.min(start),
            None => start,
        });
        end_time = Some(match end_time {
            Some(current) => current.max(end),
            None => end,
        });
        duration += subtask.duration;
    }

    EpicSnapshot {
        status,
        start_time,
        duration,
        end_time,
    }
}

#[cfg(test)]
mod tests {
    use super::{EpicSnapshot, aggregate};
    use crate::model::{Subtask, TaskStatus};
    use time::Duration;
    use time::macros::datetime;

    fn subtask(id: u64, status: TaskStatus) -> Subtask {
        Subtask {
            id,
            name: format!("subtask-{id}"),
            description: String::new(),
            status,
            start_time: None,
            duration: Duration::ZERO,
            epic_id: Some(1),
        }
    }

    #[test]
    fn no_subtasks_yields_baseline() {
        let snapshot = aggregate(&[]);
        assert_eq!(snapshot, EpicSnapshot::empty());
        assert_eq!(snapshot.status, TaskStatus::New);
        assert_eq!(snapshot.start_time, None);
        assert_eq!(snapshot.duration, Duration::ZERO);
        assert_eq!(snapshot.end_time, None);
    }

    #[test]
    fn all_new_yields_new() {
        let a = subtask(2, TaskStatus::New);
        let b = subtask(3, TaskStatus::New);
        assert_eq!(aggregate(&[&a, &b]).status, TaskStatus::New);
    }

    #[test]
    fn all_done_yields_done() {
        let a = subtask(2, TaskStatus::Done);
        let b = subtask(3, TaskStatus::Done);
        assert_eq!(aggregate(&[&a, &b]).status, TaskStatus::Done);
    }

    #[test]
    fn new_and_done_mix_yields_in_progress() {
        let a = subtask(2, TaskStatus::New);
        let b = subtask(3, TaskStatus::Done);
        assert_eq!(aggregate(&[&a, &b]).status, TaskStatus::InProgress);
    }

    #[test]
    fn any_in_progress_yields_in_progress() {
        let a = subtask(2, TaskStatus::InProgress);
        assert_eq!(aggregate(&[&a]).status, TaskStatus::InProgress);
    }

    #[test]
    fn time_window_spans_timed_subtasks_only() {
        let mut early = subtask(2, TaskStatus::New);
        early.start_time = Some(datetime!(2025-01-01 10:00 UTC));
        early.duration = Duration::minutes(30);

        let mut late = subtask(3, TaskStatus::New);
        late.start_time = Some(datetime!(2025-01-01 12:00 UTC));
        late.duration = Duration::minutes(45);

        let mut untimed = subtask(4, TaskStatus::New);
        untimed.duration = Duration::minutes(500);

        let snapshot = aggregate(&[&early, &late, &untimed]);
        assert_eq!(snapshot.start_time, Some(datetime!(2025-01-01 10:00 UTC)));
        assert_eq!(snapshot.end_time, Some(datetime!(2025-01-01 12:45 UTC)));
        assert_eq!(snapshot.duration, Duration::minutes(75));
    }

    #[test]
    fn no_timed_subtasks_resets_time_window() {
        let a = subtask(2, TaskStatus::Done);
        let b = subtask(3, TaskStatus::Done);
        let snapshot = aggregate(&[&a, &b]);
        assert_eq!(snapshot.start_time, None);
        assert_eq!(snapshot.end_time, None);
        assert_eq!(snapshot.duration, Duration::ZERO);
    }
}
