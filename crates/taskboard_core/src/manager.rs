use crate::aggregate::{self, EpicSnapshot};
use crate::error::AppError;
use crate::history::HistoryTracker;
use crate::model::{Entity, Epic, Subtask, Task, TaskId};
use crate::schedule::OverlapIndex;
use crate::store::TaskStore;
use time::{Duration, OffsetDateTime};

/// Single entry point for collaborators (CLI, persistence). Sequences the
/// store, the epic aggregation, the overlap index and the view history as
/// one synchronous step per call; no call leaves a partially applied
/// mutation behind.
#[derive(Debug, Default, Clone)]
pub struct TaskManager {
    store: TaskStore,
    schedule: OverlapIndex,
    history: HistoryTracker,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> TaskId {
        self.store.next_id()
    }

    /// Re-adding an existing id is a silent no-op; a colliding interval
    /// fails with `Overlap` before anything is touched.
    pub fn add_task(&mut self, task: Task) -> Result<(), AppError> {
        if self.store.task(task.id).is_some() {
            return Ok(());
        }
        self.check_slot(task.id, task.start_time, task.duration)?;

        self.store.observe_id(task.id);
        if let Some(start) = task.start_time {
            self.schedule.insert(task.id, start, task.duration);
        }
        self.store.insert_task(task);
        Ok(())
    }

    /// The supplied subtask-id list is sanitized and the derived fields are
    /// recomputed from it; caller-supplied derived values are never trusted.
    pub fn add_epic(&mut self, epic: Epic) -> Result<(), AppError> {
        if self.store.epic(epic.id).is_some() {
            return Ok(());
        }

        let mut epic = epic;
        epic.subtask_ids = self.sanitize_subtask_ids(epic.id, &epic.subtask_ids);
        self.store.observe_id(epic.id);

        let subtasks: Vec<&Subtask> = epic
            .subtask_ids
            .iter()
            .filter_map(|id| self.store.subtask(*id))
            .collect();
        let epic = aggregate::aggregate(&subtasks).apply(&epic);
        self.store.insert_epic(epic);
        Ok(())
    }

    pub fn add_subtask(&mut self, subtask: Subtask) -> Result<(), AppError> {
        if self.store.subtask(subtask.id).is_some() {
            return Ok(());
        }

        let mut subtask = subtask;
        if subtask.epic_id == Some(subtask.id) {
            subtask.epic_id = None;
        }
        self.check_slot(subtask.id, subtask.start_time, subtask.duration)?;

        self.store.observe_id(subtask.id);
        if let Some(start) = subtask.start_time {
            self.schedule.insert(subtask.id, start, subtask.duration);
        }
        let id = subtask.id;
        let epic_id = subtask.epic_id;
        self.store.insert_subtask(subtask);
        if let Some(epic_id) = epic_id {
            self.link_subtask(epic_id, id);
            self.refresh_epic(epic_id);
        }
        Ok(())
    }

    pub fn update_task(&mut self, task: Task) -> Result<(), AppError> {
        let previous = self
            .store
            .task(task.id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("task {} not found", task.id)))?;
        self.check_slot(task.id, task.start_time, task.duration)?;

        self.reschedule(task.id, &previous.start_time, task.start_time, task.duration);
        self.store.insert_task(task);
        Ok(())
    }

    pub fn update_subtask(&mut self, subtask: Subtask) -> Result<(), AppError> {
        let previous = self
            .store
            .subtask(subtask.id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("subtask {} not found", subtask.id)))?;

        let mut subtask = subtask;
        if subtask.epic_id == Some(subtask.id) {
            subtask.epic_id = None;
        }
        self.check_slot(subtask.id, subtask.start_time, subtask.duration)?;

        self.reschedule(
            subtask.id,
            &previous.start_time,
            subtask.start_time,
            subtask.duration,
        );

        let id = subtask.id;
        let old_epic = previous.epic_id;
        let new_epic = subtask.epic_id;
        self.store.insert_subtask(subtask);

        if old_epic == new_epic {
            if let Some(epic_id) = new_epic {
                self.refresh_epic(epic_id);
            }
        } else {
            if let Some(epic_id) = old_epic {
                self.unlink_subtask(epic_id, id);
                self.refresh_epic(epic_id);
            }
            if let Some(epic_id) = new_epic {
                self.link_subtask(epic_id, id);
                self.refresh_epic(epic_id);
            }
        }
        Ok(())
    }

    /// Only name and description are caller-editable; the subtask list and
    /// the derived fields are engine outputs and stay as stored.
    pub fn update_epic(&mut self, epic: Epic) -> Result<(), AppError> {
        let stored = self
            .store
            .epic(epic.id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("epic {} not found", epic.id)))?;

        let updated = Epic {
            name: epic.name,
            description: epic.description,
            ..stored
        };
        self.store.insert_epic(updated);
        Ok(())
    }

    pub fn task_by_id(&mut self, id: TaskId) -> Result<Task, AppError> {
        let task = self
            .store
            .task(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;
        self.history.record(Entity::Task(task.clone()));
        Ok(task)
    }

    pub fn subtask_by_id(&mut self, id: TaskId) -> Result<Subtask, AppError> {
        let subtask = self
            .store
            .subtask(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("subtask {id} not found")))?;
        self.history.record(Entity::Subtask(subtask.clone()));
        Ok(subtask)
    }

    pub fn epic_by_id(&mut self, id: TaskId) -> Result<Epic, AppError> {
        let epic = self
            .store
            .epic(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("epic {id} not found")))?;
        self.history.record(Entity::Epic(epic.clone()));
        Ok(epic)
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        self.store.all_tasks()
    }

    pub fn all_subtasks(&self) -> Vec<Subtask> {
        self.store.all_subtasks()
    }

    pub fn all_epics(&self) -> Vec<Epic> {
        self.store.all_epics()
    }

    /// Removing an unknown id is a silent no-op, as for all removals.
    pub fn remove_task_by_id(&mut self, id: TaskId) {
        let Some(task) = self.store.remove_task(id) else {
            return;
        };
        if let Some(start) = task.start_time {
            self.schedule.remove(id, start);
        }
        self.history.remove(id);
    }

    pub fn remove_subtask_by_id(&mut self, id: TaskId) {
        let Some(subtask) = self.store.remove_subtask(id) else {
            return;
        };
        if let Some(start) = subtask.start_time {
            self.schedule.remove(id, start);
        }
        self.history.remove(id);
        if let Some(epic_id) = subtask.epic_id {
            self.unlink_subtask(epic_id, id);
            self.refresh_epic(epic_id);
        }
    }

    /// Takes every subtask referencing the epic with it.
    pub fn remove_epic_by_id(&mut self, id: TaskId) {
        let Some(_epic) = self.store.remove_epic(id) else {
            return;
        };
        self.history.remove(id);

        let owned: Vec<TaskId> = self
            .store
            .all_subtasks()
            .iter()
            .filter(|subtask| subtask.epic_id == Some(id))
            .map(|subtask| subtask.id)
            .collect();
        for subtask_id in owned {
            if let Some(subtask) = self.store.remove_subtask(subtask_id) {
                if let Some(start) = subtask.start_time {
                    self.schedule.remove(subtask_id, start);
                }
                self.history.remove(subtask_id);
            }
        }
    }

    pub fn remove_all_tasks(&mut self) {
        for task in self.store.clear_tasks() {
            if let Some(start) = task.start_time {
                self.schedule.remove(task.id, start);
            }
            self.history.remove(task.id);
        }
    }

    /// Epics stay, reset to the no-subtasks baseline.
    pub fn remove_all_subtasks(&mut self) {
        for subtask in self.store.clear_subtasks() {
            if let Some(start) = subtask.start_time {
                self.schedule.remove(subtask.id, start);
            }
            self.history.remove(subtask.id);
        }
        for epic_id in self.store.epic_ids() {
            if let Some(epic) = self.store.epic(epic_id) {
                let mut reset = epic.clone();
                reset.subtask_ids.clear();
                let reset = EpicSnapshot::empty().apply(&reset);
                self.store.insert_epic(reset);
            }
        }
    }

    /// Subtasks become unparented but stay on the board and the schedule.
    pub fn remove_all_epics(&mut self) {
        for epic in self.store.clear_epics() {
            self.history.remove(epic.id);
        }
        for subtask_id in self.store.subtask_ids() {
            if let Some(subtask) = self.store.subtask(subtask_id)
                && subtask.epic_id.is_some()
            {
                let mut orphaned = subtask.clone();
                orphaned.epic_id = None;
                self.store.insert_subtask(orphaned);
            }
        }
    }

    pub fn subtasks_of_epic(&self, epic_id: TaskId) -> Result<Vec<Subtask>, AppError> {
        let epic = self
            .store
            .epic(epic_id)
            .ok_or_else(|| AppError::not_found(format!("epic {epic_id} not found")))?;
        Ok(epic
            .subtask_ids
            .iter()
            .filter_map(|id| self.store.subtask(*id).cloned())
            .collect())
    }

    /// Distinct viewed entities, oldest view first.
    pub fn history(&self) -> Vec<Entity> {
        self.history.snapshot()
    }

    /// Every scheduled task and subtask, ascending by start time (equal
    /// starts by id).
    pub fn prioritized_tasks(&self) -> Vec<Entity> {
        self.schedule
            .ordered_ids()
            .into_iter()
            .filter_map(|id| {
                if let Some(task) = self.store.task(id) {
                    Some(Entity::Task(task.clone()))
                } else {
                    self.store.subtask(id).map(|s| Entity::Subtask(s.clone()))
                }
            })
            .collect()
    }

    fn check_slot(
        &self,
        id: TaskId,
        start_time: Option<OffsetDateTime>,
        duration: Duration,
    ) -> Result<(), AppError> {
        if duration < Duration::ZERO {
            return Err(AppError::invalid_input("duration must be non-negative"));
        }
        let Some(start) = start_time else {
            // Untimed entities bypass the schedule entirely.
            return Ok(());
        };
        if let Some(blocking) = self.schedule.find_conflict(id, start, duration) {
            return Err(AppError::overlap(format!(
                "time slot conflicts with entity {blocking}"
            )));
        }
        Ok(())
    }

    fn reschedule(
        &mut self,
        id: TaskId,
        old_start: &Option<OffsetDateTime>,
        new_start: Option<OffsetDateTime>,
        duration: Duration,
    ) {
        if let Some(start) = *old_start {
            self.schedule.remove(id, start);
        }
        if let Some(start) = new_start {
            self.schedule.insert(id, start, duration);
        }
    }

    /// Keeps ids that resolve to subtasks already claiming this epic; drops
    /// self-references, duplicates and everything unresolvable, silently.
    fn sanitize_subtask_ids(&self, epic_id: TaskId, ids: &[TaskId]) -> Vec<TaskId> {
        let mut kept = Vec::with_capacity(ids.len());
        for &id in ids {
            if id == epic_id || kept.contains(&id) {
                continue;
            }
            let resolves = self
                .store
                .subtask(id)
                .is_some_and(|subtask| subtask.epic_id == Some(epic_id));
            if resolves {
                kept.push(id);
            }
        }
        kept
    }

    fn link_subtask(&mut self, epic_id: TaskId, subtask_id: TaskId) {
        if let Some(epic) = self.store.epic(epic_id)
            && !epic.subtask_ids.contains(&subtask_id)
        {
            let mut updated = epic.clone();
            updated.subtask_ids.push(subtask_id);
            self.store.insert_epic(updated);
        }
    }

    fn unlink_subtask(&mut self, epic_id: TaskId, subtask_id: TaskId) {
        if let Some(epic) = self.store.epic(epic_id)
            && epic.subtask_ids.contains(&subtask_id)
        {
            let mut updated = epic.clone();
            updated.subtask_ids.retain(|&id| id != subtask_id);
            self.store.insert_epic(updated);
        }
    }

    fn refresh_epic(&mut self, epic_id: TaskId) {
        let Some(epic) = self.store.epic(epic_id).cloned() else {
            return;
        };
        let subtasks: Vec<&Subtask> = epic
            .subtask_ids
            .iter()
            .filter_map(|id| self.store.subtask(*id))
            .collect();
        let refreshed = aggregate::aggregate(&subtasks).apply(&epic);
        self.store.insert_epic(refreshed);
    }
}
