use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    New,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Task,
    Epic,
    Subtask,
}

impl TaskKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Task => "TASK",
            Self::Epic => "EPIC",
            Self::Subtask => "SUBTASK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub start_time: Option<OffsetDateTime>,
    pub duration: Duration,
}

/// Container task. `status`, `start_time`, `duration` and `end_time` are
/// derived from the subtasks listed in `subtask_ids` and are overwritten by
/// the engine on every subtask mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epic {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub start_time: Option<OffsetDateTime>,
    pub duration: Duration,
    pub end_time: Option<OffsetDateTime>,
    pub subtask_ids: Vec<TaskId>,
}

impl Epic {
    pub fn new(id: TaskId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            status: TaskStatus::New,
            start_time: None,
            duration: Duration::ZERO,
            end_time: None,
            subtask_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtask {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub start_time: Option<OffsetDateTime>,
    pub duration: Duration,
    pub epic_id: Option<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Task(Task),
    Epic(Epic),
    Subtask(Subtask),
}

impl Entity {
    pub fn id(&self) -> TaskId {
        match self {
            Self::Task(task) => task.id,
            Self::Epic(epic) => epic.id,
            Self::Subtask(subtask) => subtask.id,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Task(_) => TaskKind::Task,
            Self::Epic(_) => TaskKind::Epic,
            Self::Subtask(_) => TaskKind::Subtask,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Task(task) => &task.name,
            Self::Epic(epic) => &epic.name,
            Self::Subtask(subtask) => &subtask.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Task(task) => &task.description,
            Self::Epic(epic) => &epic.description,
            Self::Subtask(subtask) => &subtask.description,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Task(task) => task.status,
            Self::Epic(epic) => epic.status,
            Self::Subtask(subtask) => subtask.status,
        }
    }

    pub fn start_time(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Task(task) => task.start_time,
            Self::Epic(epic) => epic.start_time,
            Self::Subtask(subtask) => subtask.start_time,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Task(task) => task.duration,
            Self::Epic(epic) => epic.duration,
            Self::Subtask(subtask) => subtask.duration,
        }
    }

    pub fn epic_id(&self) -> Option<TaskId> {
        match self {
            Self::Subtask(subtask) => subtask.epic_id,
            _ => None,
        }
    }
}
