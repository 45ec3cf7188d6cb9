use crate::error::AppError;
use crate::manager::TaskManager;
use crate::model::{Entity, Epic, Subtask, Task, TaskId, TaskKind, TaskStatus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const STORE_FILE_NAME: &str = "tasks.csv";
const HISTORY_EXTENSION: &str = "history.csv";

/// One persisted entity. The column set is the collaborator contract:
/// `id,type,name,status,description,startTime,duration,epicId`, duration in
/// whole minutes, `epicId` empty for anything but a subtask.
#[derive(Debug, Serialize, Deserialize)]
struct FlatRecord {
    id: TaskId,
    #[serde(rename = "type")]
    kind: TaskKind,
    name: String,
    status: TaskStatus,
    description: String,
    #[serde(rename = "startTime")]
    start_time: Option<String>,
    duration: i64,
    #[serde(rename = "epicId")]
    epic_id: Option<TaskId>,
}

/// One line of the view-history sidecar, most recent view last.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryRecord {
    id: TaskId,
}

/// The sidecar sits next to the board file: `tasks.csv` → `tasks.history.csv`.
pub fn history_path(path: &Path) -> PathBuf {
    path.with_extension(HISTORY_EXTENSION)
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var("TASKBOARD_STORE_PATH")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("taskboard")
            .join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskboard")
            .join(STORE_FILE_NAME))
    }
}

pub fn save_board(path: &Path, manager: &TaskManager) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    for epic in manager.all_epics() {
        let record = record_from_entity(&Entity::Epic(epic))?;
        writer
            .serialize(record)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
    }
    for task in manager.all_tasks() {
        let record = record_from_entity(&Entity::Task(task))?;
        writer
            .serialize(record)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
    }
    for subtask in manager.all_subtasks() {
        let record = record_from_entity(&Entity::Subtask(subtask))?;
        writer
            .serialize(record)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
    }

    let content = writer
        .into_inner()
        .map_err(|err| AppError::io(err.to_string()))?;
    write_store_file(path, &content)?;

    let mut history_writer = csv::Writer::from_writer(Vec::new());
    for entity in manager.history() {
        history_writer
            .serialize(HistoryRecord { id: entity.id() })
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
    }
    let history_content = history_writer
        .into_inner()
        .map_err(|err| AppError::io(err.to_string()))?;
    write_store_file(&history_path(path), &history_content)?;

    Ok(())
}

fn write_store_file(path: &Path, content: &[u8]) -> Result<(), AppError> {
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

/// Rebuilds a board from disk. Records replay through the facade — epics,
/// then tasks, then subtasks — so the id counter, epic links and aggregates
/// and the overlap index are reconstructed by the engine instead of trusted
/// from the file. A missing file yields an empty board; a file whose
/// intervals conflict fails with `Overlap` (the engine never writes one).
pub fn load_board(path: &Path) -> Result<TaskManager, AppError> {
    let mut manager = TaskManager::new();
    if !path.exists() {
        return Ok(manager);
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());

    let mut epics = Vec::new();
    let mut tasks = Vec::new();
    let mut subtasks = Vec::new();
    for result in reader.deserialize::<FlatRecord>() {
        let record = result.map_err(|err| AppError::invalid_data(err.to_string()))?;
        match entity_from_record(record)? {
            Entity::Epic(epic) => epics.push(epic),
            Entity::Task(task) => tasks.push(task),
            Entity::Subtask(subtask) => subtasks.push(subtask),
        }
    }

    for epic in epics {
        manager.add_epic(epic)?;
    }
    for task in tasks {
        manager.add_task(task)?;
    }
    for subtask in subtasks {
        manager.add_subtask(subtask)?;
    }

    replay_history(path, &mut manager)?;
    Ok(manager)
}

/// Re-views the persisted history through the public getters, oldest first,
/// so the tracker rebuilds with the same order and deduplication rules. Ids
/// that no longer resolve are skipped.
fn replay_history(path: &Path, manager: &mut TaskManager) -> Result<(), AppError> {
    let history_file = history_path(path);
    if !history_file.exists() {
        return Ok(());
    }

    let content =
        std::fs::read_to_string(&history_file).map_err(|err| AppError::io(err.to_string()))?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    for result in reader.deserialize::<HistoryRecord>() {
        let record = result.map_err(|err| AppError::invalid_data(err.to_string()))?;
        let id = record.id;
        let _ = manager.task_by_id(id).is_ok()
            || manager.subtask_by_id(id).is_ok()
            || manager.epic_by_id(id).is_ok();
    }
    Ok(())
}

fn record_from_entity(entity: &Entity) -> Result<FlatRecord, AppError> {
    let start_time = match entity.start_time() {
        Some(start) => Some(
            start
                .format(&Rfc3339)
                .map_err(|err| AppError::invalid_data(err.to_string()))?,
        ),
        None => None,
    };

    Ok(FlatRecord {
        id: entity.id(),
        kind: entity.kind(),
        name: entity.name().to_string(),
        status: entity.status(),
        description: entity.description().to_string(),
        start_time,
        duration: entity.duration().whole_minutes(),
        epic_id: entity.epic_id(),
    })
}

fn entity_from_record(record: FlatRecord) -> Result<Entity, AppError> {
    let start_time = match record.start_time.as_deref() {
        Some(value) if !value.is_empty() => Some(
            OffsetDateTime::parse(value, &Rfc3339)
                .map_err(|_| AppError::invalid_data(format!("startTime must be RFC 3339: {value}")))?,
        ),
        _ => None,
    };
    if record.duration < 0 {
        return Err(AppError::invalid_data("duration must be non-negative"));
    }
    let duration = Duration::minutes(record.duration);

    Ok(match record.kind {
        TaskKind::Task => Entity::Task(Task {
            id: record.id,
            name: record.name,
            description: record.description,
            status: record.status,
            start_time,
            duration,
        }),
        // An epic's status and times are derived; the persisted values are
        // informational and recomputed during replay.
        TaskKind::Epic => Entity::Epic(Epic::new(record.id, record.name, record.description)),
        TaskKind::Subtask => Entity::Subtask(Subtask {
            id: record.id,
            name: record.name,
            description: record.description,
            status: record.status,
            start_time,
            duration,
            epic_id: record.epic_id,
        }),
    })
}
