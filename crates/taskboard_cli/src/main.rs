use clap::Parser;
use tabled::{Table, Tabled};
use taskboard_cli::cli::{
    AddCommand, Cli, ClearCommand, Command, ListCommand, parse_datetime, parse_status,
};
use taskboard_core::config::{self, Palette};
use taskboard_core::error::AppError;
use taskboard_core::manager::TaskManager;
use taskboard_core::model::{Entity, Epic, Subtask, Task, TaskStatus};
use taskboard_core::storage::csv_store;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

#[derive(Tabled)]
struct BoardRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "type")]
    kind: &'static str,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "status")]
    status: &'static str,
    #[tabled(rename = "start")]
    start: String,
    #[tabled(rename = "minutes")]
    minutes: i64,
    #[tabled(rename = "epic")]
    epic: String,
}

impl BoardRow {
    fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id(),
            kind: entity.kind().label(),
            name: entity.name().to_string(),
            status: entity.status().label(),
            start: entity
                .start_time()
                .and_then(format_start)
                .unwrap_or_else(|| "-".to_string()),
            minutes: entity.duration().whole_minutes(),
            epic: entity
                .epic_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }
}

fn format_start(start: OffsetDateTime) -> Option<String> {
    start.format(&Rfc3339).ok()
}

fn entity_json(entity: &Entity) -> serde_json::Value {
    serde_json::json!({
        "id": entity.id(),
        "type": entity.kind().label(),
        "name": entity.name(),
        "status": entity.status().label(),
        "description": entity.description(),
        "startTime": entity.start_time().and_then(format_start),
        "duration": entity.duration().whole_minutes(),
        "epicId": entity.epic_id(),
    })
}

fn print_entities(entities: &[Entity], json: bool) {
    if json {
        let payload: Vec<serde_json::Value> = entities.iter().map(entity_json).collect();
        println!("{}", serde_json::Value::Array(payload));
    } else if entities.is_empty() {
        println!("(empty)");
    } else {
        let rows: Vec<BoardRow> = entities.iter().map(BoardRow::from_entity).collect();
        println!("{}", Table::new(rows));
    }
}

fn print_entity(entity: &Entity, palette: &Palette, json: bool) {
    if json {
        println!("{}", entity_json(entity));
        return;
    }

    let start = entity
        .start_time()
        .and_then(format_start)
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} #{} [{}] {} | start {} | {} min",
        entity.kind().label(),
        entity.id(),
        entity.status().label(),
        palette.accentize(entity.name()),
        start,
        entity.duration().whole_minutes(),
    );
    if !entity.description().is_empty() {
        println!("  {}", palette.mutedize(entity.description()));
    }
    if let Some(epic_id) = entity.epic_id() {
        println!("  epic: {epic_id}");
    }
}

fn find_task(board: &TaskManager, id: u64) -> Option<Task> {
    board.all_tasks().into_iter().find(|task| task.id == id)
}

fn find_subtask(board: &TaskManager, id: u64) -> Option<Subtask> {
    board
        .all_subtasks()
        .into_iter()
        .find(|subtask| subtask.id == id)
}

fn find_epic(board: &TaskManager, id: u64) -> Option<Epic> {
    board.all_epics().into_iter().find(|epic| epic.id == id)
}

fn find_entity(board: &TaskManager, id: u64) -> Option<Entity> {
    find_task(board, id)
        .map(Entity::Task)
        .or_else(|| find_subtask(board, id).map(Entity::Subtask))
        .or_else(|| find_epic(board, id).map(Entity::Epic))
}

fn report(board: &TaskManager, id: u64, verb: &str, json: bool) {
    let Some(entity) = find_entity(board, id) else {
        return;
    };
    if json {
        println!("{}", entity_json(&entity));
    } else {
        println!(
            "{} {}: {} ({})",
            verb,
            entity.kind().label().to_lowercase(),
            entity.name(),
            id
        );
    }
}

fn required_name(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("name is required"));
    }
    Ok(trimmed.to_string())
}

fn parse_start(raw: Option<&str>) -> Result<Option<OffsetDateTime>, AppError> {
    match raw {
        Some(value) => Ok(Some(
            parse_datetime(value).map_err(AppError::invalid_input)?,
        )),
        None => Ok(None),
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let path = csv_store::store_path()?;
    let config_load = config::load_config_with_fallback();
    if let Some(err) = &config_load.error {
        eprintln!("WARNING: {err}");
    }
    let palette = config::palette_for_theme(config_load.config.theme.as_deref());
    let mut board = csv_store::load_board(&path)?;

    match cli.command {
        Command::Add { add } => match add {
            AddCommand::Task {
                name,
                description,
                start,
                duration,
            } => {
                let name = required_name(&name)?;
                let start_time = parse_start(start.as_deref())?;
                let id = board.next_id();
                board.add_task(Task {
                    id,
                    name,
                    description,
                    status: TaskStatus::New,
                    start_time,
                    duration: Duration::minutes(i64::from(duration)),
                })?;
                csv_store::save_board(&path, &board)?;
                report(&board, id, "Added", cli.json);
            }
            AddCommand::Epic { name, description } => {
                let name = required_name(&name)?;
                let id = board.next_id();
                board.add_epic(Epic::new(id, name, description))?;
                csv_store::save_board(&path, &board)?;
                report(&board, id, "Added", cli.json);
            }
            AddCommand::Subtask {
                name,
                epic,
                description,
                start,
                duration,
            } => {
                let name = required_name(&name)?;
                if let Some(epic_id) = epic
                    && find_epic(&board, epic_id).is_none()
                {
                    return Err(AppError::not_found(format!("epic {epic_id} not found")));
                }
                let start_time = parse_start(start.as_deref())?;
                let id = board.next_id();
                board.add_subtask(Subtask {
                    id,
                    name,
                    description,
                    status: TaskStatus::New,
                    start_time,
                    duration: Duration::minutes(i64::from(duration)),
                    epic_id: epic,
                })?;
                csv_store::save_board(&path, &board)?;
                report(&board, id, "Added", cli.json);
            }
        },
        Command::Edit {
            id,
            name,
            description,
        } => {
            if name.is_none() && description.is_none() {
                return Err(AppError::invalid_input(
                    "nothing to edit: pass --name and/or --description",
                ));
            }
            if let Some(mut task) = find_task(&board, id) {
                if let Some(name) = name {
                    task.name = required_name(&name)?;
                }
                if let Some(description) = description {
                    task.description = description;
                }
                board.update_task(task)?;
            } else if let Some(mut subtask) = find_subtask(&board, id) {
                if let Some(name) = name {
                    subtask.name = required_name(&name)?;
                }
                if let Some(description) = description {
                    subtask.description = description;
                }
                board.update_subtask(subtask)?;
            } else if let Some(mut epic) = find_epic(&board, id) {
                if let Some(name) = name {
                    epic.name = required_name(&name)?;
                }
                if let Some(description) = description {
                    epic.description = description;
                }
                board.update_epic(epic)?;
            } else {
                return Err(AppError::not_found(format!("no item with id {id}")));
            }
            csv_store::save_board(&path, &board)?;
            report(&board, id, "Updated", cli.json);
        }
        Command::Status { id, status } => {
            let status = parse_status(&status).map_err(AppError::invalid_input)?;
            if let Some(mut task) = find_task(&board, id) {
                task.status = status;
                board.update_task(task)?;
            } else if let Some(mut subtask) = find_subtask(&board, id) {
                subtask.status = status;
                board.update_subtask(subtask)?;
            } else if find_epic(&board, id).is_some() {
                return Err(AppError::invalid_input(
                    "an epic's status is derived from its subtasks",
                ));
            } else {
                return Err(AppError::not_found(format!("no item with id {id}")));
            }
            csv_store::save_board(&path, &board)?;
            report(&board, id, "Marked", cli.json);
        }
        Command::Schedule {
            id,
            datetime,
            duration,
            clear,
        } => {
            let start_time = match (clear, datetime) {
                (true, Some(_)) => {
                    return Err(AppError::invalid_input(
                        "pass either a datetime or --clear, not both",
                    ));
                }
                (true, None) => None,
                (false, Some(value)) => parse_start(Some(&value))?,
                (false, None) => return Err(AppError::invalid_input("datetime is required")),
            };
            if let Some(mut task) = find_task(&board, id) {
                task.start_time = start_time;
                if let Some(minutes) = duration {
                    task.duration = Duration::minutes(i64::from(minutes));
                }
                board.update_task(task)?;
            } else if let Some(mut subtask) = find_subtask(&board, id) {
                subtask.start_time = start_time;
                if let Some(minutes) = duration {
                    subtask.duration = Duration::minutes(i64::from(minutes));
                }
                board.update_subtask(subtask)?;
            } else if find_epic(&board, id).is_some() {
                return Err(AppError::invalid_input(
                    "an epic's schedule is derived from its subtasks",
                ));
            } else {
                return Err(AppError::not_found(format!("no item with id {id}")));
            }
            csv_store::save_board(&path, &board)?;
            let verb = if clear { "Unscheduled" } else { "Scheduled" };
            report(&board, id, verb, cli.json);
        }
        Command::Show { id } => {
            let entity = board
                .task_by_id(id)
                .map(Entity::Task)
                .or_else(|_| board.subtask_by_id(id).map(Entity::Subtask))
                .or_else(|_| board.epic_by_id(id).map(Entity::Epic))
                .map_err(|_| AppError::not_found(format!("no item with id {id}")))?;
            // The recorded view is part of the persisted history.
            csv_store::save_board(&path, &board)?;
            print_entity(&entity, &palette, cli.json);
        }
        Command::List { list } => {
            let entities: Vec<Entity> = match list {
                ListCommand::Tasks => board.all_tasks().into_iter().map(Entity::Task).collect(),
                ListCommand::Epics => board.all_epics().into_iter().map(Entity::Epic).collect(),
                ListCommand::Subtasks => board
                    .all_subtasks()
                    .into_iter()
                    .map(Entity::Subtask)
                    .collect(),
            };
            print_entities(&entities, cli.json);
        }
        Command::Subtasks { epic_id } => {
            let entities: Vec<Entity> = board
                .subtasks_of_epic(epic_id)?
                .into_iter()
                .map(Entity::Subtask)
                .collect();
            print_entities(&entities, cli.json);
        }
        Command::Delete { id } => {
            if find_task(&board, id).is_some() {
                board.remove_task_by_id(id);
            } else if find_subtask(&board, id).is_some() {
                board.remove_subtask_by_id(id);
            } else if find_epic(&board, id).is_some() {
                board.remove_epic_by_id(id);
            } else {
                return Err(AppError::not_found(format!("no item with id {id}")));
            }
            csv_store::save_board(&path, &board)?;
            if cli.json {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("Deleted {id}");
            }
        }
        Command::Clear { clear } => {
            let kind = match clear {
                ClearCommand::Tasks => {
                    board.remove_all_tasks();
                    "tasks"
                }
                ClearCommand::Epics => {
                    board.remove_all_epics();
                    "epics"
                }
                ClearCommand::Subtasks => {
                    board.remove_all_subtasks();
                    "subtasks"
                }
            };
            csv_store::save_board(&path, &board)?;
            if cli.json {
                println!("{}", serde_json::json!({ "cleared": kind }));
            } else {
                println!("Cleared {kind}");
            }
        }
        Command::History => {
            print_entities(&board.history(), cli.json);
        }
        Command::Prioritized => {
            print_entities(&board.prioritized_tasks(), cli.json);
        }
    }

    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
