use clap::{Parser, Subcommand};
use taskboard_core::model::TaskStatus;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add an item to the board
    ///
    /// Example: taskboard add task "Write docs" --start "2025-01-01 10:00" --duration 60
    /// Example: taskboard add epic "Release 1.0"
    /// Example: taskboard add subtask "Draft notes" --epic 1
    Add {
        #[command(subcommand)]
        add: AddCommand,
    },
    /// Rename an item or replace its description
    ///
    /// Example: taskboard edit 1 --name "Write better docs"
    Edit {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Set a task's or subtask's status
    ///
    /// Example: taskboard status 2 done
    Status { id: u64, status: String },
    /// Schedule an item, or clear its schedule
    ///
    /// Example: taskboard schedule 1 "2025-01-01 10:00" --duration 60
    /// Example: taskboard schedule 1 --clear
    Schedule {
        id: u64,
        datetime: Option<String>,
        #[arg(long, value_name = "MINUTES")]
        duration: Option<u32>,
        #[arg(long)]
        clear: bool,
    },
    /// Show one item and record the view
    ///
    /// Example: taskboard show 1
    Show { id: u64 },
    /// List items of one kind
    ///
    /// Example: taskboard list tasks
    List {
        #[command(subcommand)]
        list: ListCommand,
    },
    /// List the subtasks of an epic
    ///
    /// Example: taskboard subtasks 1
    Subtasks { epic_id: u64 },
    /// Delete one item (an epic takes its subtasks with it)
    ///
    /// Example: taskboard delete 1
    Delete { id: u64 },
    /// Delete every item of one kind
    ///
    /// Example: taskboard clear subtasks
    Clear {
        #[command(subcommand)]
        clear: ClearCommand,
    },
    /// Show recently viewed items, oldest first
    History,
    /// Show scheduled items in start order
    Prioritized,
}

#[derive(Subcommand, Debug)]
pub enum AddCommand {
    /// Add a basic task
    Task {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long, value_name = "MINUTES", default_value_t = 0)]
        duration: u32,
    },
    /// Add an epic (status and schedule derive from its subtasks)
    Epic {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Add a subtask, optionally owned by an epic
    Subtask {
        name: String,
        #[arg(long, value_name = "ID")]
        epic: Option<u64>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long, value_name = "MINUTES", default_value_t = 0)]
        duration: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// List basic tasks
    Tasks,
    /// List epics with their derived state
    Epics,
    /// List subtasks
    Subtasks,
}

#[derive(Subcommand, Debug)]
pub enum ClearCommand {
    /// Delete all basic tasks
    Tasks,
    /// Delete all epics; their subtasks stay, unparented
    Epics,
    /// Delete all subtasks; epics reset to NEW
    Subtasks,
}

pub fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('_') {
        "new" => Ok(TaskStatus::New),
        "in_progress" | "inprogress" => Ok(TaskStatus::InProgress),
        "done" => Ok(TaskStatus::Done),
        other => Err(format!("unknown status '{other}'")),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM`, or a bare date (midnight UTC).
pub fn parse_datetime(raw: &str) -> Result<OffsetDateTime, String> {
    let trimmed = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(parsed);
    }

    let minute_format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, &minute_format) {
        return Ok(parsed.assume_utc());
    }

    let date_format = format_description!("[year]-[month]-[day]");
    if let Ok(parsed) = Date::parse(trimmed, &date_format) {
        return Ok(parsed.midnight().assume_utc());
    }

    Err(format!("could not parse datetime '{trimmed}'"))
}

#[cfg(test)]
mod tests {
    use super::{parse_datetime, parse_status};
    use taskboard_core::model::TaskStatus;
    use time::macros::datetime;

    #[test]
    fn parse_status_accepts_common_spellings() {
        assert_eq!(parse_status("new"), Ok(TaskStatus::New));
        assert_eq!(parse_status("IN_PROGRESS"), Ok(TaskStatus::InProgress));
        assert_eq!(parse_status("in-progress"), Ok(TaskStatus::InProgress));
        assert_eq!(parse_status(" Done "), Ok(TaskStatus::Done));
        assert!(parse_status("blocked").is_err());
    }

    #[test]
    fn parse_datetime_accepts_rfc3339() {
        assert_eq!(
            parse_datetime("2025-01-01T10:00:00Z"),
            Ok(datetime!(2025-01-01 10:00 UTC))
        );
    }

    #[test]
    fn parse_datetime_accepts_minute_precision_and_bare_dates() {
        assert_eq!(
            parse_datetime("2025-01-01 10:30"),
            Ok(datetime!(2025-01-01 10:30 UTC))
        );
        assert_eq!(
            parse_datetime("2025-01-01"),
            Ok(datetime!(2025-01-01 00:00 UTC))
        );
        assert!(parse_datetime("not-a-date").is_err());
    }
}
