use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::TaskError;

pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Priority as stored on disk. Unknown strings from older or hand-edited
/// files are kept verbatim so a save never rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Other(String),
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low | Self::Other(_) => 3,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "red",
            Self::Medium => "orange",
            Self::Low => "green",
            Self::Other(_) => "gray",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Low" => Self::Low,
            "Medium" => Self::Medium,
            "High" => Self::High,
            _ => Self::Other(s),
        }
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.to_string()
    }
}

/// Strict parse for user input; stored values go through `From<String>`.
impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TaskError::Validation(format!(
                "priority must be Low, Medium or High, got '{}'",
                s
            ))),
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(rename = "task")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub done: bool,
    pub due: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    pub created_at: String,
    /// Keys this version does not know about, carried through save and export.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn new(description: &str, due: NaiveDate, priority: Priority) -> Self {
        Self {
            id: new_id(),
            description: description.to_string(),
            done: false,
            due: due.format("%Y-%m-%d").to_string(),
            priority: Some(priority),
            created_at: Local::now().format(CREATED_AT_FORMAT).to_string(),
            extra: Map::new(),
        }
    }

    pub fn priority_rank(&self) -> u8 {
        self.priority.as_ref().map_or(3, Priority::rank)
    }

    pub fn priority_color(&self) -> &'static str {
        self.priority.as_ref().map_or("gray", Priority::color)
    }

    pub fn created_date(&self) -> &str {
        self.created_at.split(' ').next().unwrap_or_default()
    }
}

pub fn parse_due(s: &str) -> Result<NaiveDate, TaskError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| TaskError::Validation(format!("due date must be YYYY-MM-DD, got '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_record_without_id_or_priority_loads() {
        let json = r#"{"task": "Water plants", "done": false, "due": "2024-05-01", "created_at": "2024-04-01 09:00:00.000001"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(!task.id.is_empty());
        assert_eq!(task.priority, None);
        assert_eq!(task.priority_rank(), 3);
        assert_eq!(task.priority_color(), "gray");
    }

    #[test]
    fn missing_done_defaults_to_false() {
        let json = r#"{"task": "a", "due": "2024-05-01", "created_at": "x"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(!task.done);
    }

    #[test]
    fn null_done_reads_as_false() {
        let json = r#"[{"task": "a", "done": null, "due": "2024-05-01", "created_at": "x"},
                       {"task": "b", "done": true, "due": "2024-05-01", "created_at": "y"}]"#;
        let tasks: Vec<Task> = serde_json::from_str(json).unwrap();
        assert!(!tasks[0].done);
        assert!(tasks[1].done);
    }

    #[test]
    fn unknown_priority_and_extra_keys_survive() {
        let json = r#"{"id": "abc", "task": "a", "done": true, "due": "2024-05-01", "priority": "Urgent", "created_at": "x", "tag": "home"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Some(Priority::Other("Urgent".into())));
        assert_eq!(task.priority_color(), "gray");
        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back["priority"], "Urgent");
        assert_eq!(back["tag"], "home");
    }

    #[test]
    fn new_task_fields() {
        let due = NaiveDate::from_ymd_opt(2030, 1, 2).unwrap();
        let task = Task::new("Read", due, Priority::High);
        assert_eq!(task.due, "2030-01-02");
        assert!(!task.done);
        assert_eq!(task.created_date().len(), 10);
        assert!(NaiveDate::parse_from_str(task.created_date(), "%Y-%m-%d").is_ok());
    }

    #[test]
    fn priority_from_str_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("med".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn parse_due_rejects_garbage() {
        assert!(parse_due("2024-13-40").is_err());
        assert_eq!(
            parse_due(" 2024-02-29 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }
}
