use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::task::Task;
use crate::tracker::progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortMode {
    #[default]
    CreatedTime,
    DueDate,
    Priority,
    Status,
    Description,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatedTime => write!(f, "Created Time"),
            Self::DueDate => write!(f, "Due Date"),
            Self::Priority => write!(f, "Priority"),
            Self::Status => write!(f, "Status"),
            Self::Description => write!(f, "Description"),
        }
    }
}

/// Never fails: unrecognized names sort by description.
impl FromStr for SortMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        Ok(match normalized.as_str() {
            "createdtime" | "created" => Self::CreatedTime,
            "duedate" | "due" => Self::DueDate,
            "priority" => Self::Priority,
            "status" => Self::Status,
            _ => Self::Description,
        })
    }
}

impl SortMode {
    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::CreatedTime => a.created_at.cmp(&b.created_at),
            Self::DueDate => a.due.cmp(&b.due),
            Self::Priority => a.priority_rank().cmp(&b.priority_rank()),
            Self::Status => a.done.cmp(&b.done),
            Self::Description => a.description.cmp(&b.description),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub sort: Option<String>,
}

impl Query {
    pub fn sort_mode(&self) -> SortMode {
        self.sort
            .as_deref()
            .map(|s| s.parse::<SortMode>().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn matches(&self, task: &Task) -> bool {
        let keyword = self.search.to_lowercase();
        task.description.to_lowercase().contains(&keyword) && (!self.pending || !task.done)
    }
}

/// Filtered and stably sorted `(original_index, task)` pairs.
pub fn select<'a>(tasks: &'a [Task], query: &Query) -> Vec<(usize, &'a Task)> {
    let mode = query.sort_mode();
    let mut rows: Vec<(usize, &Task)> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| query.matches(task))
        .collect();
    // sort_by is stable, so equal keys keep storage order.
    rows.sort_by(|(_, a), (_, b)| mode.compare(a, b));
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DueStatus {
    Overdue,
    Upcoming,
    Done,
}

impl DueStatus {
    pub fn of(task: &Task, today: NaiveDate) -> Self {
        if task.done {
            Self::Done
        } else if task.due.as_str() < today.format("%Y-%m-%d").to_string().as_str() {
            Self::Overdue
        } else {
            Self::Upcoming
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overdue => write!(f, "Overdue"),
            Self::Upcoming => write!(f, "Upcoming"),
            Self::Done => write!(f, "Done"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub id: String,
    pub index: usize,
    pub description: String,
    pub done: bool,
    pub due: String,
    pub due_status: DueStatus,
    pub priority: String,
    pub priority_color: &'static str,
    pub created: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOption {
    pub position: usize,
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub progress: f64,
    pub total: usize,
    pub done: usize,
    pub sort: SortMode,
    pub rows: Vec<Row>,
    pub delete_options: Vec<DeleteOption>,
}

/// Whole-screen projection, recomputed from scratch after every interaction.
pub fn render(tasks: &[Task], query: &Query, today: NaiveDate) -> View {
    let rows = select(tasks, query)
        .into_iter()
        .map(|(index, task)| Row {
            id: task.id.clone(),
            index,
            description: task.description.clone(),
            done: task.done,
            due: task.due.clone(),
            due_status: DueStatus::of(task, today),
            priority: task
                .priority
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            priority_color: task.priority_color(),
            created: task.created_date().to_string(),
        })
        .collect();

    let delete_options = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| DeleteOption {
            position: i + 1,
            id: task.id.clone(),
            label: format!("{}. {}", i + 1, task.description),
        })
        .collect();

    View {
        progress: progress(tasks),
        total: tasks.len(),
        done: tasks.iter().filter(|t| t.done).count(),
        sort: query.sort_mode(),
        rows,
        delete_options,
    }
}
