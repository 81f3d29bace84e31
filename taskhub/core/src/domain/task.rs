// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task aggregate (the dependent item owned by the task store).
//!
//! A task always references exactly one project. The `(project_id, title)`
//! pair is unique at creation time; the command handler checks it before the
//! write, the store does not enforce it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::project::ProjectId;

/// Store-generated task identifier. Opaque to everything but the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Review => "REVIEW",
            TaskStatus::Done => "DONE",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "REVIEW" => Ok(TaskStatus::Review),
            "DONE" => Ok(TaskStatus::Done),
            "CANCELLED" => Ok(TaskStatus::Cancelled),
            _ => Err(UnknownVariant::new("status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            "URGENT" => Ok(TaskPriority::Urgent),
            _ => Err(UnknownVariant::new("priority", s)),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for TaskPriority {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Returned when a status or priority string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// A task as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub project_id: ProjectId,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated task that has not been written yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: ProjectId,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            project_id: self.project_id,
            status: self.status,
            priority: self.priority,
            assigned_to: self.assigned_to,
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Read projection handed back to callers and embedded in outbound events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub project_id: ProjectId,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            project_id: task.project_id,
            status: task.status,
            priority: task.priority,
            assigned_to: task.assigned_to.clone(),
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            project_id: task.project_id,
            status: task.status,
            priority: task.priority,
            assigned_to: task.assigned_to,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("FINISHED".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_wire_format() {
        let json = serde_json::to_string(&TaskPriority::Urgent).unwrap();
        assert_eq!(json, "\"URGENT\"");
        let err = "CRITICAL".parse::<TaskPriority>().unwrap_err();
        assert_eq!(err.to_string(), "unknown priority: CRITICAL");
    }

    #[test]
    fn test_new_task_timestamps_match() {
        let now = Utc::now();
        let task = NewTask {
            title: "Write tests".to_string(),
            description: None,
            project_id: ProjectId(3),
            status: TaskStatus::Todo,
            priority: TaskPriority::Low,
            assigned_to: None,
            due_date: None,
            created_at: now,
        }
        .into_task(TaskId::generate());

        assert_eq!(task.created_at, task.updated_at);
        assert!(!task.id.as_str().is_empty());
    }

    #[test]
    fn test_view_uses_camel_case() {
        let now = Utc::now();
        let task = Task {
            id: TaskId::from("t-1"),
            title: "Ship".to_string(),
            description: None,
            project_id: ProjectId(9),
            status: TaskStatus::Review,
            priority: TaskPriority::Medium,
            assigned_to: Some("alice".to_string()),
            due_date: None,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(TaskView::from(&task)).unwrap();
        assert_eq!(value["projectId"], 9);
        assert_eq!(value["assignedTo"], "alice");
        assert_eq!(value["status"], "REVIEW");
    }

    #[test]
    fn test_json_decoding_ignores_case() {
        let status: TaskStatus = serde_json::from_str(r#""in_progress""#).unwrap();
        assert_eq!(status, TaskStatus::InProgress);
        let priority: TaskPriority = serde_json::from_str(r#""Urgent""#).unwrap();
        assert_eq!(priority, TaskPriority::Urgent);
        assert!(serde_json::from_str::<TaskStatus>(r#""someday""#).is_err());
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), r#""IN_PROGRESS""#);
    }
}
