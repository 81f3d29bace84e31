// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Write-side commands for the task store.
//!
//! Commands arrive from the edge layer as loosely-typed payloads: every field
//! of a create command is optional on the wire so that a missing required field
//! produces a per-field validation message instead of a decode error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::project::ProjectId;
use crate::domain::task::{NewTask, Task, TaskId, TaskPriority, TaskStatus};

/// Per-field validation messages, keyed by the wire field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskCommand {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<ProjectId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
    #[serde(default, with = "crate::domain::timestamp::flexible")]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTaskCommand {
    pub fn new(
        title: impl Into<String>,
        project_id: ProjectId,
        status: TaskStatus,
        priority: TaskPriority,
    ) -> Self {
        Self {
            title: Some(title.into()),
            project_id: Some(project_id),
            status: Some(status),
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Checks required fields and produces the task to be written.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<NewTask, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => {
                errors.add("title", "title is required");
                String::new()
            }
        };
        let project_id = match self.project_id {
            Some(id) if id.0 > 0 => id,
            Some(_) => {
                errors.add("projectId", "projectId must be positive");
                ProjectId(0)
            }
            None => {
                errors.add("projectId", "projectId is required");
                ProjectId(0)
            }
        };
        if self.status.is_none() {
            errors.add("status", "status is required");
        }
        if self.priority.is_none() {
            errors.add("priority", "priority is required");
        }

        let status = self.status.unwrap_or(TaskStatus::Todo);
        let priority = self.priority.unwrap_or(TaskPriority::Medium);
        errors.into_result(|| NewTask {
            title,
            description: self.description.clone(),
            project_id,
            status,
            priority,
            assigned_to: normalize_assignee(self.assigned_to.as_deref()),
            due_date: self.due_date,
            created_at: now,
        })
    }
}

/// Partial update: `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
    #[serde(default, with = "crate::domain::timestamp::flexible")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskChanges {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if matches!(self.title.as_deref(), Some(t) if t.trim().is_empty()) {
            errors.add("title", "title must not be blank");
        }
        errors.into_result(|| ())
    }

    /// Field-level merge onto a stored task. `project_id` and `created_at` are
    /// never touched; `updated_at` always moves to `now`.
    pub fn apply_to(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee) = &self.assigned_to {
            task.assigned_to = Some(assignee.clone());
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        task.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTaskCommand {
    pub id: TaskId,
    pub changes: TaskChanges,
}

impl UpdateTaskCommand {
    pub fn new(id: impl Into<TaskId>, changes: TaskChanges) -> Self {
        Self {
            id: id.into(),
            changes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteTaskCommand {
    pub id: TaskId,
}

impl DeleteTaskCommand {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self { id: id.into() }
    }
}

fn normalize_assignee(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored_task() -> Task {
        let created = Utc::now() - chrono::Duration::hours(1);
        Task {
            id: TaskId::from("task-1"),
            title: "Draft".to_string(),
            description: Some("first pass".to_string()),
            project_id: ProjectId(5),
            status: TaskStatus::Todo,
            priority: TaskPriority::Low,
            assigned_to: None,
            due_date: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_create_reports_every_missing_field() {
        let errors = CreateTaskCommand::default().validate(Utc::now()).unwrap_err();
        assert_eq!(errors.fields().len(), 4);
        assert_eq!(errors.get("title"), Some("title is required"));
        assert_eq!(errors.get("projectId"), Some("projectId is required"));
    }

    #[test]
    fn test_create_rejects_blank_title_and_nonpositive_project() {
        let mut command = CreateTaskCommand::new("   ", ProjectId(0), TaskStatus::Todo, TaskPriority::Low);
        command.assigned_to = Some(" ".to_string());
        let errors = command.validate(Utc::now()).unwrap_err();
        assert!(errors.get("title").is_some());
        assert_eq!(errors.get("projectId"), Some("projectId must be positive"));
    }

    #[test]
    fn test_create_normalizes_blank_assignee() {
        let command = CreateTaskCommand::new("Plan", ProjectId(1), TaskStatus::Todo, TaskPriority::High)
            .with_assignee("  ");
        let new_task = command.validate(Utc::now()).unwrap();
        assert_eq!(new_task.assigned_to, None);
    }

    #[test]
    fn test_merge_only_overwrites_present_fields() {
        let mut task = stored_task();
        let before = task.clone();
        let now = Utc::now();
        let changes = TaskChanges {
            status: Some(TaskStatus::Done),
            ..TaskChanges::default()
        };

        changes.apply_to(&mut task, now);

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.priority, TaskPriority::Low);
        assert_eq!(task.title, before.title);
        assert_eq!(task.description, before.description);
        assert_eq!(task.created_at, before.created_at);
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn test_changes_reject_blank_title() {
        let changes = TaskChanges {
            title: Some(String::new()),
            ..TaskChanges::default()
        };
        assert!(changes.validate().is_err());
        assert!(TaskChanges::default().validate().is_ok());
    }

    #[test]
    fn test_changes_decode_from_partial_json() {
        let changes: TaskChanges =
            serde_json::from_str(r#"{"status":"IN_PROGRESS","assignedTo":null}"#).unwrap();
        assert_eq!(changes.status, Some(TaskStatus::InProgress));
        assert_eq!(changes.assigned_to, None);
        assert_eq!(changes.title, None);
    }

    #[test]
    fn test_due_date_accepts_zone_less_format() {
        let changes: TaskChanges = serde_json::from_str(r#"{"dueDate":"2026-03-01 09:30:00"}"#).unwrap();
        assert_eq!(
            changes.due_date,
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap())
        );

        let command: CreateTaskCommand =
            serde_json::from_str(r#"{"title":"t","dueDate":"2026-03-01T09:30:00Z"}"#).unwrap();
        assert!(command.due_date.is_some());

        assert!(serde_json::from_str::<CreateTaskCommand>(r#"{"dueDate":"soon"}"#).is_err());
    }
}
