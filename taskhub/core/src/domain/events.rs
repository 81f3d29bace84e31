// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration events exchanged with peer services.
//!
//! These are notifications, not a log: nothing here is persisted by the task
//! service. `TaskEvent` is what this service publishes after each successful
//! mutation; `ProjectEvent` is what the project service publishes and this
//! service reconciles against.
//!
//! Wire names are camelCase to match the peers. `eventId` is optional on the
//! way in (older producers do not send one) and always set on the way out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::project::ProjectId;
use crate::domain::task::{TaskId, TaskView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskEventType {
    #[serde(rename = "TASK_CREATED")]
    Created,
    #[serde(rename = "TASK_UPDATED")]
    Updated,
    #[serde(rename = "TASK_DELETED")]
    Deleted,
}

impl TaskEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskEventType::Created => "TASK_CREATED",
            TaskEventType::Updated => "TASK_UPDATED",
            TaskEventType::Deleted => "TASK_DELETED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    pub event_id: Uuid,
    pub event_type: TaskEventType,
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub task_title: String,
    /// JSON snapshot of the task as it was when the event was raised.
    pub event_data: String,
    pub timestamp: DateTime<Utc>,
}

impl TaskEvent {
    pub fn from_view(event_type: TaskEventType, view: &TaskView) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            task_id: view.id.clone(),
            project_id: view.project_id,
            task_title: view.title.clone(),
            event_data: serde_json::to_string(view).unwrap_or_default(),
            timestamp: Utc::now(),
        }
    }
}

/// Project lifecycle change as understood by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEventKind {
    Created,
    Updated,
    Deleted,
    Unknown(String),
}

impl ProjectEventKind {
    /// Accepts both the prefixed (`PROJECT_DELETED`) and bare (`DELETED`) tags.
    pub fn parse(raw: &str) -> Self {
        let tag = raw.trim().to_ascii_uppercase();
        match tag.strip_prefix("PROJECT_").unwrap_or(tag.as_str()) {
            "CREATED" => ProjectEventKind::Created,
            "UPDATED" => ProjectEventKind::Updated,
            "DELETED" => ProjectEventKind::Deleted,
            _ => ProjectEventKind::Unknown(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEvent {
    #[serde(default)]
    pub event_id: Option<Uuid>,
    pub event_type: String,
    pub project_id: ProjectId,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub event_data: Option<String>,
    #[serde(default, with = "crate::domain::timestamp::lenient")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProjectEvent {
    pub fn new(kind: &str, project_id: ProjectId, project_name: impl Into<String>) -> Self {
        Self {
            event_id: Some(Uuid::new_v4()),
            event_type: kind.to_string(),
            project_id,
            project_name: Some(project_name.into()),
            event_data: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn kind(&self) -> ProjectEventKind {
        ProjectEventKind::parse(&self.event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{TaskPriority, TaskStatus};

    #[test]
    fn test_task_event_wire_shape() {
        let now = Utc::now();
        let view = TaskView {
            id: TaskId::from("abc"),
            title: "Design spec".to_string(),
            description: None,
            project_id: ProjectId(7),
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            assigned_to: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        };
        let event = TaskEvent::from_view(TaskEventType::Created, &view);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["eventType"], "TASK_CREATED");
        assert_eq!(value["taskId"], "abc");
        assert_eq!(value["projectId"], 7);
        assert_eq!(value["taskTitle"], "Design spec");
        assert!(value["eventId"].is_string());
        let snapshot: TaskView =
            serde_json::from_str(value["eventData"].as_str().unwrap()).unwrap();
        assert_eq!(snapshot, view);
    }

    #[test]
    fn test_project_event_kind_accepts_both_tag_styles() {
        assert_eq!(ProjectEventKind::parse("PROJECT_DELETED"), ProjectEventKind::Deleted);
        assert_eq!(ProjectEventKind::parse("deleted"), ProjectEventKind::Deleted);
        assert_eq!(ProjectEventKind::parse("PROJECT_CREATED"), ProjectEventKind::Created);
        assert_eq!(
            ProjectEventKind::parse("PROJECT_ARCHIVED"),
            ProjectEventKind::Unknown("PROJECT_ARCHIVED".to_string())
        );
    }

    #[test]
    fn test_project_event_decodes_legacy_payload() {
        let raw = r#"{
            "eventType": "PROJECT_DELETED",
            "projectId": 42,
            "projectName": "Apollo",
            "eventData": "ProjectDTO(id=42)",
            "timestamp": "2026-02-19T12:00:00"
        }"#;
        let event: ProjectEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(event.event_id, None);
        assert_eq!(event.project_id, ProjectId(42));
        assert_eq!(event.kind(), ProjectEventKind::Deleted);
        assert!(event.timestamp.is_some());
    }
}
