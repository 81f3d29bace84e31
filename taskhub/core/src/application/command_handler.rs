// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task Command Handler
//!
//! Write side of the task service.
//!
//! # Flow (create)
//!
//! 1. Validate the command (per-field errors)
//! 2. Optionally confirm the project with the project service
//! 3. Reject a duplicate `(project_id, title)`
//! 4. Persist, then publish `TASK_CREATED`
//!
//! Every mutation is exactly one store write followed by one publish attempt.
//! The publish is fire-and-forget; a command succeeds on the write alone.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::errors::TaskError;
use crate::domain::commands::{CreateTaskCommand, DeleteTaskCommand, UpdateTaskCommand, ValidationErrors};
use crate::domain::events::{TaskEvent, TaskEventType};
use crate::domain::project::{ProjectDirectory, ProjectId};
use crate::domain::repository::{RepositoryError, TaskRepository};
use crate::domain::task::TaskView;
use crate::infrastructure::event_publisher::TaskEventPublisher;

/// Where outbound task events go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRoute {
    pub exchange: String,
    pub routing_key: String,
}

impl EventRoute {
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }
}

pub struct TaskCommandHandler {
    repository: Arc<dyn TaskRepository>,
    publisher: Arc<dyn TaskEventPublisher>,
    route: EventRoute,
    project_directory: Option<Arc<dyn ProjectDirectory>>,
}

impl TaskCommandHandler {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        publisher: Arc<dyn TaskEventPublisher>,
        route: EventRoute,
    ) -> Self {
        Self {
            repository,
            publisher,
            route,
            project_directory: None,
        }
    }

    /// Reject creates for projects the directory does not know. Only consulted
    /// while no local task references the project yet.
    pub fn with_project_validation(mut self, directory: Arc<dyn ProjectDirectory>) -> Self {
        self.project_directory = Some(directory);
        self
    }

    pub async fn create(&self, command: CreateTaskCommand) -> Result<TaskView, TaskError> {
        let new_task = command.validate(Utc::now())?;

        self.ensure_project_known(new_task.project_id).await?;

        if self
            .repository
            .exists_by_project_and_title(new_task.project_id, &new_task.title)
            .await?
        {
            debug!(project_id = %new_task.project_id, title = %new_task.title, "Duplicate task rejected");
            return Err(TaskError::DuplicateTask {
                project_id: new_task.project_id,
                title: new_task.title,
            });
        }

        let task = self.repository.insert(new_task).await?;
        info!(task_id = %task.id, project_id = %task.project_id, "Task created");

        let view = TaskView::from(task);
        self.emit(TaskEventType::Created, &view);
        Ok(view)
    }

    pub async fn update(&self, command: UpdateTaskCommand) -> Result<TaskView, TaskError> {
        command.changes.validate()?;

        let mut task = self
            .repository
            .find_by_id(&command.id)
            .await?
            .ok_or_else(|| TaskError::TaskNotFound(command.id.clone()))?;

        command.changes.apply_to(&mut task, Utc::now());

        let task = match self.repository.update(&task).await {
            Ok(task) => task,
            Err(RepositoryError::NotFound(_)) => return Err(TaskError::TaskNotFound(command.id)),
            Err(e) => return Err(e.into()),
        };
        info!(task_id = %task.id, status = %task.status, "Task updated");

        let view = TaskView::from(task);
        self.emit(TaskEventType::Updated, &view);
        Ok(view)
    }

    pub async fn delete(&self, command: DeleteTaskCommand) -> Result<(), TaskError> {
        let snapshot = self
            .repository
            .find_by_id(&command.id)
            .await?
            .ok_or_else(|| TaskError::TaskNotFound(command.id.clone()))?;

        if !self.repository.delete(&command.id).await? {
            return Err(TaskError::TaskNotFound(command.id));
        }
        info!(task_id = %snapshot.id, project_id = %snapshot.project_id, "Task deleted");

        self.emit(TaskEventType::Deleted, &TaskView::from(snapshot));
        Ok(())
    }

    async fn ensure_project_known(&self, project_id: ProjectId) -> Result<(), TaskError> {
        let Some(directory) = &self.project_directory else {
            return Ok(());
        };
        if self.repository.count_by_project(project_id).await? > 0 {
            return Ok(());
        }
        if directory.exists(project_id).await {
            return Ok(());
        }

        warn!(project_id = %project_id, "Create rejected, project unknown to project service");
        Err(TaskError::Validation(ValidationErrors::single(
            "projectId",
            format!("project {project_id} does not exist"),
        )))
    }

    fn emit(&self, event_type: TaskEventType, view: &TaskView) {
        let event = TaskEvent::from_view(event_type, view);
        self.publisher
            .publish(&self.route.exchange, &self.route.routing_key, &event);
    }
}
