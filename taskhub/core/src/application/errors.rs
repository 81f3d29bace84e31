// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Errors surfaced to callers of the task service facade.
//!
//! Messaging failures are absent on purpose: publish and reconciliation errors
//! stay inside the publisher and the consumer.

use crate::domain::commands::ValidationErrors;
use crate::domain::project::ProjectId;
use crate::domain::repository::RepositoryError;
use crate::domain::task::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found with id: {0}")]
    TaskNotFound(TaskId),

    #[error("Task with title '{title}' already exists in project {project_id}")]
    DuplicateTask { project_id: ProjectId, title: String },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl TaskError {
    /// Short machine-readable kind, used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::TaskNotFound(_) => "task_not_found",
            TaskError::DuplicateTask { .. } => "duplicate_task",
            TaskError::Validation(_) => "validation_failed",
            TaskError::Repository(_) => "repository_error",
        }
    }
}

impl From<ValidationErrors> for TaskError {
    fn from(errors: ValidationErrors) -> Self {
        TaskError::Validation(errors)
    }
}
