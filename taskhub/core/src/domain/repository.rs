// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Store Contract
//!
//! Persistence contract for the `Task` aggregate. The interface lives in the
//! domain layer and is implemented in `crate::infrastructure::repositories`.
//!
//! | Implementation | Backend |
//! |----------------|---------|
//! | `InMemoryTaskRepository` | process memory, development and tests |
//! | `PostgresTaskRepository` | PostgreSQL `tasks` table |
//!
//! The store guarantees per-task atomicity only. There are no cross-task
//! transactions, and `(project_id, title)` uniqueness is checked by the command
//! handler, not here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::project::ProjectId;
use crate::domain::queries::PageRequest;
use crate::domain::task::{NewTask, Task, TaskId, TaskPriority, TaskStatus};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new task; the store generates its id.
    async fn insert(&self, task: NewTask) -> Result<Task, RepositoryError>;

    /// Overwrite an existing task. `NotFound` if it disappeared meanwhile.
    async fn update(&self, task: &Task) -> Result<Task, RepositoryError>;

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, RepositoryError>;

    /// Remove a task; returns whether anything was removed.
    async fn delete(&self, id: &TaskId) -> Result<bool, RepositoryError>;

    async fn exists_by_project_and_title(
        &self,
        project_id: ProjectId,
        title: &str,
    ) -> Result<bool, RepositoryError>;

    async fn find_all(&self) -> Result<Vec<Task>, RepositoryError>;

    /// One page ordered by creation time, plus the total number of tasks.
    async fn find_page(&self, page: PageRequest) -> Result<(Vec<Task>, u64), RepositoryError>;

    async fn find_by_project(&self, project_id: ProjectId) -> Result<Vec<Task>, RepositoryError>;

    async fn find_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> Result<Vec<Task>, RepositoryError>;

    async fn find_by_assignee(&self, assignee: &str) -> Result<Vec<Task>, RepositoryError>;

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError>;

    async fn find_by_priority(&self, priority: TaskPriority) -> Result<Vec<Task>, RepositoryError>;

    /// Case-insensitive substring match on the title.
    async fn search_by_title(&self, fragment: &str) -> Result<Vec<Task>, RepositoryError>;

    /// Tasks whose due date falls in `[start, end]`.
    async fn find_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError>;

    async fn count_by_project(&self, project_id: ProjectId) -> Result<u64, RepositoryError>;

    async fn count_by_assignee(&self, assignee: &str) -> Result<u64, RepositoryError>;

    /// Bulk removal of every task referencing the project; returns how many went.
    async fn delete_by_project(&self, project_id: ProjectId) -> Result<u64, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
