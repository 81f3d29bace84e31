// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task Service Facade
//!
//! The single entry point the presentation layer calls. Wraps the command and
//! query handlers and logs every operation; each call is an independent unit
//! of work.
//!
//! Reads have two entry points: [`TaskService::query`] dispatches a
//! [`TaskQuery`] (the HTTP routes use it), and a few typed shortcuts
//! (`get_task`, `get_all_tasks`, `count_tasks_by_project`) return the concrete
//! shape for in-process callers.

use std::sync::Arc;
use tracing::{info, warn};

use crate::application::command_handler::TaskCommandHandler;
use crate::application::errors::TaskError;
use crate::application::query_handler::TaskQueryHandler;
use crate::domain::commands::{CreateTaskCommand, DeleteTaskCommand, UpdateTaskCommand};
use crate::domain::project::ProjectId;
use crate::domain::queries::{QueryResult, TaskQuery};
use crate::domain::task::{TaskId, TaskView};

#[derive(Clone)]
pub struct TaskService {
    commands: Arc<TaskCommandHandler>,
    queries: Arc<TaskQueryHandler>,
}

fn logged<T>(operation: &'static str, result: Result<T, TaskError>) -> Result<T, TaskError> {
    if let Err(e) = &result {
        match e {
            TaskError::Repository(_) => {
                tracing::error!(operation, error = %e, "Task operation failed")
            }
            _ => warn!(operation, kind = e.kind(), error = %e, "Task operation rejected"),
        }
    }
    result
}

impl TaskService {
    pub fn new(commands: Arc<TaskCommandHandler>, queries: Arc<TaskQueryHandler>) -> Self {
        Self { commands, queries }
    }

    pub async fn create_task(&self, command: CreateTaskCommand) -> Result<TaskView, TaskError> {
        info!(title = ?command.title, project_id = ?command.project_id, "Creating task");
        logged("create_task", self.commands.create(command).await)
    }

    pub async fn update_task(&self, command: UpdateTaskCommand) -> Result<TaskView, TaskError> {
        info!(task_id = %command.id, "Updating task");
        logged("update_task", self.commands.update(command).await)
    }

    pub async fn delete_task(&self, command: DeleteTaskCommand) -> Result<(), TaskError> {
        info!(task_id = %command.id, "Deleting task");
        logged("delete_task", self.commands.delete(command).await)
    }

    pub async fn query(&self, query: TaskQuery) -> Result<QueryResult, TaskError> {
        let name = query.name();
        info!(query = name, "Running task query");
        logged(name, self.queries.handle(query).await)
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<TaskView, TaskError> {
        info!(task_id = %id, "Fetching task");
        logged("get_task", self.queries.by_id(id).await)
    }

    pub async fn get_all_tasks(&self) -> Result<Vec<TaskView>, TaskError> {
        info!("Fetching all tasks");
        logged("get_all_tasks", self.queries.all().await)
    }

    pub async fn count_tasks_by_project(&self, project_id: ProjectId) -> Result<u64, TaskError> {
        info!(project_id = %project_id, "Counting tasks by project");
        logged("count_tasks_by_project", self.queries.count_by_project(project_id).await)
    }
}
