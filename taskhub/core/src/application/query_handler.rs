// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task Query Handler
//!
//! Read side of the task service. Stateless; one function per [`TaskQuery`]
//! variant. Only `ById` can fail with `TaskNotFound`; collections come back
//! empty and counts come back 0.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::application::errors::TaskError;
use crate::domain::project::ProjectId;
use crate::domain::queries::{Page, PageRequest, QueryResult, TaskQuery};
use crate::domain::repository::TaskRepository;
use crate::domain::task::{Task, TaskId, TaskPriority, TaskStatus, TaskView};

pub struct TaskQueryHandler {
    repository: Arc<dyn TaskRepository>,
}

fn views(tasks: Vec<Task>) -> Vec<TaskView> {
    tasks.into_iter().map(TaskView::from).collect()
}

impl TaskQueryHandler {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: TaskQuery) -> Result<QueryResult, TaskError> {
        debug!(query = query.name(), "Handling task query");
        let result = match query {
            TaskQuery::ById(id) => QueryResult::One(self.by_id(&id).await?),
            TaskQuery::ByProject(project_id) => QueryResult::Many(self.by_project(project_id).await?),
            TaskQuery::ByProjectAndStatus(project_id, status) => {
                QueryResult::Many(self.by_project_and_status(project_id, status).await?)
            }
            TaskQuery::ByAssignee(assignee) => QueryResult::Many(self.by_assignee(&assignee).await?),
            TaskQuery::ByStatus(status) => QueryResult::Many(self.by_status(status).await?),
            TaskQuery::ByPriority(priority) => QueryResult::Many(self.by_priority(priority).await?),
            TaskQuery::All => QueryResult::Many(self.all().await?),
            TaskQuery::Paginated(page) => QueryResult::Page(self.paginated(page).await?),
            TaskQuery::SearchByTitle(fragment) => {
                QueryResult::Many(self.search_by_title(&fragment).await?)
            }
            TaskQuery::DueBetween { start, end } => {
                QueryResult::Many(self.due_between(start, end).await?)
            }
            TaskQuery::CountByProject(project_id) => {
                QueryResult::Count(self.count_by_project(project_id).await?)
            }
            TaskQuery::CountByAssignee(assignee) => {
                QueryResult::Count(self.count_by_assignee(&assignee).await?)
            }
        };
        Ok(result)
    }

    pub async fn by_id(&self, id: &TaskId) -> Result<TaskView, TaskError> {
        self.repository
            .find_by_id(id)
            .await?
            .map(TaskView::from)
            .ok_or_else(|| TaskError::TaskNotFound(id.clone()))
    }

    pub async fn by_project(&self, project_id: ProjectId) -> Result<Vec<TaskView>, TaskError> {
        Ok(views(self.repository.find_by_project(project_id).await?))
    }

    pub async fn by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> Result<Vec<TaskView>, TaskError> {
        Ok(views(
            self.repository
                .find_by_project_and_status(project_id, status)
                .await?,
        ))
    }

    pub async fn by_assignee(&self, assignee: &str) -> Result<Vec<TaskView>, TaskError> {
        Ok(views(self.repository.find_by_assignee(assignee).await?))
    }

    pub async fn by_status(&self, status: TaskStatus) -> Result<Vec<TaskView>, TaskError> {
        Ok(views(self.repository.find_by_status(status).await?))
    }

    pub async fn by_priority(&self, priority: TaskPriority) -> Result<Vec<TaskView>, TaskError> {
        Ok(views(self.repository.find_by_priority(priority).await?))
    }

    pub async fn all(&self) -> Result<Vec<TaskView>, TaskError> {
        Ok(views(self.repository.find_all().await?))
    }

    pub async fn paginated(&self, request: PageRequest) -> Result<Page<TaskView>, TaskError> {
        let (tasks, total) = self.repository.find_page(request).await?;
        Ok(Page::new(tasks, request, total).map(TaskView::from))
    }

    /// Blank fragments match nothing rather than everything.
    pub async fn search_by_title(&self, fragment: &str) -> Result<Vec<TaskView>, TaskError> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Ok(Vec::new());
        }
        Ok(views(self.repository.search_by_title(fragment).await?))
    }

    /// An inverted range is empty, not an error.
    pub async fn due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TaskView>, TaskError> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(views(self.repository.find_due_between(start, end).await?))
    }

    pub async fn count_by_project(&self, project_id: ProjectId) -> Result<u64, TaskError> {
        Ok(self.repository.count_by_project(project_id).await?)
    }

    pub async fn count_by_assignee(&self, assignee: &str) -> Result<u64, TaskError> {
        Ok(self.repository.count_by_assignee(assignee).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::NewTask;
    use crate::infrastructure::repositories::InMemoryTaskRepository;
    use chrono::Duration;

    async fn seeded() -> TaskQueryHandler {
        let repository = Arc::new(InMemoryTaskRepository::new());
        let now = Utc::now();
        for (i, (project, title, status, assignee)) in [
            (1, "Write docs", TaskStatus::Todo, Some("ana")),
            (1, "Review docs", TaskStatus::Review, Some("ana")),
            (2, "Deploy", TaskStatus::Done, None),
        ]
        .into_iter()
        .enumerate()
        {
            repository
                .insert(NewTask {
                    title: title.to_string(),
                    description: None,
                    project_id: ProjectId(project),
                    status,
                    priority: TaskPriority::Medium,
                    assigned_to: assignee.map(str::to_string),
                    due_date: Some(now + Duration::days(i as i64 + 1)),
                    created_at: now + Duration::seconds(i as i64),
                })
                .await
                .unwrap();
        }
        TaskQueryHandler::new(repository)
    }

    #[tokio::test]
    async fn test_by_id_not_found() {
        let handler = seeded().await;
        let err = handler.by_id(&TaskId::from("nope")).await.unwrap_err();
        assert!(matches!(err, TaskError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_dispatch_per_variant() {
        let handler = seeded().await;

        match handler.handle(TaskQuery::ByProject(ProjectId(1))).await.unwrap() {
            QueryResult::Many(tasks) => assert_eq!(tasks.len(), 2),
            other => panic!("unexpected result {other:?}"),
        }
        match handler
            .handle(TaskQuery::ByProjectAndStatus(ProjectId(1), TaskStatus::Review))
            .await
            .unwrap()
        {
            QueryResult::Many(tasks) => assert_eq!(tasks[0].title, "Review docs"),
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(
            handler
                .handle(TaskQuery::CountByAssignee("ana".to_string()))
                .await
                .unwrap(),
            QueryResult::Count(2)
        );
        assert_eq!(
            handler
                .handle(TaskQuery::CountByProject(ProjectId(404)))
                .await
                .unwrap(),
            QueryResult::Count(0)
        );
    }

    #[tokio::test]
    async fn test_search_and_due_range_edges() {
        let handler = seeded().await;
        assert_eq!(handler.search_by_title("DOCS").await.unwrap().len(), 2);
        assert!(handler.search_by_title("  ").await.unwrap().is_empty());

        let now = Utc::now();
        let due = handler
            .due_between(now, now + Duration::days(2) + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(due.len(), 2);
        assert!(handler.due_between(now + Duration::days(9), now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paginated() {
        let handler = seeded().await;
        let page = handler.paginated(PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
    }
}
