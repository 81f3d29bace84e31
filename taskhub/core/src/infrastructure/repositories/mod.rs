// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of [`TaskRepository`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve tasks
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **PostgresTaskRepository** - `tasks` table, see `scripts/init-db.sql`
//! - **InMemoryTaskRepository** - HashMap-backed storage for tests and development
//!
//! Both order collection results by `created_at`, then id.

pub mod postgres_task;

pub use postgres_task::PostgresTaskRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::project::ProjectId;
use crate::domain::queries::PageRequest;
use crate::domain::repository::{RepositoryError, TaskRepository};
use crate::domain::task::{NewTask, Task, TaskId, TaskPriority, TaskStatus};

#[derive(Clone, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, filter: impl Fn(&Task) -> bool) -> Vec<Task> {
        let tasks = self.tasks.read();
        let mut selected: Vec<Task> = tasks.values().filter(|t| filter(t)).cloned().collect();
        selected.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        selected
    }

    fn count(&self, filter: impl Fn(&Task) -> bool) -> u64 {
        self.tasks.read().values().filter(|t| filter(t)).count() as u64
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, task: NewTask) -> Result<Task, RepositoryError> {
        let task = task.into_task(TaskId::generate());
        self.tasks.write().insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn update(&self, task: &Task) -> Result<Task, RepositoryError> {
        let mut tasks = self.tasks.write();
        match tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(task.clone())
            }
            None => Err(RepositoryError::NotFound(format!("task {}", task.id))),
        }
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.read().get(id).cloned())
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, RepositoryError> {
        Ok(self.tasks.write().remove(id).is_some())
    }

    async fn exists_by_project_and_title(
        &self,
        project_id: ProjectId,
        title: &str,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .tasks
            .read()
            .values()
            .any(|t| t.project_id == project_id && t.title == title))
    }

    async fn find_all(&self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.select(|_| true))
    }

    async fn find_page(&self, page: PageRequest) -> Result<(Vec<Task>, u64), RepositoryError> {
        let all = self.select(|_| true);
        let total = all.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let content = all
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .collect();
        Ok((content, total))
    }

    async fn find_by_project(&self, project_id: ProjectId) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.select(|t| t.project_id == project_id))
    }

    async fn find_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.select(|t| t.project_id == project_id && t.status == status))
    }

    async fn find_by_assignee(&self, assignee: &str) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.select(|t| t.assigned_to.as_deref() == Some(assignee)))
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.select(|t| t.status == status))
    }

    async fn find_by_priority(&self, priority: TaskPriority) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.select(|t| t.priority == priority))
    }

    async fn search_by_title(&self, fragment: &str) -> Result<Vec<Task>, RepositoryError> {
        let needle = fragment.to_lowercase();
        Ok(self.select(|t| t.title.to_lowercase().contains(&needle)))
    }

    async fn find_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.select(|t| t.due_date.is_some_and(|d| d >= start && d <= end)))
    }

    async fn count_by_project(&self, project_id: ProjectId) -> Result<u64, RepositoryError> {
        Ok(self.count(|t| t.project_id == project_id))
    }

    async fn count_by_assignee(&self, assignee: &str) -> Result<u64, RepositoryError> {
        Ok(self.count(|t| t.assigned_to.as_deref() == Some(assignee)))
    }

    async fn delete_by_project(&self, project_id: ProjectId) -> Result<u64, RepositoryError> {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|_, t| t.project_id != project_id);
        Ok((before - tasks.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_task(project: i64, title: &str, offset_secs: i64) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            project_id: ProjectId(project),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            assigned_to: None,
            due_date: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_insert_generates_id_and_equal_timestamps() {
        let repo = InMemoryTaskRepository::new();
        let task = repo.insert(new_task(1, "a", 0)).await.unwrap();
        assert!(!task.id.as_str().is_empty());
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(repo.find_by_id(&task.id).await.unwrap(), Some(task));
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let repo = InMemoryTaskRepository::new();
        let ghost = new_task(1, "ghost", 0).into_task(TaskId::from("nope"));
        assert!(matches!(
            repo.update(&ghost).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_page_is_ordered_by_creation() {
        let repo = InMemoryTaskRepository::new();
        for i in 0..5 {
            repo.insert(new_task(1, &format!("t{i}"), i)).await.unwrap();
        }
        let (content, total) = repo.find_page(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(total, 5);
        let titles: Vec<&str> = content.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["t2", "t3"]);

        let (empty, _) = repo.find_page(PageRequest::new(10, 2)).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let repo = InMemoryTaskRepository::new();
        repo.insert(new_task(1, "Design Spec", 0)).await.unwrap();
        repo.insert(new_task(1, "Ship it", 1)).await.unwrap();
        let found = repo.search_by_title("design").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Design Spec");
    }

    #[tokio::test]
    async fn test_delete_by_project_only_touches_that_project() {
        let repo = InMemoryTaskRepository::new();
        repo.insert(new_task(42, "a", 0)).await.unwrap();
        repo.insert(new_task(42, "b", 1)).await.unwrap();
        repo.insert(new_task(7, "c", 2)).await.unwrap();

        assert_eq!(repo.delete_by_project(ProjectId(42)).await.unwrap(), 2);
        assert_eq!(repo.delete_by_project(ProjectId(42)).await.unwrap(), 0);
        assert_eq!(repo.count_by_project(ProjectId(7)).await.unwrap(), 1);
    }
}
