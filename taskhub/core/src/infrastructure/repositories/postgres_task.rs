// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Task Repository
//!
//! Production `TaskRepository` backed by the `tasks` table (schema in
//! `scripts/init-db.sql`, applied out of band). Status and priority are stored
//! as their wire strings; ids are UUID strings generated here on insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::project::ProjectId;
use crate::domain::queries::PageRequest;
use crate::domain::repository::{RepositoryError, TaskRepository};
use crate::domain::task::{NewTask, Task, TaskId, TaskPriority, TaskStatus};

const TASK_COLUMNS: &str = "id, title, description, project_id, status, priority, assigned_to, \
                            due_date, created_at, updated_at";

pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        predicate: &str,
        bind: impl FnOnce(
            sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
        ) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE {predicate} ORDER BY created_at, id"
        );
        let rows = bind(sqlx::query(&sql)).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn count_where(
        &self,
        predicate: &str,
        bind: impl FnOnce(
            sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
        ) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<u64, RepositoryError> {
        let sql = format!("SELECT COUNT(*) AS total FROM tasks WHERE {predicate}");
        let row = bind(sqlx::query(&sql)).fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }
}

fn row_to_task(row: &PgRow) -> Result<Task, RepositoryError> {
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;

    Ok(Task {
        id: TaskId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        project_id: ProjectId(row.try_get("project_id")?),
        status: status
            .parse::<TaskStatus>()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        priority: priority
            .parse::<TaskPriority>()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        assigned_to: row.try_get("assigned_to")?,
        due_date: row.try_get("due_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Escape `LIKE` wildcards so user input only ever matches literally.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn insert(&self, task: NewTask) -> Result<Task, RepositoryError> {
        let task = task.into_task(TaskId::generate());

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, title, description, project_id, status, priority,
                assigned_to, due_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(task.id.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.project_id.0)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(&task.assigned_to)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to insert task: {}", e)))?;

        Ok(task)
    }

    async fn update(&self, task: &Task) -> Result<Task, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                title = $2,
                description = $3,
                status = $4,
                priority = $5,
                assigned_to = $6,
                due_date = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(task.id.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(&task.assigned_to)
        .bind(task.due_date)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update task: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("task {}", task.id)));
        }
        Ok(task.clone())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, RepositoryError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_project_and_title(
        &self,
        project_id: ProjectId,
        title: &str,
    ) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE project_id = $1 AND title = $2) AS found",
        )
        .bind(project_id.0)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("found")?)
    }

    async fn find_all(&self) -> Result<Vec<Task>, RepositoryError> {
        self.fetch_where("TRUE", |q| q).await
    }

    async fn find_page(&self, page: PageRequest) -> Result<(Vec<Task>, u64), RepositoryError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, id LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.limit()))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        let content = rows.iter().map(row_to_task).collect::<Result<Vec<_>, _>>()?;
        let total = self.count_where("TRUE", |q| q).await?;
        Ok((content, total))
    }

    async fn find_by_project(&self, project_id: ProjectId) -> Result<Vec<Task>, RepositoryError> {
        self.fetch_where("project_id = $1", |q| q.bind(project_id.0))
            .await
    }

    async fn find_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> Result<Vec<Task>, RepositoryError> {
        self.fetch_where("project_id = $1 AND status = $2", |q| {
            q.bind(project_id.0).bind(status.as_str())
        })
        .await
    }

    async fn find_by_assignee(&self, assignee: &str) -> Result<Vec<Task>, RepositoryError> {
        let assignee = assignee.to_string();
        self.fetch_where("assigned_to = $1", |q| q.bind(assignee))
            .await
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, RepositoryError> {
        self.fetch_where("status = $1", |q| q.bind(status.as_str()))
            .await
    }

    async fn find_by_priority(&self, priority: TaskPriority) -> Result<Vec<Task>, RepositoryError> {
        self.fetch_where("priority = $1", |q| q.bind(priority.as_str()))
            .await
    }

    async fn search_by_title(&self, fragment: &str) -> Result<Vec<Task>, RepositoryError> {
        let pattern = like_pattern(fragment);
        self.fetch_where("title ILIKE $1 ESCAPE '\\'", |q| q.bind(pattern))
            .await
    }

    async fn find_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError> {
        self.fetch_where("due_date BETWEEN $1 AND $2", |q| q.bind(start).bind(end))
            .await
    }

    async fn count_by_project(&self, project_id: ProjectId) -> Result<u64, RepositoryError> {
        self.count_where("project_id = $1", |q| q.bind(project_id.0))
            .await
    }

    async fn count_by_assignee(&self, assignee: &str) -> Result<u64, RepositoryError> {
        let assignee = assignee.to_string();
        self.count_where("assigned_to = $1", |q| q.bind(assignee))
            .await
    }

    async fn delete_by_project(&self, project_id: ProjectId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(project_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::Database(format!("Failed to delete tasks of project: {}", e))
            })?;
        Ok(result.rows_affected())
    }
}
