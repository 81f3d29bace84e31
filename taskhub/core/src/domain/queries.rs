// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read-side query shapes. Each variant has exactly one handler function in
//! `application::query_handler`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::project::ProjectId;
use crate::domain::task::{TaskId, TaskPriority, TaskStatus, TaskView};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskQuery {
    ById(TaskId),
    ByProject(ProjectId),
    ByProjectAndStatus(ProjectId, TaskStatus),
    ByAssignee(String),
    ByStatus(TaskStatus),
    ByPriority(TaskPriority),
    All,
    Paginated(PageRequest),
    SearchByTitle(String),
    DueBetween {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    CountByProject(ProjectId),
    CountByAssignee(String),
}

impl TaskQuery {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            TaskQuery::ById(_) => "by_id",
            TaskQuery::ByProject(_) => "by_project",
            TaskQuery::ByProjectAndStatus(..) => "by_project_and_status",
            TaskQuery::ByAssignee(_) => "by_assignee",
            TaskQuery::ByStatus(_) => "by_status",
            TaskQuery::ByPriority(_) => "by_priority",
            TaskQuery::All => "all",
            TaskQuery::Paginated(_) => "paginated",
            TaskQuery::SearchByTitle(_) => "search_by_title",
            TaskQuery::DueBetween { .. } => "due_between",
            TaskQuery::CountByProject(_) => "count_by_project",
            TaskQuery::CountByAssignee(_) => "count_by_assignee",
        }
    }
}

/// Zero-based page request. Sizes are clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit())
    }

    pub fn limit(&self) -> u32 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = request.limit();
        Self {
            content,
            page: request.page,
            size,
            total_elements,
            total_pages: total_elements.div_ceil(u64::from(size)),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// Result of dispatching a [`TaskQuery`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    One(TaskView),
    Many(Vec<TaskView>),
    Page(Page<TaskView>),
    Count(u64),
}
