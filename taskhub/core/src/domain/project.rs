// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Project references as seen from the task service.
//!
//! Projects are owned by the project service. The task service only ever holds
//! the numeric id, and can ask the project service about it through a
//! [`ProjectDirectory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subset of the project service's representation that the task service reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default, with = "crate::domain::timestamp::lenient")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Synchronous lookup against the project service.
///
/// Implementations must fail closed: a timeout, transport error or any
/// non-success answer means "does not exist" (`false` / `None`), never an error
/// surfaced to the caller.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn exists(&self, project_id: ProjectId) -> bool;

    async fn get_details(&self, project_id: ProjectId) -> Option<ProjectSnapshot>;
}
