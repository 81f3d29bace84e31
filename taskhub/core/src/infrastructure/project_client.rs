// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Project Service Client
//!
//! HTTP implementation of [`ProjectDirectory`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Synchronous project lookups against the project service
//! - **Integration:** Task command handler → `GET {base_url}/projects/{id}`
//!
//! Every call is bounded by the client timeout and fails closed: transport
//! errors, timeouts, non-2xx answers and undecodable bodies all read as
//! "no such project".

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::project::{ProjectDirectory, ProjectId, ProjectSnapshot};

pub struct HttpProjectDirectory {
    base_url: String,
    client: Client,
}

impl HttpProjectDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build project service HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn project_url(&self, project_id: ProjectId) -> String {
        format!("{}/projects/{}", self.base_url, project_id)
    }
}

#[async_trait]
impl ProjectDirectory for HttpProjectDirectory {
    async fn exists(&self, project_id: ProjectId) -> bool {
        self.get_details(project_id).await.is_some()
    }

    async fn get_details(&self, project_id: ProjectId) -> Option<ProjectSnapshot> {
        let url = self.project_url(project_id);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(project_id = %project_id, error = %e, "Project service unreachable");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(project_id = %project_id, status = %status, "Project lookup returned non-success");
            return None;
        }

        match response.json::<ProjectSnapshot>().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(project_id = %project_id, error = %e, "Project service returned an undecodable body");
                None
            }
        }
    }
}
