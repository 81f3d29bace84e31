// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service Runtime - Application Layer
//!
//! Builds the object graph of one task service instance from its
//! configuration manifest:
//!
//! config → task store → broker topology → publisher → handlers → facade
//!        → project event consumer (+ webhook relay)
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wiring shared by the `taskhub` binary and integration tests

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::command_handler::{EventRoute, TaskCommandHandler};
use crate::application::project_event_consumer::ProjectEventConsumer;
use crate::application::query_handler::TaskQueryHandler;
use crate::application::task_service::TaskService;
use crate::domain::repository::TaskRepository;
use crate::domain::service_config::{MessagingConfig, ServiceConfigManifest, StorageBackend, StorageConfig};
use crate::infrastructure::broker::{BrokerError, InMemoryBroker, MessageBroker};
use crate::infrastructure::db::Database;
use crate::infrastructure::event_publisher::BrokerTaskEventPublisher;
use crate::infrastructure::project_client::HttpProjectDirectory;
use crate::infrastructure::repositories::{InMemoryTaskRepository, PostgresTaskRepository};
use crate::infrastructure::webhook_relay::WebhookRelay;
use crate::presentation::api::AppState;

/// Creates the task store for the configured backend
pub async fn create_task_repository(storage: &StorageConfig) -> Result<Arc<dyn TaskRepository>> {
    match storage.backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryTaskRepository::new())),
        StorageBackend::Postgres => {
            let url = storage
                .connection_string
                .as_deref()
                .context("storage.connection_string is required for the postgres backend")?;
            let database = Database::connect(url, storage.max_connections).await?;
            Ok(Arc::new(PostgresTaskRepository::new(database.pool().clone())))
        }
    }
}

/// Declare both exchanges, both queues and their bindings. Idempotent.
pub fn declare_topology(broker: &dyn MessageBroker, messaging: &MessagingConfig) -> Result<(), BrokerError> {
    broker.declare_exchange(&messaging.task_exchange)?;
    broker.declare_queue(&messaging.task_queue)?;
    broker.bind_queue(
        &messaging.task_queue,
        &messaging.task_exchange,
        &messaging.task_routing_key,
    )?;

    broker.declare_exchange(&messaging.project_exchange)?;
    broker.declare_queue(&messaging.project_queue)?;
    broker.bind_queue(
        &messaging.project_queue,
        &messaging.project_exchange,
        &messaging.project_routing_key,
    )?;
    Ok(())
}

pub struct TaskServiceRuntime {
    pub config: ServiceConfigManifest,
    pub repository: Arc<dyn TaskRepository>,
    pub broker: Arc<InMemoryBroker>,
    pub service: TaskService,
    pub consumer: Arc<ProjectEventConsumer>,
}

impl TaskServiceRuntime {
    pub async fn build(config: ServiceConfigManifest) -> Result<Self> {
        let repository = create_task_repository(&config.spec.storage)
            .await
            .context("Failed to initialize task store")?;
        Self::with_repository(config, repository)
    }

    pub fn with_repository(config: ServiceConfigManifest, repository: Arc<dyn TaskRepository>) -> Result<Self> {
        let messaging = &config.spec.messaging;
        let broker = Arc::new(InMemoryBroker::new(messaging.queue_capacity));
        declare_topology(&*broker, messaging).context("Failed to declare broker topology")?;

        let publisher = Arc::new(BrokerTaskEventPublisher::new(broker.clone()));
        let mut commands = TaskCommandHandler::new(
            repository.clone(),
            publisher,
            EventRoute::new(&messaging.task_exchange, &messaging.task_routing_key),
        );

        let projects = &config.spec.project_service;
        if projects.require_existing_project {
            let base_url = projects
                .base_url
                .as_deref()
                .context("project_service.base_url is required when require_existing_project is set")?;
            let directory = HttpProjectDirectory::new(base_url, Duration::from_millis(projects.timeout_ms))?;
            info!(base_url = directory.base_url(), "Project existence validation enabled");
            commands = commands.with_project_validation(Arc::new(directory));
        }

        let service = TaskService::new(
            Arc::new(commands),
            Arc::new(TaskQueryHandler::new(repository.clone())),
        );
        let consumer = Arc::new(ProjectEventConsumer::new(
            repository.clone(),
            config.spec.consumer.dedup_capacity,
        ));

        Ok(Self {
            config,
            repository,
            broker,
            service,
            consumer,
        })
    }

    pub fn app_state(&self) -> AppState {
        let messaging = &self.config.spec.messaging;
        AppState::new(
            self.service.clone(),
            self.broker.clone(),
            EventRoute::new(&messaging.project_exchange, &messaging.project_routing_key),
            self.config.metadata.name.clone(),
        )
    }

    /// Start the project event consumer and the outbound relay. The relay is
    /// skipped when someone else already consumes the task queue.
    pub fn start_background(&self, cancel: &CancellationToken) -> Result<Vec<JoinHandle<()>>> {
        let messaging = &self.config.spec.messaging;
        let mut handles = Vec::new();

        let project_queue = self
            .broker
            .consume(&messaging.project_queue)
            .context("Failed to attach project event consumer")?;
        handles.push(self.consumer.clone().start(project_queue, cancel.child_token()));

        match self.broker.consume(&messaging.task_queue) {
            Ok(task_queue) => {
                let relay = WebhookRelay::new(
                    messaging.forward_urls.clone(),
                    Duration::from_millis(messaging.forward_timeout_ms),
                )?;
                handles.push(Arc::new(relay).start(task_queue, cancel.child_token()));
            }
            Err(e) => warn!(error = %e, "Task event relay not started"),
        }

        Ok(handles)
    }
}
