// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Project Event Consumer
//!
//! Reconciles the task store against project lifecycle events.
//!
//! | Event | Action |
//! |-------|--------|
//! | `PROJECT_DELETED` / `DELETED` | bulk delete every task of the project |
//! | `PROJECT_UPDATED` / `UPDATED` | log only, with the local task count |
//! | `PROJECT_CREATED` / `CREATED` | log only |
//! | anything else | log and ignore |
//!
//! Deliveries are auto-acknowledged: a delivery that fails to reconcile is
//! logged and dropped, never retried. Every handler is idempotent, and events
//! carrying an `eventId` already seen recently are skipped.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::events::{ProjectEvent, ProjectEventKind};
use crate::domain::project::ProjectId;
use crate::domain::repository::{RepositoryError, TaskRepository};
use crate::infrastructure::broker::QueueConsumer;

#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error("Malformed project event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Task store failure during reconciliation: {0}")]
    Repository(#[from] RepositoryError),
}

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    CascadeDeleted { project_id: ProjectId, deleted: u64 },
    NoDependents { project_id: ProjectId },
    Acknowledged { project_id: ProjectId, kind: ProjectEventKind },
    Ignored { event_type: String },
    Duplicate { event_id: Uuid },
    Failed { reason: String },
}

pub struct ProjectEventConsumer {
    repository: Arc<dyn TaskRepository>,
    seen: Mutex<LruCache<Uuid, ()>>,
}

impl ProjectEventConsumer {
    pub fn new(repository: Arc<dyn TaskRepository>, dedup_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(dedup_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            repository,
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Decode and reconcile one raw delivery. Never fails.
    pub async fn handle_delivery(&self, payload: &[u8]) -> ReconciliationOutcome {
        let event = match serde_json::from_slice::<ProjectEvent>(payload) {
            Ok(event) => event,
            Err(e) => {
                let err = ReconciliationError::from(e);
                error!(error = %err, "Dropping project event");
                return ReconciliationOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };
        self.handle_event(event).await
    }

    pub async fn handle_event(&self, event: ProjectEvent) -> ReconciliationOutcome {
        if let Some(event_id) = event.event_id {
            if self.seen.lock().contains(&event_id) {
                debug!(event_id = %event_id, project_id = %event.project_id, "Skipping already handled project event");
                return ReconciliationOutcome::Duplicate { event_id };
            }
        }

        match self.reconcile(&event).await {
            Ok(outcome) => {
                if let Some(event_id) = event.event_id {
                    self.seen.lock().put(event_id, ());
                }
                outcome
            }
            Err(e) => {
                error!(
                    project_id = %event.project_id,
                    event_type = %event.event_type,
                    error = %e,
                    "Failed to reconcile project event"
                );
                ReconciliationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn reconcile(&self, event: &ProjectEvent) -> Result<ReconciliationOutcome, ReconciliationError> {
        let project_id = event.project_id;
        match event.kind() {
            ProjectEventKind::Deleted => {
                let dependents = self.repository.count_by_project(project_id).await?;
                if dependents == 0 {
                    info!(project_id = %project_id, "Project deleted, no tasks to remove");
                    return Ok(ReconciliationOutcome::NoDependents { project_id });
                }
                let deleted = self.repository.delete_by_project(project_id).await?;
                info!(project_id = %project_id, deleted, "Project deleted, removed its tasks");
                Ok(ReconciliationOutcome::CascadeDeleted { project_id, deleted })
            }
            ProjectEventKind::Updated => {
                let tasks = self.repository.count_by_project(project_id).await?;
                info!(
                    project_id = %project_id,
                    project_name = ?event.project_name,
                    tasks,
                    "Project updated, tasks keep their reference"
                );
                Ok(ReconciliationOutcome::Acknowledged {
                    project_id,
                    kind: ProjectEventKind::Updated,
                })
            }
            ProjectEventKind::Created => {
                info!(project_id = %project_id, project_name = ?event.project_name, "Project created");
                Ok(ReconciliationOutcome::Acknowledged {
                    project_id,
                    kind: ProjectEventKind::Created,
                })
            }
            ProjectEventKind::Unknown(event_type) => {
                warn!(project_id = %project_id, event_type = %event_type, "Ignoring unknown project event type");
                Ok(ReconciliationOutcome::Ignored { event_type })
            }
        }
    }

    /// Spawn the listener loop on `consumer`'s queue. Stops when `cancel`
    /// fires or the broker goes away.
    pub fn start(self: Arc<Self>, mut consumer: QueueConsumer, cancel: CancellationToken) -> JoinHandle<()> {
        info!(queue = consumer.queue(), "Starting project event consumer");

        tokio::spawn(async move {
            let mut handled = 0u64;
            let mut failed = 0u64;

            loop {
                let delivery = tokio::select! {
                    _ = cancel.cancelled() => break,
                    delivery = consumer.recv() => match delivery {
                        Some(delivery) => delivery,
                        None => {
                            info!("Project event queue closed");
                            break;
                        }
                    },
                };

                handled += 1;
                let outcome = self.handle_delivery(&delivery.payload).await;
                if matches!(outcome, ReconciliationOutcome::Failed { .. }) {
                    failed += 1;
                    if failed % 10 == 0 {
                        warn!("Project event reconciliation has failed {} times", failed);
                    }
                }
                debug!(delivery_tag = delivery.delivery_tag, outcome = ?outcome, "Project event handled");
            }

            info!(
                "Project event consumer shut down (handled {} deliveries, {} failures)",
                handled, failed
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{NewTask, TaskPriority, TaskStatus};
    use crate::infrastructure::repositories::InMemoryTaskRepository;
    use chrono::Utc;

    async fn repository_with(project: i64, tasks: usize) -> Arc<InMemoryTaskRepository> {
        let repository = Arc::new(InMemoryTaskRepository::new());
        for i in 0..tasks {
            repository
                .insert(NewTask {
                    title: format!("task {i}"),
                    description: None,
                    project_id: ProjectId(project),
                    status: TaskStatus::Todo,
                    priority: TaskPriority::Low,
                    assigned_to: None,
                    due_date: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        repository
    }

    #[tokio::test]
    async fn test_deleted_event_cascades() {
        let repository = repository_with(42, 3).await;
        let consumer = ProjectEventConsumer::new(repository.clone(), 16);

        let outcome = consumer
            .handle_event(ProjectEvent::new("PROJECT_DELETED", ProjectId(42), "Apollo"))
            .await;

        assert_eq!(
            outcome,
            ReconciliationOutcome::CascadeDeleted {
                project_id: ProjectId(42),
                deleted: 3
            }
        );
        assert_eq!(repository.count_by_project(ProjectId(42)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_repeated_event_id_is_skipped() {
        let repository = repository_with(5, 1).await;
        let consumer = ProjectEventConsumer::new(repository, 16);
        let event = ProjectEvent::new("PROJECT_UPDATED", ProjectId(5), "Gemini");
        let event_id = event.event_id.unwrap();

        assert!(matches!(
            consumer.handle_event(event.clone()).await,
            ReconciliationOutcome::Acknowledged { .. }
        ));
        assert_eq!(
            consumer.handle_event(event).await,
            ReconciliationOutcome::Duplicate { event_id }
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_fails_softly() {
        let consumer = ProjectEventConsumer::new(Arc::new(InMemoryTaskRepository::new()), 16);
        let outcome = consumer.handle_delivery(b"not json").await;
        assert!(matches!(outcome, ReconciliationOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_unknown_type_is_ignored() {
        let repository = repository_with(9, 2).await;
        let consumer = ProjectEventConsumer::new(repository.clone(), 16);
        let outcome = consumer
            .handle_delivery(br#"{"eventType":"PROJECT_ARCHIVED","projectId":9}"#)
            .await;
        assert_eq!(
            outcome,
            ReconciliationOutcome::Ignored {
                event_type: "PROJECT_ARCHIVED".to_string()
            }
        );
        assert_eq!(repository.count_by_project(ProjectId(9)).await.unwrap(), 2);
    }
}
