// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Outbound task event publishing.
//!
//! Publishing is best-effort: the event is serialized on the caller's task,
//! and the broker hand-off runs on a spawned task. Every failure ends up as a
//! logged [`PublishError`] and never reaches the command that raised the event.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::events::TaskEvent;
use crate::infrastructure::broker::{BrokerError, MessageBroker};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Broker rejected event: {0}")]
    Broker(#[from] BrokerError),

    #[error("No async runtime available to publish on")]
    NoRuntime,
}

pub trait TaskEventPublisher: Send + Sync {
    /// Fire-and-forget. Returns before the broker has seen the event.
    fn publish(&self, exchange: &str, routing_key: &str, event: &TaskEvent);
}

pub struct BrokerTaskEventPublisher {
    broker: Arc<dyn MessageBroker>,
}

impl BrokerTaskEventPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }

    fn dispatch(&self, exchange: &str, routing_key: &str, event: &TaskEvent) -> Result<(), PublishError> {
        let payload = Bytes::from(serde_json::to_vec(event)?);
        let handle = tokio::runtime::Handle::try_current().map_err(|_| PublishError::NoRuntime)?;

        let broker = self.broker.clone();
        let exchange = exchange.to_string();
        let routing_key = routing_key.to_string();
        let event_id = event.event_id;
        let event_type = event.event_type;
        let task_id = event.task_id.clone();

        handle.spawn(async move {
            match broker.publish(&exchange, &routing_key, payload).await {
                Ok(routed) => debug!(
                    event_id = %event_id,
                    event_type = event_type.as_str(),
                    task_id = %task_id,
                    routed,
                    "Task event published"
                ),
                Err(e) => error!(
                    event_id = %event_id,
                    event_type = event_type.as_str(),
                    task_id = %task_id,
                    error = %PublishError::from(e),
                    "Failed to publish task event"
                ),
            }
        });
        Ok(())
    }
}

impl TaskEventPublisher for BrokerTaskEventPublisher {
    fn publish(&self, exchange: &str, routing_key: &str, event: &TaskEvent) {
        if let Err(e) = self.dispatch(exchange, routing_key, event) {
            error!(
                event_id = %event.event_id,
                task_id = %event.task_id,
                error = %e,
                "Failed to publish task event"
            );
        }
    }
}
