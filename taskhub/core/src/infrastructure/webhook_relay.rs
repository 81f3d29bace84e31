// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Webhook Relay
//!
//! Drains the outbound task event queue and POSTs every message, unchanged, to
//! each configured URL. Delivery is best-effort: a failed POST is logged and
//! the message is not retried. With no URLs configured the relay only drains
//! the queue.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::infrastructure::broker::QueueConsumer;

pub struct WebhookRelay {
    client: Client,
    urls: Vec<String>,
}

impl WebhookRelay {
    pub fn new(urls: Vec<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, urls })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// POST one payload to every URL; returns how many accepted it.
    pub async fn forward(&self, payload: &Bytes) -> usize {
        let mut accepted = 0;
        for url in &self.urls {
            let result = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.clone())
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => accepted += 1,
                Ok(response) => {
                    warn!(url = %url, status = %response.status(), "Webhook rejected task event");
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Webhook delivery failed");
                }
            }
        }
        accepted
    }

    pub fn start(self: Arc<Self>, mut consumer: QueueConsumer, cancel: CancellationToken) -> JoinHandle<()> {
        info!(queue = consumer.queue(), targets = self.urls.len(), "Starting webhook relay");

        tokio::spawn(async move {
            let mut relayed = 0u64;
            loop {
                let delivery = tokio::select! {
                    _ = cancel.cancelled() => break,
                    delivery = consumer.recv() => match delivery {
                        Some(delivery) => delivery,
                        None => break,
                    },
                };
                let accepted = self.forward(&delivery.payload).await;
                relayed += 1;
                debug!(delivery_tag = delivery.delivery_tag, accepted, "Task event relayed");
            }
            info!(relayed, "Webhook relay stopped");
        })
    }
}
