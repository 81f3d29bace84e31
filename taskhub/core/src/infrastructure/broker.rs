// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Message Broker - Topic Exchanges and Durable Queues
//
// In-process broker with AMQP-style topology:
// - Topic exchanges route by routing key against binding patterns
//   (`*` matches exactly one word, `#` matches zero or more words)
// - Named queues are bounded and outlive publishers; messages buffer until
//   the queue's single consumer drains them
// - Deliveries are auto-acknowledged: once handed to the consumer they are gone
//
// Messages published to an exchange with no matching binding are dropped.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One message as handed to a queue consumer
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub exchange: String,
    pub routing_key: String,
    pub payload: Bytes,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Exchange not declared: {0}")]
    ExchangeNotFound(String),

    #[error("Queue not declared: {0}")]
    QueueNotFound(String),

    #[error("Queue {0} already has a consumer")]
    ConsumerExists(String),

    #[error("Queue {0} is full")]
    QueueFull(String),

    #[error("Queue {0} has no consumer anymore")]
    QueueClosed(String),

    #[error("Broker is shut down")]
    Closed,
}

/// Topology and transport operations the service needs from a broker.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Idempotent.
    fn declare_exchange(&self, name: &str) -> Result<(), BrokerError>;

    /// Idempotent; an existing queue keeps its buffered messages.
    fn declare_queue(&self, name: &str) -> Result<(), BrokerError>;

    fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<(), BrokerError>;

    /// Route a message; returns the number of queues it landed in.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Bytes,
    ) -> Result<usize, BrokerError>;

    /// Attach the single consumer of a queue.
    fn consume(&self, queue: &str) -> Result<QueueConsumer, BrokerError>;
}

pub struct QueueConsumer {
    queue: String,
    receiver: mpsc::Receiver<Delivery>,
}

impl QueueConsumer {
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Next delivery, or `None` once the broker is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.receiver.try_recv().ok()
    }
}

struct Binding {
    queue: String,
    pattern: String,
}

struct QueueSlot {
    sender: mpsc::Sender<Delivery>,
    receiver: Option<mpsc::Receiver<Delivery>>,
}

#[derive(Default)]
struct Topology {
    exchanges: HashMap<String, Vec<Binding>>,
    queues: HashMap<String, QueueSlot>,
}

pub struct InMemoryBroker {
    topology: Mutex<Topology>,
    queue_capacity: usize,
    next_tag: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryBroker {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            topology: Mutex::new(Topology::default()),
            queue_capacity: queue_capacity.max(1),
            next_tag: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Stop accepting publishes. Consumers drain what is already queued.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.is_closed() {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    fn declare_exchange(&self, name: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.topology
            .lock()
            .exchanges
            .entry(name.to_string())
            .or_default();
        debug!(exchange = name, "Exchange declared");
        Ok(())
    }

    fn declare_queue(&self, name: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let mut topology = self.topology.lock();
        topology.queues.entry(name.to_string()).or_insert_with(|| {
            let (sender, receiver) = mpsc::channel(self.queue_capacity);
            QueueSlot {
                sender,
                receiver: Some(receiver),
            }
        });
        debug!(queue = name, "Queue declared");
        Ok(())
    }

    fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let mut topology = self.topology.lock();
        if !topology.queues.contains_key(queue) {
            return Err(BrokerError::QueueNotFound(queue.to_string()));
        }
        let bindings = topology
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;
        if !bindings
            .iter()
            .any(|b| b.queue == queue && b.pattern == pattern)
        {
            bindings.push(Binding {
                queue: queue.to_string(),
                pattern: pattern.to_string(),
            });
        }
        debug!(queue, exchange, pattern, "Queue bound");
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Bytes,
    ) -> Result<usize, BrokerError> {
        self.ensure_open()?;

        let targets: Vec<(String, mpsc::Sender<Delivery>)> = {
            let topology = self.topology.lock();
            let bindings = topology
                .exchanges
                .get(exchange)
                .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;
            let mut targets: Vec<(String, mpsc::Sender<Delivery>)> = Vec::new();
            for binding in bindings {
                if !topic_matches(&binding.pattern, routing_key)
                    || targets.iter().any(|(q, _)| q == &binding.queue)
                {
                    continue;
                }
                if let Some(slot) = topology.queues.get(&binding.queue) {
                    targets.push((binding.queue.clone(), slot.sender.clone()));
                }
            }
            targets
        };

        if targets.is_empty() {
            debug!(exchange, routing_key, "Message unroutable, dropped");
            return Ok(0);
        }

        let mut delivered = 0;
        let mut first_error = None;
        for (queue, sender) in targets {
            let delivery = Delivery {
                delivery_tag: self.next_tag.fetch_add(1, Ordering::Relaxed),
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                payload: payload.clone(),
            };
            match sender.try_send(delivery) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(queue = %queue, "Queue full, message rejected");
                    first_error.get_or_insert(BrokerError::QueueFull(queue));
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(queue = %queue, "Queue consumer gone, message rejected");
                    first_error.get_or_insert(BrokerError::QueueClosed(queue));
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(delivered),
        }
    }

    fn consume(&self, queue: &str) -> Result<QueueConsumer, BrokerError> {
        self.ensure_open()?;
        let mut topology = self.topology.lock();
        let slot = topology
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        let receiver = slot
            .receiver
            .take()
            .ok_or_else(|| BrokerError::ConsumerExists(queue.to_string()))?;
        Ok(QueueConsumer {
            queue: queue.to_string(),
            receiver,
        })
    }
}

/// AMQP topic matching over dot-separated words.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&"*", rest)) => !key.is_empty() && match_words(rest, &key[1..]),
        Some((word, rest)) => key.first() == Some(word) && match_words(rest, &key[1..]),
    }
}
