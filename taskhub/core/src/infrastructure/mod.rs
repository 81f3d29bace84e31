// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod repositories;
pub mod db;
pub mod broker;
pub mod event_publisher;
pub mod project_client;
pub mod webhook_relay;

pub use broker::{BrokerError, Delivery, InMemoryBroker, MessageBroker, QueueConsumer};
pub use event_publisher::{BrokerTaskEventPublisher, PublishError, TaskEventPublisher};
pub use project_client::HttpProjectDirectory;
pub use webhook_relay::WebhookRelay;
