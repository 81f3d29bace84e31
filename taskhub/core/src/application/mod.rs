// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod errors;
pub mod command_handler;
pub mod query_handler;
pub mod task_service;
pub mod project_event_consumer;
pub mod service_runtime;

pub use command_handler::{EventRoute, TaskCommandHandler};
pub use errors::TaskError;
pub use project_event_consumer::{ProjectEventConsumer, ReconciliationError, ReconciliationOutcome};
pub use query_handler::TaskQueryHandler;
pub use service_runtime::TaskServiceRuntime;
pub use task_service::TaskService;
