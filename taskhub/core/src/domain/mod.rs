// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Task aggregate, project references, commands, queries and integration
//! events, plus the contracts the infrastructure layer implements.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types and traits shared by every other layer

pub mod task;
pub mod project;
pub mod commands;
pub mod queries;
pub mod events;
pub mod repository;
pub mod service_config;
pub mod timestamp;

pub use commands::{CreateTaskCommand, DeleteTaskCommand, TaskChanges, UpdateTaskCommand, ValidationErrors};
pub use events::{ProjectEvent, ProjectEventKind, TaskEvent, TaskEventType};
pub use project::{ProjectDirectory, ProjectId, ProjectSnapshot};
pub use queries::{Page, PageRequest, QueryResult, TaskQuery};
pub use repository::{RepositoryError, TaskRepository};
pub use task::{NewTask, Task, TaskId, TaskPriority, TaskStatus, TaskView};
