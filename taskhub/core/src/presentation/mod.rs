// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`taskhub-core`)
//!
//! HTTP surface that translates external requests into task service calls.
//! No business logic lives here; all real work is delegated to
//! `crate::application::TaskService`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP (Axum) | Task REST endpoints and project event ingress |

pub mod api;

pub use api::{router, AppState};
