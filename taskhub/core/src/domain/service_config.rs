// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Task Service Configuration
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing one
// task service instance:
// - HTTP bind address and port
// - Task store backend
// - Broker topology (exchanges, queues, routing keys) and webhook forwarding
// - Project service lookup
// - Consumer de-duplication and logging

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "taskhub.io/v1";
pub const KIND: &str = "TaskServiceConfig";

/// Top-level service configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ServiceConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Instance name, used in log lines
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub project_service: ProjectServiceConfig,

    #[serde(default)]
    pub consumer: ConsumerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Required when `backend: postgres`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    #[serde(default = "default_task_exchange")]
    pub task_exchange: String,

    #[serde(default = "default_task_routing_key")]
    pub task_routing_key: String,

    #[serde(default = "default_task_queue")]
    pub task_queue: String,

    #[serde(default = "default_project_exchange")]
    pub project_exchange: String,

    #[serde(default = "default_project_routing_key")]
    pub project_routing_key: String,

    #[serde(default = "default_project_queue")]
    pub project_queue: String,

    /// Messages buffered per queue before publishes start failing
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Webhooks that receive every outbound task event
    #[serde(default)]
    pub forward_urls: Vec<String>,

    #[serde(default = "default_forward_timeout_ms")]
    pub forward_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectServiceConfig {
    /// Unset disables project lookups entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_project_timeout_ms")]
    pub timeout_ms: u64,

    /// Reject creates for projects the project service does not know
    #[serde(default)]
    pub require_existing_project: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Number of recent inbound event ids remembered for de-duplication
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_max_connections() -> u32 {
    5
}

fn default_task_exchange() -> String {
    "task.exchange".to_string()
}

fn default_task_routing_key() -> String {
    "task.events".to_string()
}

fn default_task_queue() -> String {
    "task.events.queue".to_string()
}

fn default_project_exchange() -> String {
    "project.exchange".to_string()
}

fn default_project_routing_key() -> String {
    "project.events".to_string()
}

fn default_project_queue() -> String {
    "project.events.consumer.queue".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_forward_timeout_ms() -> u64 {
    5000
}

fn default_project_timeout_ms() -> u64 {
    3000
}

fn default_dedup_capacity() -> usize {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            connection_string: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            task_exchange: default_task_exchange(),
            task_routing_key: default_task_routing_key(),
            task_queue: default_task_queue(),
            project_exchange: default_project_exchange(),
            project_routing_key: default_project_routing_key(),
            project_queue: default_project_queue(),
            queue_capacity: default_queue_capacity(),
            forward_urls: Vec::new(),
            forward_timeout_ms: default_forward_timeout_ms(),
        }
    }
}

impl Default for ProjectServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_project_timeout_ms(),
            require_existing_project: false,
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "task-service".to_string(),
                version: None,
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

impl ServiceConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. TASKHUB_CONFIG_PATH environment variable
    /// 2. ./taskhub-config.yaml (working directory)
    /// 3. ~/.taskhub/config.yaml (user home)
    /// 4. /etc/taskhub/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("TASKHUB_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./taskhub-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".taskhub").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/taskhub/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default.
    /// An explicit path must exist and parse.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply process environment overrides (container deployments)
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// injectable lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TASKHUB_PORT") {
            match val.trim().parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: TASKHUB_PORT={}", port);
                    self.spec.server.port = port;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for TASKHUB_PORT: '{}'. Expected a port number. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Some(url) = lookup("TASKHUB_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            tracing::info!("Environment override: TASKHUB_DATABASE_URL (postgres backend)");
            self.spec.storage.backend = StorageBackend::Postgres;
            self.spec.storage.connection_string = Some(url);
        }

        if let Some(url) = lookup("TASKHUB_PROJECT_SERVICE_URL").filter(|v| !v.trim().is_empty()) {
            tracing::info!("Environment override: TASKHUB_PROJECT_SERVICE_URL={}", url);
            self.spec.project_service.base_url = Some(url);
        }

        if let Some(level) = lookup("TASKHUB_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.spec.logging.level = level;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let spec = &self.spec;
        if spec.server.port == 0 {
            anyhow::bail!("spec.server.port cannot be 0");
        }

        if spec.storage.backend == StorageBackend::Postgres
            && spec
                .storage
                .connection_string
                .as_deref()
                .is_none_or(|s| s.trim().is_empty())
        {
            anyhow::bail!("spec.storage.connection_string is required for the postgres backend");
        }
        if spec.storage.max_connections == 0 {
            anyhow::bail!("spec.storage.max_connections must be greater than 0");
        }

        let messaging = &spec.messaging;
        for (field, value) in [
            ("task_exchange", &messaging.task_exchange),
            ("task_routing_key", &messaging.task_routing_key),
            ("task_queue", &messaging.task_queue),
            ("project_exchange", &messaging.project_exchange),
            ("project_routing_key", &messaging.project_routing_key),
            ("project_queue", &messaging.project_queue),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("spec.messaging.{} cannot be empty", field);
            }
        }
        if messaging.queue_capacity == 0 {
            anyhow::bail!("spec.messaging.queue_capacity must be greater than 0");
        }
        if messaging.forward_timeout_ms == 0 {
            anyhow::bail!("spec.messaging.forward_timeout_ms must be greater than 0");
        }
        for url in &messaging.forward_urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("spec.messaging.forward_urls entry is not an http(s) URL: {}", url);
            }
        }

        if spec.project_service.timeout_ms == 0 {
            anyhow::bail!("spec.project_service.timeout_ms must be greater than 0");
        }
        if spec.project_service.require_existing_project && spec.project_service.base_url.is_none() {
            anyhow::bail!("spec.project_service.base_url is required when require_existing_project is set");
        }

        if spec.consumer.dedup_capacity == 0 {
            anyhow::bail!("spec.consumer.dedup_capacity must be greater than 0");
        }

        if !matches!(spec.logging.format.as_str(), "compact" | "json") {
            anyhow::bail!(
                "Invalid logging.format: '{}'. Must be 'compact' or 'json'",
                spec.logging.format
            );
        }

        Ok(())
    }
}
