// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `taskhub serve`: run the HTTP API together with the project event consumer
//! and the task event relay until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Args;
use std::future::Future;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use taskhub_core::application::TaskServiceRuntime;
use taskhub_core::domain::service_config::ServiceConfigManifest;
use taskhub_core::presentation::router;

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// HTTP API port (overrides spec.server.port)
    #[arg(long)]
    pub port: Option<u16>,

    /// HTTP API bind address (overrides spec.server.bind_address)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Resolve the effective configuration: file or defaults, then environment,
/// then command-line flags.
pub fn load_config(args: &ServeArgs, config_path: Option<PathBuf>) -> Result<ServiceConfigManifest> {
    let mut config =
        ServiceConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.spec.server.port = port;
    }
    if let Some(bind) = &args.bind {
        config.spec.server.bind_address = bind.clone();
    }
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

pub async fn run(config: ServiceConfigManifest) -> Result<()> {
    let addr = format!("{}:{}", config.spec.server.bind_address, config.spec.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    serve_on(config, listener, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves, then stop the
/// background consumers.
pub async fn serve_on<F>(config: ServiceConfigManifest, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let name = config.metadata.name.clone();
    let runtime = TaskServiceRuntime::build(config)
        .await
        .context("Failed to initialize task service")?;

    let cancel = CancellationToken::new();
    let handles = runtime.start_background(&cancel)?;
    let app = router(runtime.app_state());

    info!(service = %name, address = %listener.local_addr()?, "Task service listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed");

    info!("Task service shutting down");
    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "Background task ended abnormally");
        }
    }
    runtime.broker.shutdown();

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskhub-config.yaml");
        std::fs::write(&path, include_str!("../../templates/config-minimal.yaml")).unwrap();

        let args = ServeArgs {
            port: Some(9191),
            bind: Some("127.0.0.1".to_string()),
        };
        let config = load_config(&args, Some(path)).unwrap();
        assert_eq!(config.spec.server.port, 9191);
        assert_eq!(config.spec.server.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let args = ServeArgs::default();
        assert!(load_config(&args, Some(PathBuf::from("/nonexistent/taskhub.yaml"))).is_err());
    }

    #[tokio::test]
    async fn test_serves_health_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let server = tokio::spawn(serve_on(
            ServiceConfigManifest::default(),
            listener,
            async move {
                let _ = stopped.await;
            },
        ));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("UP"));

        stop.send(()).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}
