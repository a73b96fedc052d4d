/// Identity Service Main Entry Point
///
/// Starts gRPC server with:
/// - Credential store (PostgreSQL, or in-memory when no database is configured)
/// - Token manager and access policy
/// - Authorization layer in front of every service
use anyhow::{Context, Result};
use identity_service::{
    app::{bootstrap_admin, connect_store},
    config::{Settings, TlsSettings},
    IdentityApp,
};
use std::net::SocketAddr;
use tokio::signal;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "identity_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Identity Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let store = connect_store(settings.database.as_ref()).await?;
    let app = IdentityApp::from_settings(&settings, store)?;

    if let Some(admin) = &settings.bootstrap_admin {
        bootstrap_admin(app.users(), admin).await?;
    }

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    let mut server_builder = Server::builder();
    match &settings.server.tls {
        Some(tls) => {
            server_builder = server_builder
                .tls_config(load_tls(tls).await?)
                .context("Failed to configure gRPC TLS")?;
            info!("gRPC TLS enabled");
        }
        None => warn!("TLS certificate not configured - starting without TLS"),
    }

    info!("Starting gRPC server on {}", addr);

    app.router(server_builder)
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("gRPC server error")?;

    info!("Identity service shutdown complete");

    Ok(())
}

async fn load_tls(tls: &TlsSettings) -> Result<ServerTlsConfig> {
    let cert = tokio::fs::read(&tls.cert_file)
        .await
        .with_context(|| format!("Failed to read {}", tls.cert_file.display()))?;
    let key = tokio::fs::read(&tls.key_file)
        .await
        .with_context(|| format!("Failed to read {}", tls.key_file.display()))?;

    Ok(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutting down gracefully...");
}
