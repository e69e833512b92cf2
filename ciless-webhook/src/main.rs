//! Ciless Webhook server
//!
//! Wires the GitHub and cluster clients into the pipeline, starts the
//! worker pool and serves webhook deliveries until SIGINT or SIGTERM.
//! Queued events are drained before the process exits.

use std::sync::Arc;

use anyhow::{Context, Result};
use ciless_client::{ClusterClient, GitHubClient, USER_AGENT};
use ciless_core::template::TemplateBuilder;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ciless_webhook::api::{self, AppState};
use ciless_webhook::config::{Config, LogFormat};
use ciless_webhook::repository::{ClusterTemplateRepository, GitHubConfigSource};
use ciless_webhook::service::{ConfigFetcher, Dispatcher, Pipeline, Reconciler, WebhookVerifier};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    config.validate().context("Invalid configuration")?;
    info!("Starting ciless-webhook: {}", config.summary());

    let github = GitHubClient::with_client(
        &config.github_api_url,
        &config.github_token,
        http_client(&config, None)?,
    );

    let ca = match config.cluster_ca_path() {
        Some(path) => {
            let pem = std::fs::read(&path)
                .with_context(|| format!("Failed to read cluster CA from {}", path.display()))?;
            Some(reqwest::Certificate::from_pem(&pem).context("Invalid cluster CA bundle")?)
        }
        None => None,
    };
    let mut cluster =
        ClusterClient::with_client(&config.cluster_url, &config.namespace, http_client(&config, ca)?);
    match config.cluster_token_path() {
        Some(path) => {
            let token = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read cluster token from {}", path.display()))?;
            cluster = cluster.with_token(token.trim());
        }
        None => warn!("No cluster token configured, cluster requests are unauthenticated"),
    }

    info!("Clients initialized");

    let pipeline = Arc::new(Pipeline::new(
        ConfigFetcher::new(
            Arc::new(GitHubConfigSource::new(github)),
            config.fetch_policy(),
        ),
        TemplateBuilder::new(config.template_prefix.as_str()),
        Reconciler::new(
            Arc::new(ClusterTemplateRepository::new(cluster)),
            config.call_timeout(),
            config.max_update_attempts,
        ),
    ));

    let (dispatcher, workers) = Dispatcher::start(pipeline, config.workers, config.queue_depth);
    info!("Started {} workers", config.workers);

    let app = api::create_router(AppState {
        verifier: Arc::new(WebhookVerifier::new(config.webhook_secret.as_str())),
        dispatcher,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router owned the last dispatcher handle; queues close once drained
    info!("Draining queued events");
    workers.join().await;
    info!("Shutdown complete");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ciless_webhook=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// HTTP client with the per-call deadline and an optional extra root CA
fn http_client(config: &Config, ca: Option<reqwest::Certificate>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.call_timeout());
    if let Some(ca) = ca {
        builder = builder.add_root_certificate(ca);
    }

    builder.build().context("Failed to build HTTP client")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown requested");
}
