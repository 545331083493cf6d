use std::time::Duration;

use anyhow::Result;
use thunai_agent::StateSweeper;
use thunai_core::config::{AppConfig, LoadOptions};
use thunai_server::health::{self, HealthState};
use thunai_server::messages::{self, MessagesState};
use thunai_server::{bootstrap_with_config, init_logging};
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging);

    let app = bootstrap_with_config(config).await?;
    let server = &app.config.server;
    let address = format!("{}:{}", server.bind_address, server.health_check_port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let router = health::router(HealthState {
        db_pool: app.db_pool.clone(),
        llm_configured: app.llm_configured,
    })
    .merge(messages::router(MessagesState {
        dispatcher: app.dispatcher.clone(),
        runtime: app.runtime.clone(),
    }));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut http_shutdown = shutdown_rx.clone();
    let http = tokio::spawn(async move {
        let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = http_shutdown.wait_for(|stop| *stop).await;
        });
        if let Err(error) = serve.await {
            error!(
                event_name = "system.http.error",
                correlation_id = "bootstrap",
                error = %error,
                "http server terminated unexpectedly"
            );
        }
    });
    info!(
        event_name = "system.http.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health and message endpoints listening"
    );

    let sweeper = StateSweeper::new(
        app.runtime.clone(),
        Duration::from_secs(app.config.conversation.sweep_interval_secs),
    );
    let sweeper = tokio::spawn(sweeper.run(shutdown_rx));

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        socket_transport = if app.socket_runner.is_idle() { "idle" } else { "connected" },
        "thunai-server started"
    );
    app.socket_runner.start().await?;

    tokio::signal::ctrl_c().await?;
    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "thunai-server stopping"
    );
    let _ = shutdown_tx.send(true);

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(grace, async {
        let _ = http.await;
        let _ = sweeper.await;
    })
    .await
    .is_err()
    {
        warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "background tasks did not stop within the grace period"
        );
    }
    app.db_pool.close().await;

    Ok(())
}
