use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use libris_core::config::LibrisConfig;
use libris_ledger::SqliteLedger;
use libris_mailer::{templates, MailQueue, MailWorker, Mailer};
use libris_scheduler::{Clock, DailySchedule, ReminderScanner, SchedulerEngine, SystemClock};
use tracing::{info, warn};

mod app;
mod auth;
mod cli;
mod http;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "libris=info,libris_ledger=info,libris_mailer=info,libris_scheduler=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config / LIBRIS_CONFIG > ./libris.toml
    let config = LibrisConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        LibrisConfig::default()
    });

    let state = build_state(config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::ScanNow => scan_now(state).await,
        Command::SendTest { to } => send_test(state, &to).await,
    }
}

/// Wire the queue, mailer, worker and scanner from config.
fn build_state(config: LibrisConfig) -> anyhow::Result<Arc<app::AppState>> {
    let offset = config.reminders.offset()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let queue = Arc::new(MailQueue::new());
    let mailer = Arc::new(Mailer::from_settings(&config.email));
    let worker = Arc::new(MailWorker::new(
        Arc::clone(&queue),
        Arc::clone(&mailer),
        &config.worker,
    ));

    info!(path = %config.database.path, "using lending ledger");
    let scanner = Arc::new(ReminderScanner::new(
        Arc::new(SqliteLedger::new(&config.database.path)),
        Arc::clone(&mailer),
        Arc::clone(&queue),
        Arc::clone(&clock),
        offset,
        config.reminders.delivery,
    ));

    Ok(Arc::new(app::AppState {
        config,
        queue,
        mailer,
        worker,
        scanner,
        clock,
        offset,
    }))
}

async fn serve(state: Arc<app::AppState>) -> anyhow::Result<()> {
    let addr: SocketAddr =
        format!("{}:{}", state.config.gateway.bind, state.config.gateway.port).parse()?;

    state.worker.start();

    // spawn scheduler engine loop in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler = if state.config.reminders.enabled {
        let engine = SchedulerEngine::new(
            Arc::clone(&state.scanner),
            DailySchedule::from_config(&state.config.reminders)?,
            Arc::clone(&state.clock),
            Duration::from_secs(state.config.reminders.poll_secs),
        );
        Some(tokio::spawn(engine.run(shutdown_rx)))
    } else {
        info!("daily reminders disabled by config");
        None
    };

    let router = app::build_router(Arc::clone(&state));
    info!("Libris gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // signal scheduler to stop, then let the worker finish what is queued
    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            warn!("scheduler task failed: {e}");
        }
    }
    state.worker.shutdown().await;
    info!("Libris gateway stopped");
    Ok(())
}

async fn scan_now(state: Arc<app::AppState>) -> anyhow::Result<()> {
    // Queued delivery needs a consumer; shutdown drains it.
    state.worker.start();
    let report = state.scanner.run_daily().await;
    state.worker.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn send_test(state: Arc<app::AppState>, to: &str) -> anyhow::Result<()> {
    let now = state.clock.now().with_timezone(&state.offset);
    let email = templates::test_email(&state.mailer.library_name(), now);

    state
        .mailer
        .try_send(to, &email.subject, &email.html_body)
        .await
        .map_err(|e| anyhow::anyhow!("test email to {to} failed [{}]: {e}", e.code()))?;

    println!("test email sent to {to}");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
