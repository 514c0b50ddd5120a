use std::sync::Arc;

use relay_core::{ActionRegistry, InstructionStore};
use relay_db::PgInstructionStore;
use relay_worker::broker::nats::{JetStreamSettings, JetStreamSource};
use relay_worker::config::WorkerConfig;
use relay_worker::telemetry;
use relay_worker::{ExecutionBridge, QueueConsumer, WorkerError, WorkerPool};
use tokio_util::sync::CancellationToken;

/// Connections kept beyond one per worker, for startup and health checks.
const SPARE_DB_CONNECTIONS: u32 = 2;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // --- Tracing ---
    telemetry::init_tracing(&config);
    tracing::info!(
        service = "relay-worker",
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        max_workers = config.max_workers,
        job_queue_size = config.job_queue_size,
        "Starting relay worker",
    );

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Relay worker failed");
        std::process::exit(1);
    }
}

async fn run(config: WorkerConfig) -> Result<(), WorkerError> {
    let workers = config.worker_count()?;
    let intake_capacity = config.intake_capacity()?;

    // --- Database ---
    let max_connections = u32::try_from(workers.get())
        .unwrap_or(u32::MAX)
        .saturating_add(SPARE_DB_CONNECTIONS);
    let db = relay_db::create_pool(&config.database_url, max_connections).await?;
    tracing::info!(max_connections, "Database connection pool created");

    relay_db::health_check(&db).await?;
    tracing::info!("Database health check passed");

    if config.run_migrations {
        relay_db::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");
    }

    // --- Executors ---
    let mut registry = ActionRegistry::new();
    relay_actions::register_builtin(&mut registry)?;
    tracing::info!(action_types = ?registry.names(), "Action executors registered");

    // --- Worker pool ---
    let store: Arc<dyn InstructionStore> = Arc::new(PgInstructionStore::new(db.clone()));
    let mut pool = WorkerPool::new(workers, store, Arc::new(registry), intake_capacity);
    let cancel = CancellationToken::new();
    pool.start(cancel.clone());

    // --- Broker ---
    let settings = JetStreamSettings::from_config(&config);
    let drain = config.worst_case_drain(relay_actions::webhook::REQUEST_TIMEOUT);
    if config.ack_wait < drain {
        tracing::warn!(
            ack_wait_secs = config.ack_wait.as_secs(),
            worst_case_drain_secs = drain.as_secs(),
            max_unacked = settings.max_ack_pending,
            "ACK_WAIT_SECS is shorter than the worst-case intake drain; slow webhooks may be redelivered while queued",
        );
    }
    let source = match JetStreamSource::connect(&settings).await {
        Ok(source) => source,
        Err(e) => {
            pool.shutdown().await;
            return Err(e.into());
        }
    };

    let bridge = ExecutionBridge::new(pool.intake());
    let consumer = QueueConsumer::new(bridge.clone());
    let stop_consumer = consumer.stop_token();
    let consumer_handle = tokio::spawn(consumer.run(source));

    shutdown_signal().await;

    // --- Shutdown ---
    // Acknowledgements must flush while the broker connection is open.
    stop_consumer.cancel();
    if let Err(e) = consumer_handle.await {
        tracing::error!(error = %e, "Queue consumer task failed");
    }

    cancel.cancel();
    pool.shutdown().await;

    let pending = bridge.pending_acks();
    if tokio::time::timeout(config.shutdown_timeout, bridge.wait_for_acks())
        .await
        .is_err()
    {
        tracing::warn!(
            pending,
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Timed out waiting for acknowledgements; broker will redeliver",
        );
    }

    db.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
