//! Courier - Subscriber Daemon Entry Point
//! Wires the SQLite transport into the subscription engine and runs the demo handlers

mod config;

use anyhow::Result;
use config::{DaemonConfig, LogFormat};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use courier_core::application::{Publisher, Subscriber};
use courier_core::domain::{HandlerOptions, SubscriberOptions};
use courier_core::port::id_provider::UuidProvider;
use courier_core::port::time_provider::SystemTimeProvider;
use courier_core::port::{handler_fn, HandlerError};
use courier_infra_sqlite::{create_pool, run_migrations, SqliteTransport};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Visibility delay before a failed Queue1 message is retried
const QUEUE1_RETRY_DELAY_SECS: i64 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::from_env()?;

    // 1. Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("courier=info"))?;

    match config.log_format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Courier v{} starting...", VERSION);

    // 2. Initialize database
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !config.db_path.starts_with("sqlite:") && !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    info!(db_path = %config.db_path, "Initializing database...");

    let pool = create_pool(&config.database_url())
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Setup dependencies (DI wiring)
    let transport = Arc::new(SqliteTransport::new(
        pool,
        Arc::new(SystemTimeProvider),
        Arc::new(UuidProvider),
    ));

    let prefix = &config.queue_prefix;
    let queue1 = format!("{prefix}Queue1");
    let queue2 = format!("{prefix}Queue2");
    let topic = format!("{prefix}SNSTopic");

    let queue1_id = transport.create_queue(&queue1).await?;
    let queue2_id = transport.create_queue(&queue2).await?;
    let topic_id = transport.create_topic(&topic).await?;
    transport.subscribe_queue(&topic_id, &queue1_id).await?;
    transport.subscribe_queue(&topic_id, &queue2_id).await?;

    // 4. Register handlers
    let mut subscriber = Subscriber::new(
        transport.clone(),
        SubscriberOptions::new(config.concurrency_limit),
    )?;

    subscriber.register(
        queue1.as_str(),
        handler_fn(|id, body| async move {
            info!(message_id = %id, body = ?body, "handleQueue1");
            Err::<(), _>(HandlerError::new("error handleQueue1"))
        }),
        HandlerOptions::new(QUEUE1_RETRY_DELAY_SECS),
    )?;
    subscriber.register(
        queue2.as_str(),
        handler_fn(|id, body| async move {
            info!(message_id = %id, body = ?body, "handleQueue2");
            Ok::<(), HandlerError>(())
        }),
        HandlerOptions::new(0),
    )?;

    // 5. Start subscription
    let mut subscription = tokio::spawn(subscriber.subscribe());

    // 6. Publish demo messages
    let publisher = Publisher::new(transport);
    publisher
        .publish(
            &topic,
            &serde_json::json!({"title": "test-title", "body": "test-body"}),
        )
        .await?;
    publisher
        .send_message(
            &queue1,
            &serde_json::json!({"title": "test-title2", "body": "test-body2"}),
        )
        .await?;

    info!("System ready. Waiting for messages...");
    info!("Press Ctrl+C to shutdown");

    // 7. Run until a fatal error or Ctrl+C
    tokio::select! {
        joined = &mut subscription => {
            match joined {
                Ok(err) => error!(error = %err, "Subscription failed"),
                Err(join_err) => error!(error = %join_err, "Subscription task aborted"),
            }
            std::process::exit(1);
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received. Exiting...");
            subscription.abort();
        }
    }

    info!("Shutdown complete.");
    Ok(())
}
