// SQLite Transport Implementation
//
// Queue semantics follow the cloud queues the engine was built for:
// receive hides a message for the visibility timeout and issues a fresh
// receipt handle, delete needs the latest handle, and a visibility change
// reschedules delivery.

use crate::config::SqliteTransportConfig;
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use courier_core::domain::{Batch, Message, QueueId, TopicId};
use courier_core::port::{IdProvider, OutboundTransport, TimeProvider, Transport, TransportError};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

pub struct SqliteTransport {
    pool: SqlitePool,
    config: SqliteTransportConfig,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl SqliteTransport {
    pub fn new(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            pool,
            config: SqliteTransportConfig::default(),
            time_provider,
            id_provider,
        }
    }

    pub fn with_config(mut self, config: SqliteTransportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SqliteTransportConfig {
        &self.config
    }

    /// Create a queue if it does not exist and return its ID
    pub async fn create_queue(&self, name: &str) -> Result<QueueId, TransportError> {
        sqlx::query("INSERT OR IGNORE INTO queues (id, name, created_at) VALUES (?, ?, ?)")
            .bind(self.id_provider.generate_id())
            .bind(name)
            .bind(self.time_provider.now_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let queue_id = self.resolve_queue(name).await?;
        info!(queue = %name, queue_id = %queue_id, "Queue ready");
        Ok(queue_id)
    }

    /// Create a topic if it does not exist and return its ID
    pub async fn create_topic(&self, name: &str) -> Result<TopicId, TransportError> {
        sqlx::query("INSERT OR IGNORE INTO topics (id, name, created_at) VALUES (?, ?, ?)")
            .bind(self.id_provider.generate_id())
            .bind(name)
            .bind(self.time_provider.now_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let topic_id = self.resolve_topic(name).await?;
        info!(topic = %name, topic_id = %topic_id, "Topic ready");
        Ok(topic_id)
    }

    /// Deliver every message published to `topic_id` into `queue_id` (idempotent)
    pub async fn subscribe_queue(
        &self,
        topic_id: &TopicId,
        queue_id: &QueueId,
    ) -> Result<(), TransportError> {
        sqlx::query("INSERT OR IGNORE INTO topic_subscriptions (topic_id, queue_id) VALUES (?, ?)")
            .bind(topic_id)
            .bind(queue_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Messages stored in a queue, visible or not
    pub async fn queue_depth(&self, queue_id: &QueueId) -> Result<i64, TransportError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE queue_id = ?")
            .bind(queue_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// Claim up to `max_batch_size` visible messages in one statement
    async fn claim_visible(&self, queue_id: &QueueId) -> Result<Batch, TransportError> {
        let now = self.time_provider.now_millis();
        let hidden_until = now.saturating_add(
            i64::try_from(self.config.visibility_timeout.as_millis()).unwrap_or(i64::MAX),
        );
        // Per-receive token; the message id keeps each handle unique
        let claim = self.id_provider.generate_id();

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE messages
            SET receipt_handle = ? || ':' || id,
                visible_at = ?,
                receive_count = receive_count + 1
            WHERE id IN (
                SELECT id FROM messages
                WHERE queue_id = ? AND visible_at <= ?
                ORDER BY sent_at ASC, id ASC
                LIMIT ?
            )
            RETURNING id, receipt_handle, body
            "#,
        )
        .bind(&claim)
        .bind(hidden_until)
        .bind(queue_id)
        .bind(now)
        .bind(i64::from(self.config.max_batch_size))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn insert_message(
        &self,
        executor: &mut sqlx::SqliteConnection,
        queue_id: &QueueId,
        body: &str,
        now: i64,
    ) -> Result<(), TransportError> {
        sqlx::query(
            "INSERT INTO messages (id, queue_id, body, visible_at, sent_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(self.id_provider.generate_id())
        .bind(queue_id)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(executor)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl Transport for SqliteTransport {
    async fn resolve_queue(&self, name: &str) -> Result<QueueId, TransportError> {
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM queues WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        id.ok_or_else(|| TransportError::QueueNotFound(name.to_string()))
    }

    async fn fetch_batch(&self, queue_id: &QueueId) -> Result<Batch, TransportError> {
        let deadline = Instant::now() + self.config.long_poll_wait;

        loop {
            let batch = self.claim_visible(queue_id).await?;
            if !batch.is_empty() {
                debug!(queue_id = %queue_id, received = batch.len(), "Received messages");
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(batch);
            }
            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    async fn report_success(
        &self,
        queue_id: &QueueId,
        receipt_handle: &str,
    ) -> Result<(), TransportError> {
        let result = sqlx::query("DELETE FROM messages WHERE queue_id = ? AND receipt_handle = ?")
            .bind(queue_id)
            .bind(receipt_handle)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(TransportError::ReceiptNotFound(receipt_handle.to_string()));
        }
        Ok(())
    }

    async fn report_failure(
        &self,
        queue_id: &QueueId,
        receipt_handle: &str,
        delay_secs: i64,
    ) -> Result<(), TransportError> {
        let visible_at = self
            .time_provider
            .now_millis()
            .saturating_add(delay_secs.saturating_mul(1000));

        let result = sqlx::query(
            "UPDATE messages SET visible_at = ? WHERE queue_id = ? AND receipt_handle = ?",
        )
        .bind(visible_at)
        .bind(queue_id)
        .bind(receipt_handle)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(TransportError::ReceiptNotFound(receipt_handle.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OutboundTransport for SqliteTransport {
    async fn resolve_topic(&self, name: &str) -> Result<TopicId, TransportError> {
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM topics WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        id.ok_or_else(|| TransportError::TopicNotFound(name.to_string()))
    }

    async fn publish(
        &self,
        topic_id: &TopicId,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let queue_ids: Vec<String> =
            sqlx::query_scalar("SELECT queue_id FROM topic_subscriptions WHERE topic_id = ?")
                .bind(topic_id)
                .fetch_all(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let now = self.time_provider.now_millis();
        for queue_id in &queue_ids {
            self.insert_message(&mut *tx, queue_id, body, now).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            topic_id = %topic_id,
            subject = %subject,
            fan_out = queue_ids.len(),
            "Published to topic"
        );
        Ok(())
    }

    async fn send_message(&self, queue_id: &QueueId, body: &str) -> Result<(), TransportError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        let now = self.time_provider.now_millis();
        self.insert_message(&mut *conn, queue_id, body, now).await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: String,
    receipt_handle: String,
    body: Option<String>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message::new(self.id, self.receipt_handle, self.body)
    }
}
