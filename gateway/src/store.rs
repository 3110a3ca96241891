use std::future::Future;

use sqlx::PgPool;

/// Request bodies are truncated to this length before logging.
pub const BODY_LOG_MAX_CHARS: usize = 500;

/// One append-only decision-trail record. Field set matches the
/// `request_logs` table; enums are flattened to their stable labels at
/// construction time.
#[derive(Debug, Clone)]
pub struct RequestLogRecord {
    pub client_addr: String,
    pub method: String,
    pub path: String,
    pub query_params: String,
    pub user_agent: String,
    pub body: String,
    pub rule_verdict: &'static str,
    pub rule_matches: String,
    pub advisory_verdict: &'static str,
    pub advisory_latency_ms: i32,
    pub risk_score: i32,
    pub decision: &'static str,
    pub deception_response: Option<String>,
    pub login_attempt: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence contract of the gateway: an append-only request log and a
/// unique-keyed deception table with an atomic create-if-absent primitive.
/// Log writes are fire-and-forget — observability is prioritized over strict
/// durability, and a storage failure must never abort the request path.
pub trait GatewayStore: Send + Sync + 'static {
    /// Append a decision-trail record. Must not block or fail the caller.
    fn record_request(&self, record: RequestLogRecord);

    /// Canonical fake response for a signature, if one was ever stored.
    fn deception_lookup(
        &self,
        signature: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Create-if-absent: stores the record unless one already exists for the
    /// signature, and returns the canonical text either way. Losing a
    /// concurrent race discards the caller's text.
    fn deception_store(
        &self,
        signature: &str,
        attack_type: &str,
        fake_response: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;
}

impl<S: GatewayStore> GatewayStore for std::sync::Arc<S> {
    fn record_request(&self, record: RequestLogRecord) {
        (**self).record_request(record)
    }

    async fn deception_lookup(&self, signature: &str) -> Result<Option<String>, StoreError> {
        (**self).deception_lookup(signature).await
    }

    async fn deception_store(
        &self,
        signature: &str,
        attack_type: &str,
        fake_response: &str,
    ) -> Result<String, StoreError> {
        (**self)
            .deception_store(signature, attack_type, fake_response)
            .await
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl GatewayStore for PgStore {
    fn record_request(&self, record: RequestLogRecord) {
        let pool = self.pool.clone();
        // Fire-and-forget insert (never blocks the response)
        tokio::spawn(async move {
            if let Err(e) = sqlx::query(
                "INSERT INTO request_logs \
                 (client_addr, method, path, query_params, user_agent, body, \
                  rule_verdict, rule_matches, advisory_verdict, advisory_latency_ms, \
                  risk_score, decision, deception_response, login_attempt) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            )
            .bind(&record.client_addr)
            .bind(&record.method)
            .bind(&record.path)
            .bind(&record.query_params)
            .bind(&record.user_agent)
            .bind(&record.body)
            .bind(record.rule_verdict)
            .bind(&record.rule_matches)
            .bind(record.advisory_verdict)
            .bind(record.advisory_latency_ms)
            .bind(record.risk_score)
            .bind(record.decision)
            .bind(&record.deception_response)
            .bind(record.login_attempt)
            .execute(&pool)
            .await
            {
                tracing::warn!(error = %e, "Failed to insert request log entry");
            }
        });
    }

    async fn deception_lookup(&self, signature: &str) -> Result<Option<String>, StoreError> {
        let text = sqlx::query_scalar::<_, String>(
            "SELECT fake_response FROM fake_responses WHERE attack_signature = $1",
        )
        .bind(signature)
        .fetch_optional(&self.pool)
        .await?;
        Ok(text)
    }

    async fn deception_store(
        &self,
        signature: &str,
        attack_type: &str,
        fake_response: &str,
    ) -> Result<String, StoreError> {
        // RETURNING yields a row only when this call actually inserted.
        let inserted = sqlx::query_scalar::<_, String>(
            "INSERT INTO fake_responses (attack_signature, attack_type, fake_response) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (attack_signature) DO NOTHING \
             RETURNING fake_response",
        )
        .bind(signature)
        .bind(attack_type)
        .bind(fake_response)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(text) => Ok(text),
            // A concurrent writer won; records are immutable, so the row
            // is guaranteed to exist now.
            None => {
                let canonical = sqlx::query_scalar::<_, String>(
                    "SELECT fake_response FROM fake_responses WHERE attack_signature = $1",
                )
                .bind(signature)
                .fetch_one(&self.pool)
                .await?;
                Ok(canonical)
            }
        }
    }
}
