use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway/report", get(recent_decisions))
}

/// One logged pipeline decision, newest first.
#[derive(Serialize, utoipa::ToSchema, sqlx::FromRow)]
pub struct DecisionRecord {
    pub timestamp: DateTime<Utc>,
    pub client_addr: String,
    pub method: String,
    pub path: String,
    pub rule_verdict: String,
    pub rule_matches: String,
    pub advisory_verdict: String,
    pub advisory_latency_ms: i32,
    pub risk_score: i32,
    pub decision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deception_response: Option<String>,
    pub login_attempt: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReportResponse {
    pub records: Vec<DecisionRecord>,
    pub count: usize,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ReportQuery {
    /// Maximum number of records to return (default 50, max 200).
    pub limit: Option<i64>,
}

/// Recent decision trail, the gateway's read-only operator report
///
/// Returns the latest logged pipeline decisions: verdicts, matched
/// categories, advisory results, scores, and served deception bodies.
#[utoipa::path(
    get,
    path = "/gateway/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Recent pipeline decisions", body = ReportResponse)
    ),
    tag = "report"
)]
pub async fn recent_decisions(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, GatewayError> {
    let limit = effective_limit(query.limit);

    let records = sqlx::query_as::<_, DecisionRecord>(
        "SELECT timestamp, client_addr, method, path, rule_verdict, rule_matches, \
                advisory_verdict, advisory_latency_ms, risk_score, decision, \
                deception_response, login_attempt \
         FROM request_logs \
         ORDER BY id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    let count = records.len();
    Ok(Json(ReportResponse { records, count }))
}

fn effective_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(effective_limit(None), 50);
        assert_eq!(effective_limit(Some(10)), 10);
        assert_eq!(effective_limit(Some(0)), 1);
        assert_eq!(effective_limit(Some(-5)), 1);
        assert_eq!(effective_limit(Some(10_000)), 200);
    }

    #[test]
    fn served_deception_text_is_present_only_when_set() {
        let record = DecisionRecord {
            timestamp: Utc::now(),
            client_addr: "198.51.100.7".to_string(),
            method: "GET".to_string(),
            path: "/search".to_string(),
            rule_verdict: "SUSPICIOUS".to_string(),
            rule_matches: "xss".to_string(),
            advisory_verdict: "UNSAFE".to_string(),
            advisory_latency_ms: 12,
            risk_score: 6,
            decision: "DECEIVE".to_string(),
            deception_response: None,
            login_attempt: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("deception_response").is_none());
        assert_eq!(json["decision"], "DECEIVE");
        assert_eq!(json["risk_score"], 6);
    }
}
