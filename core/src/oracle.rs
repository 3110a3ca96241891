use std::future::Future;

use serde::Serialize;
use thiserror::Error;

/// Non-authoritative classification from the advisory oracle. Only ever adds
/// to the computed risk; a rule-derived MALICIOUS verdict is never
/// downgraded by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvisoryVerdict {
    Safe,
    Unsafe,
    Unknown,
    Error,
    NotRun,
}

impl AdvisoryVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Unsafe => "UNSAFE",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
            Self::NotRun => "NOT_RUN",
        }
    }
}

/// Advisory verdict plus the oracle round-trip latency.
#[derive(Debug, Clone, Copy)]
pub struct AdvisoryOutcome {
    pub verdict: AdvisoryVerdict,
    pub latency_ms: u64,
}

impl AdvisoryOutcome {
    /// Outcome for requests where the classifier was skipped entirely.
    pub fn not_run() -> Self {
        Self {
            verdict: AdvisoryVerdict::NotRun,
            latency_ms: 0,
        }
    }
}

/// Normalize a free-text oracle reply. "UNSAFE" anywhere in the reply wins
/// over "SAFE" ("UNSAFE" contains "SAFE" as a substring); anything else is
/// UNKNOWN.
pub fn parse_advisory_reply(text: &str) -> AdvisoryVerdict {
    let upper = text.to_ascii_uppercase();
    if upper.contains("UNSAFE") {
        AdvisoryVerdict::Unsafe
    } else if upper.contains("SAFE") {
        AdvisoryVerdict::Safe
    } else {
        AdvisoryVerdict::Unknown
    }
}

/// Failure modes of the model oracles. Classification absorbs these into an
/// ERROR verdict; generation surfaces them so the caller can substitute the
/// fixed fallback text without caching it.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("oracle returned status {0}")]
    BadStatus(u16),
    #[error("oracle reply carried no text")]
    EmptyReply,
}

/// Advisory classification capability. Implementations must never propagate
/// a fault: timeouts and transport errors become ERROR verdicts with the
/// elapsed latency.
pub trait AdvisoryClassifier: Send + Sync {
    fn classify(&self, payload: &str) -> impl Future<Output = AdvisoryOutcome> + Send;
}

/// Fake-response generation capability. Non-deterministic and
/// latency-bearing; output is truncated by the adapter before storage.
pub trait FakeResponseGenerator: Send + Sync {
    fn generate(&self, payload: &str) -> impl Future<Output = Result<String, OracleError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_takes_priority_over_safe() {
        assert_eq!(parse_advisory_reply("UNSAFE"), AdvisoryVerdict::Unsafe);
        assert_eq!(
            parse_advisory_reply("This request is UNSAFE, not SAFE."),
            AdvisoryVerdict::Unsafe
        );
    }

    #[test]
    fn safe_is_recognized_with_surrounding_noise() {
        assert_eq!(parse_advisory_reply("SAFE"), AdvisoryVerdict::Safe);
        assert_eq!(parse_advisory_reply("Verdict: safe.\n"), AdvisoryVerdict::Safe);
    }

    #[test]
    fn unrecognized_replies_map_to_unknown() {
        assert_eq!(parse_advisory_reply(""), AdvisoryVerdict::Unknown);
        assert_eq!(
            parse_advisory_reply("I cannot classify this request."),
            AdvisoryVerdict::Unknown
        );
    }
}
