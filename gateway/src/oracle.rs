use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use luregate_core::oracle::{
    AdvisoryClassifier, AdvisoryOutcome, AdvisoryVerdict, FakeResponseGenerator, OracleError,
    parse_advisory_reply,
};

/// Generated fake responses are truncated to this length before storage.
pub const FAKE_RESPONSE_MAX_CHARS: usize = 500;

fn classification_prompt(payload: &str) -> String {
    format!(
        "You are a web security analysis assistant.\n\
         \n\
         Classify the following HTTP request content as either:\n\
         SAFE\n\
         or\n\
         UNSAFE\n\
         \n\
         Rules:\n\
         - Respond with ONLY one word: SAFE or UNSAFE\n\
         - Do not explain\n\
         - Consider SQL injection, XSS, path traversal, command injection\n\
         \n\
         Request Content:\n\
         {payload}\n"
    )
}

fn generation_prompt(payload: &str) -> String {
    format!(
        "You are simulating a buggy, insecure web application.\n\
         \n\
         Generate a realistic but incorrect application response for the following request.\n\
         - Do NOT mention security, AI, or honeypots.\n\
         - Do NOT confirm success.\n\
         - The response should look plausible but not useful.\n\
         \n\
         Request:\n\
         {payload}\n"
    )
}

/// Adapter for an Ollama-style `/api/generate` endpoint, implementing both
/// oracle capabilities. One underlying HTTP client, per-call timeouts.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    url: String,
    model: String,
    advisory_timeout: Duration,
    generation_timeout: Duration,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaReply {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    pub fn new(
        http: reqwest::Client,
        url: String,
        model: String,
        advisory_timeout: Duration,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            http,
            url,
            model,
            advisory_timeout,
            generation_timeout,
        }
    }

    async fn post_prompt(&self, prompt: &str, timeout: Duration) -> Result<String, OracleError> {
        let response = self
            .http
            .post(&self.url)
            .json(&OllamaRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| OracleError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OracleError::BadStatus(response.status().as_u16()));
        }

        let reply = response
            .json::<OllamaReply>()
            .await
            .map_err(|_| OracleError::EmptyReply)?;
        Ok(reply.response.trim().to_string())
    }
}

impl AdvisoryClassifier for OllamaClient {
    /// Classify a payload, absorbing every failure mode. Timeouts and
    /// transport errors become ERROR, bad statuses and unparseable replies
    /// become UNKNOWN; the elapsed latency is reported either way.
    async fn classify(&self, payload: &str) -> AdvisoryOutcome {
        let prompt = classification_prompt(payload);
        let start = Instant::now();
        let verdict = match self.post_prompt(&prompt, self.advisory_timeout).await {
            Ok(text) => parse_advisory_reply(&text),
            Err(OracleError::BadStatus(status)) => {
                tracing::warn!(status, "advisory oracle returned non-success status");
                AdvisoryVerdict::Unknown
            }
            Err(OracleError::EmptyReply) => AdvisoryVerdict::Unknown,
            Err(err) => {
                tracing::warn!(error = %err, "advisory oracle call failed");
                AdvisoryVerdict::Error
            }
        };
        AdvisoryOutcome {
            verdict,
            latency_ms: start.elapsed().as_millis().min(u64::MAX as u128) as u64,
        }
    }
}

impl FakeResponseGenerator for OllamaClient {
    async fn generate(&self, payload: &str) -> Result<String, OracleError> {
        let prompt = generation_prompt(payload);
        let text = self.post_prompt(&prompt, self.generation_timeout).await?;
        if text.is_empty() {
            return Err(OracleError::EmptyReply);
        }
        Ok(truncate_chars(&text, FAKE_RESPONSE_MAX_CHARS))
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
