use luregate_core::behavior::ActivityTracker;
use luregate_core::oracle::{AdvisoryClassifier, AdvisoryOutcome, FakeResponseGenerator};
use luregate_core::policy::{Decision, decide};
use luregate_core::request::RequestContext;
use luregate_core::rules::{joined_labels, scan};
use luregate_core::scoring::{RuleVerdict, base_risk};
use luregate_core::signature::attack_signature;

use crate::deception;
use crate::store::{BODY_LOG_MAX_CHARS, GatewayStore, RequestLogRecord};

/// Fixed risk score logged for bait-route hits; chosen well past the
/// throttle threshold so report queries sort them to the top.
pub const BAIT_SCORE: u32 = 90;

/// Pre-response delay applied to THROTTLE decisions. Throttled attackers
/// still receive the cached deceptive body, just slower.
pub const THROTTLE_DELAY_MS: u64 = 400;

const BAIT_MATCH_LABEL: &str = "bait_route";
const BEHAVIORAL_ATTACK_LABEL: &str = "behavioral";

/// Content type served with generated deception bodies.
const DECEPTION_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Trap path keywords with the content type and canned reply each serves.
/// These paths exist only to be probed: any hit bypasses analysis entirely
/// and is answered from here. The content type must match what the faked
/// artifact would really carry, or the trap fingerprints itself.
const BAIT_ROUTES: &[(&str, &str, &str)] = &[
    (
        "api/admin",
        "application/json",
        "{\"users\":[{\"id\":1,\"name\":\"jsmith\",\"role\":\"admin\"},{\"id\":2,\"name\":\"dbarnes\",\"role\":\"ops\"}],\"page\":1,\"total\":2}",
    ),
    (
        "phpmyadmin",
        "text/html; charset=utf-8",
        "<!DOCTYPE html><html><head><title>phpMyAdmin 4.8.1</title></head><body><div class=\"error\">Session expired. Please log in again.</div></body></html>",
    ),
    (
        ".env",
        "text/plain; charset=utf-8",
        "APP_ENV=production\nAPP_DEBUG=false\nDB_HOST=10.0.4.21\nDB_USERNAME=svc_app\nDB_PASSWORD=W1nter2019!\nCACHE_DRIVER=redis\n",
    ),
    (
        "wp-login",
        "text/html; charset=utf-8",
        "<!DOCTYPE html><html><head><title>Log In</title></head><body><form><p>ERROR: The password you entered is incorrect.</p></form></body></html>",
    ),
    (
        ".git/",
        "text/plain; charset=utf-8",
        "ref: refs/heads/master\n",
    ),
];

/// Everything the pipeline concluded about one request, plus the response
/// material when the decision is deceptive.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub decision: Decision,
    pub rule_verdict: RuleVerdict,
    pub rule_matches: String,
    pub advisory: AdvisoryOutcome,
    pub risk_score: u32,
    /// `Some` means answer locally with this body; `None` means forward.
    pub deception_body: Option<String>,
    /// Content type to serve with `deception_body`.
    pub deception_content_type: &'static str,
    pub throttle_delay_ms: u64,
}

/// Sequences detection, scoring, and deception for every proxied request.
/// Stateless apart from the shared activity tracker; cheap to share behind
/// an `Arc`. Generic over the store and both oracles so tests can substitute
/// deterministic doubles.
pub struct PipelineEngine<S, C, G> {
    store: S,
    classifier: C,
    generator: G,
    tracker: ActivityTracker,
    trusted_prefixes: Vec<String>,
}

impl<S, C, G> PipelineEngine<S, C, G>
where
    S: GatewayStore,
    C: AdvisoryClassifier,
    G: FakeResponseGenerator,
{
    pub fn new(
        store: S,
        classifier: C,
        generator: G,
        tracker: ActivityTracker,
        trusted_prefixes: Vec<String>,
    ) -> Self {
        Self {
            store,
            classifier,
            generator,
            tracker,
            trusted_prefixes,
        }
    }

    /// Run the full decision sequence for one request. Oracle and storage
    /// faults degrade internally; this never fails.
    pub async fn evaluate(&self, ctx: &RequestContext) -> PipelineOutcome {
        // 1. Bait routes bypass all analysis.
        if let Some((keyword, content_type, canned)) = BAIT_ROUTES
            .iter()
            .find(|(keyword, _, _)| ctx.path.contains(keyword))
        {
            tracing::info!(path = %ctx.path, keyword, "bait route hit");
            let outcome = PipelineOutcome {
                decision: Decision::Deceive,
                rule_verdict: RuleVerdict::Malicious,
                rule_matches: BAIT_MATCH_LABEL.to_string(),
                advisory: AdvisoryOutcome::not_run(),
                risk_score: BAIT_SCORE,
                deception_body: Some((*canned).to_string()),
                deception_content_type: content_type,
                throttle_delay_ms: 0,
            };
            self.store.record_request(self.make_record(ctx, &outcome, false));
            return outcome;
        }

        // 2. Trusted prefixes skip detection and always forward.
        if self
            .trusted_prefixes
            .iter()
            .any(|prefix| ctx.path.starts_with(prefix.as_str()))
        {
            let outcome = PipelineOutcome {
                decision: Decision::Allow,
                rule_verdict: RuleVerdict::Safe,
                rule_matches: String::new(),
                advisory: AdvisoryOutcome::not_run(),
                risk_score: 0,
                deception_body: None,
                deception_content_type: DECEPTION_CONTENT_TYPE,
                throttle_delay_ms: 0,
            };
            self.store.record_request(self.make_record(ctx, &outcome, false));
            return outcome;
        }

        // 3. Detection layers.
        let query_text = ctx.query_text();
        let signals = scan(&ctx.scan_input(&query_text));
        let rule_verdict = RuleVerdict::from_signal_count(signals.len());

        // The advisory oracle is expensive; only the ambiguous single-signal
        // case justifies the round trip.
        let advisory = if rule_verdict == RuleVerdict::Suspicious {
            self.classifier.classify(&ctx.analysis_payload()).await
        } else {
            AdvisoryOutcome::not_run()
        };

        let behavior = self
            .tracker
            .assess(&ctx.client_addr, &ctx.path, &ctx.body);
        let risk_score =
            base_risk(rule_verdict, signals.len(), advisory.verdict) + behavior.contribution;
        let decision = decide(risk_score);

        // 4. Deceptive decisions resolve the cache; everything else forwards.
        let (deception_body, throttle_delay_ms) = if decision.is_deceptive() {
            let attack_type = if !signals.is_empty() {
                joined_labels(&signals)
            } else if !behavior.tags.is_empty() {
                behavior.tags.join(",")
            } else {
                BEHAVIORAL_ATTACK_LABEL.to_string()
            };
            let signature = attack_signature(&ctx.path, &ctx.query, &attack_type);
            let body = deception::resolve(
                &self.store,
                &self.generator,
                &signature,
                &attack_type,
                &ctx.analysis_payload(),
            )
            .await;
            let delay = if decision == Decision::Throttle {
                THROTTLE_DELAY_MS
            } else {
                0
            };
            (Some(body), delay)
        } else {
            (None, 0)
        };

        let outcome = PipelineOutcome {
            decision,
            rule_verdict,
            rule_matches: joined_labels(&signals),
            advisory,
            risk_score,
            deception_body,
            deception_content_type: DECEPTION_CONTENT_TYPE,
            throttle_delay_ms,
        };
        self.store
            .record_request(self.make_record(ctx, &outcome, behavior.login_attempt));
        outcome
    }

    fn make_record(
        &self,
        ctx: &RequestContext,
        outcome: &PipelineOutcome,
        login_attempt: bool,
    ) -> RequestLogRecord {
        RequestLogRecord {
            client_addr: ctx.client_addr.clone(),
            method: ctx.method.clone(),
            path: ctx.path.clone(),
            query_params: ctx.query_text(),
            user_agent: ctx.user_agent.clone(),
            body: ctx.body.chars().take(BODY_LOG_MAX_CHARS).collect(),
            rule_verdict: outcome.rule_verdict.as_str(),
            rule_matches: outcome.rule_matches.clone(),
            advisory_verdict: outcome.advisory.verdict.as_str(),
            advisory_latency_ms: outcome.advisory.latency_ms.min(i32::MAX as u64) as i32,
            risk_score: outcome.risk_score.min(i32::MAX as u32) as i32,
            decision: outcome.decision.as_str(),
            deception_response: outcome.deception_body.clone(),
            login_attempt,
        }
    }
}
