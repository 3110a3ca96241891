use luregate_core::oracle::FakeResponseGenerator;

use crate::store::GatewayStore;

/// Served when the generator fails; never persisted, so a transient oracle
/// outage cannot poison the cache.
pub const GENERATION_FALLBACK_TEXT: &str = "Service temporarily unavailable.";

/// Resolve the fake response for an attack signature.
///
/// Hit: the stored text, byte for byte — a repeated attack pattern must
/// always see an identical response. Miss: invoke the generator, then
/// create-if-absent; if a concurrent writer stored a record first, this
/// caller's text is discarded and the stored one is canonical. Store
/// failures degrade to serving the freshly generated text.
pub async fn resolve<S: GatewayStore, G: FakeResponseGenerator>(
    store: &S,
    generator: &G,
    signature: &str,
    attack_type: &str,
    payload: &str,
) -> String {
    match store.deception_lookup(signature).await {
        Ok(Some(text)) => return text,
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, signature, "deception lookup failed; regenerating");
        }
    }

    let generated = match generator.generate(payload).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, signature, "fake response generation failed");
            return GENERATION_FALLBACK_TEXT.to_string();
        }
    };

    match store.deception_store(signature, attack_type, &generated).await {
        Ok(canonical) => canonical,
        Err(err) => {
            tracing::warn!(error = %err, signature, "deception record store failed");
            generated
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use luregate_core::oracle::{FakeResponseGenerator, OracleError};

    use super::*;
    use crate::store::test_support::MemoryStore;

    /// Deterministic stand-in that yields a distinct text per invocation and
    /// counts how often it was asked.
    #[derive(Default)]
    struct SequenceGenerator {
        calls: AtomicUsize,
    }

    impl FakeResponseGenerator for SequenceGenerator {
        async fn generate(&self, _payload: &str) -> Result<String, OracleError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("fake-response-{n}"))
        }
    }

    struct FailingGenerator;

    impl FakeResponseGenerator for FailingGenerator {
        async fn generate(&self, _payload: &str) -> Result<String, OracleError> {
            Err(OracleError::Unreachable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn second_resolve_reuses_the_stored_record() {
        let store = MemoryStore::default();
        let generator = SequenceGenerator::default();

        let first = resolve(&store, &generator, "sig-a", "xss", "payload").await;
        let second = resolve(&store, &generator, "sig-a", "xss", "payload").await;

        assert_eq!(first, second);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_signatures_resolve_independently() {
        let store = MemoryStore::default();
        let generator = SequenceGenerator::default();

        let a = resolve(&store, &generator, "sig-a", "xss", "p1").await;
        let b = resolve(&store, &generator, "sig-b", "ssrf", "p2").await;

        assert_ne!(a, b);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_first_access_yields_one_canonical_answer() {
        let store = Arc::new(MemoryStore::default());
        let generator = Arc::new(SequenceGenerator::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let generator = generator.clone();
            handles.push(tokio::spawn(async move {
                resolve(&*store, &*generator, "sig-race", "sql_injection", "payload").await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        let first = &results[0];
        assert!(results.iter().all(|r| r == first));
    }

    #[tokio::test]
    async fn generator_failure_serves_fallback_without_caching() {
        let store = MemoryStore::default();

        let text = resolve(&store, &FailingGenerator, "sig-f", "xss", "payload").await;
        assert_eq!(text, GENERATION_FALLBACK_TEXT);
        assert!(store.deceptions.lock().unwrap().is_empty());

        // Once the oracle recovers, the next resolve generates and caches.
        let generator = SequenceGenerator::default();
        let recovered = resolve(&store, &generator, "sig-f", "xss", "payload").await;
        assert_eq!(recovered, "fake-response-0");
        assert_eq!(
            resolve(&store, &generator, "sig-f", "xss", "payload").await,
            recovered
        );
    }
}
