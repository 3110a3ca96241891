use sha2::{Digest, Sha256};

/// Deterministic attack signature: hex SHA-256 over path, the sorted query
/// pairs, and the attack-type label. Identical inputs always hash
/// identically; query pair order never affects the digest. This is the
/// deception cache key.
pub fn attack_signature(path: &str, query: &[(String, String)], attack_type: &str) -> String {
    let mut pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(b"|");
    hasher.update(pairs.join("&").as_bytes());
    hasher.update(b"|");
    hasher.update(attack_type.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn identical_inputs_hash_identically() {
        let q = pairs(&[("user", "admin' OR 1=1 --")]);
        assert_eq!(
            attack_signature("/login", &q, "sql_injection,credential_stuffing"),
            attack_signature("/login", &q, "sql_injection,credential_stuffing"),
        );
    }

    #[test]
    fn query_pair_order_does_not_change_the_signature() {
        let a = pairs(&[("a", "1"), ("b", "2")]);
        let b = pairs(&[("b", "2"), ("a", "1")]);
        assert_eq!(
            attack_signature("/search", &a, "xss"),
            attack_signature("/search", &b, "xss"),
        );
    }

    #[test]
    fn any_differing_input_changes_the_signature() {
        let q = pairs(&[("q", "<script>alert(1)</script>")]);
        let base = attack_signature("/search", &q, "xss");
        assert_ne!(base, attack_signature("/other", &q, "xss"));
        assert_ne!(base, attack_signature("/search", &q, "sql_injection"));
        let other_q = pairs(&[("q", "<script>alert(2)</script>")]);
        assert_ne!(base, attack_signature("/search", &other_q, "xss"));
    }

    #[test]
    fn signature_is_hex_sha256() {
        let sig = attack_signature("/", &[], "behavioral");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
