use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;

/// Bumped whenever a matcher is added, removed, or reordered. Logged records
/// produced under different table versions are not directly comparable.
pub const RULE_TABLE_VERSION: &str = "2025.08.2";

/// Threat categories recognized by the rule table. Labels are stable
/// snake_case strings used in log records and attack signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    SqlInjection,
    Xss,
    DirectoryTraversal,
    CommandInjection,
    Ssrf,
    FileInclusion,
    Xxe,
    WebShell,
    Spoofing,
    CredentialStuffing,
    ParameterPollution,
    ScannerAgent,
}

impl ThreatCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::SqlInjection => "sql_injection",
            Self::Xss => "xss",
            Self::DirectoryTraversal => "directory_traversal",
            Self::CommandInjection => "command_injection",
            Self::Ssrf => "ssrf",
            Self::FileInclusion => "file_inclusion",
            Self::Xxe => "xxe",
            Self::WebShell => "web_shell",
            Self::Spoofing => "spoofing",
            Self::CredentialStuffing => "credential_stuffing",
            Self::ParameterPollution => "parameter_pollution",
            Self::ScannerAgent => "scanner_agent",
        }
    }
}

/// Which part of the request a matcher fired on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Path,
    Query,
    Body,
    Header,
}

/// One detection: a category plus the first request section it fired on.
/// De-duplicated per category within a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreatSignal {
    pub category: ThreatCategory,
    pub source: SignalSource,
}

struct CategoryRule {
    category: ThreatCategory,
    patterns: Vec<Regex>,
}

/// Scanner/tool fingerprints checked against the user-agent string
/// (lowercase substring match).
const SCANNER_FINGERPRINTS: [&str; 10] = [
    "sqlmap",
    "nikto",
    "nmap",
    "dirbuster",
    "gobuster",
    "acunetix",
    "burp",
    "hydra",
    "masscan",
    "wpscan",
];

/// The canonical rule table: category -> ordered matcher list. Built once and
/// shared read-only across all requests. Matchers within a category are
/// ordered from most to least common; scanning a category stops at its first
/// hit per section.
static RULE_TABLE: LazyLock<Vec<CategoryRule>> = LazyLock::new(|| {
    fn rule(category: ThreatCategory, patterns: &[&str]) -> CategoryRule {
        CategoryRule {
            category,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("rule table pattern must compile"))
                .collect(),
        }
    }

    vec![
        rule(
            ThreatCategory::SqlInjection,
            &[
                r"(?i)union\s+(all\s+)?select",
                r"(?i)or\s+1\s*=\s*1",
                r"(?i)drop\s+table|insert\s+into|delete\s+from",
                r"(?i)waitfor\s+delay|sleep\s*\(",
                r"--|#|/\*",
            ],
        ),
        rule(
            ThreatCategory::Xss,
            &[
                r"(?i)<script|javascript:",
                r"(?i)onerror\s*=|onload\s*=",
                r"(?i)alert\s*\(|prompt\s*\(|document\.cookie",
                r"(?i)<img\s+src=x",
            ],
        ),
        rule(
            ThreatCategory::DirectoryTraversal,
            &[
                r"\.\./|\.\.\\",
                r"(?i)etc/passwd|windows/win\.ini",
                r"(?i)%2e%2e%2f",
            ],
        ),
        rule(
            ThreatCategory::CommandInjection,
            &[
                r"(?i)(;|\||&)\s*(ping|cat|ls|whoami|id|uname|net\s+user)\b",
                r"\$\([^)]*\)|`[^`]*`",
            ],
        ),
        rule(
            ThreatCategory::Ssrf,
            &[
                r"(?i)localhost|127\.0\.0\.1|0\.0\.0\.0",
                r"169\.254\.169\.254",
                r"(?i)file:///",
            ],
        ),
        rule(
            ThreatCategory::FileInclusion,
            &[
                r"(?i)include\s*\(|require\s*\(|php://input",
                r"(?i)\.php\?|\.jsp\?",
            ],
        ),
        rule(
            ThreatCategory::Xxe,
            &[r#"(?i)<!entity|system\s+"file:"#, r"(?i)<!doctype[^>]*\["],
        ),
        rule(
            ThreatCategory::WebShell,
            &[
                r"(?i)cmd\.php|shell\.jsp|c99\.php|r57\.php",
                r"(?i)eval\s*\(|exec\s*\(|passthru\s*\(",
            ],
        ),
        rule(
            ThreatCategory::Spoofing,
            &[r"(?i)host:\s*(google|paypal|microsoft)\.com"],
        ),
        rule(
            ThreatCategory::CredentialStuffing,
            &[r"(?i)\b(admin|root|administrator)\b"],
        ),
    ]
});

/// Raw request sections handed to the scanner. Query is the raw query string
/// (`k=v&k2=v2`), body is lossy UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanInput<'a> {
    pub path: &'a str,
    pub query: &'a str,
    pub body: &'a str,
    pub user_agent: &'a str,
}

/// Percent-decode a section before matching. Query strings additionally map
/// `+` to space (form encoding).
fn decode_section(raw: &str, source: SignalSource) -> String {
    let text = if source == SignalSource::Query {
        raw.replace('+', " ")
    } else {
        raw.to_string()
    };
    percent_decode_str(&text).decode_utf8_lossy().into_owned()
}

/// Scan all request sections against every category independently. No
/// cross-category short-circuit: each category is always evaluated. Output is
/// de-duplicated per category; the first section that matched wins as the
/// signal source. Pure, no side effects.
pub fn scan(input: &ScanInput<'_>) -> Vec<ThreatSignal> {
    let sections = [
        (SignalSource::Path, input.path),
        (SignalSource::Query, input.query),
        (SignalSource::Body, input.body),
    ];
    let decoded: Vec<(SignalSource, String)> = sections
        .iter()
        .filter(|(_, raw)| !raw.is_empty())
        .map(|(source, raw)| (*source, decode_section(raw, *source)))
        .collect();

    let mut signals = Vec::new();
    for rule in RULE_TABLE.iter() {
        for (source, text) in &decoded {
            if rule.patterns.iter().any(|p| p.is_match(text)) {
                signals.push(ThreatSignal {
                    category: rule.category,
                    source: *source,
                });
                break;
            }
        }
    }

    if has_duplicate_keys(input.query) {
        signals.push(ThreatSignal {
            category: ThreatCategory::ParameterPollution,
            source: SignalSource::Query,
        });
    }

    if !input.user_agent.is_empty() {
        let ua = input.user_agent.to_ascii_lowercase();
        if SCANNER_FINGERPRINTS.iter().any(|f| ua.contains(f)) {
            signals.push(ThreatSignal {
                category: ThreatCategory::ScannerAgent,
                source: SignalSource::Header,
            });
        }
    }

    signals
}

/// Duplicate query keys (`id=1&id=2`) are flagged structurally from the key
/// list rather than by pattern: frameworks disagree on which duplicate wins,
/// and that disagreement is what pollution attacks exploit.
fn has_duplicate_keys(query: &str) -> bool {
    let mut seen: Vec<String> = Vec::new();
    for segment in query.split('&').filter(|s| !s.is_empty()) {
        let raw_key = segment.split('=').next().unwrap_or(segment);
        let key = percent_decode_str(raw_key)
            .decode_utf8_lossy()
            .to_ascii_lowercase();
        if seen.contains(&key) {
            return true;
        }
        seen.push(key);
    }
    false
}

/// Run only the content matchers over a single piece of text. Used by the
/// behavioral tracker's payload re-scan.
pub fn match_categories(text: &str) -> Vec<ThreatCategory> {
    if text.is_empty() {
        return Vec::new();
    }
    let decoded = percent_decode_str(text).decode_utf8_lossy();
    RULE_TABLE
        .iter()
        .filter(|rule| rule.patterns.iter().any(|p| p.is_match(&decoded)))
        .map(|rule| rule.category)
        .collect()
}

/// Comma-joined labels for a signal set, in rule-table order.
pub fn joined_labels(signals: &[ThreatSignal]) -> String {
    signals
        .iter()
        .map(|s| s.category.label())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(signals: &[ThreatSignal]) -> Vec<ThreatCategory> {
        signals.iter().map(|s| s.category).collect()
    }

    #[test]
    fn clean_request_produces_no_signals() {
        let input = ScanInput {
            path: "/products",
            query: "page=2&sort=price",
            body: "",
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)",
        };
        assert!(scan(&input).is_empty());
    }

    #[test]
    fn xss_in_query_matches_exactly_one_category() {
        let input = ScanInput {
            query: "q=<script>alert(1)</script>",
            ..Default::default()
        };
        let signals = scan(&input);
        assert_eq!(categories(&signals), vec![ThreatCategory::Xss]);
        assert_eq!(signals[0].source, SignalSource::Query);
    }

    #[test]
    fn classic_sqli_login_payload_matches_two_categories() {
        let input = ScanInput {
            path: "/login",
            query: "user=admin' OR 1=1 --",
            ..Default::default()
        };
        let signals = scan(&input);
        let cats = categories(&signals);
        assert!(cats.contains(&ThreatCategory::SqlInjection));
        assert!(cats.contains(&ThreatCategory::CredentialStuffing));
        assert!(cats.len() >= 2);
    }

    #[test]
    fn url_encoded_payload_is_decoded_before_matching() {
        let input = ScanInput {
            query: "user=admin%27%20OR%201%3D1",
            ..Default::default()
        };
        let cats = categories(&scan(&input));
        assert!(cats.contains(&ThreatCategory::SqlInjection));
    }

    #[test]
    fn plus_encoded_spaces_in_query_are_normalized() {
        let input = ScanInput {
            query: "user=admin'+OR+1=1",
            ..Default::default()
        };
        let cats = categories(&scan(&input));
        assert!(cats.contains(&ThreatCategory::SqlInjection));
    }

    #[test]
    fn duplicated_query_keys_are_flagged_as_parameter_pollution() {
        let input = ScanInput {
            query: "id=1&id=2",
            ..Default::default()
        };
        let signals = scan(&input);
        assert_eq!(
            categories(&signals),
            vec![ThreatCategory::ParameterPollution]
        );
        assert_eq!(signals[0].source, SignalSource::Query);
    }

    #[test]
    fn encoded_duplicate_keys_are_still_duplicates() {
        // `%69d` decodes to `id`; the key comparison happens post-decode.
        let input = ScanInput {
            query: "id=1&%69d=2",
            ..Default::default()
        };
        let cats = categories(&scan(&input));
        assert!(cats.contains(&ThreatCategory::ParameterPollution));
    }

    #[test]
    fn distinct_query_keys_are_not_pollution() {
        let input = ScanInput {
            query: "id=1&page=2&sort=price",
            ..Default::default()
        };
        assert!(scan(&input).is_empty());
    }

    #[test]
    fn duplicate_category_hits_are_deduplicated() {
        // Two traversal patterns in one section still yield one signal.
        let input = ScanInput {
            path: "/files/../../etc/passwd",
            ..Default::default()
        };
        let signals = scan(&input);
        let traversal: Vec<_> = signals
            .iter()
            .filter(|s| s.category == ThreatCategory::DirectoryTraversal)
            .collect();
        assert_eq!(traversal.len(), 1);
        assert_eq!(traversal[0].source, SignalSource::Path);
    }

    #[test]
    fn scanner_user_agent_is_flagged_from_header() {
        let input = ScanInput {
            path: "/",
            user_agent: "sqlmap/1.7.2#stable (https://sqlmap.org)",
            ..Default::default()
        };
        let signals = scan(&input);
        assert!(signals.contains(&ThreatSignal {
            category: ThreatCategory::ScannerAgent,
            source: SignalSource::Header,
        }));
    }

    #[test]
    fn ssrf_metadata_probe_is_detected() {
        let input = ScanInput {
            query: "url=http://169.254.169.254/latest/meta-data/",
            ..Default::default()
        };
        let cats = categories(&scan(&input));
        assert!(cats.contains(&ThreatCategory::Ssrf));
    }

    #[test]
    fn match_categories_covers_command_substitution() {
        let cats = match_categories("name=$(cat /etc/passwd)");
        assert!(cats.contains(&ThreatCategory::CommandInjection));
        assert!(cats.contains(&ThreatCategory::DirectoryTraversal));
    }

    #[test]
    fn joined_labels_are_comma_separated_in_table_order() {
        let input = ScanInput {
            query: "q=<script>alert(1)</script>&user=admin",
            ..Default::default()
        };
        let signals = scan(&input);
        let joined = joined_labels(&signals);
        assert_eq!(joined, "xss,credential_stuffing");
    }
}
