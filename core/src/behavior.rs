use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::rules::{ThreatCategory, match_categories};

pub const DEFAULT_WINDOW_SECS: i64 = 60;

const BURST_THRESHOLD: usize = 10;
const FLOOD_THRESHOLD: usize = 25;
const BURST_CONTRIBUTION: u32 = 2;
const FLOOD_CONTRIBUTION: u32 = 4;
const LOGIN_PATH_CONTRIBUTION: u32 = 3;
const PAYLOAD_HIT_CONTRIBUTION: u32 = 50;

const LOGIN_PATH_KEYWORDS: [&str; 3] = ["login", "signin", "auth"];

/// Per-request behavioral contribution and the tags that produced it.
#[derive(Debug, Clone)]
pub struct BehaviorAssessment {
    pub contribution: u32,
    pub tags: Vec<String>,
    pub recent_requests: usize,
    pub login_attempt: bool,
}

/// Per-client sliding-window request counter plus path heuristics.
///
/// Timestamps live in a sharded map keyed by client identity: append, prune,
/// and count for one client are serialized by the shard entry lock, and
/// clients on different keys never contend. The window is trimmed lazily on
/// read. Counting is in-memory and cannot become unavailable; a store-backed
/// replacement must fail open (treat the count as 0) rather than fail the
/// request.
pub struct ActivityTracker {
    windows: DashMap<String, Vec<DateTime<Utc>>>,
    window: Duration,
}

impl ActivityTracker {
    pub fn new(window_secs: i64) -> Self {
        Self {
            windows: DashMap::new(),
            window: Duration::seconds(window_secs),
        }
    }

    pub fn assess(&self, client_id: &str, path: &str, body: &str) -> BehaviorAssessment {
        self.assess_at(Utc::now(), client_id, path, body)
    }

    /// Record `now` for the client, drop entries older than the window, and
    /// score the remainder. Split out with an explicit timestamp for tests.
    pub fn assess_at(
        &self,
        now: DateTime<Utc>,
        client_id: &str,
        path: &str,
        body: &str,
    ) -> BehaviorAssessment {
        let recent_requests = {
            let mut entry = self.windows.entry(client_id.to_string()).or_default();
            let cutoff = now - self.window;
            entry.retain(|t| *t >= cutoff);
            entry.push(now);
            entry.len()
        };

        let mut contribution = 0;
        let mut tags = Vec::new();

        if recent_requests > BURST_THRESHOLD {
            contribution += BURST_CONTRIBUTION;
            tags.push("burst_window".to_string());
        }
        if recent_requests > FLOOD_THRESHOLD {
            contribution += FLOOD_CONTRIBUTION;
            tags.push("flood_window".to_string());
        }

        let lowered = path.to_ascii_lowercase();
        let login_attempt = LOGIN_PATH_KEYWORDS.iter().any(|k| lowered.contains(k));
        if login_attempt {
            contribution += LOGIN_PATH_CONTRIBUTION;
            tags.push("login_path".to_string());
        }

        // Independent re-scan of path and body: any rule hit is a strong
        // signal on its own, regardless of what the main scan concluded.
        let mut categories: Vec<ThreatCategory> = match_categories(path);
        for category in match_categories(body) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        if !categories.is_empty() {
            contribution += PAYLOAD_HIT_CONTRIBUTION;
            tags.extend(categories.iter().map(|c| c.label().to_string()));
        }

        BehaviorAssessment {
            contribution,
            tags,
            recent_requests,
            login_attempt,
        }
    }

    /// Number of clients currently tracked. Exposed for the report surface.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}
