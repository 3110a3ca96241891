use chrono::{DateTime, Utc};

use crate::rules::ScanInput;

/// Everything the pipeline needs to know about one inbound request. Built
/// once at the transport boundary, immutable, owned by that request's run.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client_addr: String,
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub user_agent: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    /// Raw-ish query string rebuilt from the parsed pairs, used for scanning
    /// and logging.
    pub fn query_text(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// The flat text handed to the model oracles: path, query, and body.
    pub fn analysis_payload(&self) -> String {
        format!("{} {} {}", self.path, self.query_text(), self.body)
    }

    pub fn scan_input<'a>(&'a self, query_text: &'a str) -> ScanInput<'a> {
        ScanInput {
            path: &self.path,
            query: query_text,
            body: &self.body,
            user_agent: &self.user_agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        RequestContext {
            client_addr: "10.1.2.3".to_string(),
            method: "GET".to_string(),
            path: "/search".to_string(),
            query: vec![
                ("q".to_string(), "widgets".to_string()),
                ("page".to_string(), "2".to_string()),
            ],
            user_agent: "Mozilla/5.0".to_string(),
            body: String::new(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn query_text_preserves_pair_order() {
        assert_eq!(context().query_text(), "q=widgets&page=2");
    }

    #[test]
    fn analysis_payload_joins_path_query_and_body() {
        let mut ctx = context();
        ctx.body = "note=hello".to_string();
        assert_eq!(ctx.analysis_payload(), "/search q=widgets&page=2 note=hello");
    }
}
