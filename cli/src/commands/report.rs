use crate::util::api_request;

pub async fn run(api_url: &str, limit: Option<i64>) -> i32 {
    let query: Vec<(String, String)> = limit
        .map(|n| vec![("limit".to_string(), n.to_string())])
        .unwrap_or_default();

    api_request(api_url, reqwest::Method::GET, "/gateway/report", &query).await
}
