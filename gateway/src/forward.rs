use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Response, StatusCode, header};

use luregate_core::request::RequestContext;

use crate::config::GatewayConfig;

const GATEWAY_ERROR_BODY: &str = "Bad Gateway";

/// Reissue a verdict-cleared request against the origin and relay the
/// answer. Hop-by-hop headers (Host, Content-Length) are stripped; reqwest
/// recomputes them for the outbound call. Connection failure or timeout
/// yields a fixed 502 body and is never retried.
pub async fn forward_to_origin(
    http: &reqwest::Client,
    config: &GatewayConfig,
    ctx: &RequestContext,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let target = match config
        .backend_base_url
        .join(ctx.path.trim_start_matches('/'))
    {
        Ok(mut url) => {
            if let Some(query) = encoded_query(&ctx.query) {
                url.set_query(Some(&query));
            }
            url
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %ctx.path, "origin URL construction failed");
            return gateway_error_response();
        }
    };

    let method = match reqwest::Method::from_bytes(ctx.method.as_bytes()) {
        Ok(method) => method,
        Err(_) => return gateway_error_response(),
    };

    let result = http
        .request(method, target)
        .headers(strip_hop_headers(headers))
        .body(body)
        .timeout(config.origin_timeout)
        .send()
        .await;

    match result {
        Ok(origin) => {
            let status = origin.status();
            let content_type = origin.headers().get(header::CONTENT_TYPE).cloned();
            let bytes = origin.bytes().await.unwrap_or_default();

            let mut builder = Response::builder().status(status);
            if let Some(ct) = content_type {
                builder = builder.header(header::CONTENT_TYPE, ct);
            }
            builder
                .body(Body::from(bytes))
                .expect("origin relay response should build")
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %ctx.path, "origin request failed");
            gateway_error_response()
        }
    }
}

fn gateway_error_response() -> Response<Body> {
    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(GATEWAY_ERROR_BODY))
        .expect("gateway error response should build")
}

/// Percent-encode the parsed query pairs for the outbound URL. The inbound
/// raw string was decoded once at the boundary; a value holding `&`, `=`, or
/// `+` must not change the parameter structure the origin parses.
fn encoded_query(pairs: &[(String, String)]) -> Option<String> {
    if pairs.is_empty() {
        return None;
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    Some(serializer.finish())
}

/// Clone the inbound headers minus the ones the origin must derive itself.
fn strip_hop_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    out.remove(header::HOST);
    out.remove(header::CONTENT_LENGTH);
    out
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn reserved_characters_in_values_survive_the_round_trip() {
        let pairs = vec![("q".to_string(), "a&b=c".to_string())];

        let encoded = encoded_query(&pairs).expect("non-empty query expected");
        assert_eq!(encoded, "q=a%26b%3Dc");

        // What the origin parses must be the pairs the gateway parsed.
        let reparsed: Vec<(String, String)> = url::form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(reparsed, pairs);
    }

    #[test]
    fn plus_and_space_in_values_stay_distinct() {
        let pairs = vec![("note".to_string(), "1+1 = 2".to_string())];

        let encoded = encoded_query(&pairs).expect("non-empty query expected");
        let reparsed: Vec<(String, String)> = url::form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(reparsed, pairs);
    }

    #[test]
    fn empty_query_is_omitted_entirely() {
        assert_eq!(encoded_query(&[]), None);
    }

    #[test]
    fn host_and_content_length_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.internal"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let out = strip_hop_headers(&headers);
        assert!(out.get(header::HOST).is_none());
        assert!(out.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(
            out.get(header::USER_AGENT),
            Some(&HeaderValue::from_static("Mozilla/5.0"))
        );
        assert_eq!(
            out.get(header::ACCEPT),
            Some(&HeaderValue::from_static("application/json"))
        );
    }
}
