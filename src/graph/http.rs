//! Shared HTTP client and Graph error mapping.

use std::sync::OnceLock;

use reqwest::header::HeaderMap;

use crate::error::DocAgentError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> reqwest::Client {
    SHARED_CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .pool_max_idle_per_host(10)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new())
        })
        .clone()
}

/// Percent-encode the characters that would otherwise end a URL path.
pub fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            ' ' => out.push_str("%20"),
            other => out.push(other),
        }
    }
    out
}

/// Map a non-success Graph response into an error.
pub fn status_to_error(status: u16, headers: &HeaderMap, body: &str) -> DocAgentError {
    let request_id = headers
        .get("request-id")
        .or_else(|| headers.get("client-request-id"))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    match status {
        429 | 503 if headers.contains_key(reqwest::header::RETRY_AFTER) => {
            DocAgentError::RateLimited {
                retry_after_ms: headers
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| secs.saturating_mul(1000)),
            }
        }
        429 => DocAgentError::RateLimited {
            retry_after_ms: None,
        },
        _ => DocAgentError::Api {
            status,
            message: extract_message(body),
            request_id,
        },
    }
}

/// Graph errors look like `{"error": {"code": "...", "message": "..."}}`.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let err = v.get("error")?;
            let code = err.get("code").and_then(|c| c.as_str()).unwrap_or("error");
            let message = err.get("message").and_then(|m| m.as_str()).unwrap_or("");
            Some(format!("{code}: {message}"))
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn encode_path_escapes_reserved_characters() {
        assert_eq!(encode_path("/My Docs/a#1?.txt"), "/My%20Docs/a%231%3F.txt");
        assert_eq!(encode_path("100%"), "100%25");
    }

    #[test]
    fn graph_error_body_is_summarized() {
        let mut headers = HeaderMap::new();
        headers.insert("request-id", HeaderValue::from_static("req-1"));
        let err = status_to_error(
            404,
            &headers,
            r#"{"error":{"code":"itemNotFound","message":"The resource could not be found."}}"#,
        );
        match err {
            DocAgentError::Api {
                status,
                message,
                request_id,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "itemNotFound: The resource could not be found.");
                assert_eq!(request_id.as_deref(), Some("req-1"));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn throttling_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, HeaderValue::from_static("7"));
        let err = status_to_error(429, &headers, "");
        assert!(matches!(
            err,
            DocAgentError::RateLimited {
                retry_after_ms: Some(7000)
            }
        ));
    }

    #[test]
    fn huge_retry_after_saturates() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::RETRY_AFTER,
            HeaderValue::from_static("18446744073709551615"),
        );
        let err = status_to_error(503, &headers, "");
        assert!(matches!(
            err,
            DocAgentError::RateLimited {
                retry_after_ms: Some(u64::MAX)
            }
        ));
    }
}
