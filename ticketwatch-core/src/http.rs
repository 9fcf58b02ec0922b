//! HTTP client construction and the JSON round trip shared by source adapters.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ports::FetchError;

#[derive(Debug, Clone)]
/// Settings applied to every outgoing request.
pub struct HttpSettings {
    /// Upper bound for a whole request, connect to last byte.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: format!("ticketwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Build a client that never waits longer than the configured timeout.
///
/// # Errors
///
/// Returns the underlying [`reqwest::Error`] when the TLS backend cannot be initialized.
pub fn build_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .build()
}

/// POST `body` as JSON and decode the JSON response.
///
/// Non-success statuses keep the upstream body so the log line shows what the API said.
///
/// # Errors
///
/// Returns [`FetchError::Network`] for transport and decode failures and
/// [`FetchError::Status`] for non-2xx answers.
pub async fn post_json<B, T>(client: &Client, url: &str, body: &B) -> Result<T, FetchError>
where
    B: Serialize + ?Sized + Sync,
    T: DeserializeOwned,
{
    let response = client.post(url).json(body).send().await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    response.json().await.map_err(FetchError::from)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::testing::serve_once;

    #[derive(Debug, Deserialize)]
    struct Echo {
        ok: bool,
    }

    fn client() -> Client {
        build_client(&HttpSettings::default()).expect("client builds")
    }

    #[tokio::test]
    async fn test_success_decodes_body_and_sends_json() {
        let (url, request) = serve_once(200, r#"{"ok": true}"#).await;

        let echo: Echo = post_json(&client(), &url, &serde_json::json!({"date": "2025-03-27"}))
            .await
            .expect("decoded answer");

        assert!(echo.ok);
        let request = request.await.expect("server task");
        assert!(request.starts_with("POST / HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("user-agent: ticketwatch/"));
        assert!(request.ends_with(r#"{"date":"2025-03-27"}"#));
    }

    #[tokio::test]
    async fn test_error_status_keeps_upstream_body() {
        let (url, _request) = serve_once(503, "upstream down").await;

        let result = post_json::<_, Echo>(&client(), &url, &serde_json::json!({})).await;

        match result {
            Err(FetchError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_decode_error() {
        let (url, _request) = serve_once(200, "{not json").await;

        let result = post_json::<_, Echo>(&client(), &url, &serde_json::json!({})).await;

        assert!(matches!(result, Err(FetchError::Network(err)) if err.is_decode()));
    }
}
