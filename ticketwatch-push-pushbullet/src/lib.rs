//! Push transport delivering notes through the Pushbullet v2 API.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use ticketwatch_core::ports::{NotifyError, PushPort};

const PUSHES_URL: &str = "https://api.pushbullet.com/v2/pushes";
const TOKEN_HEADER: &str = "Access-Token";

/// Body of POST /v2/pushes
#[derive(Debug, Serialize)]
struct NoteRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    body: &'a str,
}

/// Sends every notification as a Pushbullet note to all of the account's devices.
pub struct PushbulletPort {
    client: Client,
    token: String,
    url: String,
}

impl PushbulletPort {
    /// Create a port authenticating with the given access token.
    #[must_use]
    pub fn new<T: Into<String>>(client: Client, token: T) -> Self {
        Self {
            client,
            token: token.into(),
            url: PUSHES_URL.to_owned(),
        }
    }

    /// Point the port at a different pushes endpoint.
    #[must_use]
    pub fn with_url<U: Into<String>>(mut self, url: U) -> Self {
        self.url = url.into();
        self
    }
}

impl fmt::Debug for PushbulletPort {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PushbulletPort")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PushPort for PushbulletPort {
    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let note = NoteRequest {
            kind: "note",
            title,
            body,
        };

        let response = self
            .client
            .post(&self.url)
            .header(TOKEN_HEADER, &self.token)
            .json(&note)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use ticketwatch_core::testing::serve_once;

    use super::*;

    #[test]
    fn test_note_body_shape() {
        let note = NoteRequest {
            kind: "note",
            title: "\u{1f68c} Onward Bus Availability - BDTickets",
            body: "Available Buses: 1",
        };

        assert_eq!(
            serde_json::to_value(&note).expect("serializable note"),
            serde_json::json!({
                "type": "note",
                "title": "\u{1f68c} Onward Bus Availability - BDTickets",
                "body": "Available Buses: 1"
            })
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let port = PushbulletPort::new(Client::new(), "o.secret-token");
        let rendered = format!("{port:?}");
        assert!(!rendered.contains("o.secret-token"));
        assert!(rendered.contains("redacted"));
    }

    #[tokio::test]
    async fn test_note_is_sent_with_token_header() {
        let (url, request) = serve_once(200, r#"{"active": true, "type": "note"}"#).await;
        let port = PushbulletPort::new(Client::new(), "o.secret-token").with_url(url);

        port.send("title", "body").await.expect("accepted push");

        let request = request.await.expect("server task").to_ascii_lowercase();
        assert!(request.contains("access-token: o.secret-token"));
        assert!(request.contains(r#""type":"note""#));
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected() {
        let (url, _request) = serve_once(401, r#"{"error": {"code": "invalid_access_token"}}"#).await;
        let port = PushbulletPort::new(Client::new(), "o.expired").with_url(url);

        match port.send("title", "body").await {
            Err(NotifyError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid_access_token"));
            }
            other => panic!("expected a rejection, got {other:?}"),
        }
    }
}
