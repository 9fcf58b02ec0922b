use async_trait::async_trait;
use tracing::info;

use ticketwatch_core::{NotifyError, PushPort};

/// Push port that only logs what would have been sent.
#[derive(Debug, Default)]
pub(crate) struct LogPush;

#[async_trait]
impl PushPort for LogPush {
    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        info!(title, body, "dry run, notification not sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_push_always_succeeds() {
        let result = LogPush.send("title", "body").await;
        assert!(result.is_ok(), "dry run push must never fail");
    }
}
