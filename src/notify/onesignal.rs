use reqwest::Client;
use serde::Serialize;

use super::PushSender;
use crate::error::{Error, Result};

const DEFAULT_ENDPOINT: &str = "https://onesignal.com/api/v1/notifications";

/// OneSignal REST client. One call pushes a message to a batch of
/// player ids; non-2xx responses surface as notification errors.
#[derive(Clone)]
pub struct OneSignalClient {
    app_id: String,
    api_key: String,
    endpoint: String,
    client: Client,
}

#[derive(Serialize)]
struct Localized<'a> {
    en: &'a str,
    vi: &'a str,
}

#[derive(Serialize)]
struct NotificationBody<'a> {
    app_id: &'a str,
    include_player_ids: &'a [String],
    contents: Localized<'a>,
    headings: Localized<'a>,
}

impl OneSignalClient {
    pub fn new(app_id: String, api_key: String) -> Self {
        Self {
            app_id,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different URL (tests/tools).
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[async_trait::async_trait]
impl PushSender for OneSignalClient {
    async fn send_batch(&self, player_ids: &[String], message: &str) -> Result<()> {
        let body = NotificationBody {
            app_id: &self.app_id,
            include_player_ids: player_ids,
            contents: Localized {
                en: message,
                vi: message,
            },
            headings: Localized {
                en: "RankAlert",
                vi: "RankAlert",
            },
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Basic {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("onesignal request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::Notification(format!(
                "onesignal HTTP {status}: {detail}"
            )));
        }
        Ok(())
    }
}
