//! Minimal OneBot v11 HTTP action client.

use {
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::Value,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use emojilike_metrics::{counter, labels, onebot as ob_metrics};

use emojilike_config::OneBotConfig;

use crate::error::{Error, Result};

/// Response envelope shared by every OneBot action.
#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: String,
    /// Human-readable error text some implementations send instead of `message`.
    #[serde(default)]
    wording: String,
}

impl ActionResponse {
    /// `retcode` 1 means the action was queued asynchronously.
    fn succeeded(&self) -> bool {
        self.status != "failed" && matches!(self.retcode, 0 | 1)
    }
}

/// Posts actions to `{endpoint}/{action}`.
#[derive(Clone)]
pub struct OneBotClient {
    http: Client,
    endpoint: String,
    access_token: Option<Secret<String>>,
}

impl std::fmt::Debug for OneBotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneBotClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OneBotClient {
    pub fn new(config: &OneBotConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Error::config(format!(
                "endpoint must be an http(s) URL, got \"{}\"",
                config.endpoint
            )));
        }
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Invoke `action` and return its `data` payload.
    pub async fn call(&self, action: &str, params: Value) -> Result<Value> {
        #[cfg(feature = "metrics")]
        counter!(ob_metrics::REQUESTS_TOTAL, labels::ACTION => action.to_string()).increment(1);

        let result = self.send(action, params).await;
        if let Err(e) = &result {
            warn!(action, error = %e, "onebot action failed");
            #[cfg(feature = "metrics")]
            counter!(ob_metrics::REQUEST_ERRORS_TOTAL, labels::ACTION => action.to_string())
                .increment(1);
        }
        result
    }

    async fn send(&self, action: &str, params: Value) -> Result<Value> {
        let url = format!("{}/{action}", self.endpoint);
        debug!(action, %url, "onebot request");

        let mut request = self.http.post(&url).json(&params);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let body = request.send().await?.error_for_status()?.bytes().await?;
        let response: ActionResponse = serde_json::from_slice(&body)?;
        if !response.succeeded() {
            let message = if response.message.is_empty() {
                response.wording
            } else {
                response.message
            };
            return Err(Error::Action {
                action: action.to_string(),
                retcode: response.retcode,
                message,
            });
        }
        Ok(response.data)
    }
}
