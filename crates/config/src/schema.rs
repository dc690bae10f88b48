//! Config schema.
//!
//! Only deployment plumbing lives here. Emoji ids, wait windows and the time
//! slice are compiled into `emojilike-arbiter` and must not become settings.

use std::collections::BTreeMap;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojilikeConfig {
    pub onebot: OneBotConfig,
    pub metrics: MetricsConfig,
}

/// Connection to a OneBot v11 HTTP API (go-cqhttp, NapCat, Lagrange, ...).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OneBotConfig {
    /// Base URL of the HTTP action endpoint.
    pub endpoint: String,

    /// Sent as `Authorization: Bearer <token>` when set.
    #[serde(
        serialize_with = "serialize_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<Secret<String>>,

    /// Per-request timeout. Keep it below the claim window so a stalled
    /// fetch cannot push a bot out of step with its peers.
    pub request_timeout_ms: u64,
}

impl std::fmt::Debug for OneBotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneBotConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5700".into(),
            access_token: None,
            request_timeout_ms: 800,
        }
    }
}

impl OneBotConfig {
    #[must_use]
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_str(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Global labels attached to every metric.
    pub labels: BTreeMap<String, String>,
}
