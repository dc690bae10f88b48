//! Reactions on a OneBot v11 message as an [`AnnotationChannel`].

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tracing::{debug, trace},
};

use emojilike_arbiter::{AnnotationChannel, AnnotationKind, Error as ArbiterError};

use crate::client::OneBotClient;

const SET_ACTION: &str = "set_msg_emoji_like";
const FETCH_ACTION: &str = "fetch_emoji_like";

/// Reaction channel backed by the `set_msg_emoji_like` / `fetch_emoji_like`
/// extension actions (NapCat, Lagrange and compatible implementations).
#[derive(Debug, Clone)]
pub struct OneBotChannel {
    client: OneBotClient,
}

impl OneBotChannel {
    #[must_use]
    pub fn new(client: OneBotClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &OneBotClient {
        &self.client
    }
}

#[async_trait]
impl AnnotationChannel for OneBotChannel {
    async fn set_annotation(
        &self,
        message_id: i64,
        kind: AnnotationKind,
        present: bool,
    ) -> emojilike_arbiter::Result<()> {
        let params = json!({
            "message_id": message_id,
            "emoji_id": kind.id,
            "emoji_type": kind.type_tag,
            "set": present,
        });
        self.client
            .call(SET_ACTION, params)
            .await
            .map_err(|e| ArbiterError::channel(SET_ACTION, e))?;
        debug!(message_id, %kind, present, "reaction written");
        Ok(())
    }

    async fn fetch_annotation(
        &self,
        message_id: i64,
        kind: AnnotationKind,
    ) -> emojilike_arbiter::Result<Vec<i64>> {
        let params = json!({
            "message_id": message_id,
            "emojiId": kind.id.to_string(),
            "emojiType": kind.type_tag,
        });
        let data = self
            .client
            .call(FETCH_ACTION, params)
            .await
            .map_err(|e| ArbiterError::channel(FETCH_ACTION, e))?;
        let holders = parse_holders(&data);
        trace!(message_id, %kind, ?holders, "reaction holders");
        Ok(holders)
    }
}

/// Holder ids from a `fetch_emoji_like` payload.
///
/// Reads `emojiLikesList[*].tinyId`, accepting integers and decimal strings.
/// Entries without a usable id are dropped; a missing list means nobody.
#[must_use]
pub fn parse_holders(data: &Value) -> Vec<i64> {
    let Some(list) = data.get("emojiLikesList").and_then(Value::as_array) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|entry| match entry.get("tinyId")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}
