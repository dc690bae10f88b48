//! The shared medium: reactions attached to a chat message.

use std::sync::Arc;

use {async_trait::async_trait, tracing::warn};

#[cfg(feature = "metrics")]
use emojilike_metrics::{arbiter as arb_metrics, counter, labels};

use crate::{Result, order::Participants, params::AnnotationKind};

/// Read/append access to the reaction list of a message.
///
/// Implementations act as the local bot; `set_annotation` never names the
/// participant explicitly. The channel is eventually consistent and gives
/// no ordering guarantee on fetched holders.
#[async_trait]
pub trait AnnotationChannel: Send + Sync {
    /// Attach (`present = true`) or withdraw a reaction on `message_id`.
    async fn set_annotation(
        &self,
        message_id: i64,
        kind: AnnotationKind,
        present: bool,
    ) -> Result<()>;

    /// Ids currently observed holding `kind` on `message_id`.
    async fn fetch_annotation(&self, message_id: i64, kind: AnnotationKind) -> Result<Vec<i64>>;
}

#[async_trait]
impl<T: AnnotationChannel + ?Sized> AnnotationChannel for Arc<T> {
    async fn set_annotation(
        &self,
        message_id: i64,
        kind: AnnotationKind,
        present: bool,
    ) -> Result<()> {
        (**self).set_annotation(message_id, kind, present).await
    }

    async fn fetch_annotation(&self, message_id: i64, kind: AnnotationKind) -> Result<Vec<i64>> {
        (**self).fetch_annotation(message_id, kind).await
    }
}

/// Fetch and normalize holders of `kind`. Read failures count as "nobody".
pub(crate) async fn fetch_participants<C: AnnotationChannel + ?Sized>(
    channel: &C,
    message_id: i64,
    kind: AnnotationKind,
) -> Participants {
    match channel.fetch_annotation(message_id, kind).await {
        Ok(ids) => Participants::normalize(ids),
        Err(e) => {
            warn!(message_id, %kind, error = %e, "fetch annotation failed, treating as empty");
            #[cfg(feature = "metrics")]
            counter!(arb_metrics::CHANNEL_ERRORS_TOTAL, labels::OP => "fetch").increment(1);
            Participants::default()
        },
    }
}
