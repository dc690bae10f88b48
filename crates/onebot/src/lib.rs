//! OneBot v11 HTTP plumbing for emojilike.
//!
//! [`OneBotChannel`] exposes message reactions as an
//! [`emojilike_arbiter::AnnotationChannel`]; [`classify`] decides which
//! inbound events are worth arbitrating.

pub mod channel;
pub mod client;
pub mod error;
pub mod event;

use emojilike_config::OneBotConfig;

pub use {
    channel::{OneBotChannel, parse_holders},
    client::OneBotClient,
    error::{Error, Result},
    event::{InboundKind, classify},
};

/// Build a reaction channel from config.
pub fn connect(config: &OneBotConfig) -> Result<OneBotChannel> {
    Ok(OneBotChannel::new(OneBotClient::new(config)?))
}
