//! Emoji-reaction arbitration between independent chat bots.
//!
//! Several bots receiving the same group message each run [`Arbiter::compete`].
//! They coordinate only through reactions on that message: each claims it with
//! a fixed emoji, waits out a propagation window, then derives the same ranking
//! from the observed claimants and the message timestamp. At most one bot is
//! expected to win while the channel propagates within the windows; beyond
//! them duplicate or missing winners are tolerated.

pub mod channel;
pub mod context;
pub mod engine;
pub mod error;
pub mod order;
pub mod params;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use {
    channel::AnnotationChannel,
    context::ArbitrationContext,
    engine::{Arbiter, Outcome, Phase, Reason, Verdict},
    error::{ContextError, Error, Result},
    order::{Participants, decide_order, direct_winner},
    params::{AnnotationKind, BackupParams, ProtocolParams, Variant},
};
