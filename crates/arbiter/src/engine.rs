//! The arbitration state machine.
//!
//! One attempt walks `Init → Claimed → Collected → Ranked → BackupWait(i)
//! → Resolved`, never moving backwards and never retrying a phase. Every
//! channel failure maps to a verdict, so an attempt always terminates with
//! win or lose.

use std::{fmt, time::Duration};

use {
    serde_json::Value,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use {
    emojilike_metrics::{arbiter as arb_metrics, counter, histogram, labels},
    std::time::Instant,
};

use crate::{
    channel::{AnnotationChannel, fetch_participants},
    context::ArbitrationContext,
    order::{Participants, decide_order, direct_winner},
    params::{ProtocolParams, Variant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Win,
    Lose,
}

impl Verdict {
    #[must_use]
    pub const fn is_win(self) -> bool {
        matches!(self, Self::Win)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Lose => "lose",
        }
    }
}

impl From<bool> for Verdict {
    fn from(win: bool) -> Self {
        if win {
            Self::Win
        } else {
            Self::Lose
        }
    }
}

/// Which rule produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Someone already held the claim emoji before we tried.
    AlreadyClaimed,
    /// Placing our own claim failed.
    ClaimFailed,
    /// Nobody was visible after the claim window; assumed win.
    NoParticipantsObserved,
    EmptyRanking,
    SoleParticipant,
    /// Reduced variant: head of the ranking.
    DirectIndex,
    /// Feedback was observed during the turn of ranking `position`.
    FeedbackObserved { position: usize },
    FeedbackNeverObserved,
    Cancelled,
}

impl Reason {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyClaimed => "already_claimed",
            Self::ClaimFailed => "claim_failed",
            Self::NoParticipantsObserved => "no_participants_observed",
            Self::EmptyRanking => "empty_ranking",
            Self::SoleParticipant => "sole_participant",
            Self::DirectIndex => "direct_index",
            Self::FeedbackObserved { .. } => "feedback_observed",
            Self::FeedbackNeverObserved => "feedback_never_observed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeedbackObserved { position } => {
                write!(f, "{} at position {position}", self.as_str())
            },
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Terminal result of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub verdict: Verdict,
    pub reason: Reason,
}

impl Outcome {
    #[must_use]
    pub const fn new(verdict: Verdict, reason: Reason) -> Self {
        Self { verdict, reason }
    }

    const fn lose(reason: Reason) -> Self {
        Self::new(Verdict::Lose, reason)
    }
}

/// Protocol phase of an attempt in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Init,
    Claimed,
    Collected(Participants),
    Ranked(Vec<i64>),
    BackupWait { ranking: Vec<i64>, position: usize },
    Resolved(Outcome),
}

impl Phase {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Claimed => "claimed",
            Self::Collected(_) => "collected",
            Self::Ranked(_) => "ranked",
            Self::BackupWait { .. } => "backup_wait",
            Self::Resolved(_) => "resolved",
        }
    }
}

/// Runs arbitration attempts against one annotation channel.
pub struct Arbiter<C> {
    channel: C,
    params: &'static ProtocolParams,
}

impl<C: AnnotationChannel> Arbiter<C> {
    pub fn new(channel: C, variant: Variant) -> Self {
        Self {
            channel,
            params: variant.params(),
        }
    }

    #[must_use]
    pub fn params(&self) -> &'static ProtocolParams {
        self.params
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// `true` iff this bot won the message and should act on it.
    pub async fn compete(&self, ctx: &ArbitrationContext) -> bool {
        self.run(ctx).await.verdict.is_win()
    }

    /// Arbitrate a raw inbound event. Events without a valid context lose.
    pub async fn compete_event(&self, event: &Value) -> bool {
        match ArbitrationContext::from_event(event) {
            Some(ctx) => self.compete(&ctx).await,
            None => false,
        }
    }

    pub async fn run(&self, ctx: &ArbitrationContext) -> Outcome {
        self.run_until_cancelled(ctx, &CancellationToken::new())
            .await
    }

    /// Run one attempt, resolving to a `Cancelled` loss if `cancel` fires.
    ///
    /// A claim already placed is left on the message; other bots may still
    /// rank this bot and wait through its turn.
    pub async fn run_until_cancelled(
        &self,
        ctx: &ArbitrationContext,
        cancel: &CancellationToken,
    ) -> Outcome {
        #[cfg(feature = "metrics")]
        let started = Instant::now();
        #[cfg(feature = "metrics")]
        counter!(arb_metrics::ATTEMPTS_TOTAL, labels::VARIANT => self.params.variant().as_str())
            .increment(1);

        let mut phase = Phase::Init;
        let outcome = loop {
            let from = phase.name();
            phase = match phase {
                Phase::Resolved(outcome) => break outcome,
                _ if cancel.is_cancelled() => cancelled(ctx, from),
                current => self.step(current, ctx, cancel).await,
            };
            debug!(
                message_id = ctx.message_id(),
                self_id = ctx.self_id(),
                from,
                to = phase.name(),
                "arbiter phase transition"
            );
        };

        info!(
            message_id = ctx.message_id(),
            self_id = ctx.self_id(),
            variant = %self.params.variant(),
            verdict = outcome.verdict.as_str(),
            reason = %outcome.reason,
            "arbitration resolved"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                arb_metrics::VERDICTS_TOTAL,
                labels::VERDICT => outcome.verdict.as_str(),
                labels::REASON => outcome.reason.as_str()
            )
            .increment(1);
            histogram!(arb_metrics::DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        }

        outcome
    }

    async fn step(&self, phase: Phase, ctx: &ArbitrationContext, cancel: &CancellationToken) -> Phase {
        match phase {
            Phase::Init => self.claim(ctx).await,
            Phase::Claimed => self.collect(ctx, cancel).await,
            Phase::Collected(participants) => self.rank(ctx, &participants),
            Phase::Ranked(ranking) => Phase::BackupWait {
                ranking,
                position: 0,
            },
            Phase::BackupWait { ranking, position } => {
                self.confirm(ctx, ranking, position, cancel).await
            },
            resolved @ Phase::Resolved(_) => resolved,
        }
    }

    /// Precheck, then place our claim.
    async fn claim(&self, ctx: &ArbitrationContext) -> Phase {
        let message_id = ctx.message_id();
        let primary = self.params.primary();

        if !fetch_participants(&self.channel, message_id, primary)
            .await
            .is_empty()
        {
            debug!(message_id, "message already claimed by another bot");
            return Phase::Resolved(Outcome::lose(Reason::AlreadyClaimed));
        }

        // A failed claim is never assumed to have landed.
        match self.channel.set_annotation(message_id, primary, true).await {
            Ok(()) => Phase::Claimed,
            Err(e) => {
                warn!(message_id, %primary, error = %e, "claim failed, abandoning arbitration");
                #[cfg(feature = "metrics")]
                counter!(arb_metrics::CHANNEL_ERRORS_TOTAL, labels::OP => "claim").increment(1);
                Phase::Resolved(Outcome::lose(Reason::ClaimFailed))
            },
        }
    }

    /// Wait out the propagation window, then read every claimant.
    async fn collect(&self, ctx: &ArbitrationContext, cancel: &CancellationToken) -> Phase {
        if !wait(self.params.claim_wait(), cancel).await {
            return cancelled(ctx, Phase::Claimed.name());
        }

        let participants =
            fetch_participants(&self.channel, ctx.message_id(), self.params.primary()).await;
        if participants.is_empty() {
            // Even our own claim is invisible. Prefer a possible duplicate
            // winner over blocking or universal loss.
            warn!(
                message_id = ctx.message_id(),
                "no claimants visible after claim window, assuming win"
            );
            return Phase::Resolved(Outcome::new(Verdict::Win, Reason::NoParticipantsObserved));
        }
        Phase::Collected(participants)
    }

    fn rank(&self, ctx: &ArbitrationContext, participants: &Participants) -> Phase {
        let self_id = ctx.self_id();
        let time_slice = self.params.time_slice();

        if self.params.backup().is_none() {
            let winner = direct_winner(participants, ctx.msg_time(), time_slice);
            debug!(message_id = ctx.message_id(), ?winner, "direct winner");
            return Phase::Resolved(match winner {
                Some(winner) => Outcome::new(Verdict::from(winner == self_id), Reason::DirectIndex),
                None => Outcome::lose(Reason::EmptyRanking),
            });
        }

        let ranking = decide_order(participants, ctx.msg_time(), time_slice);
        debug!(message_id = ctx.message_id(), ?ranking, "ranking decided");
        match ranking.as_slice() {
            [] => Phase::Resolved(Outcome::lose(Reason::EmptyRanking)),
            [only] => Phase::Resolved(Outcome::new(
                Verdict::from(*only == self_id),
                Reason::SoleParticipant,
            )),
            _ => Phase::Ranked(ranking),
        }
    }

    /// One turn of the backup loop for the candidate at `position`.
    ///
    /// Any visible feedback resolves the turn in favour of that position's
    /// candidate, whoever posted it.
    async fn confirm(
        &self,
        ctx: &ArbitrationContext,
        ranking: Vec<i64>,
        position: usize,
        cancel: &CancellationToken,
    ) -> Phase {
        let message_id = ctx.message_id();
        let (Some(backup), Some(&candidate)) = (self.params.backup(), ranking.get(position)) else {
            return Phase::Resolved(Outcome::lose(Reason::FeedbackNeverObserved));
        };
        let feedback = backup.feedback();

        if candidate == ctx.self_id()
            && let Err(e) = self.channel.set_annotation(message_id, feedback, true).await
        {
            warn!(message_id, position, error = %e, "feedback annotation failed, continuing");
            #[cfg(feature = "metrics")]
            counter!(arb_metrics::CHANNEL_ERRORS_TOTAL, labels::OP => "feedback").increment(1);
        }

        if !wait(backup.feedback_wait(), cancel).await {
            return cancelled(ctx, "backup_wait");
        }

        if !fetch_participants(&self.channel, message_id, feedback)
            .await
            .is_empty()
        {
            return Phase::Resolved(Outcome::new(
                Verdict::from(candidate == ctx.self_id()),
                Reason::FeedbackObserved { position },
            ));
        }

        debug!(message_id, position, candidate, "no feedback during turn");
        if position + 1 < ranking.len() {
            Phase::BackupWait {
                ranking,
                position: position + 1,
            }
        } else {
            Phase::Resolved(Outcome::lose(Reason::FeedbackNeverObserved))
        }
    }
}

/// Sleep for `duration`; `false` if cancelled first.
async fn wait(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

fn cancelled(ctx: &ArbitrationContext, phase: &'static str) -> Phase {
    warn!(
        message_id = ctx.message_id(),
        phase, "arbitration cancelled, any placed claim stays on the message"
    );
    Phase::Resolved(Outcome::lose(Reason::Cancelled))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            params::AnnotationKind,
            testing::{Fetch, ScriptedChannel, Write},
        },
        serde_json::json,
        std::sync::Arc,
        tokio::time::Instant,
    };

    const CLAIM: AnnotationKind = ProtocolParams::FULL.primary();
    const REDUCED_CLAIM: AnnotationKind = ProtocolParams::REDUCED.primary();
    const FEEDBACK: AnnotationKind = AnnotationKind::new(124, "1");

    /// Scenario message: time 125 with slice 60 ranks [30, 10, 20].
    fn ctx(self_id: i64) -> ArbitrationContext {
        ArbitrationContext::new(9001, 125, self_id)
    }

    fn claimed_by_all() -> ScriptedChannel {
        ScriptedChannel::new()
            .with_fetch(CLAIM, Fetch::Holders(vec![]))
            .with_fetch(CLAIM, Fetch::Holders(vec![20, 10, 30]))
    }

    #[tokio::test(start_paused = true)]
    async fn existing_claim_loses_without_writing() {
        let channel = ScriptedChannel::new().with_fetch(CLAIM, Fetch::Holders(vec![5]));
        let arbiter = Arbiter::new(channel, Variant::Full);

        let outcome = arbiter.run(&ctx(5)).await;

        assert_eq!(outcome, Outcome::lose(Reason::AlreadyClaimed));
        assert!(arbiter.channel().writes().is_empty());
        assert_eq!(arbiter.channel().fetch_count(CLAIM), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_claim_loses_immediately() {
        let channel = ScriptedChannel::new().rejecting_writes(CLAIM);
        let arbiter = Arbiter::new(channel, Variant::Full);
        let start = Instant::now();

        assert!(!arbiter.compete(&ctx(30)).await);
        assert_eq!(arbiter.run(&ctx(30)).await.reason, Reason::ClaimFailed);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn invisible_claims_resolve_to_optimistic_win() {
        for self_id in [1, 10, 30] {
            let arbiter = Arbiter::new(ScriptedChannel::new(), Variant::Full);
            let outcome = arbiter.run(&ctx(self_id)).await;
            assert_eq!(
                outcome,
                Outcome::new(Verdict::Win, Reason::NoParticipantsObserved)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn collect_fetch_error_counts_as_empty() {
        let channel = ScriptedChannel::new()
            .with_fetch(CLAIM, Fetch::Holders(vec![]))
            .with_fetch(CLAIM, Fetch::Fail);
        let arbiter = Arbiter::new(channel, Variant::Full);
        assert!(arbiter.compete(&ctx(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn precheck_fetch_error_still_claims() {
        let channel = ScriptedChannel::new()
            .with_fetch(CLAIM, Fetch::Fail)
            .with_fetch(CLAIM, Fetch::Holders(vec![10]));
        let arbiter = Arbiter::new(channel, Variant::Full);

        let outcome = arbiter.run(&ctx(10)).await;

        assert_eq!(outcome, Outcome::new(Verdict::Win, Reason::SoleParticipant));
        assert_eq!(arbiter.channel().writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn claim_window_elapses_before_collect() {
        let arbiter = Arbiter::new(ScriptedChannel::new(), Variant::Reduced);
        let start = Instant::now();
        arbiter.run(&ctx(10)).await;
        assert_eq!(start.elapsed(), ProtocolParams::REDUCED.claim_wait());
    }

    #[tokio::test(start_paused = true)]
    async fn reduced_variant_picks_ranking_head() {
        for (self_id, expected) in [(30, Verdict::Win), (10, Verdict::Lose), (20, Verdict::Lose)] {
            let channel = ScriptedChannel::new()
                .with_fetch(REDUCED_CLAIM, Fetch::Holders(vec![]))
                .with_fetch(REDUCED_CLAIM, Fetch::Holders(vec![10, 20, 30]));
            let arbiter = Arbiter::new(channel, Variant::Reduced);

            let outcome = arbiter.run(&ctx(self_id)).await;

            assert_eq!(outcome, Outcome::new(expected, Reason::DirectIndex));
            assert_eq!(
                arbiter.channel().writes(),
                vec![Write {
                    message_id: 9001,
                    kind: REDUCED_CLAIM,
                    present: true,
                }]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sole_participant_skips_backup_loop() {
        let channel = ScriptedChannel::new()
            .with_fetch(CLAIM, Fetch::Holders(vec![]))
            .with_fetch(CLAIM, Fetch::Holders(vec![77, 77]));
        let arbiter = Arbiter::new(channel, Variant::Full);

        let outcome = arbiter.run(&ctx(10)).await;

        assert_eq!(outcome, Outcome::lose(Reason::SoleParticipant));
        assert_eq!(arbiter.channel().fetch_count(FEEDBACK), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_candidate_confirms_and_wins() {
        let channel = claimed_by_all().with_fetch(FEEDBACK, Fetch::Holders(vec![30]));
        let arbiter = Arbiter::new(channel, Variant::Full);

        let outcome = arbiter.run(&ctx(30)).await;

        assert_eq!(
            outcome,
            Outcome::new(Verdict::Win, Reason::FeedbackObserved { position: 0 })
        );
        let kinds: Vec<_> = arbiter
            .channel()
            .writes()
            .into_iter()
            .map(|w| w.kind)
            .collect();
        assert_eq!(kinds, vec![CLAIM, FEEDBACK]);
        assert_eq!(arbiter.channel().fetch_count(FEEDBACK), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn observers_lose_once_first_candidate_confirms() {
        for self_id in [10, 20] {
            let channel = claimed_by_all().with_fetch(FEEDBACK, Fetch::Holders(vec![30]));
            let arbiter = Arbiter::new(channel, Variant::Full);

            let outcome = arbiter.run(&ctx(self_id)).await;

            assert_eq!(
                outcome,
                Outcome::lose(Reason::FeedbackObserved { position: 0 })
            );
            assert_eq!(arbiter.channel().writes().len(), 1, "only the claim");
            assert_eq!(arbiter.channel().fetch_count(FEEDBACK), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn backup_candidate_wins_when_first_stays_silent() {
        let channel = claimed_by_all()
            .with_fetch(FEEDBACK, Fetch::Holders(vec![]))
            .with_fetch(FEEDBACK, Fetch::Holders(vec![10]));
        let arbiter = Arbiter::new(channel, Variant::Full);

        let outcome = arbiter.run(&ctx(10)).await;

        assert_eq!(
            outcome,
            Outcome::new(Verdict::Win, Reason::FeedbackObserved { position: 1 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn feedback_never_observed_means_nobody_wins() {
        for self_id in [30, 10, 20] {
            let arbiter = Arbiter::new(claimed_by_all(), Variant::Full);
            let start = Instant::now();

            let outcome = arbiter.run(&ctx(self_id)).await;

            assert_eq!(outcome, Outcome::lose(Reason::FeedbackNeverObserved));
            assert_eq!(arbiter.channel().fetch_count(FEEDBACK), 3);
            let backup = ProtocolParams::FULL.backup().unwrap();
            assert_eq!(
                start.elapsed(),
                ProtocolParams::FULL.claim_wait() + backup.feedback_wait() * 3
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_feedback_write_is_not_fatal() {
        let channel = claimed_by_all()
            .rejecting_writes(FEEDBACK)
            .with_fetch(FEEDBACK, Fetch::Fail)
            .with_fetch(FEEDBACK, Fetch::Holders(vec![]))
            .with_fetch(FEEDBACK, Fetch::Holders(vec![20]));
        let arbiter = Arbiter::new(channel, Variant::Full);

        let outcome = arbiter.run(&ctx(30)).await;

        assert_eq!(
            outcome,
            Outcome::lose(Reason::FeedbackObserved { position: 2 })
        );
        assert_eq!(arbiter.channel().writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_touches_nothing() {
        let arbiter = Arbiter::new(ScriptedChannel::new(), Variant::Full);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = arbiter.run_until_cancelled(&ctx(10), &cancel).await;

        assert_eq!(outcome, Outcome::lose(Reason::Cancelled));
        assert!(arbiter.channel().writes().is_empty());
        assert_eq!(arbiter.channel().fetch_count(CLAIM), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_mid_window_leaves_claim_in_place() {
        let arbiter = Arbiter::new(claimed_by_all(), Variant::Full);
        let cancel = CancellationToken::new();
        let ctx = ctx(30);

        let (outcome, ()) = tokio::join!(arbiter.run_until_cancelled(&ctx, &cancel), async {
            tokio::time::sleep(Duration::from_millis(400)).await;
            cancel.cancel();
        });

        assert_eq!(outcome, Outcome::lose(Reason::Cancelled));
        assert_eq!(arbiter.channel().writes().len(), 1);
        assert_eq!(arbiter.channel().fetch_count(CLAIM), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_event_is_not_arbitrated() {
        let arbiter = Arbiter::new(ScriptedChannel::new(), Variant::Full);
        assert!(
            !arbiter
                .compete_event(&json!({ "message_id": 1, "self_id": 2 }))
                .await
        );
        assert_eq!(arbiter.channel().fetch_count(CLAIM), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn valid_event_is_arbitrated() {
        let arbiter = Arbiter::new(Arc::new(ScriptedChannel::new()), Variant::Full);
        let event = json!({ "message_id": 9001, "time": 125, "self_id": 30 });
        assert!(arbiter.compete_event(&event).await);
        assert_eq!(arbiter.channel().fetch_count(CLAIM), 2);
    }

    #[test]
    fn reason_labels_are_stable() {
        assert_eq!(Reason::AlreadyClaimed.as_str(), "already_claimed");
        assert_eq!(
            Reason::FeedbackObserved { position: 2 }.to_string(),
            "feedback_observed at position 2"
        );
        assert_eq!(Verdict::from(true), Verdict::Win);
        assert!(!Verdict::Lose.is_win());
    }
}
