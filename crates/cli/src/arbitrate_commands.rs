use std::{fmt::Write as _, io::Read as _, process::ExitCode};

use {
    anyhow::{Context, Result},
    emojilike_arbiter::{
        Arbiter, ArbitrationContext, Participants, Variant, decide_order, direct_winner,
    },
    emojilike_metrics::{MetricsRecorderConfig, init_metrics},
    emojilike_onebot::classify,
    serde_json::Value,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

pub async fn compete(source: &str, variant: Variant, print_metrics: bool) -> Result<ExitCode> {
    let event = read_event(source)?;

    let kind = classify(&event);
    if !kind.is_arbitrable() {
        println!("lose (not an inbound message: {kind})");
        return Ok(ExitCode::FAILURE);
    }
    let ctx = match ArbitrationContext::try_from(&event) {
        Ok(ctx) => ctx,
        Err(e) => {
            println!("lose (ineligible event: {e})");
            return Ok(ExitCode::FAILURE);
        },
    };

    let config = emojilike_config::discover_and_load();
    let metrics = init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        global_labels: config.metrics.labels.clone().into_iter().collect(),
    })?;
    let channel = emojilike_onebot::connect(&config.onebot)?;
    info!(endpoint = channel.client().endpoint(), %variant, "arbitrating");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, abandoning arbitration");
            on_signal.cancel();
        }
    });

    let arbiter = Arbiter::new(channel, variant);
    let outcome = arbiter.run_until_cancelled(&ctx, &cancel).await;
    println!("{} ({})", outcome.verdict.as_str(), outcome.reason);

    if print_metrics {
        print!("{}", metrics.render());
    }

    Ok(if outcome.verdict.is_win() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_event(source: &str) -> Result<Value> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };
    serde_json::from_str(&raw).context("event is not valid JSON")
}

pub fn order(participants: Vec<i64>, time: i64, variant: Variant) {
    print!("{}", render_order(participants, time, variant));
}

fn render_order(participants: Vec<i64>, time: i64, variant: Variant) -> String {
    let params = variant.params();
    let participants = Participants::normalize(participants);
    let ranking = decide_order(&participants, time, params.time_slice());
    let winner = direct_winner(&participants, time, params.time_slice());

    let mut out = String::new();
    let _ = writeln!(out, "variant:      {variant}");
    let _ = writeln!(out, "participants: {:?}", participants.as_slice());
    let _ = writeln!(out, "ranking:      {ranking:?}");
    match winner {
        Some(id) => {
            let _ = writeln!(out, "head:         {id}");
        },
        None => {
            let _ = writeln!(out, "head:         -");
        },
    }
    out
}

pub fn params() {
    print!("{}", render_params());
}

fn render_params() -> String {
    let mut out = String::new();
    for params in [Variant::Full, Variant::Reduced].map(Variant::params) {
        let _ = writeln!(out, "[{}]", params.variant());
        let _ = writeln!(out, "  primary        {}", params.primary());
        let _ = writeln!(out, "  claim_wait     {} ms", params.claim_wait().as_millis());
        let _ = writeln!(out, "  time_slice     {} s", params.time_slice());
        match params.backup() {
            Some(backup) => {
                let _ = writeln!(out, "  feedback       {}", backup.feedback());
                let _ = writeln!(
                    out,
                    "  feedback_wait  {} ms",
                    backup.feedback_wait().as_millis()
                );
            },
            None => {
                let _ = writeln!(out, "  backup         none");
            },
        }
        let _ = writeln!(out, "  fingerprint    {}", params.fingerprint());
    }
    out
}
