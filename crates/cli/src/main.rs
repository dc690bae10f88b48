mod arbitrate_commands;
mod config_commands;

use std::{path::PathBuf, process::ExitCode};

use {
    clap::{Parser, Subcommand},
    emojilike_arbiter::Variant,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "emojilike",
    version,
    about = "Emoji-reaction arbitration between chat bots"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/emojilike/).
    #[arg(long, global = true, env = "EMOJILIKE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Arbitrate one inbound OneBot event against the configured endpoint.
    ///
    /// Exits 0 when this bot won the message, 1 otherwise.
    Compete {
        /// Path to the event JSON, or `-` for stdin.
        #[arg(long)]
        event: String,
        #[arg(long, default_value_t = Variant::Full)]
        variant: Variant,
        /// Print the Prometheus exposition to stdout after the verdict.
        #[arg(long)]
        print_metrics: bool,
    },
    /// Show the ranking a set of claimants would derive, offline.
    Order {
        /// Comma-separated participant ids.
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        participants: Vec<i64>,
        /// Message timestamp in seconds.
        #[arg(long, allow_hyphen_values = true)]
        time: i64,
        #[arg(long, default_value_t = Variant::Full)]
        variant: Variant,
    },
    /// Print the compiled protocol constants and their fingerprints.
    Params,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    debug!(version = env!("CARGO_PKG_VERSION"), "emojilike starting");

    if let Some(ref dir) = cli.config_dir {
        emojilike_config::set_config_dir(dir.clone());
    }

    match cli.command {
        Commands::Compete {
            event,
            variant,
            print_metrics,
        } => arbitrate_commands::compete(&event, variant, print_metrics).await,
        Commands::Order {
            participants,
            time,
            variant,
        } => {
            arbitrate_commands::order(participants, time, variant);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Params => {
            arbitrate_commands::params();
            Ok(ExitCode::SUCCESS)
        },
        Commands::Config { action } => config_commands::handle_config(action),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn order_accepts_comma_list_and_negative_time() {
        let cli = Cli::try_parse_from([
            "emojilike",
            "order",
            "--participants",
            "30,10,20",
            "--time",
            "-5",
            "--variant",
            "reduced",
        ])
        .unwrap();
        match cli.command {
            Commands::Order {
                participants,
                time,
                variant,
            } => {
                assert_eq!(participants, vec![30, 10, 20]);
                assert_eq!(time, -5);
                assert_eq!(variant, Variant::Reduced);
            },
            _ => panic!("expected order"),
        }
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!(
            Cli::try_parse_from(["emojilike", "params", "--variant", "x"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["emojilike", "compete", "--event", "-", "--variant", "fast"])
                .is_err()
        );
    }
}
