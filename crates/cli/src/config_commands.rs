use std::{fmt::Write as _, path::PathBuf, process::ExitCode};

use {anyhow::Result, clap::Subcommand};

use emojilike_config::validate::{self, Severity, ValidationResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Check this file instead of the discovered one.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration with secrets redacted.
    Show,
}

pub fn handle_config(action: ConfigAction) -> Result<ExitCode> {
    match action {
        ConfigAction::Check { file, verbose } => {
            let result = validate::validate(file.as_deref());
            eprint!("{}", render_report(&result, verbose));
            Ok(if result.has_errors() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        },
        ConfigAction::Show => {
            let config = emojilike_config::discover_and_load();
            println!("{config:#?}");
            Ok(ExitCode::SUCCESS)
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn render_report(result: &ValidationResult, verbose: bool) -> String {
    let mut out = String::new();

    match result.config_path {
        Some(ref path) => {
            let _ = writeln!(out, "Checking {}\n", path.display());
        },
        None => {
            let _ = writeln!(out, "No config file found; checking defaults.\n");
        },
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            let _ = writeln!(out, "  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            let _ = writeln!(out, "  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }
    if shown > 0 {
        out.push('\n');
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        out.push_str("No issues found.\n");
    } else {
        let _ = writeln!(out, "{errors} error(s), {warnings} warning(s)");
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_file_reports_no_issues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emojilike.toml");
        std::fs::write(&path, "[onebot]\nendpoint = \"http://127.0.0.1:3000\"\n").unwrap();

        let result = validate::validate(Some(&path));
        let report = render_report(&result, false);
        assert!(!result.has_errors());
        assert!(report.contains("No issues found."));
    }

    #[test]
    fn protocol_override_is_reported_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emojilike.toml");
        std::fs::write(&path, "[protocol]\nclaim_wait_ms = 10\n").unwrap();

        let result = validate::validate(Some(&path));
        let report = render_report(&result, false);
        assert!(result.has_errors());
        assert!(report.contains("error"));
        assert!(report.contains("1 error(s)"));
    }
}
