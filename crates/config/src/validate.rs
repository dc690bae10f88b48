//! Configuration validation.
//!
//! Detects unknown or misspelled keys, rejects attempts to configure the
//! arbitration protocol, and flags settings that break its timing.

use std::{collections::HashMap, path::Path};

use {emojilike_arbiter::ProtocolParams, serde_json::Value};

use crate::{
    env_subst::substitute_env,
    loader::{find_config_file, format_of},
    schema::EmojilikeConfig,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "protocol", "type-error", "endpoint",
    /// "timing" or "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "onebot.endpiont"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Keys that would make the arbitration protocol configurable. Any of these
/// at any depth is an error: bots with diverging parameters elect
/// duplicate or missing winners without any visible failure.
const PROTOCOL_KEYS: &[&str] = &[
    "protocol",
    "arbiter",
    "emoji_id",
    "emoji_type",
    "feedback_emoji_id",
    "claim_wait",
    "claim_wait_ms",
    "feedback_wait",
    "feedback_wait_ms",
    "time_slice",
];

/// Expected shape of the configuration.
enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    /// Dynamic keys with scalar values.
    Map,
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Map, Struct};

    Struct(HashMap::from([
        (
            "onebot",
            Struct(HashMap::from([
                ("endpoint", Leaf),
                ("access_token", Leaf),
                ("request_timeout_ms", Leaf),
            ])),
        ),
        (
            "metrics",
            Struct(HashMap::from([("enabled", Leaf), ("labels", Map)])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate the config file at `path`, or the discovered one if `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let Some(config_path) = path.map(Path::to_path_buf).or_else(find_config_file) else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&config_path) {
        Ok(raw) => validate_str(&substitute_env(&raw), format_of(&config_path)),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "file-ref",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(config_path);
    result
}

/// Validate raw config text of the given format (`toml`, `yaml`, `yml`, `json`).
#[must_use]
pub fn validate_str(raw: &str, format: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let parsed: Result<Value, String> = match format {
        "toml" => toml::from_str::<toml::Value>(raw)
            .map_err(|e| e.to_string())
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str::<Value>(raw).map_err(|e| e.to_string()),
        "json" => serde_json::from_str::<Value>(raw).map_err(|e| e.to_string()),
        other => Err(format!("unsupported config format: .{other}")),
    };
    let value = match parsed {
        // An empty YAML document parses as null.
        Ok(Value::Null) => Value::Object(Default::default()),
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("{format} syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    match serde_json::from_value::<EmojilikeConfig>(value) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known: Vec<&str> = fields.keys().copied().collect();

    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if PROTOCOL_KEYS.contains(&key.as_str()) {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "protocol",
                path,
                "arbitration protocol parameters are compiled in and must be identical \
                 on every bot; remove this key",
            ));
            continue;
        }

        match fields.get(key.as_str()) {
            Some(child_schema) => check_unknown_fields(child, child_schema, &path, diagnostics),
            None => {
                let message = match suggest(key, &known, 3) {
                    Some(hint) => format!("unknown field \"{key}\" (did you mean \"{hint}\"?)"),
                    None => format!("unknown field \"{key}\""),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    "unknown-field",
                    path,
                    message,
                ));
            },
        }
    }
}

fn check_semantics(config: &EmojilikeConfig, diagnostics: &mut Vec<Diagnostic>) {
    match url::Url::parse(&config.onebot.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {},
        Ok(url) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "endpoint",
            "onebot.endpoint",
            format!("unsupported scheme \"{}\", expected http or https", url.scheme()),
        )),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "endpoint",
            "onebot.endpoint",
            format!("invalid URL \"{}\": {e}", config.onebot.endpoint),
        )),
    }

    let timeout = config.onebot.request_timeout();
    let window = ProtocolParams::FULL
        .claim_wait()
        .min(ProtocolParams::REDUCED.claim_wait());
    if timeout.is_zero() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "timing",
            "onebot.request_timeout_ms",
            "a zero timeout fails every request",
        ));
    } else if timeout >= window {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "timing",
            "onebot.request_timeout_ms",
            format!(
                "timeout {}ms is not shorter than the {}ms claim window; slow requests \
                 desynchronize bots",
                timeout.as_millis(),
                window.as_millis()
            ),
        ));
    }
}
