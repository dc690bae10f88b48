use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::EmojilikeConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "emojilike.toml",
    "emojilike.yaml",
    "emojilike.yml",
    "emojilike.json",
];

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Use `dir` instead of the user config directory.
pub fn set_config_dir(dir: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(dir);
}

/// The override set by [`set_config_dir`], else `~/.config/emojilike/`.
pub fn config_dir() -> Option<PathBuf> {
    let overridden = CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    overridden.or_else(|| {
        directories::ProjectDirs::from("", "", "emojilike").map(|d| d.config_dir().to_path_buf())
    })
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<EmojilikeConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./emojilike.{toml,yaml,yml,json}`
/// 2. [`config_dir`]`/emojilike.{toml,yaml,yml,json}`
///
/// Falls back to defaults when nothing is found or the file is broken.
pub fn discover_and_load() -> EmojilikeConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return EmojilikeConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        EmojilikeConfig::default()
    })
}

/// First existing config file in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

pub(crate) fn format_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn parse_config(raw: &str, path: &Path) -> Result<EmojilikeConfig> {
    match format_of(path) {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        ext => Err(Error::UnsupportedFormat { ext: ext.into() }),
    }
}
