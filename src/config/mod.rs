pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use clap::Parser;
use regex::Regex;

use crate::utils::error::{ModmailError, Result};
use crate::utils::validation::{self, Validate};

pub use schema::{InternalConfig, ModmailConfig};

/// Packaged defaults, always the bottom layer of the merge.
pub const DEFAULT_CONFIG: &str = include_str!("config-default.toml");

/// Candidate locations for a user configuration file, checked in order.
pub const CONFIG_PATHS: &[&str] = &["./config.toml", "./modmail/config.toml"];

/// Environment variables that override individual config keys. These win
/// over both the user file and the packaged defaults.
const ENV_OVERRIDES: &[(&str, &[&str])] = &[
    ("MODMAIL_BOT_TOKEN", &["bot", "token"]),
    ("MODMAIL_BOT_PREFIX", &["bot", "prefix"]),
    ("MODMAIL_BOT_GUILD_ID", &["bot", "guild_id"]),
    ("MODMAIL_BOT_MODMAIL_GUILD_ID", &["bot", "modmail_guild_id"]),
    ("MODMAIL_BOT_LOG_URL", &["bot", "log_url"]),
    ("MODMAIL_DEV_LOG_LEVEL", &["dev", "log_level"]),
];

#[derive(Debug, Clone, Parser)]
#[command(name = "modmail")]
#[command(about = "A bot for relaying member direct messages to staff threads")]
pub struct CliConfig {
    /// Explicit config file, skips the usual search paths.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "./.cache/modmail")]
    pub cache_path: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("cache_path", &self.cache_path)?;
        if let Some(path) = &self.config {
            if !path.exists() {
                return Err(ModmailError::InvalidConfigValueError {
                    field: "config".to_string(),
                    value: path.display().to_string(),
                    reason: "File does not exist".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Find the first existing path out of a candidate list.
pub fn determine_file_path<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a str>,
{
    for candidate in paths {
        let path = Path::new(candidate);
        if path.exists() {
            tracing::debug!("Found config at {}", candidate);
            return Some(path.to_path_buf());
        }
    }
    None
}

fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap())
}

/// Replace `${VAR_NAME}` placeholders with environment values. Unset
/// variables are left as-is so the error surfaces at the field that uses
/// them rather than here.
fn substitute_env_vars(content: &str) -> String {
    env_var_regex()
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
}

/// Merge `overlay` into `base`. Tables merge key by key, everything else
/// is replaced wholesale.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn set_path(root: &mut toml::Value, path: &[&str], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let table = match current {
            toml::Value::Table(table) => table,
            other => {
                *other = toml::Value::Table(toml::map::Map::new());
                match other {
                    toml::Value::Table(table) => table,
                    _ => unreachable!(),
                }
            }
        };
        current = table
            .entry(segment.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let toml::Value::Table(table) = current {
        table.insert(last.to_string(), value);
    }
}

fn apply_env_overrides(root: &mut toml::Value) {
    for (var, path) in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(var) {
            tracing::debug!("Overriding {} from {}", path.join("."), var);
            set_path(root, path, toml::Value::String(value));
        }
    }
}

impl ModmailConfig {
    /// Load configuration with the standard precedence: packaged defaults,
    /// then the first discovered user file, then environment overrides.
    pub fn load() -> Result<Self> {
        match determine_file_path(CONFIG_PATHS.iter().copied()) {
            Some(path) => Self::from_file(path),
            None => Self::from_user_str(""),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_user_str(&content)
    }

    /// Parse a user config fragment and merge it over the packaged defaults.
    pub fn from_user_str(user_content: &str) -> Result<Self> {
        let mut merged: toml::Value = toml::from_str(DEFAULT_CONFIG)?;

        if !user_content.trim().is_empty() {
            let processed = substitute_env_vars(user_content);
            let user_value: toml::Value = toml::from_str(&processed)?;
            deep_merge(&mut merged, user_value);
        }

        apply_env_overrides(&mut merged);

        merged
            .try_into()
            .map_err(|e| ModmailError::InvalidConfigValueError {
                field: "config".to_string(),
                value: String::new(),
                reason: format!("Config deserialization error: {}", e),
            })
    }
}
