use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ReleaseFlowError, Result};

/// File name of the per-project configuration, looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = "gitflow.toml";

/// Sentinel branch whose presence on the remote means "release in progress".
pub const DEFAULT_LOCK_BRANCH: &str = "release_lock";

/// DingTalk robot endpoint; `{token}` is replaced with `notify_token`.
pub const DEFAULT_NOTIFY_URL: &str = "https://oapi.dingtalk.com/robot/send?access_token={token}";

/// Represents the complete configuration for git-release-flow.
///
/// Resolved once per invocation and handed to the workflow as a read-only value.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_release_branch")]
    pub release_branch: String,

    #[serde(default = "default_master_branch")]
    pub master_branch: String,

    #[serde(default)]
    pub tag_prefix: String,

    #[serde(default)]
    pub notify_token: Option<String>,

    #[serde(default = "default_notify_url")]
    pub notify_url: String,

    #[serde(default = "default_lock_branch")]
    pub lock_branch: String,

    #[serde(default)]
    pub conflict_strategy: ConflictStrategyConfig,
}

/// How merge conflicts are handled when a merge stops.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategyConfig {
    /// Ask the operator for every conflicting file
    #[default]
    Prompt,
    /// Keep the target branch side
    Ours,
    /// Take the incoming branch side
    Theirs,
    /// Hand every file to `git mergetool`
    Manual,
}

fn default_release_branch() -> String {
    "release".to_string()
}

fn default_master_branch() -> String {
    "master".to_string()
}

fn default_notify_url() -> String {
    DEFAULT_NOTIFY_URL.to_string()
}

fn default_lock_branch() -> String {
    DEFAULT_LOCK_BRANCH.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            release_branch: default_release_branch(),
            master_branch: default_master_branch(),
            tag_prefix: String::new(),
            notify_token: None,
            notify_url: default_notify_url(),
            lock_branch: default_lock_branch(),
            conflict_strategy: ConflictStrategyConfig::default(),
        }
    }
}

impl Config {
    /// Checks the values the release workflow cannot run without.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("release_branch", &self.release_branch),
            ("master_branch", &self.master_branch),
            ("lock_branch", &self.lock_branch),
        ] {
            if value.trim().is_empty() {
                return Err(ReleaseFlowError::config(format!("{} must not be empty", key)));
            }
        }

        if self.lock_branch == self.release_branch || self.lock_branch == self.master_branch {
            return Err(ReleaseFlowError::config(format!(
                "lock_branch '{}' must differ from the release and master branches",
                self.lock_branch
            )));
        }

        Ok(())
    }

    /// Webhook URL for third-party notification, or `None` when no token is set.
    pub fn notify_endpoint(&self) -> Option<String> {
        self.notify_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| self.notify_url.replace("{token}", token))
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitflow.toml` at the project root, when one is known
/// 3. `gitflow.toml` in current directory
/// 4. `.gitflow.toml` in user config directory
/// 5. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&str>, project_root: Option<&Path>) -> Result<Config> {
    let project_file = project_root
        .map(|root| root.join(CONFIG_FILE_NAME))
        .filter(|path| path.exists());

    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if let Some(path) = project_file {
        fs::read_to_string(path)?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config: Config = toml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

/// Serializes a default configuration for `init-config`.
pub fn render_default_config() -> Result<String> {
    toml::to_string_pretty(&Config::default())
        .map_err(|e| ReleaseFlowError::config(format!("cannot render default config: {}", e)))
}
