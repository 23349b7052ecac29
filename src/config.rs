//! CLI configuration stored in `~/.circleci/config.yml`.

use std::{env, fs, path::Path, path::PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CIRCLECI_CONFIG";

/// Takes precedence over the token stored in the config file.
pub const TOKEN_ENV: &str = "CIRCLECI_TOKEN";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// e.g. `gh/CircleCI-Public/api-preview-docs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project_slug: Option<String>,
}

/// Keys accepted by `config set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigKey {
    ApiToken,
    DefaultProjectSlug,
}

impl CliConfig {
    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        let value = Some(value.into());
        match key {
            ConfigKey::ApiToken => self.api_token = value,
            ConfigKey::DefaultProjectSlug => self.default_project_slug = value,
        }
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        match key {
            ConfigKey::ApiToken => self.api_token.as_deref(),
            ConfigKey::DefaultProjectSlug => self.default_project_slug.as_deref(),
        }
    }

    /// Token to authenticate with: `CIRCLECI_TOKEN` first, then the file.
    pub fn resolve_token(&self) -> Option<String> {
        resolve_token_from(env::var(TOKEN_ENV).ok(), self)
    }
}

fn resolve_token_from(env_token: Option<String>, config: &CliConfig) -> Option<String> {
    env_token
        .filter(|t| !t.is_empty())
        .or_else(|| config.api_token.clone().filter(|t| !t.is_empty()))
}

pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(p) = env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(p));
    }

    let home = env::var("HOME")
        .map_err(|_| anyhow::anyhow!("Could not locate config (set {} or HOME)", CONFIG_PATH_ENV))?;
    Ok(PathBuf::from(home).join(".circleci").join("config.yml"))
}

/// Load the config file. A missing or empty file is an empty config.
pub fn load_config(path: &Path) -> anyhow::Result<CliConfig> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(CliConfig::default());
    }

    let cfg: CliConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(expand_config(cfg, |name| env::var(name).ok()))
}

pub fn save_config(path: &Path, config: &CliConfig) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let raw = serde_yaml::to_string(config)?;
    fs::write(path, raw).with_context(|| format!("Failed to write config {}", path.display()))?;
    Ok(())
}

/// Show only the first four characters of a token.
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

fn expand_env_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Some(val) = lookup(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}

fn expand_config(cfg: CliConfig, lookup: impl Fn(&str) -> Option<String>) -> CliConfig {
    CliConfig {
        api_token: cfg.api_token.map(|t| expand_env_vars(&t, &lookup)),
        default_project_slug: cfg
            .default_project_slug
            .map(|s| expand_env_vars(&s, &lookup)),
    }
}
