//! Site configuration.
//!
//! `studio.json` holds everything that is fixed per deployment: the base path,
//! the placeholder image, contact-list routing, and whether the bot check is
//! on. Secrets never live in the file; they come from the environment.
use crate::inquiry::DEFAULT_SOURCE;
use crate::paths::SitePaths;
use crate::recaptcha::SITEVERIFY_URL;
use crate::resolver::{PathResolver, PLACEHOLDER_IMAGE};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

pub const BREVO_API_URL: &str = "https://api.brevo.com/v3";

pub const BREVO_API_KEY_ENV: &str = "BREVO_API_KEY";
pub const LEGACY_API_KEY_ENV: &str = "SENDINBLUE_API_KEY";
pub const RECAPTCHA_SECRET_ENV: &str = "RECAPTCHA_SECRET_KEY";
const BCRYPT_HASH_LEN: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub schema_version: u32,
    /// URL prefix the exported site is served under; empty at a root domain.
    #[serde(default)]
    pub base_path: String,
    #[serde(default = "default_placeholder")]
    pub placeholder_image: String,
    /// Tag stored on every inquiry.
    #[serde(default = "default_source")]
    pub inquiry_source: String,
    #[serde(default)]
    pub contact_list: ContactListConfig,
    #[serde(default)]
    pub bot_verification: BotVerificationConfig,
    /// Bcrypt hash of the admin password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactListConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_list_ids")]
    pub list_ids: Vec<u64>,
}

impl Default for ContactListConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            list_ids: default_list_ids(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotVerificationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
}

impl Default for BotVerificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verify_url: default_verify_url(),
        }
    }
}

fn default_placeholder() -> String {
    PLACEHOLDER_IMAGE.to_string()
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_api_url() -> String {
    BREVO_API_URL.to_string()
}

fn default_list_ids() -> Vec<u64> {
    vec![2]
}

fn default_verify_url() -> String {
    SITEVERIFY_URL.to_string()
}

/// Config written by `studio init`.
pub fn default_config() -> SiteConfig {
    SiteConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        base_path: String::new(),
        placeholder_image: default_placeholder(),
        inquiry_source: default_source(),
        contact_list: ContactListConfig::default(),
        bot_verification: BotVerificationConfig::default(),
        admin_password_hash: None,
    }
}

/// Load and validate `studio.json`; a site without one uses the defaults.
pub fn load_config(paths: &SitePaths) -> Result<SiteConfig> {
    let path = paths.config_path();
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no site config; using defaults");
        return Ok(default_config());
    }
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: SiteConfig = serde_json::from_slice(&bytes).context("parse site config JSON")?;
    validate_config(&config)?;
    Ok(config)
}

/// Persist a config in a stable JSON format.
pub fn write_config(paths: &SitePaths, config: &SiteConfig) -> Result<()> {
    let path = paths.config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create site dir")?;
    }
    let text = serde_json::to_string_pretty(config).context("serialize site config")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_config(config: &SiteConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported site config schema_version {}",
            config.schema_version
        ));
    }
    let base = config.base_path.trim();
    if base.contains("://") || base.contains(char::is_whitespace) || base.contains('?') {
        return Err(anyhow!(
            "base_path must be a plain URL path such as \"/portfolio\" (got {:?})",
            config.base_path
        ));
    }
    if config.placeholder_image.trim().is_empty() {
        return Err(anyhow!("placeholder_image must be non-empty"));
    }
    if config.inquiry_source.trim().is_empty() {
        return Err(anyhow!("inquiry_source must be non-empty"));
    }
    if config.contact_list.list_ids.is_empty() {
        return Err(anyhow!("contact_list.list_ids must name at least one list"));
    }
    if let Some(hash) = config.admin_password_hash.as_deref() {
        if hash.len() != BCRYPT_HASH_LEN || !hash.starts_with("$2") {
            return Err(anyhow!("admin_password_hash must be a bcrypt hash"));
        }
    }
    Ok(())
}

impl SiteConfig {
    /// Build the path resolver for this deployment.
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(&self.base_path, &self.placeholder_image)
    }
}

/// Secrets read from the process environment once at startup.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub contact_api_key: Option<String>,
    pub recaptcha_secret: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            contact_api_key: read(BREVO_API_KEY_ENV).or_else(|| read(LEGACY_API_KEY_ENV)),
            recaptcha_secret: read(RECAPTCHA_SECRET_ENV),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
