//! Shared-secret check for content mutations.
//!
//! The admin password is stored as a bcrypt hash, so hashes produced by
//! PHP's `password_hash` (`$2y$`) verify unchanged.
use crate::config::SiteConfig;
use anyhow::{anyhow, Context, Result};

pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).context("hash admin password")
}

/// Check `password` against the hash in the site config.
pub fn verify_password(config: &SiteConfig, password: Option<&str>) -> Result<()> {
    let Some(expected) = config.admin_password_hash.as_deref() else {
        return Err(anyhow!(
            "admin password not configured; run `studio admin hash-password` and set admin_password_hash"
        ));
    };
    let Some(password) = password.filter(|password| !password.is_empty()) else {
        return Err(anyhow!("Unauthorized: --password is required"));
    };
    let matched = bcrypt::verify(password, expected).context("check admin password hash")?;
    if !matched {
        tracing::warn!("admin password rejected");
        return Err(anyhow!("Invalid credentials"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    fn configured(password: &str) -> SiteConfig {
        let mut config = default_config();
        config.admin_password_hash = Some(hash_password(password, 4).expect("hash"));
        config
    }

    #[test]
    fn accepts_matching_password() {
        let config = configured("hunter2");
        assert!(verify_password(&config, Some("hunter2")).is_ok());
    }

    #[test]
    fn rejects_wrong_or_missing_password() {
        let config = configured("hunter2");
        let err = verify_password(&config, Some("hunter3")).expect_err("wrong password");
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(verify_password(&config, None).is_err());
        assert!(verify_password(&config, Some("")).is_err());
    }

    #[test]
    fn unconfigured_site_refuses_mutations() {
        let err = verify_password(&default_config(), Some("anything")).expect_err("no hash");
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("hunter2", 4).expect("hash");
        let second = hash_password("hunter2", 4).expect("hash");
        assert_ne!(first, second);
        assert!(first.starts_with("$2b$04$"));
    }

    #[test]
    fn php_style_hash_verifies() {
        let mut config = default_config();
        let hash = hash_password("hunter2", 4).expect("hash");
        config.admin_password_hash = Some(hash.replacen("$2b$", "$2y$", 1));
        assert!(verify_password(&config, Some("hunter2")).is_ok());
        assert!(verify_password(&config, Some("hunter3")).is_err());
    }
}
