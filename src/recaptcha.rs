//! reCAPTCHA `siteverify` client.
use crate::wizard::gate::{BotVerdict, BotVerifier};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    // Absent for non-scoring keys; treated as the lowest score.
    #[serde(default)]
    score: f64,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Verifies tokens against the reCAPTCHA service with a server secret.
#[derive(Debug, Clone)]
pub struct RecaptchaVerifier {
    endpoint: String,
    secret: String,
    token: Option<String>,
}

impl RecaptchaVerifier {
    pub fn new(endpoint: &str, secret: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            secret: secret.to_string(),
            token: None,
        }
    }

    /// Token issued to the client for the submission being gated.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }
}

impl BotVerifier for RecaptchaVerifier {
    fn token(&self) -> Result<String> {
        self.token
            .clone()
            .ok_or_else(|| anyhow!("no bot verification token supplied"))
    }

    fn verify(&self, token: &str) -> Result<BotVerdict> {
        let mut response = ureq::post(&self.endpoint)
            .send_form([("secret", self.secret.as_str()), ("response", token)])
            .with_context(|| format!("post token to {}", self.endpoint))?;
        let parsed: SiteVerifyResponse = response
            .body_mut()
            .read_json()
            .context("parse siteverify response")?;
        if !parsed.error_codes.is_empty() {
            tracing::debug!(codes = ?parsed.error_codes, "siteverify reported errors");
        }
        Ok(BotVerdict {
            success: parsed.success,
            score: parsed.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_counts_as_missing() {
        let verifier = RecaptchaVerifier::new(SITEVERIFY_URL, "secret").with_token(Some(" ".into()));
        assert!(verifier.token().is_err());
        let verifier = RecaptchaVerifier::new(SITEVERIFY_URL, "secret").with_token(Some("abc".into()));
        assert_eq!(verifier.token().expect("token"), "abc");
    }

    #[test]
    fn siteverify_response_defaults_missing_score() {
        let parsed: SiteVerifyResponse =
            serde_json::from_str(r#"{"success": true}"#).expect("parse response");
        assert!(parsed.success);
        assert_eq!(parsed.score, 0.0);

        let parsed: SiteVerifyResponse = serde_json::from_str(
            r#"{"success": false, "score": 0.3, "error-codes": ["timeout-or-duplicate"]}"#,
        )
        .expect("parse response");
        assert_eq!(parsed.error_codes, vec!["timeout-or-duplicate"]);
    }
}
