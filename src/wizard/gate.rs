//! Final-step submission gate: honeypot, bot score, normalization, forwarding.
use super::steps::StepRegistry;
use super::{FieldValues, WizardError};
use crate::contacts::ContactList;
use crate::inquiry::{InquiryRecord, DEFAULT_SOURCE};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Hidden contact-form field that only automated submitters fill in.
pub const HONEYPOT_FIELD: &str = "website";

/// Field a browser host uses to carry a bot-verification token.
pub const TOKEN_FIELD: &str = "recaptchaToken";

/// Fields that never leave the gate.
pub const TRANSIENT_FIELDS: [&str; 2] = [HONEYPOT_FIELD, TOKEN_FIELD];

/// Scores below this are treated as automated traffic.
pub const MIN_BOT_SCORE: f64 = 0.5;

pub const SPAM_REJECTION_MESSAGE: &str = "Spam protection check failed. Please try again.";

/// Result of verifying a bot-verification token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotVerdict {
    pub success: bool,
    pub score: f64,
}

impl BotVerdict {
    pub fn passes(&self) -> bool {
        self.success && self.score >= MIN_BOT_SCORE
    }
}

/// Token-based anti-automation check.
pub trait BotVerifier {
    /// Obtain a token for the current submission.
    fn token(&self) -> Result<String>;
    /// Ask the verification service to score `token`.
    fn verify(&self, token: &str) -> Result<BotVerdict>;
}

/// What happened to the record after the gate accepted the submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Forwarding {
    /// The contact list accepted the record.
    Delivered,
    /// The honeypot was filled; nothing was forwarded.
    SkippedHoneypot,
    /// Forwarding failed; the user still sees success.
    Failed(String),
}

/// Accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub forwarding: Forwarding,
    /// The normalized record, absent on the honeypot path.
    pub record: Option<InquiryRecord>,
}

pub struct SubmissionGate<'a> {
    contacts: &'a dyn ContactList,
    verifier: Option<&'a dyn BotVerifier>,
    source: String,
}

impl<'a> SubmissionGate<'a> {
    pub fn new(contacts: &'a dyn ContactList) -> Self {
        Self {
            contacts,
            verifier: None,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    pub fn with_verifier(mut self, verifier: &'a dyn BotVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Run the gate over validated answers.
    pub fn submit(
        &self,
        registry: &StepRegistry,
        values: &FieldValues,
        now: DateTime<Utc>,
    ) -> Result<GateOutcome, WizardError> {
        if values
            .get(HONEYPOT_FIELD)
            .is_some_and(|value| !value.is_empty())
        {
            tracing::info!("honeypot filled; reporting success without forwarding");
            return Ok(GateOutcome {
                forwarding: Forwarding::SkippedHoneypot,
                record: None,
            });
        }

        if let Some(verifier) = self.verifier {
            check_bot_score(verifier)?;
        }

        let record = InquiryRecord::from_values(registry, values, &self.source, now);
        let forwarding = match self.contacts.add_contact(&record) {
            Ok(()) => {
                tracing::info!(email = %record.email, "inquiry forwarded to contact list");
                Forwarding::Delivered
            }
            Err(err) => {
                tracing::error!(
                    email = %record.email,
                    error = %format!("{err:#}"),
                    "contact list forwarding failed; reporting success"
                );
                Forwarding::Failed(format!("{err:#}"))
            }
        };
        Ok(GateOutcome {
            forwarding,
            record: Some(record),
        })
    }
}

fn check_bot_score(verifier: &dyn BotVerifier) -> Result<(), WizardError> {
    let verdict = verifier
        .token()
        .and_then(|token| verifier.verify(&token))
        .map_err(|err| {
            tracing::warn!(error = %format!("{err:#}"), "bot verification unavailable");
            WizardError::SpamRejected(SPAM_REJECTION_MESSAGE.to_string())
        })?;
    if !verdict.passes() {
        tracing::warn!(
            success = verdict.success,
            score = verdict.score,
            "bot verification rejected submission"
        );
        return Err(WizardError::SpamRejected(
            SPAM_REJECTION_MESSAGE.to_string(),
        ));
    }
    Ok(())
}
