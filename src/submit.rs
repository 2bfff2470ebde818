//! Server side of `submitInquiry`.
//!
//! Accepts the JSON body a browser posts, checks required fields and the bot
//! score, forwards the record, and always answers success once the record is
//! accepted. Forwarding failures go to the operations log instead.
use crate::contacts::ContactList;
use crate::inquiry::{SubmissionPayload, MISSING_FIELDS_ERROR};
use crate::ops_log::{append_failure, ForwardFailure};
use crate::wizard::gate::{BotVerifier, HONEYPOT_FIELD, SPAM_REJECTION_MESSAGE};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::path::PathBuf;

pub const SUCCESS_MESSAGE: &str = "Thank you for your inquiry. We will be in touch soon.";

/// JSON reply with an HTTP-style status code.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointReply {
    pub status: u16,
    pub body: Value,
}

impl EndpointReply {
    pub fn success() -> Self {
        Self {
            status: 200,
            body: json!({ "success": true, "message": SUCCESS_MESSAGE }),
        }
    }

    pub fn error(status: u16, error: &str, message: Option<&str>) -> Self {
        let body = match message {
            Some(message) => json!({ "error": error, "message": message }),
            None => json!({ "error": error }),
        };
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct InquiryEndpoint<'a> {
    contacts: &'a dyn ContactList,
    verifier: Option<&'a dyn BotVerifier>,
    default_source: String,
    failures_path: PathBuf,
}

impl<'a> InquiryEndpoint<'a> {
    pub fn new(
        contacts: &'a dyn ContactList,
        default_source: impl Into<String>,
        failures_path: PathBuf,
    ) -> Self {
        Self {
            contacts,
            verifier: None,
            default_source: default_source.into(),
            failures_path,
        }
    }

    pub fn with_verifier(mut self, verifier: &'a dyn BotVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn handle(&self, raw_body: &str, now: DateTime<Utc>) -> EndpointReply {
        let payload: SubmissionPayload = match serde_json::from_str(raw_body) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "unparseable inquiry body");
                return EndpointReply::error(400, "Invalid request body", None);
            }
        };

        if payload
            .form_data
            .get(HONEYPOT_FIELD)
            .is_some_and(|value| !value.is_empty())
        {
            tracing::info!("honeypot filled; reporting success without forwarding");
            return EndpointReply::success();
        }

        let token = payload.recaptcha_token.clone();
        let record = match payload.into_record(&self.default_source, now) {
            Ok(record) => record,
            Err(_) => return EndpointReply::error(400, MISSING_FIELDS_ERROR, None),
        };

        if let Some(verifier) = self.verifier {
            let passed = match token.as_deref().filter(|token| !token.trim().is_empty()) {
                Some(token) => match verifier.verify(token) {
                    Ok(verdict) => {
                        if !verdict.passes() {
                            tracing::warn!(score = verdict.score, "bot verification rejected inquiry");
                        }
                        verdict.passes()
                    }
                    Err(err) => {
                        tracing::warn!(error = %format!("{err:#}"), "bot verification unavailable");
                        false
                    }
                },
                None => {
                    tracing::warn!("inquiry arrived without a bot verification token");
                    false
                }
            };
            if !passed {
                return EndpointReply::error(400, SPAM_REJECTION_MESSAGE, None);
            }
        }

        if let Err(err) = self.contacts.add_contact(&record) {
            let error = format!("{err:#}");
            tracing::error!(
                sink = self.contacts.name(),
                email = %record.email,
                error = %error,
                "contact list forwarding failed; reporting success"
            );
            let failure = ForwardFailure {
                logged_at: now,
                sink: self.contacts.name().to_string(),
                email: record.email.clone(),
                submitted_at: record.submitted_at,
                error,
            };
            if let Err(log_err) = append_failure(&self.failures_path, &failure) {
                tracing::error!(error = %format!("{log_err:#}"), "could not record forwarding failure");
            }
        } else {
            tracing::info!(sink = self.contacts.name(), email = %record.email, "inquiry accepted");
        }
        EndpointReply::success()
    }
}
