//! Inquiry records and the `submitInquiry` wire format.
//!
//! `InquiryRecord` is what the contact list receives. `SubmissionPayload` is
//! the JSON body a browser posts; the two differ only in naming (`comments`
//! travels as `message`, answers as `formData`) and in the transient token.
use crate::wizard::gate::TRANSIENT_FIELDS;
use crate::wizard::steps::{
    StepRegistry, COMMENTS_FIELD, CONSENT_FIELD, EMAIL_FIELD, FIRST_NAME_FIELD, LAST_NAME_FIELD,
    PHONE_FIELD,
};
use crate::wizard::{FieldValue, FieldValues};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source tag recorded when the config does not override it.
pub const DEFAULT_SOURCE: &str = "website_acquisition_form";

pub const MISSING_FIELDS_ERROR: &str =
    "Missing required fields: email, firstName, and lastName are required";

/// Normalized inquiry, created once per accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub form_responses: BTreeMap<String, FieldValue>,
    pub submitted_at: DateTime<Utc>,
    pub consent_given: bool,
    pub source: String,
}

impl InquiryRecord {
    /// Normalize wizard answers into a record.
    ///
    /// Step answers land in `form_responses`; contact fields become top-level
    /// fields; transient fields are dropped.
    pub fn from_values(
        registry: &StepRegistry,
        values: &FieldValues,
        source: &str,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let text = |name: &str| {
            values
                .get(name)
                .and_then(FieldValue::as_text)
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        let optional = |name: &str| Some(text(name)).filter(|value| !value.is_empty());

        let form_responses = registry
            .steps()
            .iter()
            .filter(|step| !step.presentation.is_contact_form())
            .filter(|step| !TRANSIENT_FIELDS.contains(&step.field_name))
            .filter_map(|step| {
                values
                    .get(step.field_name)
                    .map(|value| (step.field_name.to_string(), value.clone()))
            })
            .collect();

        Self {
            first_name: text(FIRST_NAME_FIELD),
            last_name: text(LAST_NAME_FIELD),
            email: text(EMAIL_FIELD),
            phone: optional(PHONE_FIELD),
            comments: optional(COMMENTS_FIELD),
            form_responses,
            submitted_at,
            consent_given: values.get(CONSENT_FIELD) == Some(&FieldValue::Flag(true)),
            source: source.to_string(),
        }
    }
}

/// JSON body of `POST /submitInquiry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub form_data: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub consent_given: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recaptcha_token: Option<String>,
}

impl SubmissionPayload {
    /// Build the body a browser host would post for `record`.
    pub fn from_record(record: &InquiryRecord, recaptcha_token: Option<String>) -> Self {
        Self {
            first_name: Some(record.first_name.clone()),
            last_name: Some(record.last_name.clone()),
            email: Some(record.email.clone()),
            phone: record.phone.clone(),
            message: record.comments.clone(),
            form_data: record.form_responses.clone(),
            submitted_at: Some(record.submitted_at.to_rfc3339()),
            consent_given: record.consent_given,
            source: Some(record.source.clone()),
            recaptcha_token,
        }
    }

    fn required(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Convert into a record; the token is not carried over.
    ///
    /// `submittedAt` accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC); anything
    /// else is replaced by `now`.
    pub fn into_record(self, default_source: &str, now: DateTime<Utc>) -> Result<InquiryRecord> {
        let (Some(first_name), Some(last_name), Some(email)) = (
            Self::required(&self.first_name),
            Self::required(&self.last_name),
            Self::required(&self.email),
        ) else {
            return Err(anyhow!(MISSING_FIELDS_ERROR));
        };
        let submitted_at = self
            .submitted_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now);
        let mut form_responses = self.form_data;
        for field in TRANSIENT_FIELDS {
            form_responses.remove(field);
        }
        Ok(InquiryRecord {
            first_name,
            last_name,
            email,
            phone: Self::required(&self.phone),
            comments: Self::required(&self.message),
            form_responses,
            submitted_at,
            consent_given: self.consent_given,
            source: Self::required(&self.source).unwrap_or_else(|| default_source.to_string()),
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Convert a camelCase field name to the UPPER_SNAKE attribute name used by
/// contact-list services.
pub fn upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() && index > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}

/// Flatten a record into contact attributes.
pub fn contact_attributes(record: &InquiryRecord) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    attributes.insert("FIRSTNAME".to_string(), record.first_name.clone());
    attributes.insert("LASTNAME".to_string(), record.last_name.clone());
    attributes.insert(
        "PHONE".to_string(),
        record.phone.clone().unwrap_or_default(),
    );
    attributes.insert(
        "MESSAGE".to_string(),
        record.comments.clone().unwrap_or_default(),
    );
    attributes.insert("SOURCE".to_string(), record.source.clone());
    attributes.insert(
        "CONSENT".to_string(),
        FieldValue::Flag(record.consent_given).to_flat_string(),
    );
    attributes.insert("SUBMITTED_AT".to_string(), record.submitted_at.to_rfc3339());
    for (name, value) in &record.form_responses {
        attributes.insert(upper_snake(name), value.to_flat_string());
    }
    attributes
}
