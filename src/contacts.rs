//! Contact-list collaborators.
//!
//! Accepted inquiries go to exactly one sink: the Brevo contacts API when an
//! API key is configured, otherwise the local `data/inquiries.json` file. A
//! dry-run sink only logs.
use crate::inquiry::{contact_attributes, InquiryRecord, SubmissionPayload};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

const MAX_ERROR_DETAIL_BYTES: usize = 300;

/// Receives accepted inquiries.
pub trait ContactList {
    /// Short name used in logs.
    fn name(&self) -> &'static str;
    fn add_contact(&self, record: &InquiryRecord) -> Result<()>;
}

/// Brevo (formerly Sendinblue) contacts API.
#[derive(Debug, Clone)]
pub struct BrevoContactList {
    api_url: String,
    api_key: String,
    list_ids: Vec<u64>,
}

impl BrevoContactList {
    pub fn new(api_url: &str, api_key: &str, list_ids: Vec<u64>) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            list_ids,
        }
    }

    /// Body of `POST /contacts`; existing contacts are updated in place.
    pub fn request_body(&self, record: &InquiryRecord) -> serde_json::Value {
        json!({
            "email": record.email,
            "attributes": contact_attributes(record),
            "listIds": self.list_ids,
            "updateEnabled": true,
        })
    }
}

impl ContactList for BrevoContactList {
    fn name(&self) -> &'static str {
        "brevo"
    }

    fn add_contact(&self, record: &InquiryRecord) -> Result<()> {
        let url = format!("{}/contacts", self.api_url);
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        let mut response = agent
            .post(&url)
            .header("api-key", &self.api_key)
            .send_json(self.request_body(record))
            .with_context(|| format!("post contact to {url}"))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.body_mut().read_to_string().unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(anyhow!(
            "contact list API error ({}): {}",
            status.as_u16(),
            clip(&detail, MAX_ERROR_DETAIL_BYTES)
        ))
    }
}

/// Cut `text` to at most `max_bytes`, backing off to a char boundary.
fn clip(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct InquiriesFile {
    #[serde(default)]
    inquiries: Vec<SubmissionPayload>,
}

/// Appends inquiries to a local JSON file when no API key is available.
#[derive(Debug, Clone)]
pub struct InquiryFileStore {
    path: PathBuf,
}

impl InquiryFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<InquiriesFile> {
        if !self.path.is_file() {
            return Ok(InquiriesFile::default());
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("read inquiries {}", self.path.display()))?;
        serde_json::from_slice(&bytes).context("parse inquiries JSON")
    }
}

impl ContactList for InquiryFileStore {
    fn name(&self) -> &'static str {
        "inquiries_file"
    }

    fn add_contact(&self, record: &InquiryRecord) -> Result<()> {
        let mut file = self.load()?;
        file.inquiries.push(SubmissionPayload::from_record(record, None));
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("create data dir")?;
        }
        let text = serde_json::to_string_pretty(&file).context("serialize inquiries")?;
        fs::write(&self.path, text.as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}

/// Logs the inquiry instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct DryRunContactList;

impl ContactList for DryRunContactList {
    fn name(&self) -> &'static str {
        "dry_run"
    }

    fn add_contact(&self, record: &InquiryRecord) -> Result<()> {
        let attributes = contact_attributes(record);
        tracing::info!(
            email = %record.email,
            attributes = %serde_json::to_string(&attributes).unwrap_or_default(),
            "dry run: inquiry not delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inquiry::DEFAULT_SOURCE;
    use crate::wizard::FieldValue;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record(email: &str) -> InquiryRecord {
        let mut form_responses = BTreeMap::new();
        form_responses.insert(
            "collectionTier".to_string(),
            FieldValue::Text("tier2".to_string()),
        );
        InquiryRecord {
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            email: email.to_string(),
            phone: None,
            comments: Some("Hello".to_string()),
            form_responses,
            submitted_at: Utc::now(),
            consent_given: true,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    #[test]
    fn brevo_body_carries_list_and_attributes() {
        let brevo = BrevoContactList::new("https://api.brevo.com/v3/", "key", vec![2]);
        let body = brevo.request_body(&record("ada@example.com"));
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["listIds"], json!([2]));
        assert_eq!(body["updateEnabled"], true);
        assert_eq!(body["attributes"]["COLLECTION_TIER"], "tier2");
        assert_eq!(body["attributes"]["MESSAGE"], "Hello");
    }

    #[test]
    fn error_detail_is_clipped_on_char_boundary() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("héllo", 2), "h");
        assert_eq!(clip("héllo", 3), "hé");
    }

    #[test]
    fn file_store_appends_records() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("data").join("inquiries.json");
        let store = InquiryFileStore::new(path.clone());
        store.add_contact(&record("a@example.com")).expect("first");
        store.add_contact(&record("b@example.com")).expect("second");

        let text = fs::read_to_string(&path).expect("read inquiries");
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse inquiries");
        let inquiries = value["inquiries"].as_array().expect("inquiries array");
        assert_eq!(inquiries.len(), 2);
        assert_eq!(inquiries[1]["email"], "b@example.com");
        assert_eq!(inquiries[0]["formData"]["collectionTier"], "tier2");
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("inquiries.json");
        fs::write(&path, b"not json").expect("write corrupt file");
        let store = InquiryFileStore::new(path);
        assert!(store.add_contact(&record("a@example.com")).is_err());
    }
}
