use super::gate::{BotVerdict, BotVerifier, Forwarding, SubmissionGate, SPAM_REJECTION_MESSAGE};
use super::steps::StepRegistry;
use super::*;
use crate::contacts::ContactList;
use crate::inquiry::InquiryRecord;
use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};

#[derive(Default)]
struct SpyContactList {
    received: RefCell<Vec<InquiryRecord>>,
    fail_with: Option<&'static str>,
}

impl ContactList for SpyContactList {
    fn name(&self) -> &'static str {
        "spy"
    }

    fn add_contact(&self, record: &InquiryRecord) -> Result<()> {
        self.received.borrow_mut().push(record.clone());
        match self.fail_with {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}

struct FixedScore {
    score: f64,
    unavailable: bool,
    calls: Cell<usize>,
}

impl FixedScore {
    fn new(score: f64) -> Self {
        Self {
            score,
            unavailable: false,
            calls: Cell::new(0),
        }
    }

    fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(0.0)
        }
    }
}

impl BotVerifier for FixedScore {
    fn token(&self) -> Result<String> {
        Ok("token".to_string())
    }

    fn verify(&self, _token: &str) -> Result<BotVerdict> {
        self.calls.set(self.calls.get() + 1);
        if self.unavailable {
            return Err(anyhow!("connection refused"));
        }
        Ok(BotVerdict {
            success: true,
            score: self.score,
        })
    }
}

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

fn many(values: &[&str]) -> FieldValue {
    FieldValue::Many(values.iter().map(|value| value.to_string()).collect())
}

fn answer(field: &str, value: FieldValue) -> FieldValues {
    FieldValues::from([(field.to_string(), value)])
}

fn contact_answers() -> FieldValues {
    FieldValues::from([
        ("firstName".to_string(), text("Ada")),
        ("lastName".to_string(), text("Lovelace")),
        ("email".to_string(), text("ada@example.com")),
        ("phone".to_string(), text("555-0100")),
        ("comments".to_string(), text("Interested in the tide series")),
        ("consent".to_string(), FieldValue::Flag(true)),
    ])
}

/// Answer the five selection steps so the wizard sits on the contact step.
fn walk_to_contact_step(wizard: &mut WizardController<'_>) {
    let answers = [
        answer("collectionExperience", text("experienced")),
        answer("inquiryType", text("open")),
        answer("acquisitionGoals", many(&["investment", "legacy"])),
        answer("collectionTier", text("tier2")),
        answer("inquiryRoles", many(&["private"])),
    ];
    for (index, values) in answers.into_iter().enumerate() {
        assert_eq!(wizard.advance(values), Ok(Advance::Moved(index + 1)));
    }
    assert_eq!(wizard.phase(), WizardPhase::Editing(5));
    assert!(wizard.is_final_step());
}

#[test]
fn advance_moves_exactly_one_step() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let mut wizard = WizardController::new(&registry, SubmissionGate::new(&spy));

    assert_eq!(wizard.phase(), WizardPhase::Editing(0));
    assert_eq!(
        wizard.current_step().map(|step| step.field_name),
        Some("collectionExperience")
    );
    let moved = wizard.advance(answer("collectionExperience", text("new")));
    assert_eq!(moved, Ok(Advance::Moved(1)));
    assert_eq!(wizard.state().current_step_index, 1);
    assert_eq!(wizard.registry().step_count(), 6);
}

#[test]
fn invalid_step_does_not_move() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let mut wizard = WizardController::new(&registry, SubmissionGate::new(&spy));

    let err = wizard
        .advance(FieldValues::new())
        .expect_err("empty answer must fail");
    match err {
        WizardError::Invalid(errors) => assert!(errors.contains_key("collectionExperience")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(wizard.phase(), WizardPhase::Editing(0));
    assert!(wizard.state().field_values.is_empty());
}

#[test]
fn retreat_keeps_answers() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let mut wizard = WizardController::new(&registry, SubmissionGate::new(&spy));

    assert!(!wizard.retreat());
    wizard
        .advance(answer("collectionExperience", text("beginner")))
        .expect("advance");
    assert!(wizard.retreat());
    assert_eq!(wizard.phase(), WizardPhase::Editing(0));
    assert_eq!(
        wizard.state().field_values.get("collectionExperience"),
        Some(&text("beginner"))
    );
    // The earlier answer already satisfies the step.
    assert_eq!(wizard.advance(FieldValues::new()), Ok(Advance::Moved(1)));
}

#[test]
fn honeypot_reports_success_without_forwarding() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let verifier = FixedScore::new(0.9);
    let gate = SubmissionGate::new(&spy).with_verifier(&verifier);
    let mut wizard = WizardController::new(&registry, gate);
    walk_to_contact_step(&mut wizard);

    let mut values = contact_answers();
    values.insert("website".to_string(), text("http://spam.example"));
    let outcome = wizard.advance(values).expect("honeypot path succeeds");

    assert_eq!(
        outcome,
        Advance::Submitted(GateOutcome {
            forwarding: Forwarding::SkippedHoneypot,
            record: None,
        })
    );
    assert_eq!(wizard.phase(), WizardPhase::Submitted);
    assert!(spy.received.borrow().is_empty());
    assert_eq!(verifier.calls.get(), 0);
}

#[test]
fn whitespace_honeypot_is_not_forwarded() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let mut wizard = WizardController::new(&registry, SubmissionGate::new(&spy));
    walk_to_contact_step(&mut wizard);

    let mut values = contact_answers();
    values.insert("website".to_string(), text("   "));
    let outcome = wizard.advance(values).expect("honeypot path succeeds");

    assert!(matches!(
        outcome,
        Advance::Submitted(GateOutcome {
            forwarding: Forwarding::SkippedHoneypot,
            ..
        })
    ));
    assert!(spy.received.borrow().is_empty());
}

#[test]
fn low_score_is_rejected_and_answers_kept() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let verifier = FixedScore::new(0.3);
    let gate = SubmissionGate::new(&spy).with_verifier(&verifier);
    let mut wizard = WizardController::new(&registry, gate);
    walk_to_contact_step(&mut wizard);

    let err = wizard.advance(contact_answers()).expect_err("low score");
    assert_eq!(
        err,
        WizardError::SpamRejected(SPAM_REJECTION_MESSAGE.to_string())
    );
    assert_eq!(wizard.phase(), WizardPhase::Editing(5));
    assert!(spy.received.borrow().is_empty());
    assert_eq!(
        wizard.state().field_values.get("email"),
        Some(&text("ada@example.com"))
    );
}

#[test]
fn unavailable_verifier_counts_as_rejection() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let verifier = FixedScore::unavailable();
    let gate = SubmissionGate::new(&spy).with_verifier(&verifier);
    let mut wizard = WizardController::new(&registry, gate);
    walk_to_contact_step(&mut wizard);

    let err = wizard.advance(contact_answers()).expect_err("verifier down");
    assert!(matches!(err, WizardError::SpamRejected(_)));
    assert_eq!(wizard.phase(), WizardPhase::Editing(5));
    assert!(spy.received.borrow().is_empty());
}

#[test]
fn forwarding_failure_still_submits() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList {
        fail_with: Some("contact list API error (500): boom"),
        ..SpyContactList::default()
    };
    let mut wizard = WizardController::new(&registry, SubmissionGate::new(&spy));
    walk_to_contact_step(&mut wizard);

    let outcome = wizard.advance(contact_answers()).expect("submitted");
    let Advance::Submitted(outcome) = outcome else {
        panic!("expected submission, got {outcome:?}");
    };
    assert!(matches!(outcome.forwarding, Forwarding::Failed(ref message) if message.contains("boom")));
    assert!(outcome.record.is_some());
    assert_eq!(wizard.phase(), WizardPhase::Submitted);
    assert_eq!(spy.received.borrow().len(), 1);
}

#[test]
fn submitted_wizard_is_terminal() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let mut wizard = WizardController::new(&registry, SubmissionGate::new(&spy));
    walk_to_contact_step(&mut wizard);
    wizard.advance(contact_answers()).expect("submitted");

    assert_eq!(
        wizard.advance(FieldValues::new()),
        Err(WizardError::AlreadySubmitted)
    );
    assert!(!wizard.retreat());
    assert!(wizard.current_step().is_none());
    assert_eq!(spy.received.borrow().len(), 1);
}

#[test]
fn accepted_inquiry_reaches_contact_list_once() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let verifier = FixedScore::new(0.9);
    let gate = SubmissionGate::new(&spy)
        .with_verifier(&verifier)
        .with_source("studio_test");
    let mut wizard = WizardController::new(&registry, gate);
    walk_to_contact_step(&mut wizard);

    let outcome = wizard.advance(contact_answers()).expect("submitted");
    assert!(matches!(
        outcome,
        Advance::Submitted(GateOutcome {
            forwarding: Forwarding::Delivered,
            record: Some(_),
        })
    ));
    assert_eq!(verifier.calls.get(), 1);

    let received = spy.received.borrow();
    assert_eq!(received.len(), 1);
    let record = &received[0];
    assert_eq!(record.first_name, "Ada");
    assert_eq!(record.last_name, "Lovelace");
    assert_eq!(record.email, "ada@example.com");
    assert_eq!(record.phone.as_deref(), Some("555-0100"));
    assert_eq!(record.comments.as_deref(), Some("Interested in the tide series"));
    assert!(record.consent_given);
    assert_eq!(record.source, "studio_test");
    assert_eq!(
        record.form_responses.keys().collect::<Vec<_>>(),
        vec![
            "acquisitionGoals",
            "collectionExperience",
            "collectionTier",
            "inquiryRoles",
            "inquiryType"
        ]
    );
    assert_eq!(
        record.form_responses.get("acquisitionGoals"),
        Some(&many(&["investment", "legacy"]))
    );
    assert!(!record.form_responses.contains_key("website"));
}

#[test]
fn contact_errors_are_reported_per_field() {
    let registry = StepRegistry::acquisition_inquiry();
    let spy = SpyContactList::default();
    let mut wizard = WizardController::new(&registry, SubmissionGate::new(&spy));
    walk_to_contact_step(&mut wizard);

    let mut values = contact_answers();
    values.insert("email".to_string(), text("not-an-email"));
    values.insert("consent".to_string(), FieldValue::Flag(false));
    let err = wizard.advance(values).expect_err("invalid contact step");
    let WizardError::Invalid(errors) = err else {
        panic!("expected field errors");
    };
    assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["consent", "email"]);
    assert!(spy.received.borrow().is_empty());
}

#[test]
fn flat_string_rendering() {
    assert_eq!(FieldValue::Flag(true).to_flat_string(), "Yes");
    assert_eq!(many(&["a", "b"]).to_flat_string(), "a, b");
    assert!(text("").is_empty());
    assert!(!text("  ").is_empty());
    assert!(FieldValue::Flag(false).is_empty());
    assert!(!many(&["a"]).is_empty());
}
