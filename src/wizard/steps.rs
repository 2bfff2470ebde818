//! Step definitions for the acquisition inquiry wizard.
//!
//! The registry is the only place that knows how a step is presented and
//! validated; the controller treats steps as opaque indices.
use super::{FieldErrors, FieldValue, FieldValues};
use regex::Regex;
use std::sync::OnceLock;

pub const FIRST_NAME_FIELD: &str = "firstName";
pub const LAST_NAME_FIELD: &str = "lastName";
pub const EMAIL_FIELD: &str = "email";
pub const PHONE_FIELD: &str = "phone";
pub const COMMENTS_FIELD: &str = "comments";
pub const CONSENT_FIELD: &str = "consent";

/// How a step collects its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Radio group; exactly one option.
    SingleSelectRadio,
    /// Checkbox group that behaves like a radio group; re-selecting the checked
    /// option clears it.
    SingleSelectCheckbox,
    /// Checkbox group; any non-empty subset.
    MultiSelectCheckbox,
    /// Free-text contact fields plus consent.
    ContactForm,
}

impl Presentation {
    pub fn is_multi(&self) -> bool {
        matches!(self, Presentation::MultiSelectCheckbox)
    }

    pub fn is_contact_form(&self) -> bool {
        matches!(self, Presentation::ContactForm)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOption {
    pub value: &'static str,
    pub label: &'static str,
}

const fn option(value: &'static str, label: &'static str) -> StepOption {
    StepOption { value, label }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub title: &'static str,
    pub field_name: &'static str,
    pub presentation: Presentation,
    pub options: Vec<StepOption>,
}

impl StepDefinition {
    fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    /// Apply a click on `value` to the step's current answer.
    ///
    /// Returns `None` when the answer becomes empty. Values outside the option
    /// set leave the answer unchanged.
    pub fn select(&self, current: Option<&FieldValue>, value: &str) -> Option<FieldValue> {
        if !self.has_option(value) {
            return current.cloned();
        }
        match self.presentation {
            Presentation::SingleSelectRadio => Some(FieldValue::Text(value.to_string())),
            Presentation::SingleSelectCheckbox => match current {
                Some(FieldValue::Text(selected)) if selected == value => None,
                _ => Some(FieldValue::Text(value.to_string())),
            },
            Presentation::MultiSelectCheckbox => {
                let mut selected = match current {
                    Some(FieldValue::Many(values)) => values.clone(),
                    Some(FieldValue::Text(single)) if !single.is_empty() => vec![single.clone()],
                    _ => Vec::new(),
                };
                if let Some(position) = selected.iter().position(|item| item == value) {
                    selected.remove(position);
                } else {
                    selected.push(value.to_string());
                }
                if selected.is_empty() {
                    None
                } else {
                    Some(FieldValue::Many(selected))
                }
            }
            Presentation::ContactForm => current.cloned(),
        }
    }

    fn validate(&self, values: &FieldValues) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self.presentation {
            Presentation::SingleSelectRadio | Presentation::SingleSelectCheckbox => {
                let valid = matches!(
                    values.get(self.field_name),
                    Some(FieldValue::Text(value)) if self.has_option(value)
                );
                if !valid {
                    errors.insert(
                        self.field_name.to_string(),
                        "Please select an option".to_string(),
                    );
                }
            }
            Presentation::MultiSelectCheckbox => {
                match values.get(self.field_name) {
                    Some(FieldValue::Many(selected))
                        if !selected.is_empty()
                            && selected.iter().all(|value| self.has_option(value)) =>
                    {
                        let repeated = selected
                            .iter()
                            .enumerate()
                            .any(|(index, value)| selected[..index].contains(value));
                        if repeated {
                            errors.insert(
                                self.field_name.to_string(),
                                "Each option can be selected only once".to_string(),
                            );
                        }
                    }
                    _ => {
                        errors.insert(
                            self.field_name.to_string(),
                            "Please select at least one option".to_string(),
                        );
                    }
                }
            }
            Presentation::ContactForm => validate_contact(values, &mut errors),
        }
        errors
    }
}

fn validate_contact(values: &FieldValues, errors: &mut FieldErrors) {
    let text = |name: &str| {
        values
            .get(name)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .unwrap_or_default()
    };

    if text(FIRST_NAME_FIELD).is_empty() {
        errors.insert(
            FIRST_NAME_FIELD.to_string(),
            "First name is required".to_string(),
        );
    }
    if text(LAST_NAME_FIELD).is_empty() {
        errors.insert(
            LAST_NAME_FIELD.to_string(),
            "Last name is required".to_string(),
        );
    }
    let email = text(EMAIL_FIELD);
    if email.is_empty() {
        errors.insert(EMAIL_FIELD.to_string(), "Email is required".to_string());
    } else if !is_valid_email(email) {
        errors.insert(EMAIL_FIELD.to_string(), "Invalid email address".to_string());
    }
    if values.get(CONSENT_FIELD) != Some(&FieldValue::Flag(true)) {
        errors.insert(
            CONSENT_FIELD.to_string(),
            "You must consent to the privacy policy".to_string(),
        );
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
        )
        .expect("email pattern compiles")
    })
}

pub fn is_valid_email(candidate: &str) -> bool {
    email_regex().is_match(candidate)
}

/// Outcome of validating one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(FieldErrors),
}

/// Ordered, immutable list of wizard steps.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
}

impl StepRegistry {
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        Self { steps }
    }

    /// The acquisition inquiry shipped with the site.
    pub fn acquisition_inquiry() -> Self {
        Self::new(vec![
            StepDefinition {
                title: "1. HAVE YOU COLLECTED ORIGINAL ART BEFORE?",
                field_name: "collectionExperience",
                presentation: Presentation::SingleSelectRadio,
                options: vec![
                    option("experienced", "YES - I'VE COLLECTED WORKS FROM NOTABLE ARTISTS."),
                    option("beginner", "YES - I'M EARLY IN MY JOURNEY, BUT I KNOW WHAT I LIKE."),
                    option("new", "NO - BUT I'M READY TO BEGIN."),
                ],
            },
            StepDefinition {
                title: "2. ARE YOU INQUIRING ABOUT A SPECIFIC WORK OR OPEN TO OTHERS?",
                field_name: "inquiryType",
                presentation: Presentation::SingleSelectRadio,
                options: vec![
                    option("specific", "I HAVE A SPECIFIC PIECE IN MIND"),
                    option("open", "OPEN TO AVAILABLE AND UPCOMING"),
                    option("both", "BOTH"),
                ],
            },
            StepDefinition {
                title: "3. WHAT DESCRIBES YOUR ACQUISITION GOALS BEST?",
                field_name: "acquisitionGoals",
                presentation: Presentation::MultiSelectCheckbox,
                options: vec![
                    option("investment", "RARE AND INVESTMENT-GRADE"),
                    option("curated", "PERSONALLY CURATED"),
                    option("legacy", "LONG-TERM LEGACY"),
                    option("emotional", "I COLLECT BASED ON EMOTIONAL CONNECTION"),
                ],
            },
            StepDefinition {
                title: "4. WHICH TIER REFLECTS YOUR CURRENT COLLECTION STRATEGY?",
                field_name: "collectionTier",
                presentation: Presentation::SingleSelectCheckbox,
                options: vec![
                    option("tier1", "$250K - $1M+"),
                    option("tier2", "$50K - $250K"),
                    option("tier3", "$25K - $50K"),
                    option("tier4", "$5K - $25K"),
                ],
            },
            StepDefinition {
                title: "5. ARE YOU INQUIRING FOR YOURSELF OR SOMEONE ELSE?",
                field_name: "inquiryRoles",
                presentation: Presentation::MultiSelectCheckbox,
                options: vec![
                    option("private", "FOR MY PRIVATE COLLECTION"),
                    option("behalf", "ON BEHALF OF A COLLECTOR"),
                    option("advisor", "ADVISOR / CONSULTANT"),
                    option("other", "OTHER"),
                ],
            },
            StepDefinition {
                title: "6. CONTACT INFORMATION",
                field_name: "contactInfo",
                presentation: Presentation::ContactForm,
                options: Vec::new(),
            },
        ])
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_at(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Validate `values` against the rule declared on step `index`.
    pub fn validate(&self, index: usize, values: &FieldValues) -> ValidationResult {
        let Some(step) = self.step_at(index) else {
            let mut errors = FieldErrors::new();
            errors.insert("step".to_string(), format!("No step at index {index}"));
            return ValidationResult::Invalid(errors);
        };
        let errors = step.validate(values);
        if errors.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(errors)
        }
    }
}
