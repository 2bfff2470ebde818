//! Line-oriented host for the inquiry wizard.
//!
//! Selection steps accept option numbers or values (comma-separated for
//! multi-select) and `back`. The contact step prompts field by field; an empty
//! line keeps the earlier answer. End of input cancels the inquiry.
use crate::wizard::gate::GateOutcome;
use crate::wizard::steps::{
    StepDefinition, COMMENTS_FIELD, CONSENT_FIELD, EMAIL_FIELD, FIRST_NAME_FIELD, LAST_NAME_FIELD,
    PHONE_FIELD,
};
use crate::wizard::{Advance, FieldValue, FieldValues, WizardController, WizardError};
use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, Write};

const BACK_COMMAND: &str = "back";

/// How a terminal session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    Submitted(GateOutcome),
    Cancelled,
}

enum StepInput {
    Values(FieldValues),
    Back,
    Eof,
}

/// Run the wizard against `input`, writing prompts to `output`.
pub fn run_session<R: BufRead, W: Write>(
    wizard: &mut WizardController<'_>,
    mut input: R,
    output: &mut W,
) -> Result<SessionEnd> {
    // Input from a rejected advance; shown as the defaults on the re-prompt.
    let mut draft = FieldValues::new();
    loop {
        let Some(step) = wizard.current_step().cloned() else {
            return Err(anyhow!("inquiry already submitted"));
        };
        let total = wizard.registry().step_count();
        writeln!(output)?;
        writeln!(
            output,
            "[{}/{total}] {}",
            wizard.state().current_step_index + 1,
            step.title
        )?;

        let mut shown = wizard.state().field_values.clone();
        shown.extend(draft.clone());
        let collected = if step.presentation.is_contact_form() {
            read_contact(&mut input, output, &shown)?
        } else {
            read_selection(&step, &mut input, output, &shown)?
        };
        let values = match collected {
            StepInput::Values(values) => {
                draft.extend(values);
                draft.clone()
            }
            StepInput::Back => {
                draft.clear();
                if !wizard.retreat() {
                    writeln!(output, "Already at the first step.")?;
                }
                continue;
            }
            StepInput::Eof => {
                writeln!(output, "Inquiry cancelled.")?;
                return Ok(SessionEnd::Cancelled);
            }
        };

        match wizard.advance(values) {
            Ok(Advance::Moved(_)) => draft.clear(),
            Ok(Advance::Submitted(outcome)) => {
                writeln!(output)?;
                writeln!(output, "Thank you for your inquiry. We will be in touch soon.")?;
                return Ok(SessionEnd::Submitted(outcome));
            }
            Err(WizardError::Invalid(errors)) => {
                for message in errors.values() {
                    writeln!(output, "  ! {message}")?;
                }
            }
            Err(WizardError::SpamRejected(message)) => {
                writeln!(output, "  ! {message}")?;
            }
            Err(WizardError::AlreadySubmitted) => {
                return Err(anyhow!(WizardError::AlreadySubmitted));
            }
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("read terminal input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn read_selection<R: BufRead, W: Write>(
    step: &StepDefinition,
    input: &mut R,
    output: &mut W,
    answers: &FieldValues,
) -> Result<StepInput> {
    for (index, option) in step.options.iter().enumerate() {
        writeln!(output, "  {}) {}", index + 1, option.label)?;
    }
    let current = answers.get(step.field_name);
    let hint = if step.presentation.is_multi() {
        "Choose one or more (e.g. 1,3)"
    } else {
        "Choose one"
    };
    match current {
        Some(value) => write!(output, "{hint} [{}]: ", value.to_flat_string())?,
        None => write!(output, "{hint}: ")?,
    }
    output.flush()?;

    let Some(line) = read_line(input)? else {
        return Ok(StepInput::Eof);
    };
    if line.eq_ignore_ascii_case(BACK_COMMAND) {
        return Ok(StepInput::Back);
    }
    if line.is_empty() {
        return Ok(StepInput::Values(FieldValues::new()));
    }

    let mut chosen: Vec<&str> = Vec::new();
    for token in line.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        match option_value(step, token) {
            Some(value) if !chosen.contains(&value) => chosen.push(value),
            Some(_) => {}
            None => {
                writeln!(output, "  ! Unknown option {token:?}")?;
                return Ok(StepInput::Values(FieldValues::new()));
            }
        }
    }
    if !step.presentation.is_multi() && chosen.len() > 1 {
        writeln!(output, "  ! Choose a single option")?;
        return Ok(StepInput::Values(FieldValues::new()));
    }

    let answer = chosen
        .into_iter()
        .fold(None, |answer, value| step.select(answer.as_ref(), value));
    let mut values = FieldValues::new();
    if let Some(answer) = answer {
        values.insert(step.field_name.to_string(), answer);
    }
    Ok(StepInput::Values(values))
}

fn option_value(step: &StepDefinition, token: &str) -> Option<&'static str> {
    if let Ok(number) = token.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| step.options.get(index))
            .map(|option| option.value);
    }
    step.options
        .iter()
        .find(|option| option.value.eq_ignore_ascii_case(token))
        .map(|option| option.value)
}

fn read_contact<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    answers: &FieldValues,
) -> Result<StepInput> {
    let prompts = [
        (FIRST_NAME_FIELD, "First name"),
        (LAST_NAME_FIELD, "Last name"),
        (EMAIL_FIELD, "Email"),
        (PHONE_FIELD, "Phone (optional)"),
        (COMMENTS_FIELD, "Comments (optional)"),
    ];
    let mut values = FieldValues::new();
    for (index, (field, label)) in prompts.into_iter().enumerate() {
        match answers.get(field).and_then(FieldValue::as_text) {
            Some(current) if !current.is_empty() => write!(output, "{label} [{current}]: ")?,
            _ => write!(output, "{label}: ")?,
        }
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(StepInput::Eof);
        };
        if index == 0 && line.eq_ignore_ascii_case(BACK_COMMAND) {
            return Ok(StepInput::Back);
        }
        if !line.is_empty() {
            values.insert(field.to_string(), FieldValue::Text(line));
        }
    }

    write!(
        output,
        "I consent to the privacy policy and to being contacted about this inquiry [y/N]: "
    )?;
    output.flush()?;
    let Some(line) = read_line(input)? else {
        return Ok(StepInput::Eof);
    };
    let consent = matches!(line.to_ascii_lowercase().as_str(), "y" | "yes");
    values.insert(CONSENT_FIELD.to_string(), FieldValue::Flag(consent));
    Ok(StepInput::Values(values))
}

/// Drive the wizard from a prepared answer set, one advance per step.
pub fn run_answers(wizard: &mut WizardController<'_>, answers: FieldValues) -> Result<GateOutcome> {
    let mut pending = Some(answers);
    loop {
        let step = wizard
            .current_step()
            .map(|step| step.field_name)
            .ok_or_else(|| anyhow!("inquiry already submitted"))?;
        match wizard.advance(pending.take().unwrap_or_default()) {
            Ok(Advance::Moved(_)) => {}
            Ok(Advance::Submitted(outcome)) => return Ok(outcome),
            Err(WizardError::Invalid(errors)) => {
                let details = errors
                    .iter()
                    .map(|(field, message)| format!("{field}: {message}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(anyhow!("step {step} is incomplete ({details})"));
            }
            Err(err) => return Err(anyhow!(err)),
        }
    }
}
