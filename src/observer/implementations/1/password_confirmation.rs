// Ring 1: User input validation
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::models::UserDraft;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalizes the email and checks the password pair. Name and email are
/// required on create; on update they are checked only when supplied.
#[derive(Default)]
pub struct PasswordConfirmation;

#[async_trait]
impl Observer<UserDraft> for PasswordConfirmation {
    fn name(&self) -> &'static str {
        "PasswordConfirmation"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op.writes()
    }

    async fn execute(&self, ctx: &mut ObserverContext<UserDraft>) -> Result<(), ObserverError> {
        let creating = ctx.operation == Operation::Create;
        let Some(draft) = ctx.record_mut() else {
            return Err(ObserverError::SystemError("No user in context".to_string()));
        };

        let messages = validate(draft, creating);
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ObserverError::ValidationError(messages))
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn validate(draft: &mut UserDraft, creating: bool) -> Vec<String> {
    let mut messages = Vec::new();

    if let Some(email) = draft.email.as_mut() {
        *email = email.trim().to_lowercase();
    }
    if let Some(name) = draft.name.as_mut() {
        *name = name.trim().to_string();
    }

    match draft.name.as_deref() {
        Some("") => messages.push("Please enter your name.".to_string()),
        None if creating => messages.push("Please enter your name.".to_string()),
        _ => {}
    }

    match draft.email.as_deref() {
        Some("") => messages.push("Please enter an email.".to_string()),
        None if creating => messages.push("Please enter an email.".to_string()),
        Some(email) if !is_valid_email(email) => messages.push("Please enter a valid email".to_string()),
        _ => {}
    }

    // Password rules apply whenever a password is being set
    if creating || draft.password.is_some() {
        match draft.password.as_deref() {
            None | Some("") => messages.push("Please enter a password".to_string()),
            Some(p) if p.chars().count() < MIN_PASSWORD_LENGTH => {
                messages.push(format!("Password must have at least {} characters", MIN_PASSWORD_LENGTH))
            }
            _ => {}
        }
        match draft.confirm_password.as_deref() {
            None | Some("") => messages.push("Please confirm your password".to_string()),
            Some(confirm) if Some(confirm) != draft.password.as_deref() => {
                messages.push("Passwords do not match!".to_string())
            }
            _ => {}
        }
    }

    messages
}
