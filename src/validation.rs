//! Structured error sets produced by form validation and submission.
//!
//! Every expected failure in the onboarding forms and the transaction
//! creation path is reported through these types instead of being raised
//! past the submit boundary.

use std::{collections::BTreeMap, fmt::Display};

use crate::Error;

/// The errors collected while validating a form or a record built from one.
///
/// Field errors are keyed by field name and keep their insertion order per
/// field. Base errors apply to the form as a whole, e.g. "add at least one
/// account".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    field_errors: BTreeMap<String, Vec<String>>,
    base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Record an error message that applies to the form as a whole.
    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    /// The error messages recorded against `field`.
    pub fn field(&self, field: &str) -> &[String] {
        self.field_errors
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The form-wide error messages.
    pub fn base(&self) -> &[String] {
        &self.base_errors
    }

    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty() && self.base_errors.is_empty()
    }

    /// Fold another error set into this one, preserving message order.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.field_errors {
            self.field_errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    /// Every message in the set, field errors first (in field name order),
    /// then base errors.
    pub fn messages(&self) -> Vec<String> {
        self.field_errors
            .values()
            .flatten()
            .chain(self.base_errors.iter())
            .cloned()
            .collect()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}

/// The ways a form submission can fail.
///
/// Both variants leave the database unchanged: validation failures are
/// detected before any write happens, and storage failures roll back the
/// enclosing transaction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SubmitError {
    /// The form, or a record built from it, failed validation. The caller
    /// should re-render the form with the error set.
    #[error("submitted data failed validation: {0}")]
    Invalid(ValidationErrors),

    /// An unexpected storage error. The caller should log it and show a
    /// general error message.
    #[error(transparent)]
    Db(#[from] Error),
}

impl SubmitError {
    /// Shortcut for building the `Invalid` variant from a single base error.
    pub fn base(message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add_base(message);
        Self::Invalid(errors)
    }
}
