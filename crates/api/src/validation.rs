//! Request validation with per-field messages.
//!
//! Handlers collect every problem with a request body into
//! [`ValidationErrors`] and fail with a 422 carrying the whole map, so a form
//! can show all messages at once.

use std::collections::BTreeMap;

use serde::Serialize;

/// Field name to messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors holding a single message.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one message was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Check a required string field; returns the trimmed value when valid.
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>, max: usize) -> Option<&'a str> {
        match value.map(str::trim) {
            None | Some("") => {
                self.add(field, format!("The {} field is required.", label(field)));
                None
            }
            Some(v) => self.max_length(field, v, max).then_some(v),
        }
    }

    /// Check an optional string field against a maximum length.
    pub fn optional<'a>(&mut self, field: &str, value: Option<&'a str>, max: usize) -> Option<&'a str> {
        let v = value?;
        self.max_length(field, v, max).then_some(v)
    }

    fn max_length(&mut self, field: &str, value: &str, max: usize) -> bool {
        if value.chars().count() > max {
            self.add(
                field,
                format!("The {} field must not be greater than {max} characters.", label(field)),
            );
            return false;
        }
        true
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl From<Vec<loomi_core::cart::CartError>> for ValidationErrors {
    fn from(errors: Vec<loomi_core::cart::CartError>) -> Self {
        let mut out = Self::new();
        for e in errors {
            out.add(&e.field(), e.to_string());
        }
        out
    }
}

/// Human label of a field: `first_name` -> `first name`.
fn label(field: &str) -> String {
    field.replace('_', " ")
}
