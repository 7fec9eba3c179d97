//! Ordered, field-keyed accumulator of validation errors.
//!
//! # Design
//! - Errors are data: stages append to the list and hand it to the next stage.
//! - Append-only during a pipeline run; insertion order is the reporting order.
//! - Serialises to the `{ location, type, msg }` shape consumed by the API layer.

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Location reported for errors that are not tied to a single field.
pub const ROOT_LOCATION: &str = "__root__";

/// Single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted field path (`threads.2`), or `None` for operation-level errors.
    pub location: Option<String>,
    /// Machine-readable error code (`permission_denied`, `value_error.missing`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl FieldError {
    /// Construct an error attached to a field path.
    #[must_use]
    pub fn new(
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            location: Some(location.into()),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Construct an operation-level error without field attribution.
    #[must_use]
    pub fn root(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: None,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns `true` when the error is attached to `field` or one of its children.
    #[must_use]
    pub fn is_under(&self, field: &str) -> bool {
        self.location.as_deref().is_some_and(|location| {
            location == field
                || location
                    .strip_prefix(field)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    fn location_segments(&self) -> Vec<&str> {
        self.location
            .as_deref()
            .map_or_else(|| vec![ROOT_LOCATION], |location| location.split('.').collect())
    }
}

impl Serialize for FieldError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("FieldError", 3)?;
        state.serialize_field("location", &self.location_segments())?;
        state.serialize_field("type", &self.code)?;
        state.serialize_field("msg", &self.message)?;
        state.end()
    }
}

/// Ordered accumulator of [`FieldError`] values for one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorsList {
    errors: Vec<FieldError>,
}

impl ErrorsList {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Append an error attached to a field path.
    pub fn add_error(
        &mut self,
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldError::new(location, code, message));
    }

    /// Append an operation-level error.
    pub fn add_root_error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::root(code, message));
    }

    /// Append a prepared error.
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Returns `true` when at least one error was recorded.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` when no errors were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded errors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` when `field` or one of its children carries an error.
    #[must_use]
    pub fn has_errors_at(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.is_under(field))
    }

    /// Returns `true` when an operation-level error was recorded.
    #[must_use]
    pub fn has_root_errors(&self) -> bool {
        self.errors.iter().any(|error| error.location.is_none())
    }

    /// Error locations in insertion order (`None` for root errors).
    #[must_use]
    pub fn get_errors_locations(&self) -> Vec<Option<&str>> {
        self.errors
            .iter()
            .map(|error| error.location.as_deref())
            .collect()
    }

    /// Error codes in insertion order.
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        self.errors.iter().map(|error| error.code.as_str()).collect()
    }

    /// Iterate over recorded errors in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }

    /// Consume the list and return the underlying errors.
    #[must_use]
    pub fn into_vec(self) -> Vec<FieldError> {
        self.errors
    }
}

impl Extend<FieldError> for ErrorsList {
    fn extend<T: IntoIterator<Item = FieldError>>(&mut self, iter: T) {
        self.errors.extend(iter);
    }
}

impl FromIterator<FieldError> for ErrorsList {
    fn from_iter<T: IntoIterator<Item = FieldError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ErrorsList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorsList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl Serialize for ErrorsList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.errors.serialize(serializer)
    }
}
