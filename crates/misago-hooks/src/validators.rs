//! Per-field asynchronous validators.
//!
//! # Design
//! - Validators are looked up by field name and run in registration order.
//! - The first failing validator for a field records its errors and stops the
//!   remaining validators for that field; other fields still run.
//! - Fields missing from the input, or already carrying errors, are skipped.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::HookResult;
use crate::errors_list::ErrorsList;

/// Rejection reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path relative to the validated field (`"2"` for the third list item).
    pub path: Option<String>,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Rejection of the field value as a whole.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: None,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Rejection of a nested element of the field value.
    #[must_use]
    pub fn at(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            code: code.into(),
            message: message.into(),
        }
    }

    fn location(&self, field: &str) -> String {
        self.path
            .as_ref()
            .map_or_else(|| field.to_string(), |path| format!("{field}.{path}"))
    }
}

/// Outcome of a single validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Value accepted as is.
    Valid,
    /// Value accepted and replaced with a normalised version.
    Replace(Value),
    /// Value rejected.
    Invalid(Vec<ValidationError>),
}

impl Validation {
    /// Shorthand for a single rejection of the whole value.
    #[must_use]
    pub fn invalid(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid(vec![ValidationError::new(code, message)])
    }
}

/// Asynchronous validator for a single field value.
#[async_trait]
pub trait AsyncValidator<C>: Send + Sync {
    /// Validate `value`; faults are reserved for collaborator failures.
    async fn validate(&self, ctx: &C, value: &Value) -> HookResult<Validation>;
}

/// Ordered mapping from field name to its validators.
pub struct ValidatorsRegistry<C> {
    fields: Vec<(String, Vec<Arc<dyn AsyncValidator<C>>>)>,
}

impl<C> Default for ValidatorsRegistry<C> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<C> Clone for ValidatorsRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
        }
    }
}

impl<C> fmt::Debug for ValidatorsRegistry<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_map()
            .entries(
                self.fields
                    .iter()
                    .map(|(field, validators)| (field, validators.len())),
            )
            .finish()
    }
}

impl<C> ValidatorsRegistry<C>
where
    C: Send + Sync + 'static,
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator for `field`, after any validators already registered for it.
    pub fn add<V>(&mut self, field: &str, validator: V)
    where
        V: AsyncValidator<C> + 'static,
    {
        self.add_shared(field, Arc::new(validator));
    }

    /// Register a shared validator for `field`.
    pub fn add_shared(&mut self, field: &str, validator: Arc<dyn AsyncValidator<C>>) {
        if let Some((_, validators)) = self.fields.iter_mut().find(|(name, _)| name == field) {
            validators.push(validator);
        } else {
            self.fields.push((field.to_string(), vec![validator]));
        }
    }

    /// Builder-style variant of [`Self::add`].
    #[must_use]
    pub fn with<V>(mut self, field: &str, validator: V) -> Self
    where
        V: AsyncValidator<C> + 'static,
    {
        self.add(field, validator);
        self
    }

    /// Validators registered for `field`, in registration order.
    #[must_use]
    pub fn validators_for(&self, field: &str) -> &[Arc<dyn AsyncValidator<C>>] {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, validators)| validators.as_slice())
            .unwrap_or_default()
    }

    /// Field names in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Run every registered validator against `input`.
    ///
    /// Returns the (possibly normalised) input together with `errors` extended by
    /// any rejections, in field registration order.
    ///
    /// # Errors
    ///
    /// Propagates faults raised by validators.
    pub async fn validate(
        &self,
        ctx: &C,
        mut input: Map<String, Value>,
        mut errors: ErrorsList,
    ) -> HookResult<(Map<String, Value>, ErrorsList)> {
        for (field, validators) in &self.fields {
            if errors.has_errors_at(field) {
                debug!(field = %field, "skipping validators for field with errors");
                continue;
            }
            let Some(mut value) = input.remove(field) else {
                continue;
            };
            for validator in validators {
                match validator.validate(ctx, &value).await? {
                    Validation::Valid => {}
                    Validation::Replace(normalised) => value = normalised,
                    Validation::Invalid(failures) => {
                        for failure in failures {
                            errors.add_error(failure.location(field), failure.code, failure.message);
                        }
                        break;
                    }
                }
            }
            input.insert(field.clone(), value);
        }
        Ok((input, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Positive;

    #[async_trait]
    impl AsyncValidator<()> for Positive {
        async fn validate(&self, _ctx: &(), value: &Value) -> HookResult<Validation> {
            Ok(match value.as_i64() {
                Some(number) if number > 0 => Validation::Valid,
                _ => Validation::invalid("value_error.number.not_gt", "must be positive"),
            })
        }
    }

    struct Double;

    #[async_trait]
    impl AsyncValidator<()> for Double {
        async fn validate(&self, _ctx: &(), value: &Value) -> HookResult<Validation> {
            Ok(value
                .as_i64()
                .map_or(Validation::Valid, |number| {
                    Validation::Replace(json!(number * 2))
                }))
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl AsyncValidator<()> for Counting {
        async fn validate(&self, _ctx: &(), _value: &Value) -> HookResult<Validation> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Validation::Valid)
        }
    }

    struct EvenItems;

    #[async_trait]
    impl AsyncValidator<()> for EvenItems {
        async fn validate(&self, _ctx: &(), value: &Value) -> HookResult<Validation> {
            let failures: Vec<_> = value
                .as_array()
                .into_iter()
                .flatten()
                .enumerate()
                .filter(|(_, item)| item.as_i64().is_some_and(|number| number % 2 != 0))
                .map(|(index, _)| ValidationError::at(index.to_string(), "odd", "item is odd"))
                .collect();
            Ok(if failures.is_empty() {
                Validation::Valid
            } else {
                Validation::Invalid(failures)
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl AsyncValidator<()> for Broken {
        async fn validate(&self, _ctx: &(), _value: &Value) -> HookResult<Validation> {
            Err(HookError::collaborator("validator.broken", io::Error::other("down")))
        }
    }

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object input")
    }

    #[tokio::test]
    async fn validators_run_in_order_and_normalise_values() {
        let registry = ValidatorsRegistry::<()>::new()
            .with("count", Positive)
            .with("count", Double);

        let (cleaned, errors) = registry
            .validate(&(), input(json!({"count": 4})), ErrorsList::new())
            .await
            .expect("validation runs");

        assert!(errors.is_empty());
        assert_eq!(cleaned.get("count"), Some(&json!(8)));
    }

    #[tokio::test]
    async fn first_failure_stops_field_validators() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ValidatorsRegistry::<()>::new()
            .with("count", Positive)
            .with("count", Counting(Arc::clone(&calls)));

        let (cleaned, errors) = registry
            .validate(&(), input(json!({"count": -1})), ErrorsList::new())
            .await
            .expect("validation runs");

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(errors.codes(), vec!["value_error.number.not_gt"]);
        assert_eq!(errors.get_errors_locations(), vec![Some("count")]);
        assert_eq!(cleaned.get("count"), Some(&json!(-1)));
    }

    #[tokio::test]
    async fn nested_failures_are_keyed_by_item_path() {
        let registry = ValidatorsRegistry::<()>::new().with("items", EvenItems);

        let (_, errors) = registry
            .validate(&(), input(json!({"items": [2, 3, 4, 5]})), ErrorsList::new())
            .await
            .expect("validation runs");

        assert_eq!(
            errors.get_errors_locations(),
            vec![Some("items.1"), Some("items.3")]
        );
    }

    #[tokio::test]
    async fn missing_and_already_failed_fields_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ValidatorsRegistry::<()>::new()
            .with("absent", Counting(Arc::clone(&calls)))
            .with("count", Counting(Arc::clone(&calls)));
        let mut errors = ErrorsList::new();
        errors.add_error("count", "type_error.integer", "not an integer");

        let (_, errors) = registry
            .validate(&(), input(json!({"count": "x"})), errors)
            .await
            .expect("validation runs");

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn validator_faults_propagate() {
        let registry = ValidatorsRegistry::<()>::new().with("count", Broken);

        let err = registry
            .validate(&(), input(json!({"count": 1})), ErrorsList::new())
            .await
            .expect_err("fault propagates");
        assert_eq!(err.operation(), "validator.broken");
    }

    #[test]
    fn registry_keeps_field_order() {
        let registry = ValidatorsRegistry::<()>::new()
            .with("category", Positive)
            .with("threads", EvenItems)
            .with("category", Double);

        assert_eq!(registry.fields().collect::<Vec<_>>(), vec!["category", "threads"]);
        assert_eq!(registry.validators_for("category").len(), 2);
        assert!(registry.validators_for("unknown").is_empty());
    }
}
