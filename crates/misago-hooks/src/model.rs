//! Input model descriptors used to check payload shape before business validators run.

use serde_json::{Map, Number, Value};

use crate::errors_list::ErrorsList;

/// Largest value accepted by [`FieldKind::PositiveInt`] and list items; the range of
/// a 32-bit serial key.
pub const MAX_POSITIVE_INT: i64 = 2_147_483_647;

/// Expected type of an input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer in `1..=MAX_POSITIVE_INT`; numeric strings are coerced.
    PositiveInt,
    /// List of positive integers, deduplicated, with bounded length.
    PositiveIntList {
        /// Minimum number of unique items.
        min_items: usize,
        /// Maximum number of unique items.
        max_items: usize,
    },
    /// String with bounded length; surrounding whitespace is stripped.
    String {
        /// Maximum length in characters.
        max_length: usize,
    },
    /// Boolean flag.
    Bool,
}

/// Declared input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as it appears in the payload.
    pub name: String,
    /// Expected value type.
    pub kind: FieldKind,
    /// Whether the field must be present and non-null.
    pub required: bool,
}

impl FieldSpec {
    /// Required field.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// Optional field.
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// Schema describing the expected shape of an operation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputModel {
    name: String,
    fields: Vec<FieldSpec>,
}

impl InputModel {
    /// Create a model without fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style variant of [`Self::set_field`].
    #[must_use]
    pub fn with_field(mut self, spec: FieldSpec) -> Self {
        self.set_field(spec);
        self
    }

    /// Add a field, replacing an existing declaration with the same name.
    pub fn set_field(&mut self, spec: FieldSpec) {
        if let Some(existing) = self.fields.iter_mut().find(|field| field.name == spec.name) {
            *existing = spec;
        } else {
            self.fields.push(spec);
        }
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a declared field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Check `input` against the model.
    ///
    /// Returns the cleaned input (declared fields only, coerced values) and the
    /// shape errors found, in declaration order.
    #[must_use]
    pub fn clean(&self, input: &Map<String, Value>) -> (Map<String, Value>, ErrorsList) {
        let mut cleaned = Map::new();
        let mut errors = ErrorsList::new();

        for spec in &self.fields {
            match input.get(&spec.name) {
                None => {
                    if spec.required {
                        errors.add_error(&spec.name, "value_error.missing", "field required");
                    }
                }
                Some(Value::Null) => {
                    if spec.required {
                        errors.add_error(
                            &spec.name,
                            "type_error.none.not_allowed",
                            "none is not an allowed value",
                        );
                    }
                }
                Some(value) => {
                    if let Some(value) = clean_value(&spec.name, spec.kind, value, &mut errors) {
                        cleaned.insert(spec.name.clone(), value);
                    }
                }
            }
        }

        (cleaned, errors)
    }
}

fn clean_value(
    location: &str,
    kind: FieldKind,
    value: &Value,
    errors: &mut ErrorsList,
) -> Option<Value> {
    match kind {
        FieldKind::PositiveInt => clean_positive_int(location, value, errors).map(Value::from),
        FieldKind::PositiveIntList {
            min_items,
            max_items,
        } => clean_positive_int_list(location, value, min_items, max_items, errors),
        FieldKind::String { max_length } => clean_string(location, value, max_length, errors),
        FieldKind::Bool => {
            if let Value::Bool(flag) = value {
                Some(Value::Bool(*flag))
            } else {
                errors.add_error(location, "type_error.bool", "value could not be parsed to a boolean");
                None
            }
        }
    }
}

fn clean_positive_int(location: &str, value: &Value, errors: &mut ErrorsList) -> Option<i64> {
    let number = match value {
        Value::Number(number) => integer_from_number(number),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(number) = number else {
        errors.add_error(location, "type_error.integer", "value is not a valid integer");
        return None;
    };
    if number <= 0 {
        errors.add_error(
            location,
            "value_error.number.not_gt",
            "ensure this value is greater than 0",
        );
        return None;
    }
    if number > MAX_POSITIVE_INT {
        errors.add_error(
            location,
            "value_error.number.not_le",
            format!("ensure this value is less than or equal to {MAX_POSITIVE_INT}"),
        );
        return None;
    }
    Some(number)
}

fn integer_from_number(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|float| float.fract() == 0.0 && float.is_finite())
            .and_then(|float| format!("{float:.0}").parse().ok())
    })
}

fn clean_positive_int_list(
    location: &str,
    value: &Value,
    min_items: usize,
    max_items: usize,
    errors: &mut ErrorsList,
) -> Option<Value> {
    let Value::Array(items) = value else {
        errors.add_error(location, "type_error.list", "value is not a valid list");
        return None;
    };

    let before = errors.len();
    let mut unique: Vec<i64> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_location = format!("{location}.{index}");
        if let Some(number) = clean_positive_int(&item_location, item, errors) {
            if !unique.contains(&number) {
                unique.push(number);
            }
        }
    }
    if errors.len() > before {
        return None;
    }

    if unique.len() < min_items {
        errors.add_error(
            location,
            "value_error.list.min_items",
            format!("ensure this value has at least {min_items} items"),
        );
        return None;
    }
    if unique.len() > max_items {
        errors.add_error(
            location,
            "value_error.list.max_items",
            format!("ensure this value has at most {max_items} items"),
        );
        return None;
    }

    Some(Value::from(unique))
}

fn clean_string(
    location: &str,
    value: &Value,
    max_length: usize,
    errors: &mut ErrorsList,
) -> Option<Value> {
    let Value::String(text) = value else {
        errors.add_error(location, "type_error.str", "str type expected");
        return None;
    };
    let text = text.trim();
    if text.chars().count() > max_length {
        errors.add_error(
            location,
            "value_error.any_str.max_length",
            format!("ensure this value has at most {max_length} characters"),
        );
        return None;
    }
    Some(Value::String(text.to_string()))
}
