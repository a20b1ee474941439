//! Filters and update descriptions.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use crate::{
    error::{StoreError, StoreResult},
    id::DocumentId,
    store::ID_FIELD,
};

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(Value),
    Gt(Value),
    Lt(Value),
}

/// Conjunction of field conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    /// Create a filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the document with the given identity.
    pub fn by_id(id: DocumentId) -> Self {
        Self::new().eq(ID_FIELD, id.to_string())
    }

    /// Require `field` to equal `value`. A missing field equals `null`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), Condition::Eq(value.into())));
        self
    }

    /// Require `field` to be strictly greater than `value`.
    ///
    /// Numbers compare numerically and strings lexically; any other pairing never matches.
    pub fn gt(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), Condition::Gt(value.into())));
        self
    }

    /// Require `field` to be strictly less than `value`, compared as in [`Filter::gt`].
    pub fn lt(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), Condition::Lt(value.into())));
        self
    }

    /// Whether `document` satisfies every clause.
    pub fn matches(&self, document: &Map<String, Value>) -> bool {
        self.clauses.iter().all(|(field, condition)| {
            let actual = document.get(field).unwrap_or(&Value::Null);
            match condition {
                Condition::Eq(expected) => values_equal(actual, expected),
                Condition::Gt(bound) => compare(actual, bound) == Some(Ordering::Greater),
                Condition::Lt(bound) => compare(actual, bound) == Some(Ordering::Less),
            }
        })
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => compare(left, right) == Some(Ordering::Equal),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            _ => l.as_f64()?.partial_cmp(&r.as_f64()?),
        },
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// Field-level modification applied to matched documents.
///
/// `set` overwrites (or adds) fields, `inc` adds an integer delta to a field,
/// treating a missing field as zero. Sets are applied before increments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Map<String, Value>,
    inc: Vec<(String, i64)>,
}

impl Update {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite `field` with `value`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Overwrite every field in `fields`.
    pub fn set_all(mut self, fields: Map<String, Value>) -> Self {
        self.set.extend(fields);
        self
    }

    /// Add `delta` to the integer stored in `field`.
    pub fn inc(mut self, field: impl Into<String>, delta: i64) -> Self {
        self.inc.push((field.into(), delta));
        self
    }

    /// Apply the update in place, returning whether the document changed.
    pub fn apply(&self, collection: &str, document: &mut Map<String, Value>) -> StoreResult<bool> {
        let touches_id = self.set.contains_key(ID_FIELD)
            || self.inc.iter().any(|(field, _)| field == ID_FIELD);
        if touches_id {
            return Err(StoreError::ImmutableField {
                field: ID_FIELD.to_string(),
            });
        }

        let mut changed = false;

        for (field, value) in &self.set {
            if document.get(field) != Some(value) {
                document.insert(field.clone(), value.clone());
                changed = true;
            }
        }

        for (field, delta) in &self.inc {
            let current = match document.get(field) {
                None | Some(Value::Null) => 0,
                Some(value) => value.as_i64().ok_or_else(|| {
                    StoreError::invalid_document(
                        collection,
                        format!("field '{field}' is not an integer"),
                    )
                })?,
            };
            let next = current.checked_add(*delta).ok_or_else(|| {
                StoreError::invalid_document(collection, format!("field '{field}' overflowed"))
            })?;
            if *delta != 0 || !document.contains_key(field) {
                document.insert(field.clone(), Value::Number(Number::from(next)));
                changed = true;
            }
        }

        Ok(changed)
    }
}
