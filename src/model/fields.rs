//! Accumulating field reader for raw JSON records.
//!
//! serde stops at the first error. Book authors want every problem in a file
//! reported at once, so node factories read their fields through [`Fields`],
//! which records each violation against its key and keeps going.
//!
//! ```text
//! let title = f.optional("title", |v| LocalizedStr::from_value(v, ctx));
//! let text  = f.required("text",  |v| FormatText::from_value(v, ctx));
//! f.check()?;                       // bail with everything found so far
//! Ok(TextPage { title, text: required(text, "text")? })
//! ```
//!
//! [`Fields::run`] wraps a factory: it rejects non-object input, reports keys
//! nobody consumed as unknown fields, and merges the factory's own result.

use crate::error::{Error, ValidationError, join_path};
use crate::resource::{ItemStack, ResourceLocation};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub type Record = Map<String, Value>;

pub struct Fields<'a> {
    record: &'a Record,
    seen: BTreeSet<&'a str>,
    errors: ValidationError,
    fatal: Option<Error>,
    discriminator: Option<ResourceLocation>,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value) -> Result<Self, Error> {
        match value {
            Value::Object(record) => Ok(Self::from_record(record)),
            other => Err(Error::invalid(format!(
                "expected an object, got {}",
                value_kind(other)
            ))),
        }
    }

    pub fn from_record(record: &'a Record) -> Self {
        Self {
            record,
            seen: BTreeSet::new(),
            errors: ValidationError::new(),
            fatal: None,
            discriminator: None,
        }
    }

    /// Read `value` with `build` and apply the unknown-field check.
    pub fn run<T>(
        value: &'a Value,
        build: impl FnOnce(&mut Fields<'a>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut fields = Fields::new(value)?;
        let result = build(&mut fields);
        fields.finish(result)
    }

    pub(crate) fn set_discriminator(&mut self, key: &'a str, id: ResourceLocation) {
        self.seen.insert(key);
        self.discriminator = Some(id);
    }

    /// The tagged-union key this record was dispatched on, if any.
    pub fn discriminator(&self) -> Option<&ResourceLocation> {
        self.discriminator.as_ref()
    }

    pub fn has(&self, key: &str) -> bool {
        self.record.get(key).is_some_and(|v| !v.is_null())
    }

    /// Raw access; marks the key as consumed.
    pub fn raw(&mut self, key: &str) -> Option<&'a Value> {
        let (k, v) = self.record.get_key_value(key)?;
        self.seen.insert(k.as_str());
        Some(v)
    }

    /// Mark keys as known without reading them (cosmetic keys with no
    /// bearing on the document model).
    pub fn ignore(&mut self, keys: &[&str]) {
        for key in keys {
            self.raw(key);
        }
    }

    /// Every key not consumed so far, consumed now.
    pub fn rest(&mut self) -> Record {
        let mut rest = Record::new();
        for (k, v) in self.record {
            if self.seen.insert(k.as_str()) {
                rest.insert(k.clone(), v.clone());
            }
        }
        rest
    }

    /// Record an error against `path`. Configuration errors are kept aside
    /// and returned ahead of everything else.
    pub fn record(&mut self, path: &str, error: Error) {
        if error.is_fatal() {
            if self.fatal.is_none() {
                self.fatal = Some(error);
            }
        } else {
            self.errors.push(path, error);
        }
    }

    fn read<T>(&mut self, key: &str, value: &'a Value, parse: impl FnOnce(&'a Value) -> Result<T, Error>) -> Option<T> {
        match parse(value) {
            Ok(v) => Some(v),
            Err(e) => {
                self.record(key, e);
                None
            }
        }
    }

    /// A field that must be present and non-null.
    pub fn required<T>(&mut self, key: &str, parse: impl FnOnce(&'a Value) -> Result<T, Error>) -> Option<T> {
        match self.raw(key) {
            Some(Value::Null) | None => {
                self.record(key, Error::invalid("field required"));
                None
            }
            Some(value) => self.read(key, value, parse),
        }
    }

    /// A field that may be absent or null.
    pub fn optional<T>(&mut self, key: &str, parse: impl FnOnce(&'a Value) -> Result<T, Error>) -> Option<T> {
        match self.raw(key) {
            Some(Value::Null) | None => None,
            Some(value) => self.read(key, value, parse),
        }
    }

    /// A field with a literal default used when absent. Invalid values are
    /// recorded and the default is returned so reading can continue.
    pub fn or<T>(&mut self, key: &str, default: T, parse: impl FnOnce(&'a Value) -> Result<T, Error>) -> T {
        match self.raw(key) {
            Some(Value::Null) | None => default,
            Some(value) => self.read(key, value, parse).unwrap_or(default),
        }
    }

    /// A required list; each element is parsed independently and errors are
    /// recorded at `key[i]`.
    pub fn list<T>(&mut self, key: &str, mut parse: impl FnMut(&'a Value) -> Result<T, Error>) -> Option<Vec<T>> {
        let value = match self.raw(key) {
            Some(Value::Null) | None => {
                self.record(key, Error::invalid("field required"));
                return None;
            }
            Some(value) => value,
        };
        let Value::Array(items) = value else {
            self.record(key, Error::invalid(format!("expected a list, got {}", value_kind(value))));
            return None;
        };
        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, item) in items.iter().enumerate() {
            match parse(item) {
                Ok(v) => out.push(v),
                Err(e) => {
                    ok = false;
                    self.record(&format!("{key}[{i}]"), e);
                }
            }
        }
        ok.then_some(out)
    }

    /// Fail with everything recorded so far, if anything was.
    pub fn check(&mut self) -> Result<(), Error> {
        if let Some(fatal) = self.fatal.take() {
            return Err(fatal);
        }
        std::mem::take(&mut self.errors).into_result()
    }

    /// Merge the factory result with recorded errors and unknown keys.
    pub fn finish<T>(mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Some(fatal) = self.fatal {
            return Err(fatal);
        }
        let value = match result {
            Ok(v) => Some(v),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.errors.push("", e);
                None
            }
        };
        for key in self.record.keys() {
            if !self.seen.contains(key.as_str()) {
                self.errors.push(key, Error::invalid("unknown field"));
            }
        }
        match value {
            Some(v) if self.errors.is_empty() => Ok(v),
            _ => Err(Error::Validation(self.errors)),
        }
    }
}

/// Take a required value after [`Fields::check`] succeeded.
pub fn required<T>(value: Option<T>, key: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::invalid(format!("{key}: field required")))
}

/// Prefix every violation in `error` with `path`.
pub fn at(path: &str, error: Error) -> Error {
    match error {
        Error::Validation(inner) => {
            let mut out = ValidationError::new();
            for v in inner.violations {
                out.push(&join_path(path, &v.path), v.error);
            }
            Error::Validation(out)
        }
        other if other.is_fatal() => other,
        other => {
            let mut out = ValidationError::new();
            out.push(path, other);
            Error::Validation(out)
        }
    }
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Leaf parsers
// =============================================================================

pub fn string(value: &Value) -> Result<String, Error> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::invalid(format!("expected a string, got {}", value_kind(value))))
}

pub fn boolean(value: &Value) -> Result<bool, Error> {
    value
        .as_bool()
        .ok_or_else(|| Error::invalid(format!("expected a boolean, got {}", value_kind(value))))
}

pub fn integer(value: &Value) -> Result<i64, Error> {
    value
        .as_i64()
        .ok_or_else(|| Error::invalid(format!("expected an integer, got {}", value_kind(value))))
}

pub fn number(value: &Value) -> Result<f64, Error> {
    value
        .as_f64()
        .ok_or_else(|| Error::invalid(format!("expected a number, got {}", value_kind(value))))
}

/// An integer within `min..=max`.
pub fn int_in(value: &Value, min: i64, max: i64) -> Result<i64, Error> {
    let n = integer(value)?;
    if n < min || n > max {
        return Err(Error::invalid(format!("{n} is out of range {min}..={max}")));
    }
    Ok(n)
}

/// A finite number no smaller than `min`.
pub fn number_at_least(value: &Value, min: f64) -> Result<f64, Error> {
    let n = number(value)?;
    if !n.is_finite() || n < min {
        return Err(Error::invalid(format!("{n} must be at least {min}")));
    }
    Ok(n)
}

pub fn location(value: &Value) -> Result<ResourceLocation, Error> {
    Ok(ResourceLocation::parse(&string(value)?)?)
}

/// A location whose namespace defaults to `namespace` instead of `minecraft`.
pub fn location_in(value: &Value, namespace: &str) -> Result<ResourceLocation, Error> {
    Ok(ResourceLocation::with_default_namespace(
        &string(value)?,
        namespace,
    )?)
}

pub fn item_stack(value: &Value) -> Result<ItemStack, Error> {
    Ok(ItemStack::parse(&string(value)?)?)
}
