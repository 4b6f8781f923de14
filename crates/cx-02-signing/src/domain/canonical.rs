//! # Canonical Bytes
//!
//! The byte layout every signature in the exchange is computed over.
//!
//! ## Layout
//!
//! Fields are written in a fixed order, joined by U+2063 INVISIBLE SEPARATOR.
//! The separator may not appear inside a text field. Lists are written as their
//! length followed by each item, so `["a", "b"]` and `["a⁣b"]` can never
//! collide. JSON values are written with object keys sorted at every depth and
//! no whitespace.

use super::errors::DefinitionError;
use serde_json::Value;
use std::fmt::Write as _;

/// Field separator.
pub const SEPARATOR: char = '\u{2063}';

/// Deterministic serialization of one payload under one definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Appends fields in order, validating each one.
#[derive(Debug, Default)]
pub(crate) struct CanonicalWriter {
    buf: String,
    fields: usize,
}

impl CanonicalWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn separate(&mut self) {
        if self.fields > 0 {
            self.buf.push(SEPARATOR);
        }
        self.fields += 1;
    }

    /// Required, non-empty text field.
    pub(crate) fn text(&mut self, name: &'static str, value: &str) -> Result<&mut Self, DefinitionError> {
        if value.is_empty() {
            return Err(DefinitionError::MissingField(name));
        }
        if value.contains(SEPARATOR) {
            return Err(DefinitionError::ForbiddenCharacter(name));
        }
        self.separate();
        self.buf.push_str(value);
        Ok(self)
    }

    /// Fixed token such as a message type name.
    pub(crate) fn token(&mut self, value: &'static str) -> &mut Self {
        self.separate();
        self.buf.push_str(value);
        self
    }

    pub(crate) fn number(&mut self, value: u64) -> &mut Self {
        self.separate();
        // Writing to a String cannot fail.
        let _ = write!(self.buf, "{value}");
        self
    }

    /// Length-prefixed, order-preserving list of required text items.
    pub(crate) fn list<'v, I>(&mut self, name: &'static str, items: I) -> Result<&mut Self, DefinitionError>
    where
        I: IntoIterator<Item = &'v str>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        self.number(items.len() as u64);
        for item in items {
            self.text(name, item)?;
        }
        Ok(self)
    }

    /// JSON value with sorted keys.
    pub(crate) fn json(&mut self, value: &Value) -> Result<&mut Self, DefinitionError> {
        self.separate();
        write_json(&mut self.buf, value)?;
        Ok(self)
    }

    pub(crate) fn finish(self) -> CanonicalBytes {
        CanonicalBytes(self.buf.into_bytes())
    }
}

/// Canonical JSON text of `value`.
pub fn canonical_json(value: &Value) -> Result<String, DefinitionError> {
    let mut out = String::new();
    write_json(&mut out, value)?;
    Ok(out)
}

fn write_json(out: &mut String, value: &Value) -> Result<(), DefinitionError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if n.as_f64().is_some_and(|f| !f.is_finite()) {
                return Err(DefinitionError::NonFiniteNumber);
            }
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_json_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json(out, item)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(out, key);
                out.push(':');
                write_json(out, item)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_json_string(out: &mut String, s: &str) {
    // serde_json's escaping of a plain string is stable; the separator is
    // additionally escaped so JSON text never contains a raw one.
    let quoted = Value::String(s.to_owned()).to_string();
    if quoted.contains(SEPARATOR) {
        out.push_str(&quoted.replace(SEPARATOR, "\\u2063"));
    } else {
        out.push_str(&quoted);
    }
}
