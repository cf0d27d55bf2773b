use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// A single record as returned by an upstream: a movie, a show or an artist.
///
/// The record is kept verbatim so the JSON export reproduces exactly what the
/// upstream sent. Only a handful of fields are ever looked at, through the
/// accessors below.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct ListItem(Value);

impl ListItem {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// The record identifier, numeric or string, as text.
    pub fn id(&self) -> Option<Cow<'_, str>> {
        match self.0.get("id")? {
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }

    /// A top level field rendered as a csv cell. Missing and null fields are empty.
    pub fn field(&self, name: &str) -> Cow<'_, str> {
        match self.0.get(name) {
            None | Some(Value::Null) => Cow::Borrowed(""),
            Some(Value::String(s)) => Cow::Borrowed(s),
            Some(Value::Number(n)) => Cow::Owned(n.to_string()),
            Some(Value::Bool(b)) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Some(other) => Cow::Owned(other.to_string()),
        }
    }
}

impl From<Value> for ListItem {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
