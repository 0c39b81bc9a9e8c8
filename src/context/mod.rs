//! The variable store shared by the nodes of a single run.

use crate::error::DocumentError;
use crate::value::lookup_path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Maps variable names to values for the duration of one run.
///
/// Variables keep their write order: rewriting a name moves it to the most recent
/// position. Executors only ever see `&ExecutionContext`; the scheduler is the sole
/// writer between node invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext {
    vars: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a context from a JSON object. Any other JSON value is stored under `input`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(vars) => Self { vars },
            Value::Null => Self::default(),
            other => {
                let mut ctx = Self::default();
                ctx.set("input", other);
                ctx
            }
        }
    }

    /// Loads the initial variables of a run from a JSON document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_value(serde_json::from_str(&content)?))
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub(crate) fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.vars.shift_remove(&name);
        self.vars.insert(name, value);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates variables in write order, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.vars)
    }

    /// Resolves a variable reference used by formulas, conditions and templates.
    ///
    /// Lookup order: the exact variable name, then a dotted path rooted at a variable,
    /// then the most recently written record that exposes the name as a field. A tabular
    /// value (`{columns, rows}`) exposes the fields of its first row.
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.vars.get(name) {
            return Some(value);
        }
        if let Some((root, rest)) = name.split_once('.') {
            if let Some(found) = self.vars.get(root).and_then(|v| lookup_path(v, rest)) {
                return Some(found);
            }
        }
        self.vars.values().rev().find_map(|value| scoped_field(value, name))
    }

    /// The most recently written array-shaped value, with the name it was written under.
    ///
    /// Tabular values count as arrays through their `rows`.
    pub fn latest_collection(&self) -> Option<(&str, &Vec<Value>)> {
        self.vars
            .iter()
            .rev()
            .find_map(|(name, value)| collection_of(value).map(|rows| (name.as_str(), rows)))
    }
}

/// Returns the rows of an array or of a tabular record.
pub fn collection_of(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => match map.get("rows") {
            Some(Value::Array(rows)) => Some(rows),
            _ => None,
        },
        _ => None,
    }
}

fn scoped_field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    let Value::Object(map) = value else {
        return None;
    };
    if let Some(found) = map.get(name) {
        return Some(found);
    }
    match map.get("rows") {
        Some(Value::Array(rows)) => rows.first().and_then(|row| lookup_path(row, name)),
        _ => None,
    }
}

impl From<Map<String, Value>> for ExecutionContext {
    fn from(vars: Map<String, Value>) -> Self {
        Self { vars }
    }
}
