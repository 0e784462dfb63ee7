//! # Projects
//!
//! A project is whatever JSON object the frontend saves, as long as it carries a
//! non-empty `id` and `sourceImage`. The server only ever adds `updatedAt`.
//! Both must be JSON strings: a number, `true` or an empty string is a `400`.
//!
//! - Key: `roomify_project_<id>`
//! - `updatedAt`: ISO 8601, millisecond precision, UTC (`2025-11-14T08:30:00.000Z`)
//! - `list` responses add `isPublic: true` to every entry
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::AppError;

pub const PROJECT_PREFIX: &str = "roomify_project_";

pub const ID: &str = "id";
pub const SOURCE_IMAGE: &str = "sourceImage";
pub const UPDATED_AT: &str = "updatedAt";
pub const IS_PUBLIC: &str = "isPublic";

pub fn project_key(id: &str) -> String {
    format!("{PROJECT_PREFIX}{id}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Project {
    /// Pulls `project` out of a save body.
    pub fn from_body(body: &Value) -> Result<Self, AppError> {
        let fields = body
            .get("project")
            .and_then(Value::as_object)
            .ok_or(AppError::MissingProjectFields)?;

        let id = non_empty_str(fields, ID).ok_or(AppError::MissingProjectFields)?;
        non_empty_str(fields, SOURCE_IMAGE).ok_or(AppError::MissingProjectFields)?;

        Ok(Self {
            id: id.to_string(),
            fields: fields.clone(),
        })
    }

    pub fn key(&self) -> String {
        project_key(&self.id)
    }

    /// The stored form: every field as sent, `updatedAt` overwritten.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Value {
        self.fields.insert(
            UPDATED_AT.to_string(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Value::Object(self.fields)
    }
}

/// Adds `isPublic: true`. Anything that is not an object has no place in a listing.
pub fn publish(value: Value) -> Option<Value> {
    match value {
        Value::Object(mut fields) => {
            fields.insert(IS_PUBLIC.to_string(), Value::Bool(true));
            Some(Value::Object(fields))
        }
        _ => None,
    }
}

fn non_empty_str<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}
