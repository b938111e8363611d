//! Homework record -> notification text.

use serde_json::Value;

use crate::{domain::Verdict, errors::json_type_name, Error, Result};

pub const HOMEWORK_NAME: &str = "homework_name";
pub const STATUS: &str = "status";

/// Verdict of a single homework record.
pub fn verdict_of(homework: &Value) -> Result<Verdict> {
    match homework.get(STATUS) {
        Some(Value::String(s)) => s.parse(),
        Some(other) => Err(Error::UnknownVerdict(other.to_string())),
        None => Err(Error::UnknownVerdict("<missing>".to_string())),
    }
}

/// Render the status-change message for one homework record.
pub fn parse_status(homework: &Value) -> Result<String> {
    if !homework.is_object() {
        return Err(Error::Shape {
            expected: "object",
            actual: json_type_name(homework),
        });
    }

    let Some(name) = homework.get(HOMEWORK_NAME).and_then(Value::as_str) else {
        return Err(Error::MissingName);
    };
    let verdict = verdict_of(homework)?;

    Ok(format!(
        "Changed review status of \"{name}\". {}",
        verdict.description()
    ))
}
