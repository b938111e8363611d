//! Shape checks for the review API response.

use serde_json::Value;

use crate::{errors::json_type_name, Error, Result};

pub const HOMEWORKS: &str = "homeworks";
pub const CURRENT_DATE: &str = "current_date";

/// Check that `response` is an object carrying a `homeworks` array.
///
/// A `homeworks` key holding `null` is treated as missing.
pub fn check_response(response: &Value) -> Result<()> {
    let Some(obj) = response.as_object() else {
        return Err(Error::Shape {
            expected: "object",
            actual: json_type_name(response),
        });
    };

    let homeworks = match obj.get(HOMEWORKS) {
        None | Some(Value::Null) => return Err(Error::MissingField(HOMEWORKS)),
        Some(v) => v,
    };

    if !homeworks.is_array() {
        return Err(Error::FieldType {
            field: HOMEWORKS,
            expected: "array",
            actual: json_type_name(homeworks),
        });
    }

    Ok(())
}

/// Homework records of an already validated response, newest first.
pub fn homeworks(response: &Value) -> &[Value] {
    response
        .get(HOMEWORKS)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Server-supplied cursor for the next poll, when present and integral.
pub fn current_date(response: &Value) -> Option<i64> {
    response.get(CURRENT_DATE).and_then(Value::as_i64)
}
