use serde_json::json;

use crate::error::ValidationError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Operator input that failed validation. The store was not touched.
pub fn invalid(id: &str, e: &ValidationError) -> serde_json::Value {
    err(
        id,
        "invalid_input",
        "invalid input, try again",
        Some(json!({ "reason": e.to_string() })),
    )
}

pub fn not_found(id: &str, what: &str) -> serde_json::Value {
    err(id, "not_found", format!("{what} not found"), None)
}

/// A load or save phase failed; `{:#}` keeps the anyhow context chain.
pub fn storage_failed(id: &str, e: impl std::fmt::Display) -> serde_json::Value {
    err(id, "storage_failed", format!("{e:#}"), None)
}
