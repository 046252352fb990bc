use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request, Session};
use crate::record::Student;

pub fn param_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn param_i64(params: &serde_json::Value, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.as_i64())
}

pub fn param_i64_list(params: &serde_json::Value, key: &str) -> Option<Vec<i64>> {
    params
        .get(key)?
        .as_array()?
        .iter()
        .map(|v| v.as_i64())
        .collect()
}

pub fn require_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    match param_str(&req.params, key) {
        Some(v) => Ok(v.trim()),
        None => Err(err(&req.id, "bad_params", format!("missing {key}"), None)),
    }
}

pub fn require_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    match param_i64(&req.params, key) {
        Some(v) => Ok(v),
        None => Err(err(&req.id, "bad_params", format!("missing {key}"), None)),
    }
}

pub fn session<'a>(state: &'a AppState, req: &Request) -> Result<&'a Session, serde_json::Value> {
    state
        .session
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_store", "open a store first", None))
}

pub fn session_mut<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Session, serde_json::Value> {
    state
        .session
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_store", "open a store first", None))
}

pub fn student_json(s: &Student) -> serde_json::Value {
    serde_json::to_value(s).unwrap_or(serde_json::Value::Null)
}

pub fn students_json<'a>(it: impl IntoIterator<Item = &'a Student>) -> Vec<serde_json::Value> {
    it.into_iter().map(student_json).collect()
}
