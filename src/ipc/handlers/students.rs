use crate::codec::parse_line;
use crate::error::ValidationError;
use crate::ipc::error::{err, invalid, not_found, ok};
use crate::ipc::helpers::{
    param_i64, param_i64_list, param_str, require_i64, require_str, session, session_mut,
    student_json, students_json,
};
use crate::ipc::types::{AppState, Request};
use crate::query::search_by_name;
use crate::record::{Placement, Student};
use crate::store::{StudentUpdate, UpdateError};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let level = param_i64(&req.params, "level");
    let class = param_i64(&req.params, "class");
    let students = match (level, class) {
        (None, None) => students_json(s.store.iter().map(|(_, st)| st)),
        (Some(level), Some(class)) => match Placement::new(level, class) {
            Ok(p) => students_json(s.store.bucket(p).map(|(_, st)| st)),
            Err(e) => return invalid(&req.id, &e),
        },
        _ => return err(&req.id, "bad_params", "level and class go together", None),
    };
    ok(&req.id, json!({ "students": students }))
}

/// Either `params.line` in store format, or the individual fields.
fn student_from_params(params: &serde_json::Value) -> Result<Student, ValidationError> {
    if let Some(line) = param_str(params, "line") {
        return parse_line(line);
    }
    let placement = Placement::new(
        param_i64(params, "level").unwrap_or(0),
        param_i64(params, "class").unwrap_or(0),
    )?;
    let grades = param_i64_list(params, "grades").unwrap_or_default();
    Student::new(
        param_str(params, "firstName").unwrap_or("").trim(),
        param_str(params, "lastName").unwrap_or("").trim(),
        param_str(params, "phone").unwrap_or("").trim(),
        placement,
        &grades,
    )
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session_mut(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let student = match student_from_params(&req.params) {
        Ok(v) => v,
        Err(e) => return invalid(&req.id, &e),
    };
    let id = s.store.insert(student);
    let created = s.store.get(id).map(student_json);
    ok(&req.id, json!({ "student": created }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session_mut(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let (level, class, phone) = match (
        require_i64(req, "level"),
        require_i64(req, "class"),
        require_str(req, "phone"),
    ) {
        (Ok(l), Ok(c), Ok(p)) => (l, c, p),
        (Err(resp), _, _) | (_, Err(resp), _) | (_, _, Err(resp)) => return resp,
    };
    let placement = match Placement::new(level, class) {
        Ok(p) => p,
        Err(e) => return invalid(&req.id, &e),
    };

    let Some(id) = s.store.find_by_phone(placement, phone) else {
        return not_found(&req.id, "student");
    };
    match s.store.delete(id) {
        Some(deleted) => ok(&req.id, json!({ "deleted": student_json(&deleted) })),
        None => not_found(&req.id, "student"),
    }
}

fn update_from_params(params: &serde_json::Value) -> StudentUpdate {
    let text = |k: &str| param_str(params, k).map(|v| v.trim().to_string());
    StudentUpdate {
        first_name: text("firstName"),
        last_name: text("lastName"),
        phone: text("phone"),
        level: param_i64(params, "level"),
        class: param_i64(params, "class"),
        grades: param_i64_list(params, "grades"),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session_mut(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let (first, last) = match (require_str(req, "firstName"), require_str(req, "lastName")) {
        (Ok(f), Ok(l)) => (f, l),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let Some(set) = req.params.get("set").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "missing set", None);
    };
    let changes = update_from_params(set);
    if changes.is_empty() {
        return err(&req.id, "bad_params", "set has no known fields", None);
    }

    let Some((id, _)) = search_by_name(&s.store, first, last) else {
        return not_found(&req.id, "student");
    };
    match s.store.update(id, &changes) {
        Ok(updated) => ok(&req.id, json!({ "student": student_json(updated) })),
        Err(UpdateError::Invalid(e)) => invalid(&req.id, &e),
        Err(UpdateError::NotFound) => not_found(&req.id, "student"),
    }
}

fn handle_students_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let (first, last) = match (require_str(req, "firstName"), require_str(req, "lastName")) {
        (Ok(f), Ok(l)) => (f, l),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    match search_by_name(&s.store, first, last) {
        Some((_, found)) => ok(&req.id, json!({ "student": student_json(found) })),
        None => not_found(&req.id, "student"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.search" => Some(handle_students_search(state, req)),
        _ => None,
    }
}
