use crate::ipc::error::{err, invalid, ok};
use crate::ipc::helpers::{param_i64, require_i64, session, students_json};
use crate::ipc::types::{AppState, Request};
use crate::query;
use serde_json::json;

fn handle_top_students(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let course = match require_i64(req, "course") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let n = match param_i64(&req.params, "n") {
        Some(v) if v < 0 => return err(&req.id, "bad_params", "n must be >= 0", None),
        Some(v) => v as usize,
        None => state.config.top_n,
    };

    match param_i64(&req.params, "level") {
        Some(level) => match query::top_n_in_course(&s.store, level, course, n) {
            Ok(students) => ok(
                &req.id,
                json!({
                    "level": level,
                    "course": course,
                    "students": students_json(students),
                }),
            ),
            Err(e) => invalid(&req.id, &e),
        },
        None => match query::top_n_per_level(&s.store, course, n) {
            Ok(levels) => ok(&req.id, json!({ "levels": levels })),
            Err(e) => invalid(&req.id, &e),
        },
    }
}

fn handle_dropouts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let threshold = match param_i64(&req.params, "threshold") {
        Some(v) => match i32::try_from(v) {
            Ok(t) => t,
            Err(_) => return err(&req.id, "bad_params", "threshold out of range", None),
        },
        None => state.config.dropout_threshold,
    };
    let students = query::below_threshold(&s.store, threshold);
    ok(
        &req.id,
        json!({
            "threshold": threshold,
            "students": students_json(students),
        }),
    )
}

fn handle_course_averages(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let level = param_i64(&req.params, "level");
    let course = param_i64(&req.params, "course");
    match (level, course) {
        (Some(level), Some(course)) => {
            match query::average_per_course(&s.store, level, course) {
                Ok(Some(average)) => ok(
                    &req.id,
                    json!({ "averages": [{ "level": level, "course": course, "average": average }] }),
                ),
                Ok(None) => ok(&req.id, json!({ "averages": [] })),
                Err(e) => invalid(&req.id, &e),
            }
        }
        (None, None) => ok(
            &req.id,
            json!({ "averages": query::course_averages(&s.store) }),
        ),
        _ => err(&req.id, "bad_params", "level and course go together", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "query.topStudents" => Some(handle_top_students(state, req)),
        "query.dropouts" => Some(handle_dropouts(state, req)),
        "query.courseAverages" => Some(handle_course_averages(state, req)),
        _ => None,
    }
}
