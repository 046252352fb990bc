use crate::ipc::error::{err, ok, storage_failed};
use crate::ipc::helpers::{param_str, session, session_mut};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dataDir": state.session.as_ref().map(|s| s.data_dir.to_string_lossy().to_string())
        }),
    )
}

fn handle_store_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dir = param_str(&req.params, "dataDir")
        .map(PathBuf::from)
        .or_else(|| state.config.data_dir.clone());
    let Some(dir) = dir else {
        return err(&req.id, "bad_params", "missing params.dataDir", None);
    };

    match state.open(&dir) {
        Ok(report) => ok(
            &req.id,
            json!({
                "dataDir": dir.to_string_lossy(),
                "source": report.source.as_str(),
                "records": report.records,
            }),
        ),
        Err(e) => storage_failed(&req.id, e),
    }
}

fn handle_store_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let paths = s.persistence.paths();
    ok(
        &req.id,
        json!({
            "dataDir": s.data_dir.to_string_lossy(),
            "loadedFrom": s.loaded_from.as_str(),
            "records": s.store.len(),
            "dirty": s.store.is_dirty(),
            "encryptedPath": paths.encrypted.to_string_lossy(),
        }),
    )
}

fn handle_store_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session_mut(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match s.persistence.export(&s.store) {
        Ok(written) => {
            s.store.mark_saved();
            ok(
                &req.id,
                json!({
                    "records": written,
                    "path": s.persistence.paths().encrypted.to_string_lossy(),
                }),
            )
        }
        Err(e) => storage_failed(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "store.open" => Some(handle_store_open(state, req)),
        "store.status" => Some(handle_store_status(state, req)),
        "store.export" => Some(handle_store_export(state, req)),
        _ => None,
    }
}
