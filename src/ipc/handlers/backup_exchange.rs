use crate::backup;
use crate::ipc::error::{err, ok, storage_failed};
use crate::ipc::helpers::{require_str, session_mut};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

/// Saves the current store first so the bundle matches what is in memory.
fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session_mut(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let out_path = match require_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };

    let records = match s.persistence.export(&s.store) {
        Ok(n) => n,
        Err(e) => return storage_failed(&req.id, e),
    };
    s.store.mark_saved();

    match backup::export_store_bundle(&s.persistence.paths().encrypted, records, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "outPath": out_path.to_string_lossy(),
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
                "records": records,
                "sha256": summary.sha256,
            }),
        ),
        Err(e) => storage_failed(&req.id, e),
    }
}

/// Replaces the open store with the bundled one. The bundle must fully load
/// with the configured key before anything on disk or in memory changes.
fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let s = match session_mut(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let in_path = match require_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };

    let mut staged = None;
    let dest = s.persistence.paths().encrypted.clone();
    let persistence = &s.persistence;
    let result = backup::import_store_bundle(&in_path, &dest, |p| {
        staged = Some(persistence.load_encrypted(p)?);
        Ok(())
    });

    match (result, staged) {
        (Ok(summary), Some(mut store)) => {
            store.mark_saved();
            let records = store.len();
            s.store = store;
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "records": records,
                }),
            )
        }
        (Ok(_), None) => err(&req.id, "storage_failed", "bundle produced no store", None),
        (Err(e), _) => storage_failed(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportBundle" => Some(handle_backup_export(state, req)),
        "backup.importBundle" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
