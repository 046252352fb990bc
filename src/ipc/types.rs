use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::persist::{LoadReport, LoadSource, Persistence};
use crate::store::Store;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// An opened data directory: its fully loaded store and the persistence
/// manager that produced it.
pub struct Session {
    pub data_dir: PathBuf,
    pub persistence: Persistence,
    pub store: Store,
    pub loaded_from: LoadSource,
}

pub struct AppState {
    pub config: Config,
    pub session: Option<Session>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Runs the startup protocol for `dir`. Pending changes in the current
    /// session are saved before anything is read, so reopening the same
    /// directory sees them. On failure the current session, if any, is kept.
    pub fn open(&mut self, dir: &Path) -> anyhow::Result<LoadReport> {
        let cipher = self.config.cipher()?;
        let persistence = Persistence::new(self.config.store_paths(dir), Box::new(cipher));
        self.save_pending()?;
        let (store, report) = persistence
            .open()
            .with_context(|| format!("failed to open store in {}", dir.to_string_lossy()))?;

        self.session = Some(Session {
            data_dir: dir.to_path_buf(),
            persistence,
            store,
            loaded_from: report.source,
        });
        Ok(report)
    }

    /// Saves unsaved changes when `saveOnExit` is set, then drops the session.
    /// A failed save leaves the session in place.
    pub fn close(&mut self) -> anyhow::Result<()> {
        self.save_pending()?;
        self.session = None;
        Ok(())
    }

    fn save_pending(&mut self) -> anyhow::Result<()> {
        if !self.config.save_on_exit {
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.store.is_dirty() {
            let written = session
                .persistence
                .export(&session.store)
                .context("failed to save open store")?;
            session.store.mark_saved();
            info!(records = written, "saved open store");
        }
        Ok(())
    }
}
