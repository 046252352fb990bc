use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::cipher::AesGcmCipher;
use crate::persist::StorePaths;
use crate::query::{DROPOUT_THRESHOLD, TOP_N};

pub const ENV_DATA_DIR: &str = "ROSTERD_DATA_DIR";
pub const ENV_KEY: &str = "ROSTERD_KEY";
pub const ENV_IV: &str = "ROSTERD_IV";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the stores. Without it the sidecar waits for
    /// `store.open`.
    pub data_dir: Option<PathBuf>,
    pub plaintext_file: String,
    pub encrypted_file: String,
    pub key_hex: Option<String>,
    pub iv_hex: Option<String>,
    pub dropout_threshold: i32,
    pub top_n: usize,
    pub save_on_exit: bool,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            plaintext_file: "students.txt".to_string(),
            encrypted_file: "students.enc".to_string(),
            key_hex: None,
            iv_hex: None,
            dropout_threshold: DROPOUT_THRESHOLD,
            top_n: TOP_N,
            save_on_exit: true,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads the JSON file if given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config {}", p.to_string_lossy()))?;
                serde_json::from_str::<Config>(&text)
                    .with_context(|| format!("invalid config {}", p.to_string_lossy()))?
            }
            None => Config::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_KEY) {
            self.key_hex = Some(v);
        }
        if let Some(v) = get(ENV_IV) {
            self.iv_hex = Some(v);
        }
    }

    pub fn store_paths(&self, dir: &Path) -> StorePaths {
        StorePaths::new(dir, &self.plaintext_file, &self.encrypted_file)
    }

    pub fn cipher(&self) -> anyhow::Result<AesGcmCipher> {
        let key = self
            .key_hex
            .as_deref()
            .ok_or_else(|| anyhow!("no store key configured (keyHex or {ENV_KEY})"))?;
        let iv = self
            .iv_hex
            .as_deref()
            .ok_or_else(|| anyhow!("no store IV configured (ivHex or {ENV_IV})"))?;
        AesGcmCipher::from_hex(key, iv).context("invalid store key material")
    }
}
