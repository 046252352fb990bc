//! Plaintext and encrypted stores, and the one-way migration between them.
//!
//! Encrypted store layout: a bare sequence of frames
//! `[i32 native-endian length][ciphertext]`, no header and no count. Each
//! frame decrypts to one codec line.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cipher::Cipher;
use crate::codec::{format_line, parse_line};
use crate::error::StorageError;
use crate::store::Store;

/// Frames larger than this are treated as garbage rather than allocated.
pub const MAX_FRAME_LEN: usize = 64 * 1024;
const LEN_PREFIX: usize = std::mem::size_of::<i32>();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub plaintext: PathBuf,
    pub encrypted: PathBuf,
}

impl StorePaths {
    pub fn new(dir: &Path, plaintext_file: &str, encrypted_file: &str) -> Self {
        Self {
            plaintext: dir.join(plaintext_file),
            encrypted: dir.join(encrypted_file),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Encrypted,
    /// Loaded from plaintext, re-saved encrypted, plaintext deleted.
    Migrated,
    Empty,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadSource::Encrypted => "encrypted",
            LoadSource::Migrated => "migrated",
            LoadSource::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    pub records: usize,
}

pub struct Persistence {
    paths: StorePaths,
    cipher: Box<dyn Cipher>,
}

impl Persistence {
    pub fn new(paths: StorePaths, cipher: Box<dyn Cipher>) -> Self {
        Self { paths, cipher }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Startup protocol. The encrypted store wins when present; otherwise a
    /// plaintext store is loaded and migrated. The returned store is clean.
    pub fn open(&self) -> Result<(Store, LoadReport), StorageError> {
        if self.paths.encrypted.is_file() {
            if self.paths.plaintext.exists() {
                warn!(
                    path = %self.paths.plaintext.display(),
                    "ignoring plaintext store next to encrypted store"
                );
            }
            let mut store = self.load_encrypted(&self.paths.encrypted)?;
            store.mark_saved();
            let records = store.len();
            info!(records, path = %self.paths.encrypted.display(), "loaded encrypted store");
            return Ok((
                store,
                LoadReport {
                    source: LoadSource::Encrypted,
                    records,
                },
            ));
        }

        if self.paths.plaintext.is_file() {
            let mut store = self.load_plaintext(&self.paths.plaintext)?;
            self.export(&store)?;
            fs::remove_file(&self.paths.plaintext)
                .map_err(|e| StorageError::io(&self.paths.plaintext, e))?;
            store.mark_saved();
            let records = store.len();
            info!(
                records,
                from = %self.paths.plaintext.display(),
                to = %self.paths.encrypted.display(),
                "migrated plaintext store to encrypted store"
            );
            return Ok((
                store,
                LoadReport {
                    source: LoadSource::Migrated,
                    records,
                },
            ));
        }

        info!("no store found; starting empty");
        Ok((
            Store::new(),
            LoadReport {
                source: LoadSource::Empty,
                records: 0,
            },
        ))
    }

    /// All-or-nothing: the first bad line fails the whole load.
    pub fn load_plaintext(&self, path: &Path) -> Result<Store, StorageError> {
        let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
        let mut store = Store::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StorageError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let student = parse_line(&line).map_err(|source| StorageError::Record {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })?;
            store.insert(student);
        }
        Ok(store)
    }

    /// All-or-nothing: a truncated frame, a cipher failure or a bad payload
    /// fails the whole load.
    pub fn load_encrypted(&self, path: &Path) -> Result<Store, StorageError> {
        let bytes = fs::read(path).map_err(|e| StorageError::io(path, e))?;
        let mut store = Store::new();
        for (frame, payload) in Frames::new(&bytes).enumerate() {
            let ciphertext = payload.map_err(|e| e.into_storage(path, frame))?;
            let plaintext =
                self.cipher
                    .decrypt(ciphertext)
                    .map_err(|source| StorageError::Cipher {
                        path: path.to_path_buf(),
                        frame,
                        source,
                    })?;
            let text = String::from_utf8(plaintext).map_err(|_| StorageError::NotUtf8 {
                path: path.to_path_buf(),
                frame,
            })?;
            let student = parse_line(&text).map_err(|source| StorageError::FrameRecord {
                path: path.to_path_buf(),
                frame,
                source,
            })?;
            store.insert(student);
        }
        Ok(store)
    }

    /// Full snapshot in (level, class) order. Written beside the target,
    /// synced, then renamed over it, so a failed export leaves the previous
    /// store untouched. Returns only once the rename itself is durable.
    pub fn export(&self, store: &Store) -> Result<usize, StorageError> {
        let target = &self.paths.encrypted;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let staging = staging_path(target);
        let written = self.write_encrypted(store, &staging).inspect_err(|_| {
            let _ = fs::remove_file(&staging);
        })?;
        fs::rename(&staging, target).map_err(|e| {
            let _ = fs::remove_file(&staging);
            StorageError::io(target, e)
        })?;
        sync_parent(target)?;
        info!(records = written, path = %target.display(), "exported encrypted store");
        Ok(written)
    }

    fn write_encrypted(&self, store: &Store, path: &Path) -> Result<usize, StorageError> {
        let mut out = File::create(path).map_err(|e| StorageError::io(path, e))?;
        let mut written = 0;
        for (frame, (_, student)) in store.iter().enumerate() {
            let ciphertext = self
                .cipher
                .encrypt(format_line(student).as_bytes())
                .map_err(|source| StorageError::Cipher {
                    path: path.to_path_buf(),
                    frame,
                    source,
                })?;
            write_frame(&mut out, &ciphertext).map_err(|e| StorageError::io(path, e))?;
            written += 1;
        }
        out.sync_all().map_err(|e| StorageError::io(path, e))?;
        Ok(written)
    }
}

/// Flushes the directory entry created by a rename.
#[cfg(unix)]
fn sync_parent(target: &Path) -> Result<(), StorageError> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| StorageError::io(parent, e))
}

#[cfg(not(unix))]
fn sync_parent(_target: &Path) -> Result<(), StorageError> {
    Ok(())
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".writing");
    target.with_file_name(name)
}

pub fn write_frame<W: Write>(out: &mut W, ciphertext: &[u8]) -> std::io::Result<()> {
    let len = i32::try_from(ciphertext.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "frame too large"))?;
    out.write_all(&len.to_ne_bytes())?;
    out.write_all(ciphertext)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    Truncated { offset: usize },
    BadLength { length: i32 },
}

impl FrameError {
    fn into_storage(self, path: &Path, frame: usize) -> StorageError {
        match self {
            FrameError::Truncated { offset } => StorageError::TruncatedFrame {
                path: path.to_path_buf(),
                frame,
                offset,
            },
            FrameError::BadLength { length } => StorageError::BadFrameLength {
                path: path.to_path_buf(),
                frame,
                length: length as i64,
            },
        }
    }
}

/// Splits an encrypted store into ciphertext frames. Stops after the first
/// error.
pub struct Frames<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Frames<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            failed: false,
        }
    }

    fn fail(&mut self, e: FrameError) -> Option<Result<&'a [u8], FrameError>> {
        self.failed = true;
        Some(Err(e))
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<&'a [u8], FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos == self.bytes.len() {
            return None;
        }
        let rest = &self.bytes[self.pos..];
        let Some(prefix) = rest.get(..LEN_PREFIX) else {
            return self.fail(FrameError::Truncated { offset: self.pos });
        };
        let mut raw = [0u8; LEN_PREFIX];
        raw.copy_from_slice(prefix);
        let length = i32::from_ne_bytes(raw);
        if length <= 0 || length as usize > MAX_FRAME_LEN {
            return self.fail(FrameError::BadLength { length });
        }
        let Some(body) = rest.get(LEN_PREFIX..LEN_PREFIX + length as usize) else {
            return self.fail(FrameError::Truncated {
                offset: self.pos + LEN_PREFIX,
            });
        };
        self.pos += LEN_PREFIX + body.len();
        Some(Ok(body))
    }
}
