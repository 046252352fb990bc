use rosterd::cipher::{AesGcmCipher, Cipher};
use rosterd::codec::{format_line, parse_line};
use rosterd::error::{StorageError, ValidationError};
use rosterd::persist::{write_frame, Frames, LoadSource, Persistence, StorePaths};
use rosterd::record::Placement;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const KEY: &str = "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";
const OTHER_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
const IV: &str = "cafebabefacedbaddecaf888";

const ALICE: &str = "Alice Cohen 0501 1 1 90 90 90 90 90 90 90 90 90 90";
const BOB: &str = "Bob Levi 0502 1 1 60 60 60 60 60 60 60 60 60 60";
const CARMEL: &str = "Carmel Mizrahi 0503 4 7 70 71 72 73 74 75 76 77 78 79";

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn persistence_with(dir: &Path, key: &str) -> Persistence {
    Persistence::new(
        StorePaths::new(dir, "students.txt", "students.enc"),
        Box::new(AesGcmCipher::from_hex(key, IV).expect("cipher")),
    )
}

fn persistence(dir: &Path) -> Persistence {
    persistence_with(dir, KEY)
}

fn lines_of(p: &Persistence) -> Vec<String> {
    let (store, _) = p.open().expect("open");
    store.iter().map(|(_, s)| format_line(s)).collect()
}

#[test]
fn first_run_migrates_plaintext_to_encrypted() {
    let dir = temp_dir("rosterd-migrate");
    let p = persistence(&dir);
    std::fs::write(&p.paths().plaintext, format!("{ALICE}\n{CARMEL}\n\n{BOB}\n"))
        .expect("write plaintext");

    let (store, report) = p.open().expect("open");
    assert_eq!(report.source, LoadSource::Migrated);
    assert_eq!(report.records, 3);
    assert!(!store.is_dirty());
    assert!(!p.paths().plaintext.exists());
    assert!(p.paths().encrypted.is_file());

    let raw = std::fs::read(&p.paths().encrypted).expect("read store");
    assert!(!String::from_utf8_lossy(&raw).contains("Alice"));

    // Second open is sticky on the encrypted store and sees the same records.
    let (again, report) = p.open().expect("reopen");
    assert_eq!(report.source, LoadSource::Encrypted);
    let before: Vec<String> = store.iter().map(|(_, s)| format_line(s)).collect();
    let after: Vec<String> = again.iter().map(|(_, s)| format_line(s)).collect();
    assert_eq!(before, after);
    assert_eq!(
        after,
        [
            format!("{BOB}\n"),
            format!("{ALICE}\n"),
            format!("{CARMEL}\n")
        ]
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn bad_plaintext_line_fails_the_whole_load() {
    let dir = temp_dir("rosterd-bad-line");
    let p = persistence(&dir);
    let text = format!("{ALICE}\nDana Peretz 0504 2 2 80 80 80\n");
    std::fs::write(&p.paths().plaintext, &text).expect("write plaintext");

    let err = p.open().err().expect("load must fail");
    match err {
        StorageError::Record { line, source, .. } => {
            assert_eq!(line, 2);
            assert_eq!(source, ValidationError::GradeCount(3));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!p.paths().encrypted.exists());
    assert_eq!(
        std::fs::read_to_string(&p.paths().plaintext).expect("plaintext kept"),
        text
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn encrypted_store_wins_over_stray_plaintext() {
    let dir = temp_dir("rosterd-sticky");
    let p = persistence(&dir);
    std::fs::write(&p.paths().plaintext, format!("{ALICE}\n")).expect("write plaintext");
    p.open().expect("migrate");

    std::fs::write(&p.paths().plaintext, format!("{BOB}\n{CARMEL}\n")).expect("write stray");
    let (store, report) = p.open().expect("open");
    assert_eq!(report.source, LoadSource::Encrypted);
    assert_eq!(store.len(), 1);
    assert!(p.paths().plaintext.exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_stores_open_empty() {
    let dir = temp_dir("rosterd-empty");
    let p = persistence(&dir);
    let (store, report) = p.open().expect("open");
    assert_eq!(report.source, LoadSource::Empty);
    assert!(store.is_empty());
    assert!(!p.paths().encrypted.exists());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn each_frame_decrypts_to_one_formatted_line() {
    let dir = temp_dir("rosterd-frames");
    let p = persistence(&dir);
    std::fs::write(&p.paths().plaintext, format!("{CARMEL}\n{ALICE}\n")).expect("write");
    p.open().expect("migrate");

    let cipher = AesGcmCipher::from_hex(KEY, IV).expect("cipher");
    let bytes = std::fs::read(&p.paths().encrypted).expect("read");
    let lines: Vec<String> = Frames::new(&bytes)
        .map(|f| {
            let plain = cipher.decrypt(f.expect("frame")).expect("decrypt");
            String::from_utf8(plain).expect("utf8")
        })
        .collect();
    assert_eq!(lines, [format!("{ALICE}\n"), format!("{CARMEL}\n")]);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn truncated_final_frame_is_a_hard_failure() {
    let dir = temp_dir("rosterd-truncated");
    let p = persistence(&dir);
    std::fs::write(&p.paths().plaintext, format!("{ALICE}\n{BOB}\n")).expect("write");
    p.open().expect("migrate");

    let mut bytes = std::fs::read(&p.paths().encrypted).expect("read");
    bytes.truncate(bytes.len() - 3);
    std::fs::write(&p.paths().encrypted, &bytes).expect("truncate");

    let err = p.open().err().expect("load must fail");
    assert!(
        matches!(err, StorageError::TruncatedFrame { frame: 1, .. }),
        "unexpected error: {err}"
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn garbled_frame_fails_with_cipher_error() {
    let dir = temp_dir("rosterd-garbled");
    let p = persistence(&dir);
    let mut bytes = Vec::new();
    write_frame(&mut bytes, b"definitely not ciphertext").expect("frame");
    std::fs::write(&p.paths().encrypted, &bytes).expect("write");

    let err = p.open().err().expect("load must fail");
    assert!(matches!(err, StorageError::Cipher { frame: 0, .. }));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn wrong_key_cannot_load() {
    let dir = temp_dir("rosterd-wrong-key");
    let p = persistence(&dir);
    std::fs::write(&p.paths().plaintext, format!("{ALICE}\n")).expect("write");
    p.open().expect("migrate");

    let other = persistence_with(&dir, OTHER_KEY);
    assert!(matches!(
        other.open().err(),
        Some(StorageError::Cipher { .. })
    ));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn export_is_a_full_snapshot() {
    let dir = temp_dir("rosterd-snapshot");
    let p = persistence(&dir);
    std::fs::write(&p.paths().plaintext, format!("{ALICE}\n{BOB}\n{CARMEL}\n")).expect("write");
    let (mut store, _) = p.open().expect("migrate");

    let bucket = Placement::new(1, 1).expect("placement");
    let bob = store.find_by_phone(bucket, "0502").expect("bob");
    store.delete(bob).expect("delete");
    store.insert(parse_line("Dana Peretz 0504 2 2 80 80 80 80 80 80 80 80 80 80").expect("parse"));
    assert_eq!(p.export(&store).expect("export"), 3);

    let lines = lines_of(&p);
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| !l.starts_with("Bob")));
    assert!(lines.iter().any(|l| l.starts_with("Dana")));
    assert!(!dir.join("students.enc.writing").exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn export_into_a_fresh_directory_is_readable_at_once() {
    let root = temp_dir("rosterd-fresh-dir");
    let dir = root.join("nested").join("store");
    let p = persistence(&dir);
    let mut store = rosterd::store::Store::new();
    store.insert(parse_line(ALICE).expect("parse"));
    assert_eq!(p.export(&store).expect("export"), 1);

    let (loaded, report) = p.open().expect("open");
    assert_eq!(report.source, LoadSource::Encrypted);
    assert_eq!(loaded.len(), 1);
    assert!(!dir.join("students.enc.writing").exists());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn failed_rename_keeps_previous_store_and_no_staging_file() {
    let dir = temp_dir("rosterd-rename-fail");
    let p = persistence(&dir);
    std::fs::create_dir_all(p.paths().encrypted.join("keep")).expect("create blocker");

    let mut store = rosterd::store::Store::new();
    store.insert(parse_line(ALICE).expect("parse"));
    let e = p.export(&store).expect_err("rename over a directory");
    assert!(matches!(e, StorageError::Io { .. }));
    assert!(p.paths().encrypted.is_dir());
    assert!(!dir.join("students.enc.writing").exists());

    let _ = std::fs::remove_dir_all(dir);
}
