use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const STORE_ENTRY: &str = "store/students.enc";
pub const BUNDLE_FORMAT_V1: &str = "rosterd-store-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub record_count: Option<u64>,
}

/// Zips the encrypted store as-is (it stays encrypted inside the bundle)
/// together with a manifest carrying its SHA-256.
pub fn export_store_bundle(
    store_path: &Path,
    record_count: usize,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if !store_path.is_file() {
        return Err(anyhow!(
            "encrypted store not found: {}",
            store_path.to_string_lossy()
        ));
    }
    let store_bytes = std::fs::read(store_path)
        .with_context(|| format!("failed to read store {}", store_path.to_string_lossy()))?;
    let digest = hex::encode(Sha256::digest(&store_bytes));

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "recordCount": record_count,
        "storeSha256": digest,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(STORE_ENTRY, opts)
        .context("failed to start store entry")?;
    zip.write_all(&store_bytes)
        .context("failed to write store entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 2,
        sha256: digest,
    })
}

/// Extracts the store next to `dest`, checks its digest, hands the staged
/// file to `verify` (expected to fully load it), and only then moves it over
/// `dest`. Any failure leaves `dest` untouched.
pub fn import_store_bundle<F>(
    in_path: &Path,
    dest: &Path,
    verify: F,
) -> anyhow::Result<ImportSummary>
where
    F: FnOnce(&Path) -> anyhow::Result<()>,
{
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let expected_digest = manifest
        .get("storeSha256")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("manifest missing storeSha256"))?
        .to_ascii_lowercase();

    let mut store_bytes = Vec::new();
    archive
        .by_name(STORE_ENTRY)
        .context("bundle missing store/students.enc")?
        .read_to_end(&mut store_bytes)
        .context("failed to extract store entry")?;
    let digest = hex::encode(Sha256::digest(&store_bytes));
    if digest != expected_digest {
        return Err(anyhow!(
            "store digest mismatch: manifest {}, bundle {}",
            expected_digest,
            digest
        ));
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let tmp_dst = dest.with_extension("importing");
    if tmp_dst.exists() {
        let _ = std::fs::remove_file(&tmp_dst);
    }
    {
        let mut out = File::create(&tmp_dst).with_context(|| {
            format!("failed to create temp store {}", tmp_dst.to_string_lossy())
        })?;
        out.write_all(&store_bytes)
            .context("failed to write extracted store")?;
        out.sync_all().context("failed to flush extracted store")?;
    }

    if let Err(e) = verify(&tmp_dst) {
        let _ = std::fs::remove_file(&tmp_dst);
        return Err(e.context("bundled store failed to load"));
    }

    std::fs::rename(&tmp_dst, dest).with_context(|| {
        format!(
            "failed to move extracted store to {}",
            dest.to_string_lossy()
        )
    })?;

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        record_count: manifest.get("recordCount").and_then(|v| v.as_u64()),
    })
}
