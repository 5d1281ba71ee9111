//! Bundle container: the ZIP stream served at `/download?taskId=...` and
//! extracted by the receiver. Entries are stored, not deflated — the bundle
//! is a streaming container, not a compression product.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file (or synthetic text) to pack into a bundle.
pub struct BundleEntry<'a> {
    pub display_name: &'a str,
    pub contents: &'a [u8],
}

/// A file extracted from a received bundle.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Pack `entries` into a ZIP bundle, `{index}/{display_name}` per entry,
/// using the Stored method (no compression).
pub fn create_bundle(entries: &[BundleEntry<'_>]) -> Result<Vec<u8>, BundleError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buf);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (index, entry) in entries.iter().enumerate() {
            zip.start_file(format!("{index}/{}", entry.display_name), options)?;
            zip.write_all(entry.contents)?;
        }
        zip.finish()?;
    }
    Ok(buf.into_inner())
}

/// Extract a received bundle into `output_dir`, retaining only each entry's
/// basename and resolving name collisions as `name_N.ext` (N starting at 1).
pub fn extract_bundle(data: &[u8], output_dir: &Path) -> Result<Vec<ExtractedFile>, BundleError> {
    std::fs::create_dir_all(output_dir)?;
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut extracted = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let name = Path::new(entry.name())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let out_path = resolve_collision(output_dir, &name);

        let mut out_file = std::fs::File::create(&out_path)?;
        let size = std::io::copy(&mut entry, &mut out_file)?;
        extracted.push(ExtractedFile { name: name.clone(), path: out_path, size });
    }

    Ok(extracted)
}

fn resolve_collision(output_dir: &Path, name: &str) -> PathBuf {
    let candidate = output_dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = Path::new(name).file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let suffix = Path::new(name).extension().and_then(|s| s.to_str()).map(|s| format!(".{s}")).unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = output_dir.join(format!("{stem}_{counter}{suffix}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
