use crate::{config::Config, session::Session, util::ensure_dir};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::info;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub index: usize,
    pub image_filename: String,
    pub report_filename: String,
}

/// One row per anonymized image, in the order the batch finished them.
pub fn manifest(session: &Session) -> Vec<ManifestRow> {
    session
        .anonymization()
        .results()
        .filter_map(|r| session.registry().image(r.id))
        .enumerate()
        .map(|(index, image)| ManifestRow {
            index,
            image_filename: image.filename.clone(),
            report_filename: session
                .associations()
                .get(image.id)
                .map(|a| a.as_str().to_string())
                .unwrap_or_default(),
        })
        .collect()
}

pub fn manifest_csv(rows: &[ManifestRow]) -> Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    // serialize() skips the header when there are no rows.
    w.write_record(["index", "image_filename", "report_filename"])?;
    for row in rows {
        let index = row.index.to_string();
        w.write_record([
            index.as_str(),
            row.image_filename.as_str(),
            row.report_filename.as_str(),
        ])?;
    }
    w.into_inner().map_err(|e| anyhow::anyhow!("flushing manifest: {e}"))
}

/// Builds the zip archive from committed session state. Makes no network calls.
pub fn package(cfg: &Config, session: &Session) -> Result<Vec<u8>> {
    if !session.can_export() {
        bail!("nothing to export: no image has been anonymized");
    }

    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut used_images = HashSet::new();
    for result in session.anonymization().results() {
        let Some(image) = session.registry().image(result.id) else {
            continue;
        };
        let base = format!("{}{}", stem(&image.filename), cfg.export.image_suffix);
        let name = unique_name(&mut used_images, &base, ".png");
        let entry = format!("{}/{}", cfg.export.images_dir, name);
        zip.start_file(entry.as_str(), opts)
            .with_context(|| format!("adding {entry}"))?;
        zip.write_all(&result.png)?;
    }

    let mut used_reports = HashSet::new();
    for report in session.registry().reports() {
        let (base, ext) = split_report_name(&report.filename);
        let name = unique_name(&mut used_reports, &base, &ext);
        let entry = format!("{}/{}", cfg.export.reports_dir, name);
        zip.start_file(entry.as_str(), opts)
            .with_context(|| format!("adding {entry}"))?;
        zip.write_all(&report.bytes)?;
    }

    let rows = manifest(session);
    zip.start_file(cfg.export.manifest_filename.as_str(), opts)
        .with_context(|| "adding manifest")?;
    zip.write_all(&manifest_csv(&rows)?)?;

    let bytes = zip.finish().with_context(|| "finishing zip")?.into_inner();
    info!(
        "packaged {} image(s), {} report(s), {} bytes",
        rows.len(),
        session.registry().reports().len(),
        bytes.len()
    );
    Ok(bytes)
}

pub fn write_archive(cfg: &Config, session: &Session, path: &Path) -> Result<()> {
    let bytes = package(cfg, session)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(path, bytes).with_context(|| format!("writing archive: {}", path.display()))
}

fn stem(filename: &str) -> String {
    Path::new(last_component(filename))
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
        .to_string()
}

// Entries must stay under their directory, whatever the upload was called.
fn last_component(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or_default()
}

fn split_report_name(filename: &str) -> (String, String) {
    let path = Path::new(last_component(filename));
    let base = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "..")
        .unwrap_or("report")
        .to_string();
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    (base, ext)
}

fn unique_name(used: &mut HashSet<String>, base: &str, ext: &str) -> String {
    let first = format!("{base}{ext}");
    if used.insert(first.clone()) {
        return first;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
