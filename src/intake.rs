use crate::{config::Config, registry::Upload, util::looks_like_url};
use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Report,
}

/// Reads the files named by `inputs`. Directories contribute their matching
/// files in name order; explicit files that do not match are rejected.
pub fn collect_uploads(cfg: &Config, kind: UploadKind, inputs: &[PathBuf]) -> Result<Vec<Upload>> {
    let pattern = match kind {
        UploadKind::Image => &cfg.uploads.image_pattern,
        UploadKind::Report => &cfg.uploads.report_pattern,
    };
    let re = Regex::new(pattern).with_context(|| format!("invalid upload pattern: {pattern}"))?;

    let mut uploads = Vec::new();
    for input in inputs {
        validate_input(cfg, input)?;
        if input.is_dir() {
            let mut entries = std::fs::read_dir(input)
                .with_context(|| format!("listing {}", input.display()))?
                .collect::<std::result::Result<Vec<_>, _>>()?
                .into_iter()
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect::<Vec<_>>();
            entries.sort();
            for path in entries {
                if matches(&re, &path) {
                    uploads.push(read_upload(cfg, &path)?);
                } else {
                    debug!("skipping {} (does not match {pattern})", path.display());
                }
            }
        } else {
            if !matches(&re, input) {
                bail!("{} is not an accepted {:?} upload", input.display(), kind);
            }
            uploads.push(read_upload(cfg, input)?);
        }
    }

    if uploads.is_empty() && !inputs.is_empty() {
        warn!("no {:?} files found in the given inputs", kind);
    }
    Ok(uploads)
}

fn matches(re: &Regex, path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| re.is_match(name))
}

fn read_upload(cfg: &Config, path: &Path) -> Result<Upload> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    if size > cfg.uploads.max_file_bytes {
        bail!(
            "{} exceeds uploads.max_file_bytes ({} > {})",
            path.display(),
            size,
            cfg.uploads.max_file_bytes
        );
    }
    Upload::from_path(path)
}

pub fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    Ok(())
}
