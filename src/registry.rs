use crate::util::{media_type_for, sha256_hex};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

/// Synthetic identity assigned to an image at upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            media_type: media_type.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .with_context(|| format!("upload has no usable file name: {}", path.display()))?
            .to_string();
        let bytes =
            std::fs::read(path).with_context(|| format!("reading upload: {}", path.display()))?;
        Ok(Self {
            filename,
            bytes,
            media_type: media_type_for(path).to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ImageItem {
    pub id: ItemId,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ReportItem {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub media_type: String,
}

#[derive(Debug, Default)]
pub struct UploadRegistry {
    images: Vec<ImageItem>,
    reports: Vec<ReportItem>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole image set. Every image gets a new identity, even if
    /// the same file was part of the previous set.
    pub fn replace_images(&mut self, uploads: Vec<Upload>) -> &[ImageItem] {
        let mut seen = HashSet::new();
        self.images = uploads
            .into_iter()
            .map(|u| {
                if !seen.insert(u.filename.clone()) {
                    warn!("duplicate image filename in batch: {}", u.filename);
                }
                ImageItem {
                    id: ItemId::fresh(),
                    sha256: sha256_hex(&u.bytes),
                    filename: u.filename,
                    bytes: u.bytes,
                    media_type: u.media_type,
                }
            })
            .collect();
        &self.images
    }

    /// Replaces the whole report set. The first report with a given file name wins.
    pub fn replace_reports(&mut self, uploads: Vec<Upload>) -> &[ReportItem] {
        let mut seen = HashSet::new();
        self.reports = uploads
            .into_iter()
            .filter(|u| {
                let fresh = seen.insert(u.filename.clone());
                if !fresh {
                    warn!("dropping duplicate report: {}", u.filename);
                }
                fresh
            })
            .map(|u| ReportItem {
                filename: u.filename,
                bytes: u.bytes,
                media_type: u.media_type,
            })
            .collect();
        &self.reports
    }

    pub fn images(&self) -> &[ImageItem] {
        &self.images
    }

    pub fn reports(&self) -> &[ReportItem] {
        &self.reports
    }

    pub fn image(&self, id: ItemId) -> Option<&ImageItem> {
        self.images.iter().find(|i| i.id == id)
    }

    pub fn image_by_filename(&self, filename: &str) -> Option<&ImageItem> {
        self.images.iter().find(|i| i.filename == filename)
    }

    pub fn image_at(&self, index: usize) -> Option<&ImageItem> {
        self.images.get(index)
    }

    pub fn report(&self, filename: &str) -> Option<&ReportItem> {
        self.reports.iter().find(|r| r.filename == filename)
    }

    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.images.iter().position(|i| i.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.position(id).is_some()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.reports.is_empty()
    }
}
