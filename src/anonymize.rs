use crate::{
    client::AnonymizeClient,
    config::Thumbnail,
    registry::{ImageItem, ItemId, UploadRegistry},
    report::{BatchReport, ItemOutcome, ItemReport},
    util::{encode_png, thumbnail},
};
use anyhow::{Context, Result};
use image::ImageFormat;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Anonymized,
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct AnonymizedImage {
    pub id: ItemId,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub thumbnail_png: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub processed: usize,
    pub total: usize,
    pub item: &'a ImageItem,
    pub outcome: &'a ItemOutcome,
}

#[derive(Debug, Default)]
pub struct AnonymizationTable {
    // Insertion order is completion order; the export manifest relies on it.
    results: IndexMap<ItemId, AnonymizedImage>,
    failures: HashMap<ItemId, String>,
}

impl AnonymizationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, id: ItemId) -> ItemStatus {
        if self.results.contains_key(&id) {
            ItemStatus::Anonymized
        } else if let Some(reason) = self.failures.get(&id) {
            ItemStatus::Failed {
                reason: reason.clone(),
            }
        } else {
            ItemStatus::Pending
        }
    }

    /// Runs the anonymize call for every image that is not anonymized yet,
    /// one at a time in upload order. A failing image is recorded and the
    /// loop moves on.
    pub fn anonymize_all<C, F>(
        &mut self,
        registry: &UploadRegistry,
        client: &C,
        thumb: &Thumbnail,
        mut progress: F,
    ) -> BatchReport
    where
        C: AnonymizeClient + ?Sized,
        F: FnMut(Progress<'_>),
    {
        let total = registry.image_count();
        let mut report = BatchReport {
            total,
            ..Default::default()
        };

        for (i, item) in registry.images().iter().enumerate() {
            let started = Instant::now();

            let outcome = if self.results.contains_key(&item.id) {
                debug!("skip {} ({}): already anonymized", item.filename, item.id);
                ItemOutcome::Skipped
            } else {
                match process(item, client, thumb) {
                    Ok(done) => {
                        let outcome = ItemOutcome::Anonymized {
                            width: done.width,
                            height: done.height,
                        };
                        self.failures.remove(&item.id);
                        self.results.insert(item.id, done);
                        outcome
                    }
                    Err(err) => {
                        let reason = format!("{err:#}");
                        warn!("anonymize failed for {}: {reason}", item.filename);
                        self.failures.insert(item.id, reason.clone());
                        ItemOutcome::Failed { reason }
                    }
                }
            };

            progress(Progress {
                processed: i + 1,
                total,
                item,
                outcome: &outcome,
            });

            report.push(ItemReport {
                id: item.id,
                filename: item.filename.clone(),
                sha256: item.sha256.clone(),
                outcome,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        info!(
            "anonymize batch total={} succeeded={} failed={} skipped={}",
            report.total, report.succeeded, report.failed, report.skipped
        );
        report
    }

    pub fn result(&self, id: ItemId) -> Option<&AnonymizedImage> {
        self.results.get(&id)
    }

    pub fn results(&self) -> impl Iterator<Item = &AnonymizedImage> {
        self.results.values()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(ItemId) -> bool) {
        self.results.retain(|id, _| keep(*id));
        self.failures.retain(|id, _| keep(*id));
    }
}

fn process<C: AnonymizeClient + ?Sized>(
    item: &ImageItem,
    client: &C,
    thumb: &Thumbnail,
) -> Result<AnonymizedImage> {
    let bytes = client
        .anonymize(item)
        .with_context(|| format!("anonymize call for {}", item.filename))?;

    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("decoding anonymized image for {}", item.filename))?;

    let png = match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => bytes,
        _ => encode_png(&img)?,
    };
    let thumbnail_png = encode_png(&thumbnail(&img, thumb.max_side))?;

    Ok(AnonymizedImage {
        id: item.id,
        png,
        width: img.width(),
        height: img.height(),
        thumbnail_png,
    })
}
