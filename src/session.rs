use crate::{
    anonymize::{AnonymizationTable, ItemStatus, Progress},
    association::{AssignError, Assignment, AssociationTable},
    client::AnonymizeClient,
    config::Config,
    cursor::NavigationCursor,
    export,
    registry::{ImageItem, ItemId, Upload, UploadRegistry},
    report::BatchReport,
    util::{encode_png, thumbnail},
};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct Session {
    registry: UploadRegistry,
    anonymization: AnonymizationTable,
    associations: AssociationTable,
    cursor: NavigationCursor,
}

/// What the detail view shows for the current image.
#[derive(Debug, Clone)]
pub struct Preview {
    pub index: usize,
    pub total: usize,
    pub filename: String,
    pub status: ItemStatus,
    pub assignment: Option<Assignment>,
    pub thumbnail_png: Vec<u8>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &UploadRegistry {
        &self.registry
    }

    pub fn anonymization(&self) -> &AnonymizationTable {
        &self.anonymization
    }

    pub fn associations(&self) -> &AssociationTable {
        &self.associations
    }

    pub fn cursor(&self) -> &NavigationCursor {
        &self.cursor
    }

    /// Replaces the image set. Results and associations of the previous set
    /// are dropped and the cursor goes back to the first image.
    pub fn upload_images(&mut self, uploads: Vec<Upload>) -> usize {
        let count = self.registry.replace_images(uploads).len();
        let live: HashSet<ItemId> = self.registry.images().iter().map(|i| i.id).collect();
        self.anonymization.retain(|id| live.contains(&id));
        self.associations.retain(|id, _| live.contains(&id));
        self.cursor.reset(count);
        info!("uploaded {count} image(s)");
        count
    }

    pub fn upload_reports(&mut self, uploads: Vec<Upload>) -> usize {
        let count = self.registry.replace_reports(uploads).len();
        let registry = &self.registry;
        self.associations.retain(|_, a| match a {
            Assignment::Report(name) => registry.report(name).is_some(),
            Assignment::Label(_) => true,
        });
        info!("uploaded {count} report(s)");
        count
    }

    pub fn anonymize_all<C, F>(&mut self, cfg: &Config, client: &C, progress: F) -> BatchReport
    where
        C: AnonymizeClient + ?Sized,
        F: FnMut(Progress<'_>),
    {
        self.anonymization
            .anonymize_all(&self.registry, client, &cfg.thumbnail, progress)
    }

    pub fn assign(
        &mut self,
        id: ItemId,
        report: Option<&str>,
        label: Option<&str>,
    ) -> Result<&Assignment, AssignError> {
        self.associations.assign(&self.registry, id, report, label)
    }

    pub fn assign_current(
        &mut self,
        report: Option<&str>,
        label: Option<&str>,
    ) -> Result<&Assignment, AssignError> {
        let id = self
            .current_image()
            .map(|i| i.id)
            .ok_or(AssignError::MissingImage)?;
        self.assign(id, report, label)
    }

    pub fn assign_all(&mut self, report: &str) -> Result<usize, AssignError> {
        self.associations.assign_all(&self.registry, report)
    }

    pub fn clear_associations(&mut self) {
        self.associations.clear();
    }

    pub fn next(&mut self) -> Option<usize> {
        self.cursor.next()
    }

    pub fn prev(&mut self) -> Option<usize> {
        self.cursor.prev()
    }

    pub fn current_image(&self) -> Option<&ImageItem> {
        self.cursor
            .current()
            .and_then(|i| self.registry.image_at(i))
    }

    /// Builds the detail view for the current image. Undecodable uploads
    /// fail here, for this image only.
    pub fn preview_current(&self, cfg: &Config) -> Result<Option<Preview>> {
        let Some(index) = self.cursor.current() else {
            return Ok(None);
        };
        let Some(image) = self.registry.image_at(index) else {
            return Ok(None);
        };

        let thumbnail_png = match self.anonymization.result(image.id) {
            Some(done) => done.thumbnail_png.clone(),
            None => {
                let img = image::load_from_memory(&image.bytes)
                    .with_context(|| format!("cannot open {}", image.filename))?;
                encode_png(&thumbnail(&img, cfg.thumbnail.max_side))?
            }
        };
        debug!("preview {} ({})", image.filename, image.id);

        Ok(Some(Preview {
            index,
            total: self.registry.image_count(),
            filename: image.filename.clone(),
            status: self.anonymization.status(image.id),
            assignment: self.associations.get(image.id).cloned(),
            thumbnail_png,
        }))
    }

    pub fn can_export(&self) -> bool {
        !self.anonymization.is_empty()
    }

    pub fn export(&self, cfg: &Config) -> Result<Vec<u8>> {
        export::package(cfg, self)
    }

    pub fn export_to(&self, cfg: &Config, path: &Path) -> Result<()> {
        export::write_archive(cfg, self, path)
    }

    pub fn reset(&mut self) {
        *self = Session::default();
        info!("session reset");
    }
}
