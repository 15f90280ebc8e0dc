use crate::registry::{ItemId, UploadRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Assignment {
    /// File name of an uploaded report.
    Report(String),
    Label(String),
}

impl Assignment {
    /// Text written to the manifest's `report_filename` column.
    pub fn as_str(&self) -> &str {
        match self {
            Assignment::Report(name) => name,
            Assignment::Label(text) => text,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    #[error("select a report or enter a label")]
    MissingLabel,
    #[error("no image selected")]
    MissingImage,
    #[error("no uploaded image with id {0}")]
    UnknownImage(ItemId),
    #[error("no uploaded report named {0:?}")]
    UnknownReport(String),
}

#[derive(Debug, Default)]
pub struct AssociationTable {
    entries: IndexMap<ItemId, Assignment>,
}

impl AssociationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a label for one image. A non-empty `label` wins over `report`.
    /// On error nothing is changed.
    pub fn assign(
        &mut self,
        registry: &UploadRegistry,
        id: ItemId,
        report: Option<&str>,
        label: Option<&str>,
    ) -> Result<&Assignment, AssignError> {
        if !registry.contains(id) {
            return Err(AssignError::UnknownImage(id));
        }

        let label = label.map(normalize_label).filter(|l| !l.is_empty());
        let report = report.map(str::trim).filter(|r| !r.is_empty());

        let assignment = match (label, report) {
            (Some(text), _) => Assignment::Label(text),
            (None, Some(name)) => {
                if registry.report(name).is_none() {
                    return Err(AssignError::UnknownReport(name.to_string()));
                }
                Assignment::Report(name.to_string())
            }
            (None, None) => return Err(AssignError::MissingLabel),
        };

        self.entries.insert(id, assignment);
        Ok(&self.entries[&id])
    }

    /// Points every uploaded image at `report`, overwriting what was there.
    pub fn assign_all(
        &mut self,
        registry: &UploadRegistry,
        report: &str,
    ) -> Result<usize, AssignError> {
        let report = report.trim();
        if report.is_empty() {
            return Err(AssignError::MissingLabel);
        }
        if registry.report(report).is_none() {
            return Err(AssignError::UnknownReport(report.to_string()));
        }
        for image in registry.images() {
            self.entries
                .insert(image.id, Assignment::Report(report.to_string()));
        }
        Ok(registry.image_count())
    }

    pub fn get(&self, id: ItemId) -> Option<&Assignment> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(ItemId, &Assignment) -> bool) {
        self.entries.retain(|id, a| keep(*id, a));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn normalize_label(raw: &str) -> String {
    raw.nfkc().collect::<String>().trim().to_string()
}
