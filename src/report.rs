use crate::{client::Prediction, registry::ItemId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub attempted: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn push(&mut self, item: ItemReport) {
        match &item.outcome {
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Anonymized { .. } => {
                self.attempted += 1;
                self.succeeded += 1;
            }
            ItemOutcome::Failed { .. } => {
                self.attempted += 1;
                self.failed += 1;
            }
        }
        self.items.push(item);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub id: ItemId,
    pub filename: String,
    pub sha256: String,
    pub outcome: ItemOutcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Anonymized { width: u32, height: u32 },
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub filename: String,
    pub prediction: Prediction,
    pub saliency_path: Option<String>,
    pub warnings: Vec<String>,
}
