use serde::{Deserialize, Serialize};

/// `{ "image": "<data URI>" }`, shared by the anonymize and saliency endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub class: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn is_class(&self, name: &str) -> bool {
        self.class.trim().eq_ignore_ascii_case(name.trim())
    }
}
