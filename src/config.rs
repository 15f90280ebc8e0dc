use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub uploads: Uploads,
    #[serde(default)]
    pub thumbnail: Thumbnail,
    #[serde(default)]
    pub export: Export,
    #[serde(default)]
    pub classify: Classify,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Loads `path` when it exists, otherwise falls back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub session_name: String,
    pub print_summary: bool,
    pub fail_on_empty_export: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            session_name: "default".into(),
            print_summary: true,
            fail_on_empty_export: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub base_url: String,
    pub anonymize_path: String,
    pub predict_path: String,
    pub saliency_path: String,
    pub upload_field: String,
    /// Per-call deadline; 0 disables it.
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub user_agent: String,
}
impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            anonymize_path: "/anonymize-image".into(),
            predict_path: "/predict-yolo".into(),
            saliency_path: "/predict-shap".into(),
            upload_field: "file".into(),
            timeout_seconds: 60,
            connect_timeout_seconds: 10,
            user_agent: concat!("radiobatch/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uploads {
    pub image_pattern: String,
    pub report_pattern: String,
    pub max_file_bytes: u64,
}
impl Default for Uploads {
    fn default() -> Self {
        Self {
            image_pattern: "(?i)\\.(jpe?g|png|webp|avif)$".into(),
            report_pattern: ".*".into(),
            max_file_bytes: 200 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub max_side: u32,
}
impl Default for Thumbnail {
    fn default() -> Self {
        Self { max_side: 400 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub out_dir: String,
    pub archive_filename: String,
    pub images_dir: String,
    pub reports_dir: String,
    pub image_suffix: String,
    pub manifest_filename: String,
}
impl Default for Export {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
            archive_filename: "anonymized_batch.zip".into(),
            images_dir: "images".into(),
            reports_dir: "reports".into(),
            image_suffix: "_anonymized".into(),
            manifest_filename: "associations.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classify {
    pub positive_class: String,
    pub fetch_saliency: bool,
}
impl Default for Classify {
    fn default() -> Self {
        Self {
            positive_class: "fractured".into(),
            fetch_saliency: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Debug {
    pub dump_effective_config: bool,
    pub log_response_bodies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}
