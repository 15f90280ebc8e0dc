use super::{types::*, AnonymizeClient, Classifier, ClientError};
use crate::{config::Config, registry::ImageItem, util::decode_data_uri};
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct HttpClient {
    cfg: Config,
    http: Client,
    timeout: Option<Duration>,
}

impl HttpClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let timeout = match cfg.endpoints.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        // The blocking client defaults to 30s, so `None` has to be passed explicitly.
        let http = Client::builder()
            .user_agent(cfg.endpoints.user_agent.clone())
            .connect_timeout(Duration::from_secs(cfg.endpoints.connect_timeout_seconds.max(1)))
            .timeout(timeout)
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self {
            cfg: cfg.clone(),
            http,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.cfg.endpoints.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn post_file<O: for<'de> serde::Deserialize<'de>>(
        &self,
        path: &str,
        image: &ImageItem,
    ) -> Result<O, ClientError> {
        let url = self.url(path);
        debug!(
            "POST {url} file={} bytes={} timeout={:?}",
            image.filename,
            image.bytes.len(),
            self.timeout
        );

        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.filename.clone())
            .mime_str(&image.media_type)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part(self.cfg.endpoints.upload_field.clone(), part);

        let started = Instant::now();
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().map_err(|e| self.transport_error(e))?;
        debug!(
            "POST {url} -> {} in {}ms",
            status.as_u16(),
            started.elapsed().as_millis()
        );
        if self.cfg.debug.log_response_bodies {
            debug!("response body {url}: {}", truncate(&body, 512));
        }

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: truncate(&body, 512).to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Malformed(e.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            if let Some(t) = self.timeout {
                warn!("request timed out after {:?}", t);
                return ClientError::Timeout(t);
            }
        }
        ClientError::Transport(err.to_string())
    }

    fn fetch_image(&self, path: &str, image: &ImageItem) -> Result<Vec<u8>, ClientError> {
        let out: ImagePayload = self.post_file(path, image)?;
        let raw = out
            .image
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ClientError::Malformed("missing `image` field".to_string()))?;
        decode_data_uri(&raw).map_err(|e| ClientError::Malformed(format!("{e:#}")))
    }
}

impl AnonymizeClient for HttpClient {
    fn anonymize(&self, image: &ImageItem) -> Result<Vec<u8>, ClientError> {
        self.fetch_image(&self.cfg.endpoints.anonymize_path, image)
    }
}

impl Classifier for HttpClient {
    fn predict(&self, image: &ImageItem) -> Result<Prediction, ClientError> {
        let out: Prediction = self.post_file(&self.cfg.endpoints.predict_path, image)?;
        if !(0.0..=1.0).contains(&out.confidence) {
            return Err(ClientError::Malformed(format!(
                "confidence out of range: {}",
                out.confidence
            )));
        }
        Ok(out)
    }

    fn saliency(&self, image: &ImageItem) -> Result<Vec<u8>, ClientError> {
        self.fetch_image(&self.cfg.endpoints.saliency_path, image)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
