#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use radiobatch::{
    client::{AnonymizeClient, Classifier, ClientError, Prediction},
    registry::{ImageItem, Upload},
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 80, 120])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn image_uploads(names: &[&str]) -> Vec<Upload> {
    names
        .iter()
        .map(|n| Upload::new(*n, png(8, 8), "image/png"))
        .collect()
}

pub fn report_uploads(names: &[&str]) -> Vec<Upload> {
    names
        .iter()
        .map(|n| Upload::new(*n, format!("report body of {n}").into_bytes(), "text/plain"))
        .collect()
}

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("radiobatch-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Collaborator stand-in. Images named in `failing` get an HTTP 500.
#[derive(Default)]
pub struct FakeClient {
    failing: RefCell<HashSet<String>>,
    garbage: HashSet<String>,
    calls: RefCell<Vec<String>>,
    pub output_size: (u32, u32),
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            output_size: (16, 16),
            ..Default::default()
        }
    }

    pub fn failing(names: &[&str]) -> Self {
        let client = Self::new();
        client
            .failing
            .borrow_mut()
            .extend(names.iter().map(|n| n.to_string()));
        client
    }

    pub fn returning_garbage(names: &[&str]) -> Self {
        Self {
            garbage: names.iter().map(|n| n.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn heal(&self, name: &str) {
        self.failing.borrow_mut().remove(name);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl AnonymizeClient for FakeClient {
    fn anonymize(&self, image: &ImageItem) -> Result<Vec<u8>, ClientError> {
        self.calls.borrow_mut().push(image.filename.clone());
        if self.failing.borrow().contains(&image.filename) {
            return Err(ClientError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        if self.garbage.contains(&image.filename) {
            return Ok(b"not an image".to_vec());
        }
        Ok(png(self.output_size.0, self.output_size.1))
    }
}

pub struct FakeClassifier {
    pub class: String,
    pub confidence: f32,
    pub saliency_ok: bool,
    pub saliency_calls: RefCell<usize>,
}

impl FakeClassifier {
    pub fn new(class: &str, confidence: f32) -> Self {
        Self {
            class: class.to_string(),
            confidence,
            saliency_ok: true,
            saliency_calls: RefCell::new(0),
        }
    }
}

impl Classifier for FakeClassifier {
    fn predict(&self, _image: &ImageItem) -> Result<Prediction, ClientError> {
        Ok(Prediction {
            class: self.class.clone(),
            confidence: self.confidence,
        })
    }

    fn saliency(&self, _image: &ImageItem) -> Result<Vec<u8>, ClientError> {
        *self.saliency_calls.borrow_mut() += 1;
        if self.saliency_ok {
            Ok(png(12, 12))
        } else {
            Err(ClientError::Transport("connection refused".to_string()))
        }
    }
}
