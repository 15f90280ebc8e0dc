use crate::{
    client::Classifier,
    config::Config,
    registry::ImageItem,
    report::ClassificationReport,
    util::{encode_png, ensure_dir},
};
use anyhow::{Context, Result};
use image::ImageFormat;
use std::path::Path;
use tracing::{info, warn};

/// Runs the prediction for one image and, for a positive result, fetches the
/// saliency map into `saliency_out`. A saliency failure only adds a warning.
pub fn classify_image<C: Classifier + ?Sized>(
    cfg: &Config,
    classifier: &C,
    image: &ImageItem,
    saliency_out: Option<&Path>,
) -> Result<ClassificationReport> {
    let prediction = classifier
        .predict(image)
        .with_context(|| format!("prediction for {}", image.filename))?;
    info!(
        "prediction {}: class={} confidence={:.2}%",
        image.filename,
        prediction.class,
        prediction.confidence * 100.0
    );

    let mut warnings = Vec::new();
    let mut saliency_path = None;

    let wants_saliency =
        cfg.classify.fetch_saliency && prediction.is_class(&cfg.classify.positive_class);
    match (wants_saliency, saliency_out) {
        (true, Some(out)) => match fetch_saliency(classifier, image, out) {
            Ok(()) => saliency_path = Some(out.display().to_string()),
            Err(err) => {
                warn!("saliency map unavailable for {}: {err:#}", image.filename);
                warnings.push(format!("saliency: {err:#}"));
            }
        },
        (true, None) => warnings.push("saliency skipped: no output path given".to_string()),
        (false, _) => {}
    }

    Ok(ClassificationReport {
        filename: image.filename.clone(),
        prediction,
        saliency_path,
        warnings,
    })
}

fn fetch_saliency<C: Classifier + ?Sized>(
    classifier: &C,
    image: &ImageItem,
    out: &Path,
) -> Result<()> {
    let bytes = classifier.saliency(image)?;
    let img = image::load_from_memory(&bytes).with_context(|| "decoding saliency map")?;
    let png = match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => bytes,
        _ => encode_png(&img)?,
    };
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(out, png).with_context(|| format!("writing {}", out.display()))
}
