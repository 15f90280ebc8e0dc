use crate::{
    classify::classify_image,
    client::http::HttpClient,
    config::Config,
    console::Console,
    intake::{UploadKind, collect_uploads, validate_input},
    registry::{Upload, UploadRegistry},
    session::Session,
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "radiobatch")]
#[command(about = "Batch radiograph anonymization with report association and archive export")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./radiobatch.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Anonymize a batch, apply labels and write the archive.
    Run {
        /// Image files or directories, in upload order.
        #[arg(long, num_args = 1.., required = true)]
        images: Vec<PathBuf>,
        /// Report files or directories.
        #[arg(long, num_args = 1..)]
        reports: Vec<PathBuf>,
        /// Free-text label for one image, as IMAGE=TEXT.
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Uploaded report for one image, as IMAGE=REPORT.
        #[arg(long = "report")]
        report_links: Vec<String>,
        /// Report attached to every image before per-image links are applied.
        #[arg(long)]
        assign_all: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Interactive session on stdin.
    Session {
        #[arg(long, num_args = 1..)]
        images: Vec<PathBuf>,
        #[arg(long, num_args = 1..)]
        reports: Vec<PathBuf>,
    },
    /// Classify one radiograph and fetch its saliency map.
    Classify {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        saliency_out: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = match &args.config {
        Some(_) => Config::load(&cfg_path)?,
        None => Config::load_or_default(&cfg_path)?,
    };

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
    info!("config {}", cfg_path.display());

    match &args.cmd {
        Command::Run {
            images,
            reports,
            labels,
            report_links,
            assign_all,
            out,
        } => run(
            &cfg,
            &RunArgs {
                images,
                reports,
                labels,
                report_links,
                assign_all: assign_all.as_deref(),
                out: out.as_deref(),
            },
        ),
        Command::Session { images, reports } => session(&cfg, images, reports),
        Command::Classify {
            input,
            saliency_out,
        } => classify(&cfg, input, saliency_out.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> PathBuf {
    if let Some(p) = user {
        return p.to_path_buf();
    }
    let default = PathBuf::from("radiobatch.toml");
    if default.exists() {
        default
    } else {
        PathBuf::from("radiobatch.example.toml")
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout belongs to the console and the JSON summary.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(PathBuf::from(&cfg.export.out_dir).join("radiobatch.log"))
}

struct RunArgs<'a> {
    images: &'a [PathBuf],
    reports: &'a [PathBuf],
    labels: &'a [String],
    report_links: &'a [String],
    assign_all: Option<&'a str>,
    out: Option<&'a Path>,
}

fn run(cfg: &Config, args: &RunArgs<'_>) -> Result<()> {
    let started = now_rfc3339();

    let mut session = Session::new();
    session.upload_images(collect_uploads(cfg, UploadKind::Image, args.images)?);
    session.upload_reports(collect_uploads(cfg, UploadKind::Report, args.reports)?);
    if session.registry().image_count() == 0 {
        bail!("no images to process");
    }

    let client = HttpClient::new(cfg)?;
    let batch = session.anonymize_all(cfg, &client, |p| {
        info!("anonymize {}/{} {}", p.processed, p.total, p.item.filename);
    });

    apply_assignments(&mut session, args);

    if !session.can_export() {
        if cfg.global.fail_on_empty_export {
            bail!("no image was anonymized; nothing to export");
        }
        warn!("no image was anonymized; skipping export");
        return Ok(());
    }

    let archive = args.out.map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(&cfg.export.out_dir).join(&cfg.export.archive_filename)
    });
    session.export_to(cfg, &archive)?;
    info!("archive {}", archive.display());

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        let dir = archive.parent().unwrap_or_else(|| Path::new("."));
        std::fs::write(dir.join("effective-config.toml"), raw)?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "session": cfg.global.session_name,
                "archive": archive,
                "started": started,
                "finished": now_rfc3339(),
                "batch": batch,
            }))?
        );
    }

    Ok(())
}

/// Bulk assignment first, then per-image links and labels on top.
/// Rejected assignments are logged and skipped.
fn apply_assignments(session: &mut Session, args: &RunArgs<'_>) {
    if let Some(report) = args.assign_all {
        match session.assign_all(report) {
            Ok(n) => info!("{report} assigned to {n} image(s)"),
            Err(err) => warn!("assign-all {report}: {err}"),
        }
    }

    let pairs = args
        .report_links
        .iter()
        .map(|raw| (raw, true))
        .chain(args.labels.iter().map(|raw| (raw, false)));
    for (raw, is_report) in pairs {
        let Some((image, value)) = raw.split_once('=') else {
            warn!("expected IMAGE=VALUE, got {raw:?}");
            continue;
        };
        let Some(id) = session
            .registry()
            .image_by_filename(image.trim())
            .map(|i| i.id)
        else {
            warn!("no uploaded image named {image:?}");
            continue;
        };
        let result = if is_report {
            session.assign(id, Some(value), None)
        } else {
            session.assign(id, None, Some(value))
        };
        if let Err(err) = result {
            warn!("{image}: {err}");
        }
    }
}

fn session(cfg: &Config, images: &[PathBuf], reports: &[PathBuf]) -> Result<()> {
    let mut session = Session::new();
    if !images.is_empty() {
        session.upload_images(collect_uploads(cfg, UploadKind::Image, images)?);
    }
    if !reports.is_empty() {
        session.upload_reports(collect_uploads(cfg, UploadKind::Report, reports)?);
    }

    let client = HttpClient::new(cfg)?;
    let mut console = Console::new(cfg, &client, session);
    let stdin = std::io::stdin();
    console.run(stdin.lock(), std::io::stdout().lock())
}

fn classify(cfg: &Config, input: &Path, saliency_out: Option<&Path>) -> Result<()> {
    validate_input(cfg, input)?;
    let mut registry = UploadRegistry::new();
    registry.replace_images(vec![Upload::from_path(input)?]);
    let image = registry
        .image_at(0)
        .ok_or_else(|| anyhow!("no image loaded from {}", input.display()))?;

    let client = HttpClient::new(cfg)?;
    let report = classify_image(cfg, &client, image, saliency_out)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
