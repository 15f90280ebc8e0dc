//! Line-oriented front end over a single [`Session`].

use crate::{
    anonymize::ItemStatus,
    client::AnonymizeClient,
    config::Config,
    intake::{UploadKind, collect_uploads},
    session::Session,
    util::ensure_dir,
};
use anyhow::{Context, Result, bail};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

const HELP: &str = "\
commands:
  images <path>...      replace the uploaded images
  reports <path>...     replace the uploaded reports
  anonymize             anonymize every image not done yet
  next | prev           move between images
  show                  describe the current image
  label <text>          label the current image
  report <filename>     attach an uploaded report to the current image
  all <filename>        attach a report to every image
  clear                 remove all labels and report links
  preview <out.png>     write the current thumbnail
  export [path]         write the archive
  status                batch summary
  reset                 start over
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Images(Vec<PathBuf>),
    Reports(Vec<PathBuf>),
    Anonymize,
    Next,
    Prev,
    Show,
    Label(String),
    Report(String),
    All(String),
    Clear,
    Preview(PathBuf),
    Export(Option<PathBuf>),
    Status,
    Reset,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));
        let paths = || rest.split_whitespace().map(PathBuf::from).collect::<Vec<_>>();

        let cmd = match word.to_ascii_lowercase().as_str() {
            "images" if !rest.is_empty() => Command::Images(paths()),
            "reports" if !rest.is_empty() => Command::Reports(paths()),
            "anonymize" => Command::Anonymize,
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Prev,
            "show" => Command::Show,
            "label" => Command::Label(rest.to_string()),
            "report" => Command::Report(rest.to_string()),
            "all" => Command::All(rest.to_string()),
            "clear" => Command::Clear,
            "preview" if !rest.is_empty() => Command::Preview(PathBuf::from(rest)),
            "export" if rest.is_empty() => Command::Export(None),
            "export" => Command::Export(Some(PathBuf::from(rest))),
            "status" => Command::Status,
            "reset" => Command::Reset,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "images" | "reports" | "preview" => bail!("{word}: missing argument"),
            other => bail!("unknown command: {other} (try `help`)"),
        };
        Ok(cmd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<'a, C: AnonymizeClient + ?Sized> {
    cfg: &'a Config,
    client: &'a C,
    session: Session,
}

impl<'a, C: AnonymizeClient + ?Sized> Console<'a, C> {
    pub fn new(cfg: &'a Config, client: &'a C, session: Session) -> Self {
        Self {
            cfg,
            client,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Reads commands until `quit` or end of input. A failing command is
    /// reported and the loop keeps going.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        writeln!(out, "type `help` for commands")?;
        for line in input.lines() {
            let line = line.with_context(|| "reading command")?;
            if line.trim().is_empty() {
                continue;
            }
            match line
                .parse::<Command>()
                .and_then(|cmd| self.execute(cmd, &mut out))
            {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => {
                    warn!("{err:#}");
                    writeln!(out, "error: {err:#}")?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }

    pub fn execute<W: Write>(&mut self, cmd: Command, out: &mut W) -> Result<Flow> {
        match cmd {
            Command::Images(paths) => {
                let uploads = collect_uploads(self.cfg, UploadKind::Image, &paths)?;
                let n = self.session.upload_images(uploads);
                writeln!(out, "{n} image(s) uploaded")?;
            }
            Command::Reports(paths) => {
                let uploads = collect_uploads(self.cfg, UploadKind::Report, &paths)?;
                let n = self.session.upload_reports(uploads);
                writeln!(out, "{n} report(s) uploaded")?;
            }
            Command::Anonymize => {
                let mut write_err = None;
                let report = self.session.anonymize_all(self.cfg, self.client, |p| {
                    if write_err.is_some() {
                        return;
                    }
                    if let Err(e) =
                        writeln!(out, "[{}/{}] {}", p.processed, p.total, p.item.filename)
                    {
                        write_err = Some(e);
                    }
                });
                if let Some(e) = write_err {
                    return Err(e).with_context(|| "writing progress");
                }
                writeln!(
                    out,
                    "anonymized {} failed {} skipped {}",
                    report.succeeded, report.failed, report.skipped
                )?;
            }
            Command::Next => {
                self.session.next();
                self.show(out)?;
            }
            Command::Prev => {
                self.session.prev();
                self.show(out)?;
            }
            Command::Show => self.show(out)?,
            Command::Label(text) => {
                let a = self.session.assign_current(None, Some(&text))?;
                writeln!(out, "saved: {}", a.as_str())?;
            }
            Command::Report(name) => {
                let a = self.session.assign_current(Some(&name), None)?;
                writeln!(out, "saved: {}", a.as_str())?;
            }
            Command::All(name) => {
                let n = self.session.assign_all(&name)?;
                writeln!(out, "{name} assigned to {n} image(s)")?;
            }
            Command::Clear => {
                self.session.clear_associations();
                writeln!(out, "associations cleared")?;
            }
            Command::Preview(path) => match self.session.preview_current(self.cfg)? {
                Some(p) => {
                    if let Some(parent) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                        ensure_dir(parent)?;
                    }
                    std::fs::write(&path, &p.thumbnail_png)
                        .with_context(|| format!("writing {}", path.display()))?;
                    writeln!(out, "preview of {} written to {}", p.filename, path.display())?;
                }
                None => writeln!(out, "no images uploaded")?,
            },
            Command::Export(path) => {
                if !self.session.can_export() {
                    bail!("nothing to export yet; run `anonymize` first");
                }
                let path = path.unwrap_or_else(|| {
                    PathBuf::from(&self.cfg.export.out_dir).join(&self.cfg.export.archive_filename)
                });
                self.session.export_to(self.cfg, &path)?;
                writeln!(out, "archive written to {}", path.display())?;
            }
            Command::Status => {
                let s = &self.session;
                writeln!(
                    out,
                    "images {} reports {} anonymized {} failed {} associations {}",
                    s.registry().image_count(),
                    s.registry().reports().len(),
                    s.anonymization().len(),
                    s.anonymization().failed_count(),
                    s.associations().len()
                )?;
            }
            Command::Reset => {
                self.session.reset();
                writeln!(out, "session reset")?;
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn show<W: Write>(&self, out: &mut W) -> Result<()> {
        let Some(image) = self.session.current_image() else {
            writeln!(out, "no images uploaded")?;
            return Ok(());
        };
        let index = self.session.cursor().current().unwrap_or(0);
        let status = match self.session.anonymization().status(image.id) {
            ItemStatus::Pending => "pending".to_string(),
            ItemStatus::Anonymized => "anonymized".to_string(),
            ItemStatus::Failed { reason } => format!("failed ({reason})"),
        };
        let label = self
            .session
            .associations()
            .get(image.id)
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{}/{} {} [{}] label: {}",
            index + 1,
            self.session.registry().image_count(),
            image.filename,
            status,
            label
        )?;
        Ok(())
    }
}
