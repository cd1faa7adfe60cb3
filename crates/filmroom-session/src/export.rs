//! Clip export through an external encoder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use filmroom_core::model::{ClipRow, NoteId};
use tokio::process::Command;

use crate::error::{Result, SessionError};

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Mp4,
    Webm,
    Mkv,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
        }
    }

    /// Codec arguments for a re-encode into this container.
    const fn codecs(self) -> [&'static str; 4] {
        match self {
            Self::Webm => ["-c:v", "libvpx-vp9", "-c:a", "libopus"],
            Self::Mp4 | Self::Mkv => ["-c:v", "libx264", "-c:a", "aac"],
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            "mkv" => Ok(Self::Mkv),
            _ => Err(SessionError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Output file for a single clip, or output directory for a batch.
    pub output: Option<PathBuf>,
    pub format: ExportFormat,
    pub reencode: bool,
}

/// Name of the file a single-clip export writes.
///
/// A blank output becomes `clip-<id>.<format>`; an output without an
/// extension gets the format's.
pub fn output_path(clip_id: NoteId, output: Option<&Path>, format: ExportFormat) -> PathBuf {
    match output.filter(|p| !p.as_os_str().is_empty()) {
        None => default_file_name(clip_id, format),
        Some(path) if path.extension().is_none() => path.with_extension(format.extension()),
        Some(path) => path.to_path_buf(),
    }
}

fn default_file_name(clip_id: NoteId, format: ExportFormat) -> PathBuf {
    PathBuf::from(format!("clip-{clip_id}.{}", format.extension()))
}

/// Encoder arguments for cutting `[start, end)` out of `video_path`.
///
/// Seeking happens on the input side, so `-ss` comes before `-i` and `-to`
/// is the clip length.
pub fn encoder_args(
    video_path: &str,
    start: f64,
    end: f64,
    format: ExportFormat,
    reencode: bool,
    output: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-ss".to_string(),
        format!("{start:.3}"),
        "-i".to_string(),
        video_path.to_string(),
        "-to".to_string(),
        format!("{:.3}", end - start),
    ];
    if reencode {
        args.extend(format.codecs().iter().map(|s| (*s).to_string()));
    } else {
        args.extend(["-c".to_string(), "copy".to_string()]);
    }
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Outcome of a batch export.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(NoteId, SessionError)>,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }

    pub fn succeeded(&self) -> usize {
        self.written.len()
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} successful", self.succeeded(), self.total())
    }
}

/// Runs the encoder. Its output goes straight to the terminal.
#[derive(Debug, Clone)]
pub struct Exporter {
    encoder_bin: String,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Exporter {
    pub fn new(encoder_bin: impl Into<String>) -> Self {
        Self {
            encoder_bin: encoder_bin.into(),
        }
    }

    pub fn encoder_bin(&self) -> &str {
        &self.encoder_bin
    }

    /// Export one clip and return the file written.
    pub async fn export(&self, clip: &ClipRow, opts: &ExportOptions) -> Result<PathBuf> {
        let output = output_path(clip.id, opts.output.as_deref(), opts.format);
        self.run(clip, &output, opts).await?;
        Ok(output)
    }

    /// Export every clip into the directory named by `opts.output` (or the
    /// working directory). Each clip is attempted independently; only an
    /// unusable output directory stops the batch before it starts.
    pub async fn export_all(
        &self,
        clips: &[ClipRow],
        opts: &ExportOptions,
    ) -> Result<ExportSummary> {
        let dir = opts.output.clone().unwrap_or_default();
        let mut summary = ExportSummary::default();

        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&dir)
                .map_err(|source| SessionError::OutputDir {
                    path: dir.clone(),
                    source,
                })?;
        }

        for clip in clips {
            let output = dir.join(default_file_name(clip.id, opts.format));
            match self.run(clip, &output, opts).await {
                Ok(()) => summary.written.push(output),
                Err(e) => {
                    log::warn!("Clip {} failed: {e}", clip.id);
                    summary.failed.push((clip.id, e));
                }
            }
        }
        Ok(summary)
    }

    async fn run(&self, clip: &ClipRow, output: &Path, opts: &ExportOptions) -> Result<()> {
        let args = encoder_args(
            &clip.video_path,
            clip.start,
            clip.end,
            opts.format,
            opts.reencode,
            output,
        );
        log::info!("Exporting clip {} to {}", clip.id, output.display());
        log::debug!("{} {}", self.encoder_bin, args.join(" "));

        let status = Command::new(&self.encoder_bin)
            .args(&args)
            .status()
            .await
            .map_err(|source| SessionError::EncoderSpawn {
                bin: self.encoder_bin.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SessionError::ExportFailed {
                clip_id: clip.id,
                status,
            })
        }
    }
}
