use std::path::PathBuf;

use anyhow::Result;
use filmroom_core::time;
use filmroom_session::{ClipMarker, Config, ExportFormat, ExportOptions, Exporter, Labels, Session};

use super::{connect, open_db, parse_id, truncate};

pub async fn start(config: &Config) -> Result<()> {
    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let marked = session.clip_start().await?;
    marker.save(&config.marker_path())?;
    println!("✓ Clip start marked at {}", time::format(marked.start));
    Ok(())
}

pub async fn end(config: &Config, description: &str, labels: Labels) -> Result<()> {
    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::load(&config.marker_path())?;
    let session = Session::new(&db, &player, &marker);

    let id = session.clip_end(description, labels).await?;
    marker.save(&config.marker_path())?;

    let clip = db.get_clip(id)?;
    println!(
        "✓ Clip {id} saved: {} - {} ({:.1}s)",
        time::format(clip.start),
        time::format(clip.end),
        clip.duration()
    );
    Ok(())
}

pub async fn add(
    config: &Config,
    start: &str,
    end: &str,
    description: &str,
    labels: Labels,
) -> Result<()> {
    let start = time::parse(start)?;
    let end = time::parse(end)?;

    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let id = session.clip_add(start, end, description, labels).await?;
    println!(
        "✓ Clip {id} saved: {} - {}",
        time::format(start),
        time::format(end)
    );
    Ok(())
}

pub async fn play(config: &Config, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let clip = session.clip_play(id).await?;
    println!(
        "▶ Looping clip {id}: {} - {}",
        time::format(clip.start),
        time::format(clip.end)
    );
    println!("  Run `filmroom clip stop` to stop looping");
    Ok(())
}

pub async fn stop(config: &Config) -> Result<()> {
    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    session.clip_stop().await?;
    println!("✓ Loop cleared");
    Ok(())
}

pub async fn list(config: &Config) -> Result<()> {
    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let path = session.video_path().await?;
    let clips = session.clip_list().await?;

    println!("\n🎬 Clips for {path}\n");
    if clips.is_empty() {
        println!("  No clips yet. Mark one with `filmroom clip start` / `filmroom clip end`");
        return Ok(());
    }

    println!(
        "  {:>5}  {:>8}  {:>8}  {:>7}  {:<14}  {}",
        "ID", "Start", "End", "Length", "Category", "Description"
    );
    for clip in &clips {
        println!(
            "  {:>5}  {:>8}  {:>8}  {:>6.1}s  {:<14}  {}",
            clip.id,
            time::format(clip.start),
            time::format(clip.end),
            clip.duration(),
            truncate(clip.category.as_deref().unwrap_or("-"), 14),
            clip.description.as_deref().unwrap_or(""),
        );
    }
    println!("\n  {} clip(s)", clips.len());
    Ok(())
}

/// Arguments of `clip export`.
#[derive(Debug)]
pub struct ExportRequest {
    pub id: Option<String>,
    pub all: bool,
    pub output: Option<PathBuf>,
    pub format: String,
    pub reencode: bool,
}

pub async fn export(config: &Config, request: ExportRequest) -> Result<()> {
    let opts = ExportOptions {
        output: request.output,
        format: request.format.parse::<ExportFormat>()?,
        reencode: request.reencode,
    };
    let exporter = Exporter::new(config.encoder_bin.clone());
    let db = open_db(config)?;

    if !request.all {
        let id = parse_id(request.id.as_deref().unwrap_or_default())?;
        let clip = db.get_clip(id)?;
        let written = exporter.export(&clip, &opts).await?;
        println!("✓ Exported clip {id} to {}", written.display());
        return Ok(());
    }

    // Only the batch needs to know which video is loaded.
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let summary = session.clip_export_all(&exporter, &opts).await?;
    for path in &summary.written {
        println!("  ✓ {}", path.display());
    }
    for (id, error) in &summary.failed {
        eprintln!("  ✗ clip {id}: {error}");
    }
    println!("\n{summary}");

    if summary.failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} of {} exports failed", summary.failed.len(), summary.total())
    }
}
