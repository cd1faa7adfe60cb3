use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use filmroom_core::model::{detail_kind, Note, NoteEdit};
use filmroom_core::time;
use filmroom_session::{ClipMarker, Config, ErrorKind, Labels, Notebook, Session};

use super::{connect, open_db, parse_id, truncate};
use crate::LabelArgs;

pub async fn add(config: &Config, labels: Labels, text: Option<String>) -> Result<()> {
    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let id = session.note_add(text, labels).await?;
    let note = session.note_show(id)?;
    println!("✓ Note {id} added at {}", time::format(note.start()));
    Ok(())
}

pub async fn list(config: &Config) -> Result<()> {
    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let path = session.video_path().await?;
    let notes = session.note_list().await?;

    println!("\n📝 Notes for {path}\n");
    if notes.is_empty() {
        println!("  No notes yet. Add one with `filmroom note add -x \"...\"`");
        return Ok(());
    }

    println!(
        "  {:>5}  {:>8}  {:>8}  {:<7}  {:<14}  {}",
        "ID", "Start", "End", "Kind", "Category", "Text"
    );
    for note in &notes {
        let kind = if note.is_tackle {
            "tackle"
        } else if note.is_clip() {
            "clip"
        } else {
            "note"
        };
        println!(
            "  {:>5}  {:>8}  {:>8}  {:<7}  {:<14}  {}",
            note.id,
            time::format(note.start),
            time::format(note.end),
            kind,
            truncate(note.category.as_deref().unwrap_or("-"), 14),
            note.text.as_deref().unwrap_or(""),
        );
    }
    println!("\n  {} note(s)", notes.len());
    Ok(())
}

pub async fn goto(config: &Config, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let note = session.note_goto(id).await?;
    println!("✓ Jumped to note {id} at {}", time::format(note.start()));
    Ok(())
}

/// Delete a note, asking first unless `force` is set.
///
/// Does not need the player.
pub fn delete(config: &Config, id: &str, force: bool) -> Result<()> {
    let id = parse_id(id)?;
    let db = open_db(config)?;
    let notebook = Notebook::new(&db);

    print_note(&notebook.show(id)?);

    if !force && !confirm(&format!("\nDelete note {id}?"))? {
        println!("Cancelled.");
        return Ok(());
    }

    notebook.delete(id)?;
    println!("✓ Deleted note {id}");
    Ok(())
}

pub fn edit(config: &Config, id: &str, labels: LabelArgs, text: Option<String>) -> Result<()> {
    let id = parse_id(id)?;
    let db = open_db(config)?;

    let edit = NoteEdit {
        category: labels.category,
        ..NoteEdit::default()
    }
    .with_detail(detail_kind::TEXT, text)
    .with_detail(detail_kind::PLAYER, labels.player)
    .with_detail(detail_kind::TEAM, labels.team);

    let note = match Notebook::new(&db).edit(id, &edit) {
        Err(e) if e.kind() == ErrorKind::Validation => {
            anyhow::bail!("{e}: pass -c, -x, -p or -t")
        }
        result => result?,
    };
    println!("✓ Updated note {id}");
    print_note(&note);
    Ok(())
}

fn print_note(note: &Note) {
    println!("\nNote {}", note.id);
    for timing in &note.timings {
        if timing.length() > 0.0 {
            println!(
                "  Time:     {} - {}",
                time::format(timing.start),
                time::format(timing.end)
            );
        } else {
            println!("  Time:     {}", time::format(timing.start));
        }
    }
    if let Some(category) = &note.category {
        println!("  Category: {category}");
    }
    for video in &note.videos {
        println!("  Video:    {}", video.path);
    }
    for detail in &note.details {
        println!("  {:<9} {}", format!("{}:", capitalise(&detail.kind)), detail.text);
    }
    for zone in &note.zones {
        println!("  Zone:     {zone}");
    }
    for tackle in &note.tackles {
        println!(
            "  Tackle:   {} (attempt {}, {})",
            tackle.player, tackle.attempt, tackle.outcome
        );
    }
    if !note.highlights.is_empty() {
        println!("  Starred:  yes");
    }
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
