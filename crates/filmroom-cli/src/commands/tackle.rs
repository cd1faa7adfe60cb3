use anyhow::Result;
use filmroom_core::model::{Outcome, TackleFilter};
use filmroom_core::time;
use filmroom_session::{ClipMarker, Config, Session, TackleInput};

use super::{connect, open_db, truncate};

pub async fn add(config: &Config, input: &TackleInput) -> Result<()> {
    // Reject bad flags before touching the player or the store.
    let tackle = input.validate()?;

    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let id = session.tackle_add(input).await?;
    let note = session.note_show(id)?;
    println!(
        "✓ Tackle {id} by {} ({}) at {}{}",
        tackle.player,
        tackle.outcome,
        time::format(note.start()),
        if input.star { " ★" } else { "" }
    );
    Ok(())
}

pub async fn list(
    config: &Config,
    player_filter: Option<String>,
    outcome: Option<String>,
    star: bool,
) -> Result<()> {
    let filter = TackleFilter {
        player: player_filter,
        outcome: outcome.map(|o| o.parse::<Outcome>()).transpose()?,
        starred_only: star,
    };

    let db = open_db(config)?;
    let player = connect(config).await?;
    let marker = ClipMarker::new();
    let session = Session::new(&db, &player, &marker);

    let path = session.video_path().await?;
    let tackles = session.tackle_list(&filter).await?;

    println!("\n🏉 Tackles for {path}\n");
    if tackles.is_empty() {
        println!("  No matching tackles");
        return Ok(());
    }

    println!(
        "  {:>5}  {:>8}  {:<18}  {:<8}  {:>3}  {:<9}  {:<6}  {}",
        "ID", "Time", "Player", "Team", "Att", "Outcome", "Zone", "Notes"
    );
    for row in &tackles {
        println!(
            "  {:>5}  {:>8}  {:<18}  {:<8}  {:>3}  {:<9}  {:<6}  {}{}",
            row.id,
            time::format(row.start),
            truncate(&row.tackle.player, 18),
            truncate(row.tackle.team.as_deref().unwrap_or("-"), 8),
            row.tackle.attempt,
            row.tackle.outcome,
            truncate(row.zone.as_deref().unwrap_or("-"), 6),
            if row.starred { "★ " } else { "" },
            row.notes.as_deref().unwrap_or(""),
        );
    }

    let completed = tackles
        .iter()
        .filter(|t| t.tackle.outcome == Outcome::Completed)
        .count();
    println!(
        "\n  {} tackle(s), {} completed ({:.0}%)",
        tackles.len(),
        completed,
        percentage(completed, tackles.len())
    );
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert!((percentage(1, 4) - 25.0).abs() < f64::EPSILON);
        assert!(percentage(0, 0).abs() < f64::EPSILON);
    }
}
