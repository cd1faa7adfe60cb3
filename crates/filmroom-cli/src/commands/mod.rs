pub mod clip;
pub mod config;
pub mod doctor;
pub mod note;
pub mod open;
pub mod tackle;

use anyhow::{Context, Result};
use filmroom_core::schema::Database;
use filmroom_core::model::NoteId;
use filmroom_player::PlayerChannel;
use filmroom_session::Config;

/// Open the annotation store named by the configuration.
pub fn open_db(config: &Config) -> Result<Database> {
    Database::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database_path.display()
        )
    })
}

/// Connect to the running player. The channel closes when dropped.
pub async fn connect(config: &Config) -> Result<PlayerChannel> {
    let channel =
        PlayerChannel::connect_with_timeout(&config.socket_path, config.command_timeout()).await?;
    Ok(channel)
}

pub fn parse_id(raw: &str) -> Result<NoteId> {
    Ok(raw.parse::<NoteId>()?)
}

/// Clip text for table cells.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
