use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use filmroom_player::{launch, Player};
use filmroom_session::Config;

use super::open_db;

/// Start the player on `video` and run the annotation UI until either side
/// quits.
pub async fn run_open(config: &Config, video: &Path) -> Result<()> {
    if !video.exists() {
        anyhow::bail!("Video not found: {}", video.display());
    }

    let db = open_db(config)?;
    let (mut process, channel) = launch(video, &config.launch_options())
        .await
        .with_context(|| format!("Failed to start {}", config.player_bin))?;

    let result = crate::tui::run_tui(&db, &channel, config.poll_interval()).await;

    // The UI may have exited because the player already went away.
    if channel.quit().await.is_err() {
        log::debug!("Player already gone");
    }
    channel.close();
    match tokio::time::timeout(Duration::from_secs(2), process.wait()).await {
        Ok(Ok(status)) => log::debug!("Player exited with {status}"),
        Ok(Err(e)) => log::warn!("Could not wait for the player: {e}"),
        Err(_) => {
            log::warn!("Player did not exit; killing it");
            process.kill().await.ok();
        }
    }

    result
}
