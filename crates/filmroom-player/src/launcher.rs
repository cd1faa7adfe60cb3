//! Start a player on a video and wait for its control endpoint.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use tokio::process::{Child, Command};

use crate::channel::{PlayerChannel, DEFAULT_COMMAND_TIMEOUT};
use crate::endpoint;
use crate::error::{PlayerError, PlayerResult};

/// How to start the player and how long to wait for it.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Executable name or path.
    pub player_bin: String,
    /// Control endpoint; empty means the platform default.
    pub endpoint: String,
    pub connect_attempts: usize,
    pub connect_interval: Duration,
    pub command_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            player_bin: "mpv".to_string(),
            endpoint: String::new(),
            connect_attempts: 50,
            connect_interval: Duration::from_millis(100),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl LaunchOptions {
    /// The endpoint actually used, with the default filled in.
    #[must_use]
    pub fn resolved_endpoint(&self) -> String {
        if self.endpoint.is_empty() {
            endpoint::default_endpoint()
        } else {
            self.endpoint.clone()
        }
    }
}

/// Arguments that open `video` paused, keep the window up, and expose the
/// control endpoint.
#[must_use]
pub fn player_args(video: &Path, endpoint: &str) -> Vec<String> {
    vec![
        video.to_string_lossy().into_owned(),
        "--pause".to_string(),
        "--idle=yes".to_string(),
        "--force-window=immediate".to_string(),
        format!("--input-ipc-server={endpoint}"),
    ]
}

/// A running player process.
#[derive(Debug)]
pub struct PlayerProcess {
    child: Child,
}

impl PlayerProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the player to exit.
    pub async fn wait(&mut self) -> PlayerResult<ExitStatus> {
        Ok(self.child.wait().await?)
    }

    pub async fn kill(&mut self) -> PlayerResult<()> {
        Ok(self.child.kill().await?)
    }

    /// Returns the exit status if the process has already exited.
    pub fn try_wait(&mut self) -> PlayerResult<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }
}

/// Start the player on `video` and connect to it.
///
/// Connection attempts repeat while nothing is listening at the endpoint.
/// If the process exits before the endpoint appears, that is reported as
/// [`PlayerError::Exited`].
pub async fn launch(video: &Path, opts: &LaunchOptions) -> PlayerResult<(PlayerProcess, PlayerChannel)> {
    let endpoint = opts.resolved_endpoint();
    let args = player_args(video, &endpoint);
    log::info!("Starting {} on {}", opts.player_bin, video.display());
    log::debug!("Player arguments: {args:?}");

    let child = Command::new(&opts.player_bin)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false)
        .spawn()
        .map_err(|source| PlayerError::Spawn {
            bin: opts.player_bin.clone(),
            source,
        })?;
    let mut process = PlayerProcess { child };

    let timeout = opts.command_timeout;
    let connected = (|| PlayerChannel::connect_with_timeout(&endpoint, timeout))
        .retry(
            ConstantBuilder::default()
                .with_delay(opts.connect_interval)
                .with_max_times(opts.connect_attempts),
        )
        .sleep(tokio::time::sleep)
        .when(PlayerError::is_no_player)
        .notify(|_, after| log::trace!("Player endpoint not up yet, retrying in {after:?}"))
        .await;

    match connected {
        Ok(channel) => {
            log::info!("Connected to player at {endpoint}");
            Ok((process, channel))
        }
        Err(e) => {
            if let Some(status) = process.try_wait()? {
                return Err(PlayerError::Exited(status));
            }
            log::warn!("Player did not open {endpoint} in time; stopping it");
            process.kill().await.ok();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_args() {
        let args = player_args(Path::new("/games/final.mp4"), "/tmp/fr.sock");
        assert_eq!(
            args,
            vec![
                "/games/final.mp4",
                "--pause",
                "--idle=yes",
                "--force-window=immediate",
                "--input-ipc-server=/tmp/fr.sock",
            ]
        );
    }

    #[test]
    fn test_resolved_endpoint_defaults() {
        let opts = LaunchOptions::default();
        assert_eq!(opts.resolved_endpoint(), endpoint::default_endpoint());

        let opts = LaunchOptions {
            endpoint: "/tmp/custom.sock".to_string(),
            ..LaunchOptions::default()
        };
        assert_eq!(opts.resolved_endpoint(), "/tmp/custom.sock");
    }

    #[tokio::test]
    async fn test_launch_missing_binary() {
        let opts = LaunchOptions {
            player_bin: "filmroom-no-such-player".to_string(),
            ..LaunchOptions::default()
        };
        let err = launch(Path::new("/v.mp4"), &opts).await.unwrap_err();
        assert!(matches!(err, PlayerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_reports_early_exit() {
        let dir = tempfile::TempDir::new().unwrap();
        let opts = LaunchOptions {
            player_bin: "false".to_string(),
            endpoint: dir.path().join("never.sock").to_string_lossy().into_owned(),
            connect_attempts: 5,
            connect_interval: Duration::from_millis(50),
            ..LaunchOptions::default()
        };
        let err = launch(Path::new("/v.mp4"), &opts).await.unwrap_err();
        assert!(matches!(err, PlayerError::Exited(_)), "got {err:?}");
    }
}
