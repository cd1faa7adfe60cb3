use std::process::Stdio;

use anyhow::Result;
use filmroom_core::schema::Database;
use filmroom_player::{Player, PlayerChannel};
use filmroom_session::Config;
use tokio::process::Command;

/// Result of one check.
#[derive(Debug)]
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

impl Check {
    fn print(&self) {
        let mark = if self.ok { "✓" } else { "✗" };
        println!("  {mark} {:<10} {}", self.name, self.detail);
    }
}

/// Run `bin <flag>` and report the first line of its output.
async fn check_binary(name: &'static str, bin: &str, flag: &str) -> Check {
    let output = Command::new(bin)
        .arg(flag)
        .stdin(Stdio::null())
        .output()
        .await;
    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            Check {
                name,
                ok: true,
                detail: text.lines().next().unwrap_or(bin).trim().to_string(),
            }
        }
        Ok(out) => Check {
            name,
            ok: false,
            detail: format!("{bin} {flag} exited with {}", out.status),
        },
        Err(e) => Check {
            name,
            ok: false,
            detail: format!("cannot run {bin}: {e}"),
        },
    }
}

fn check_database(config: &Config) -> Check {
    let path = config.database_path.display().to_string();
    match Database::open(&config.database_path) {
        Ok(_) => Check {
            name: "database",
            ok: true,
            detail: path,
        },
        Err(e) => Check {
            name: "database",
            ok: false,
            detail: format!("{path}: {e}"),
        },
    }
}

/// The socket is optional: a player only listens while a session is open.
async fn check_socket(config: &Config) -> Check {
    match PlayerChannel::connect_with_timeout(&config.socket_path, config.command_timeout()).await
    {
        Ok(channel) => {
            let loaded = channel.path().await.ok();
            Check {
                name: "socket",
                ok: true,
                detail: format!(
                    "{} (player running{})",
                    config.socket_path,
                    loaded.map(|p| format!(", {p}")).unwrap_or_default()
                ),
            }
        }
        Err(_) => Check {
            name: "socket",
            ok: true,
            detail: format!("{} (no player running)", config.socket_path),
        },
    }
}

pub async fn run_doctor(config: &Config) -> Result<()> {
    println!("\n🩺 filmroom doctor\n");

    let checks = [
        check_binary("player", &config.player_bin, "--version").await,
        check_binary("encoder", &config.encoder_bin, "-version").await,
        check_database(config),
        check_socket(config).await,
    ];
    for check in &checks {
        check.print();
    }

    let failed = checks.iter().filter(|c| !c.ok).count();
    if failed == 0 {
        println!("\n✓ All checks passed");
        Ok(())
    } else {
        anyhow::bail!("{failed} check(s) failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_binary_fails() {
        let check = check_binary("player", "filmroom-no-such-binary", "--version").await;
        assert!(!check.ok);
        assert!(check.detail.contains("cannot run"));
    }

    #[test]
    fn test_database_check() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            database_path: dir.path().join("data.db"),
            ..Config::default()
        };
        let check = check_database(&config);
        assert!(check.ok, "{}", check.detail);
    }

    #[tokio::test]
    async fn test_socket_check_without_player() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            socket_path: dir.path().join("none.sock").to_string_lossy().into_owned(),
            ..Config::default()
        };
        let check = check_socket(&config).await;
        assert!(check.ok);
        assert!(check.detail.contains("no player running"));
    }
}
