use anyhow::Result;
use clap::Parser;
use filmroom_session::Config;
use std::path::PathBuf;

mod commands;
mod tui;

#[derive(Debug, Parser)]
#[command(name = "filmroom", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/filmroom/data.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Player control endpoint (default: /tmp/filmroom-mpv.sock)
    #[arg(long, global = true)]
    socket: Option<String>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Open a video in mpv and start an annotation session
    ///
    /// Starts the player paused on the video with its control endpoint
    /// enabled, then runs the terminal UI against it:
    ///
    /// - Notes, clips and tackles for the video in the left column
    /// - Details of the selected note, a tackle summary and player status
    ///   alongside, as the terminal width allows
    /// - Playback position refreshed four times a second
    ///
    /// Quitting the UI also closes the player.
    Open {
        /// Video file to open
        video: PathBuf,

        /// Keep logging enabled while the UI is running
        #[arg(long)]
        log: bool,
    },
    /// Check that the player, the encoder and the database are usable
    Doctor,
    /// Print version information
    Version,
    /// Free-form notes
    #[command(subcommand)]
    Note(NoteCommand),
    /// Clips (annotated intervals)
    #[command(subcommand)]
    Clip(ClipCommand),
    /// Tackle events
    #[command(subcommand)]
    Tackle(TackleCommand),
    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, clap::Args)]
pub struct LabelArgs {
    /// Category (e.g. attack, defence, set-piece)
    #[arg(short, long)]
    pub category: Option<String>,

    /// Player the annotation is about
    #[arg(short, long)]
    pub player: Option<String>,

    /// Team the annotation is about
    #[arg(short, long)]
    pub team: Option<String>,
}

#[derive(Debug, clap::Subcommand)]
enum NoteCommand {
    /// Note the current playback position
    Add {
        #[command(flatten)]
        labels: LabelArgs,

        /// Note text
        #[arg(short = 'x', long)]
        text: Option<String>,
    },
    /// List notes for the loaded video
    List,
    /// Seek the player to a note
    Goto {
        /// Note id
        id: String,
    },
    /// Delete a note and everything attached to it
    Delete {
        /// Note id
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Change a note's category or text
    Edit {
        /// Note id
        id: String,

        #[command(flatten)]
        labels: LabelArgs,

        /// New note text (empty to clear)
        #[arg(short = 'x', long)]
        text: Option<String>,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ClipCommand {
    /// Mark the current position as the start of a clip
    Start,
    /// Finish the clip started with `clip start` at the current position
    End {
        /// What happens in the clip
        description: String,

        #[command(flatten)]
        labels: LabelArgs,
    },
    /// Add a clip between two times (H:MM:SS, MM:SS or seconds)
    Add {
        start: String,
        end: String,
        description: String,

        #[command(flatten)]
        labels: LabelArgs,
    },
    /// Seek to a clip and loop it
    Play {
        /// Clip id
        id: String,
    },
    /// Stop looping
    Stop,
    /// List clips for the loaded video
    List,
    /// Cut clips out of the video with ffmpeg
    ///
    /// Exports one clip by id, or with --all every clip on the loaded video.
    /// By default the streams are copied without re-encoding, which is fast
    /// but cuts on keyframes; --reencode gives frame-accurate cuts.
    ///
    /// Output:
    /// - One clip: the file named by --output, or clip-<id>.<format>
    /// - With --all: clip-<id>.<format> files in the --output directory
    Export {
        /// Clip id
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Export every clip on the loaded video
        #[arg(long)]
        all: bool,

        /// Output file (or directory with --all)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Container format: mp4, webm or mkv
        #[arg(short, long, default_value = "mp4")]
        format: String,

        /// Re-encode instead of copying streams
        #[arg(long)]
        reencode: bool,
    },
}

#[derive(Debug, clap::Subcommand)]
enum TackleCommand {
    /// Record a tackle at the current position
    Add {
        /// Tackling player
        #[arg(short, long)]
        player: Option<String>,

        /// Team of the tackling player
        #[arg(short, long)]
        team: Option<String>,

        /// Attempt number (default 1)
        #[arg(short, long)]
        attempt: Option<String>,

        /// completed, missed, possible or other
        #[arg(short, long)]
        outcome: String,

        /// What followed the tackle
        #[arg(short, long)]
        followed: Option<String>,

        /// Star this tackle
        #[arg(short, long)]
        star: bool,

        /// Extra notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Field zone
        #[arg(short, long)]
        zone: Option<String>,
    },
    /// List tackles for the loaded video
    List {
        /// Only this player
        #[arg(long)]
        player: Option<String>,

        /// Only this outcome
        #[arg(long)]
        outcome: Option<String>,

        /// Only starred tackles
        #[arg(long)]
        star: bool,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file
    Get {
        key: Option<String>,
    },
    /// Set a value in the config file
    Set {
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
    /// Create the config file with defaults
    Init,
    /// Print an example config file
    Example,
}

fn setup_logging(config: &Config) {
    if let Err(e) = twyg::setup(config.logging.clone()) {
        eprintln!("Warning: could not set up logging: {e:?}");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => commands::config::show_config(),
        ConfigCommand::Get { key } => commands::config::get_config(key),
        ConfigCommand::Set { key, value } => commands::config::set_config(&key, &value),
        ConfigCommand::Path => commands::config::show_path(),
        ConfigCommand::Init => commands::config::init_config(),
        ConfigCommand::Example => commands::config::show_example(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        command,
        db,
        socket,
    } = cli;

    // Config commands must work even with a broken config file, so the
    // config is only loaded by the arms that need it.
    let load = move |with_logging: bool| -> Result<Config> {
        let config = Config::load_with_overrides(db, socket)?;
        if with_logging {
            setup_logging(&config);
        }
        Ok(config)
    };

    match command {
        Commands::Config(command) => run_config(command),
        Commands::Version => {
            println!("filmroom {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        // The UI owns the terminal; log lines would garble it.
        Commands::Open { video, log } => commands::open::run_open(&load(log)?, &video).await,
        Commands::Doctor => commands::doctor::run_doctor(&load(true)?).await,
        Commands::Note(command) => run_note(&load(true)?, command).await,
        Commands::Clip(command) => run_clip(&load(true)?, command).await,
        Commands::Tackle(command) => run_tackle(&load(true)?, command).await,
    }
}

async fn run_note(config: &Config, command: NoteCommand) -> Result<()> {
    match command {
        NoteCommand::Add { labels, text } => commands::note::add(config, labels.into(), text).await,
        NoteCommand::List => commands::note::list(config).await,
        NoteCommand::Goto { id } => commands::note::goto(config, &id).await,
        NoteCommand::Delete { id, force } => commands::note::delete(config, &id, force),
        NoteCommand::Edit { id, labels, text } => commands::note::edit(config, &id, labels, text),
    }
}

async fn run_clip(config: &Config, command: ClipCommand) -> Result<()> {
    match command {
        ClipCommand::Start => commands::clip::start(config).await,
        ClipCommand::End {
            description,
            labels,
        } => commands::clip::end(config, &description, labels.into()).await,
        ClipCommand::Add {
            start,
            end,
            description,
            labels,
        } => commands::clip::add(config, &start, &end, &description, labels.into()).await,
        ClipCommand::Play { id } => commands::clip::play(config, &id).await,
        ClipCommand::Stop => commands::clip::stop(config).await,
        ClipCommand::List => commands::clip::list(config).await,
        ClipCommand::Export {
            id,
            all,
            output,
            format,
            reencode,
        } => {
            let request = commands::clip::ExportRequest {
                id,
                all,
                output,
                format,
                reencode,
            };
            commands::clip::export(config, request).await
        }
    }
}

async fn run_tackle(config: &Config, command: TackleCommand) -> Result<()> {
    match command {
        TackleCommand::Add {
            player,
            team,
            attempt,
            outcome,
            followed,
            star,
            notes,
            zone,
        } => {
            let input = filmroom_session::TackleInput {
                player,
                team,
                attempt,
                outcome,
                followed,
                star,
                notes,
                zone,
            };
            commands::tackle::add(config, &input).await
        }
        TackleCommand::List {
            player,
            outcome,
            star,
        } => commands::tackle::list(config, player, outcome, star).await,
    }
}

impl From<LabelArgs> for filmroom_session::Labels {
    fn from(args: LabelArgs) -> Self {
        Self {
            category: args.category,
            player: args.player,
            team: args.team,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_reach_every_verb() {
        let cli = Cli::parse_from(["filmroom", "note", "list", "--db", "/tmp/x.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Commands::Note(NoteCommand::List)));

        let cli = Cli::parse_from(["filmroom", "config", "path", "--socket", "/tmp/s"]);
        assert!(matches!(cli.command, Commands::Config(ConfigCommand::Path)));
    }

    #[tokio::test]
    async fn test_config_and_version_run_without_loading_config() {
        run(Cli::parse_from(["filmroom", "config", "example"]))
            .await
            .unwrap();
        run(Cli::parse_from(["filmroom", "version"])).await.unwrap();
    }
}
