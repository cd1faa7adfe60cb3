//! Interactive annotation view driven alongside a running player.
//!
//! The view is a message reducer: [`update`] turns the current [`Model`]
//! and one [`Msg`] into the next model plus at most one [`Command`], and
//! [`perform`] carries that command out against the session, producing the
//! follow-up message. Only `perform` touches the player or the store.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use filmroom_core::model::{Note, NoteEdit, NoteId, NoteSummary, TackleFilter, TackleRow};
use filmroom_core::schema::Database;
use filmroom_core::time;
use filmroom_player::{property, ChannelState, Player, PlayerChannel, PlayerEvent, PlayerResult};
use filmroom_session::{ClipMarker, Labels, Session, SessionError, TackleInput};
use ratatui::prelude::*;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;

use form::{Form, FormAction, FormKind};
use layout::Columns;

pub mod form;
pub mod layout;
mod render;

const SEEK_STEP: f64 = 5.0;
const INPUT_POLL: Duration = Duration::from_millis(100);
const INPUT_BUFFER: usize = 32;

/// Which notes the list column shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Clips,
    Tackles,
    Notes,
}

impl Filter {
    fn next(self) -> Self {
        match self {
            Self::All => Self::Clips,
            Self::Clips => Self::Tackles,
            Self::Tackles => Self::Notes,
            Self::Notes => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Clips => "clips",
            Self::Tackles => "tackles",
            Self::Notes => "notes",
        }
    }

    fn matches(self, note: &NoteSummary) -> bool {
        match self {
            Self::All => true,
            Self::Clips => note.is_clip(),
            Self::Tackles => note.is_tackle,
            Self::Notes => !note.is_clip() && !note.is_tackle,
        }
    }
}

/// What is drawn over the columns and receives keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Idle,
    NoteForm(Form),
    TackleForm(Form),
    /// Esc was pressed on a form with unsaved input.
    ConfirmDiscard(Form),
    ConfirmDelete(NoteId),
}

impl Overlay {
    /// The overlay that shows `form` for editing.
    fn editing(form: Form) -> Self {
        match form.kind {
            FormKind::Tackle => Self::TackleForm(form),
            FormKind::NewNote | FormKind::EditNote(_) => Self::NoteForm(form),
        }
    }
}

/// Last polled player state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub path: String,
    pub time_pos: f64,
    pub duration: f64,
    pub paused: bool,
}

/// Notes and tackles for the loaded video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub notes: Vec<NoteSummary>,
    pub tackles: Vec<TackleRow>,
}

#[derive(Debug)]
pub struct Model {
    pub notes: Vec<NoteSummary>,
    pub tackles: Vec<TackleRow>,
    /// Index into [`Model::visible`].
    pub selected: usize,
    pub overlay: Overlay,
    pub filter: Filter,
    pub columns: Columns,
    pub status: Option<PlayerStatus>,
    /// Full record of the selected note, once loaded.
    pub detail: Option<Note>,
    /// Start of the clip being marked.
    pub clip_start: Option<f64>,
    /// Status line text.
    pub message: Option<String>,
    pub should_quit: bool,
}

impl Model {
    pub fn new(width: u16) -> Self {
        Self {
            notes: Vec::new(),
            tackles: Vec::new(),
            selected: 0,
            overlay: Overlay::Idle,
            filter: Filter::All,
            columns: layout::compute_columns(width),
            status: None,
            detail: None,
            clip_start: None,
            message: None,
            should_quit: false,
        }
    }

    /// Notes passing the current filter, in list order.
    pub fn visible(&self) -> impl Iterator<Item = &NoteSummary> {
        let filter = self.filter;
        self.notes.iter().filter(move |n| filter.matches(n))
    }

    pub fn selected_note(&self) -> Option<&NoteSummary> {
        self.visible().nth(self.selected)
    }

    /// Keep the selection inside the visible list and ask for its detail.
    fn reselect(&mut self) -> Command {
        let count = self.visible().count();
        self.selected = self.selected.min(count.saturating_sub(1));
        match self.selected_note().map(|n| n.id) {
            Some(id) if self.detail.as_ref().map(|d| d.id) != Some(id) => Command::LoadNote(id),
            Some(_) => Command::None,
            None => {
                self.detail = None;
                Command::None
            }
        }
    }

    fn say(&mut self, text: impl Into<String>) {
        self.message = Some(text.into());
    }
}

#[derive(Debug)]
pub enum Msg {
    Key(KeyEvent),
    Resize(u16),
    Tick,
    Polled(Result<PlayerStatus, String>),
    Loaded(Result<Listing, String>),
    NoteLoaded(Result<Note, String>),
    ClipMarked(Result<f64, String>),
    ClipEnded(Result<NoteId, String>),
    /// A store write finished; the listing is stale.
    Saved(Result<String, String>),
    /// A player-only action finished.
    Done(Result<String, String>),
    Player(PlayerEvent),
    /// The control channel is gone for good.
    PlayerGone,
}

/// One side effect requested by [`update`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    None,
    PollPlayer,
    Reload,
    LoadNote(NoteId),
    GotoNote(NoteId),
    TogglePause,
    SeekRelative(f64),
    SaveNote { text: Option<String>, labels: Labels },
    EditNote { id: NoteId, edit: NoteEdit },
    SaveTackle(TackleInput),
    ClipStart,
    ClipEnd,
    LoopClip(NoteId),
    ClearLoop,
    DeleteNote(NoteId),
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Advance the model by one message.
pub fn update(mut model: Model, msg: Msg) -> (Model, Command) {
    let command = match msg {
        Msg::Key(key) => handle_key(&mut model, key),
        Msg::Resize(width) => {
            model.columns = layout::compute_columns(width);
            Command::None
        }
        Msg::Tick => Command::PollPlayer,
        Msg::Polled(Ok(status)) => {
            let previous = model.status.as_ref().map(|s| s.path.as_str());
            let changed = previous != Some(status.path.as_str());
            model.status = Some(status);
            if changed {
                Command::Reload
            } else {
                Command::None
            }
        }
        Msg::Polled(Err(e)) => {
            if model.status.take().is_some() {
                model.say(format!("Player not responding: {e}"));
            }
            Command::None
        }
        Msg::Loaded(Ok(listing)) => {
            model.notes = listing.notes;
            model.tackles = listing.tackles;
            model.reselect()
        }
        Msg::NoteLoaded(Ok(note)) => {
            if model.selected_note().map(|n| n.id) == Some(note.id) {
                model.detail = Some(note);
            }
            Command::None
        }
        Msg::ClipMarked(Ok(start)) => {
            model.clip_start = Some(start);
            model.say(format!("Clip start at {}", time::format(start)));
            Command::None
        }
        Msg::ClipEnded(Ok(id)) => {
            model.clip_start = None;
            model.say(format!("Saved clip {id}"));
            Command::Reload
        }
        Msg::Saved(Ok(text)) => {
            model.say(text);
            Command::Reload
        }
        Msg::Done(Ok(text)) => {
            if !text.is_empty() {
                model.say(text);
            }
            Command::None
        }
        Msg::Loaded(Err(e))
        | Msg::NoteLoaded(Err(e))
        | Msg::ClipMarked(Err(e))
        | Msg::ClipEnded(Err(e))
        | Msg::Saved(Err(e))
        | Msg::Done(Err(e)) => {
            model.say(e);
            Command::None
        }
        Msg::Player(event) => {
            handle_player_event(&mut model, &event);
            Command::None
        }
        Msg::PlayerGone => {
            model.should_quit = true;
            Command::None
        }
    };
    (model, command)
}

fn handle_player_event(model: &mut Model, event: &PlayerEvent) {
    match event.event.as_str() {
        "shutdown" => model.should_quit = true,
        "property-change" if event.name.as_deref() == Some(property::PAUSE) => {
            if let (Some(status), Some(paused)) = (model.status.as_mut(), event.data.as_bool()) {
                status.paused = paused;
            }
        }
        _ => {}
    }
}

fn handle_key(model: &mut Model, key: KeyEvent) -> Command {
    match std::mem::replace(&mut model.overlay, Overlay::Idle) {
        Overlay::Idle => handle_idle_key(model, key),
        Overlay::NoteForm(form) | Overlay::TackleForm(form) => handle_form_key(model, form, key),
        Overlay::ConfirmDiscard(form) => {
            match key.code {
                KeyCode::Char('y') if !is_ctrl_c(&key) => model.say("Discarded"),
                KeyCode::Char('n') | KeyCode::Esc => model.overlay = Overlay::editing(form),
                _ if is_ctrl_c(&key) => model.say("Cancelled"),
                _ => model.overlay = Overlay::ConfirmDiscard(form),
            }
            Command::None
        }
        Overlay::ConfirmDelete(id) => match key.code {
            KeyCode::Char('y') if !is_ctrl_c(&key) => Command::DeleteNote(id),
            _ => Command::None,
        },
    }
}

fn handle_form_key(model: &mut Model, mut form: Form, key: KeyEvent) -> Command {
    match form.handle_key(key) {
        FormAction::Continue => {
            model.overlay = Overlay::editing(form);
            Command::None
        }
        FormAction::Escape if form.dirty => {
            model.overlay = Overlay::ConfirmDiscard(form);
            Command::None
        }
        FormAction::Escape => Command::None,
        FormAction::Abort => {
            model.say("Cancelled");
            Command::None
        }
        FormAction::Submit => submit(model, form),
    }
}

fn submit(model: &mut Model, form: Form) -> Command {
    match form.kind {
        FormKind::NewNote => Command::SaveNote {
            text: form.note_text(),
            labels: form.labels(),
        },
        FormKind::EditNote(id) => Command::EditNote {
            id,
            edit: form.note_edit(),
        },
        FormKind::Tackle => {
            let input = form.tackle_input();
            match input.validate() {
                Ok(_) => Command::SaveTackle(input),
                Err(e) => {
                    model.say(e.to_string());
                    model.overlay = Overlay::TackleForm(form);
                    Command::None
                }
            }
        }
    }
}

fn handle_idle_key(model: &mut Model, key: KeyEvent) -> Command {
    if is_ctrl_c(&key) {
        model.should_quit = true;
        return Command::None;
    }
    let selected = model.selected_note().map(|n| (n.id, n.is_clip()));
    match key.code {
        KeyCode::Char('q') => {
            model.should_quit = true;
            Command::None
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if model.selected + 1 < model.visible().count() {
                model.selected += 1;
            }
            model.reselect()
        }
        KeyCode::Char('k') | KeyCode::Up => {
            model.selected = model.selected.saturating_sub(1);
            model.reselect()
        }
        KeyCode::Enter => selected.map_or(Command::None, |(id, _)| Command::GotoNote(id)),
        KeyCode::Char(' ') => Command::TogglePause,
        KeyCode::Left => Command::SeekRelative(-SEEK_STEP),
        KeyCode::Right => Command::SeekRelative(SEEK_STEP),
        KeyCode::Char('n') => {
            model.overlay = Overlay::NoteForm(Form::new_note());
            Command::None
        }
        KeyCode::Char('e') => {
            let form = model
                .detail
                .as_ref()
                .filter(|d| Some(d.id) == selected.map(|s| s.0))
                .map(Form::edit_note);
            match form {
                Some(form) => model.overlay = Overlay::NoteForm(form),
                None => model.say("No note selected"),
            }
            Command::None
        }
        KeyCode::Char('t') => {
            model.overlay = Overlay::TackleForm(Form::tackle());
            Command::None
        }
        KeyCode::Char('c') => {
            if model.clip_start.is_some() {
                Command::ClipEnd
            } else {
                Command::ClipStart
            }
        }
        KeyCode::Char('l') => match selected {
            Some((id, true)) => Command::LoopClip(id),
            Some((_, false)) => {
                model.say("Selected note is not a clip");
                Command::None
            }
            None => Command::None,
        },
        KeyCode::Char('L') => Command::ClearLoop,
        KeyCode::Char('d') => {
            if let Some((id, _)) = selected {
                model.overlay = Overlay::ConfirmDelete(id);
            }
            Command::None
        }
        KeyCode::Char('r') => Command::Reload,
        KeyCode::Char('f') => {
            model.filter = model.filter.next();
            model.selected = 0;
            model.say(format!("Showing {}", model.filter.label()));
            model.reselect()
        }
        _ => Command::None,
    }
}

fn describe(e: &SessionError) -> String {
    format!("[{}] {e}", e.kind())
}

async fn poll_status(player: &PlayerChannel) -> PlayerResult<PlayerStatus> {
    Ok(PlayerStatus {
        path: player.path().await?,
        time_pos: player.time_pos().await?,
        duration: player.duration().await?,
        paused: player.is_paused().await?,
    })
}

async fn load_listing(session: &Session<'_, PlayerChannel>) -> filmroom_session::Result<Listing> {
    Ok(Listing {
        notes: session.note_list().await?,
        tackles: session.tackle_list(&TackleFilter::default()).await?,
    })
}

/// Carry out one command. Returns the message reporting its result.
pub async fn perform(session: &Session<'_, PlayerChannel>, command: Command) -> Option<Msg> {
    let player = session.player();
    let msg = match command {
        Command::None => return None,
        Command::PollPlayer => {
            if player.state() == ChannelState::Disconnected {
                return Some(Msg::PlayerGone);
            }
            Msg::Polled(poll_status(player).await.map_err(|e| e.to_string()))
        }
        Command::Reload => Msg::Loaded(load_listing(session).await.map_err(|e| describe(&e))),
        Command::LoadNote(id) => Msg::NoteLoaded(session.note_show(id).map_err(|e| describe(&e))),
        Command::GotoNote(id) => Msg::Done(
            session
                .note_goto(id)
                .await
                .map(|note| format!("Note {id} at {}", time::format(note.start())))
                .map_err(|e| describe(&e)),
        ),
        Command::TogglePause => Msg::Done(
            player
                .toggle_pause()
                .await
                .map(|()| String::new())
                .map_err(|e| e.to_string()),
        ),
        Command::SeekRelative(delta) => Msg::Done(
            player
                .seek_relative(delta)
                .await
                .map(|()| String::new())
                .map_err(|e| e.to_string()),
        ),
        Command::SaveNote { text, labels } => Msg::Saved(
            session
                .note_add(text, labels)
                .await
                .map(|id| format!("Added note {id}"))
                .map_err(|e| describe(&e)),
        ),
        Command::EditNote { id, edit } => Msg::Saved(
            session
                .note_edit(id, &edit)
                .map(|_| format!("Updated note {id}"))
                .map_err(|e| describe(&e)),
        ),
        Command::SaveTackle(input) => Msg::Saved(
            session
                .tackle_add(&input)
                .await
                .map(|id| format!("Added tackle {id}"))
                .map_err(|e| describe(&e)),
        ),
        Command::ClipStart => Msg::ClipMarked(
            session
                .clip_start()
                .await
                .map(|marked| marked.start)
                .map_err(|e| describe(&e)),
        ),
        Command::ClipEnd => Msg::ClipEnded(
            session
                .clip_end("clip", Labels::default())
                .await
                .map_err(|e| describe(&e)),
        ),
        Command::LoopClip(id) => Msg::Done(
            session
                .clip_play(id)
                .await
                .map(|clip| {
                    format!(
                        "Looping clip {id} {} - {}",
                        time::format(clip.start),
                        time::format(clip.end)
                    )
                })
                .map_err(|e| describe(&e)),
        ),
        Command::ClearLoop => Msg::Done(
            session
                .clip_stop()
                .await
                .map(|()| "Loop cleared".to_string())
                .map_err(|e| describe(&e)),
        ),
        Command::DeleteNote(id) => Msg::Saved(
            session
                .note_delete(id)
                .map(|()| format!("Deleted note {id}"))
                .map_err(|e| describe(&e)),
        ),
    };
    Some(msg)
}

/// Forward terminal events from a blocking reader thread until the
/// receiving side goes away.
fn spawn_input(tx: mpsc::Sender<Event>) {
    std::thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("Terminal read failed: {e}");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Terminal poll failed: {e}");
                    break;
                }
            }
        }
    });
}

/// Run the annotation view until the analyst quits or the player exits.
///
/// Sets up the terminal, runs the event loop, and restores the terminal
/// on exit (including on error).
pub async fn run_tui(db: &Database, channel: &PlayerChannel, poll: Duration) -> Result<()> {
    let marker = ClipMarker::new();
    let session = Session::new(db, channel, &marker);
    let events = channel.subscribe();
    if let Err(e) = channel.observe_property(property::PAUSE).await {
        log::warn!("Could not observe pause state: {e}");
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &session, events, poll).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &Session<'_, PlayerChannel>,
    mut events: broadcast::Receiver<PlayerEvent>,
    poll: Duration,
) -> Result<()> {
    let (tx, mut input) = mpsc::channel(INPUT_BUFFER);
    spawn_input(tx);

    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut model = Model::new(terminal.size()?.width);
    let mut pending = VecDeque::from([Command::PollPlayer]);

    loop {
        while let Some(command) = pending.pop_front() {
            log::trace!("perform {command:?}");
            if let Some(msg) = perform(session, command).await {
                let (next, follow) = update(model, msg);
                model = next;
                if follow != Command::None {
                    pending.push_back(follow);
                }
            }
        }
        if model.should_quit {
            return Ok(());
        }

        terminal.draw(|frame| render::render(frame, &model))?;

        let msg = tokio::select! {
            _ = ticker.tick() => Msg::Tick,
            Some(ev) = input.recv() => match ev {
                Event::Key(key) if key.kind == KeyEventKind::Press => Msg::Key(key),
                Event::Resize(width, _) => Msg::Resize(width),
                _ => continue,
            },
            ev = events.recv() => match ev {
                Ok(event) => Msg::Player(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("Skipped {skipped} player events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => Msg::PlayerGone,
            },
        };

        let (next, command) = update(model, msg);
        model = next;
        if command != Command::None {
            pending.push_back(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn key(code: KeyCode) -> Msg {
        Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl_c() -> Msg {
        Msg::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
    }

    fn summary(id: i64, start: f64, end: f64, is_tackle: bool) -> NoteSummary {
        NoteSummary {
            id: NoteId::new(id),
            category: None,
            start,
            end,
            text: Some(format!("note {id}")),
            is_tackle,
            created_at: Utc::now(),
        }
    }

    fn loaded_model() -> Model {
        let listing = Listing {
            notes: vec![
                summary(1, 10.0, 10.0, false),
                summary(2, 20.0, 30.0, false),
                summary(3, 40.0, 40.0, true),
            ],
            tackles: Vec::new(),
        };
        let (model, command) = update(Model::new(120), Msg::Loaded(Ok(listing)));
        assert_eq!(command, Command::LoadNote(NoteId::new(1)));
        model
    }

    fn status(path: &str) -> PlayerStatus {
        PlayerStatus {
            path: path.to_string(),
            time_pos: 1.0,
            duration: 90.0,
            paused: true,
        }
    }

    fn type_text(mut model: Model, text: &str) -> Model {
        for c in text.chars() {
            model = update(model, key(KeyCode::Char(c))).0;
        }
        model
    }

    #[test]
    fn test_tick_polls_and_new_video_reloads() {
        let (model, command) = update(Model::new(120), Msg::Tick);
        assert_eq!(command, Command::PollPlayer);

        let (model, command) = update(model, Msg::Polled(Ok(status("/a.mp4"))));
        assert_eq!(command, Command::Reload);
        let (model, command) = update(model, Msg::Polled(Ok(status("/a.mp4"))));
        assert_eq!(command, Command::None);
        let (_, command) = update(model, Msg::Polled(Ok(status("/b.mp4"))));
        assert_eq!(command, Command::Reload);
    }

    #[test]
    fn test_lost_player_is_reported_once() {
        let (model, _) = update(Model::new(120), Msg::Polled(Ok(status("/a.mp4"))));
        let (model, _) = update(model, Msg::Polled(Err("timed out".to_string())));
        assert!(model.status.is_none());
        assert!(model.message.as_deref().unwrap().contains("timed out"));

        let mut model = model;
        model.message = None;
        let (model, _) = update(model, Msg::Polled(Err("timed out".to_string())));
        assert!(model.message.is_none());
    }

    #[test]
    fn test_selection_moves_and_loads_detail() {
        let model = loaded_model();
        let (model, command) = update(model, key(KeyCode::Char('j')));
        assert_eq!(model.selected, 1);
        assert_eq!(command, Command::LoadNote(NoteId::new(2)));

        let (model, _) = update(model, key(KeyCode::Down));
        let (model, command) = update(model, key(KeyCode::Down));
        assert_eq!(model.selected, 2);
        assert_eq!(command, Command::LoadNote(NoteId::new(3)));

        let (_, command) = update(model, key(KeyCode::Enter));
        assert_eq!(command, Command::GotoNote(NoteId::new(3)));
    }

    #[test]
    fn test_playback_keys() {
        let model = loaded_model();
        let (model, command) = update(model, key(KeyCode::Char(' ')));
        assert_eq!(command, Command::TogglePause);
        let (model, command) = update(model, key(KeyCode::Left));
        assert_eq!(command, Command::SeekRelative(-5.0));
        let (model, command) = update(model, key(KeyCode::Right));
        assert_eq!(command, Command::SeekRelative(5.0));
        let (_, command) = update(model, key(KeyCode::Char('L')));
        assert_eq!(command, Command::ClearLoop);
    }

    #[test]
    fn test_filter_cycles() {
        let model = loaded_model();
        let (model, command) = update(model, key(KeyCode::Char('f')));
        assert_eq!(model.filter, Filter::Clips);
        assert_eq!(model.visible().count(), 1);
        assert_eq!(command, Command::LoadNote(NoteId::new(2)));

        let (model, _) = update(model, key(KeyCode::Char('f')));
        assert_eq!(model.filter, Filter::Tackles);
        assert_eq!(model.selected_note().map(|n| n.id), Some(NoteId::new(3)));

        let (model, _) = update(model, key(KeyCode::Char('f')));
        assert_eq!(model.filter, Filter::Notes);
        assert_eq!(model.visible().count(), 1);

        let (model, _) = update(model, key(KeyCode::Char('f')));
        assert_eq!(model.filter, Filter::All);
        assert_eq!(model.visible().count(), 3);
    }

    #[test]
    fn test_loop_needs_a_clip() {
        let model = loaded_model();
        let (model, command) = update(model, key(KeyCode::Char('l')));
        assert_eq!(command, Command::None);
        assert!(model.message.is_some());

        let (model, _) = update(model, key(KeyCode::Char('j')));
        let (_, command) = update(model, key(KeyCode::Char('l')));
        assert_eq!(command, Command::LoopClip(NoteId::new(2)));
    }

    #[test]
    fn test_clip_key_toggles_start_and_end() {
        let model = loaded_model();
        let (model, command) = update(model, key(KeyCode::Char('c')));
        assert_eq!(command, Command::ClipStart);
        let (model, _) = update(model, Msg::ClipMarked(Ok(12.5)));
        assert_eq!(model.clip_start, Some(12.5));

        let (model, command) = update(model, key(KeyCode::Char('c')));
        assert_eq!(command, Command::ClipEnd);

        let (model, command) = update(model, Msg::ClipEnded(Err("video changed".to_string())));
        assert_eq!(command, Command::None);
        assert_eq!(model.clip_start, Some(12.5));

        let (model, command) = update(model, Msg::ClipEnded(Ok(NoteId::new(9))));
        assert_eq!(command, Command::Reload);
        assert_eq!(model.clip_start, None);
    }

    #[test]
    fn test_note_form_submits() {
        let model = loaded_model();
        let (model, _) = update(model, key(KeyCode::Char('n')));
        assert!(matches!(model.overlay, Overlay::NoteForm(_)));

        // Keys go to the form, not the idle bindings.
        let model = type_text(model, "q");
        assert!(!model.should_quit);

        let mut model = model;
        for _ in 0..3 {
            model = update(model, key(KeyCode::Tab)).0;
        }
        let model = type_text(model, "Blues");
        let (model, command) = update(model, key(KeyCode::Enter));
        assert_eq!(model.overlay, Overlay::Idle);
        assert_eq!(
            command,
            Command::SaveNote {
                text: Some("q".to_string()),
                labels: Labels {
                    team: Some("Blues".to_string()),
                    ..Labels::default()
                },
            }
        );

        let (_, command) = update(model, Msg::Saved(Ok("Added note 4".to_string())));
        assert_eq!(command, Command::Reload);
    }

    #[test]
    fn test_escape_on_dirty_form_confirms() {
        let model = loaded_model();
        let (model, _) = update(model, key(KeyCode::Char('n')));
        let (model, _) = update(model, key(KeyCode::Esc));
        assert_eq!(model.overlay, Overlay::Idle, "clean form closes at once");

        let (model, _) = update(model, key(KeyCode::Char('t')));
        let model = type_text(model, "Smith");
        let (model, _) = update(model, key(KeyCode::Esc));
        assert!(matches!(model.overlay, Overlay::ConfirmDiscard(_)));

        let (model, _) = update(model, key(KeyCode::Char('n')));
        let Overlay::TackleForm(form) = &model.overlay else {
            panic!("expected the tackle form back, got {:?}", model.overlay);
        };
        assert_eq!(form.fields[0].value, "Smith");

        let (model, _) = update(model, key(KeyCode::Esc));
        let (model, command) = update(model, key(KeyCode::Char('y')));
        assert_eq!(model.overlay, Overlay::Idle);
        assert_eq!(command, Command::None);
    }

    #[test]
    fn test_ctrl_c_cancels_form_then_quits() {
        let model = loaded_model();
        let (model, _) = update(model, key(KeyCode::Char('n')));
        let model = type_text(model, "half typed");
        let (model, _) = update(model, ctrl_c());
        assert_eq!(model.overlay, Overlay::Idle);
        assert!(!model.should_quit);

        let (model, _) = update(model, ctrl_c());
        assert!(model.should_quit);
    }

    #[test]
    fn test_invalid_tackle_keeps_form_open() {
        let model = loaded_model();
        let (mut model, _) = update(model, key(KeyCode::Char('t')));
        let model = {
            if let Overlay::TackleForm(form) = &mut model.overlay {
                form.focus = form.fields.len() - 1;
            }
            model
        };
        let (model, command) = update(model, key(KeyCode::Enter));
        assert_eq!(command, Command::None);
        assert!(matches!(model.overlay, Overlay::TackleForm(_)));
        assert!(model.message.is_some());
    }

    #[test]
    fn test_delete_asks_first() {
        let model = loaded_model();
        let (model, command) = update(model, key(KeyCode::Char('d')));
        assert_eq!(command, Command::None);
        assert_eq!(model.overlay, Overlay::ConfirmDelete(NoteId::new(1)));

        let (model, command) = update(model, key(KeyCode::Char('n')));
        assert_eq!(command, Command::None);
        assert_eq!(model.overlay, Overlay::Idle);

        let (model, _) = update(model, key(KeyCode::Char('d')));
        let (_, command) = update(model, key(KeyCode::Char('y')));
        assert_eq!(command, Command::DeleteNote(NoteId::new(1)));
    }

    #[test]
    fn test_reload_after_delete_clamps_selection() {
        let model = loaded_model();
        let (model, _) = update(model, key(KeyCode::Char('j')));
        let (model, _) = update(model, key(KeyCode::Char('j')));
        let listing = Listing {
            notes: vec![summary(1, 10.0, 10.0, false)],
            tackles: Vec::new(),
        };
        let (model, _) = update(model, Msg::Loaded(Ok(listing)));
        assert_eq!(model.selected, 0);

        let (model, _) = update(model, Msg::Loaded(Ok(Listing::default())));
        assert!(model.selected_note().is_none());
        assert!(model.detail.is_none());
    }

    #[test]
    fn test_player_events() {
        let (model, _) = update(Model::new(120), Msg::Polled(Ok(status("/a.mp4"))));
        let pause = PlayerEvent {
            event: "property-change".to_string(),
            id: Some(1),
            name: Some("pause".to_string()),
            data: json!(false),
        };
        let (model, _) = update(model, Msg::Player(pause));
        assert!(!model.status.as_ref().unwrap().paused);

        let shutdown = PlayerEvent {
            event: "shutdown".to_string(),
            id: None,
            name: None,
            data: serde_json::Value::Null,
        };
        let (model, _) = update(model, Msg::Player(shutdown));
        assert!(model.should_quit);
    }

    #[test]
    fn test_resize_recomputes_columns() {
        let (model, _) = update(Model::new(200), Msg::Resize(70));
        assert!(model.columns.is_mini());
        let (model, _) = update(model, Msg::Resize(160));
        assert_eq!(model.columns.count, 4);
    }
}
