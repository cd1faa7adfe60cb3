//! Input forms shown over the annotation view.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use filmroom_core::model::{detail_kind, Note, NoteEdit, NoteId};
use filmroom_session::{Labels, TackleInput};

/// What a form produces when submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    NewNote,
    EditNote(NoteId),
    Tackle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

impl Field {
    fn new(label: &'static str) -> Self {
        Self::with_value(label, String::new())
    }

    fn with_value(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

/// Result of feeding a key to a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    /// Keep editing.
    Continue,
    Submit,
    /// Esc: leave, after confirmation if anything was typed.
    Escape,
    /// Ctrl-C: leave now.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub kind: FormKind,
    pub fields: Vec<Field>,
    pub focus: usize,
    pub dirty: bool,
    /// Detail kind the text field reads from and writes to. Clips keep
    /// their text as a description.
    text_kind: &'static str,
}

const TEXT: &str = "Text";
const CATEGORY: &str = "Category";
const PLAYER: &str = "Player";
const TEAM: &str = "Team";
const ATTEMPT: &str = "Attempt";
const OUTCOME: &str = "Outcome";
const FOLLOWED: &str = "Followed by";
const ZONE: &str = "Zone";
const NOTES: &str = "Notes";
const STAR: &str = "Star (y/n)";

impl Form {
    fn new(kind: FormKind, fields: Vec<Field>) -> Self {
        Self {
            kind,
            fields,
            focus: 0,
            dirty: false,
            text_kind: detail_kind::TEXT,
        }
    }

    pub fn new_note() -> Self {
        Self::new(
            FormKind::NewNote,
            vec![
                Field::new(TEXT),
                Field::new(CATEGORY),
                Field::new(PLAYER),
                Field::new(TEAM),
            ],
        )
    }

    /// A note form filled in from an existing note.
    pub fn edit_note(note: &Note) -> Self {
        let text_kind = if note.detail(detail_kind::TEXT).is_none()
            && note.detail(detail_kind::DESCRIPTION).is_some()
        {
            detail_kind::DESCRIPTION
        } else {
            detail_kind::TEXT
        };
        let detail = |kind: &str| note.detail(kind).unwrap_or_default().to_string();
        let mut form = Self::new(
            FormKind::EditNote(note.id),
            vec![
                Field::with_value(TEXT, detail(text_kind)),
                Field::with_value(CATEGORY, note.category.clone().unwrap_or_default()),
                Field::with_value(PLAYER, detail(detail_kind::PLAYER)),
                Field::with_value(TEAM, detail(detail_kind::TEAM)),
            ],
        );
        form.text_kind = text_kind;
        form
    }

    pub fn tackle() -> Self {
        Self::new(
            FormKind::Tackle,
            vec![
                Field::new(PLAYER),
                Field::new(TEAM),
                Field::with_value(ATTEMPT, "1"),
                Field::new(OUTCOME),
                Field::new(FOLLOWED),
                Field::new(ZONE),
                Field::new(NOTES),
                Field::with_value(STAR, "n"),
            ],
        )
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            FormKind::NewNote => "New note",
            FormKind::EditNote(_) => "Edit note",
            FormKind::Tackle => "New tackle",
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return FormAction::Abort;
        }
        match key.code {
            KeyCode::Esc => return FormAction::Escape,
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_prev(),
            KeyCode::Enter => {
                if self.focus + 1 == self.fields.len() {
                    return FormAction::Submit;
                }
                self.focus_next();
            }
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    if field.value.pop().is_some() {
                        self.dirty = true;
                    }
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.fields.get_mut(self.focus) {
                    field.value.push(c);
                    self.dirty = true;
                }
            }
            _ => {}
        }
        FormAction::Continue
    }

    fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    /// Trimmed value of a field, `None` when blank.
    fn value(&self, label: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn note_text(&self) -> Option<String> {
        self.value(TEXT)
    }

    pub fn labels(&self) -> Labels {
        Labels {
            category: self.value(CATEGORY),
            player: self.value(PLAYER),
            team: self.value(TEAM),
        }
    }

    /// Replacement values for the edited note. Blank fields clear their
    /// detail.
    pub fn note_edit(&self) -> NoteEdit {
        let or_clear = |label| Some(self.value(label).unwrap_or_default());
        NoteEdit {
            category: or_clear(CATEGORY),
            ..NoteEdit::default()
        }
        .with_detail(self.text_kind, or_clear(TEXT))
        .with_detail(detail_kind::PLAYER, or_clear(PLAYER))
        .with_detail(detail_kind::TEAM, or_clear(TEAM))
    }

    pub fn tackle_input(&self) -> TackleInput {
        TackleInput {
            player: self.value(PLAYER),
            team: self.value(TEAM),
            attempt: self.value(ATTEMPT),
            outcome: self.value(OUTCOME).unwrap_or_default(),
            followed: self.value(FOLLOWED),
            star: self
                .value(STAR)
                .is_some_and(|v| v.eq_ignore_ascii_case("y") || v.eq_ignore_ascii_case("yes")),
            notes: self.value(NOTES),
            zone: self.value(ZONE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmroom_core::model::Outcome;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut Form, text: &str) {
        for c in text.chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_focus_wraps() {
        let mut form = Form::new_note();
        form.handle_key(key(KeyCode::BackTab));
        assert_eq!(form.focus, 3);
        form.handle_key(key(KeyCode::Tab));
        assert_eq!(form.focus, 0);
    }

    #[test]
    fn test_enter_submits_on_last_field() {
        let mut form = Form::new_note();
        type_text(&mut form, "maul");
        assert!(form.dirty);
        for _ in 0..3 {
            assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::Continue);
        }
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::Submit);
        assert_eq!(form.note_text().as_deref(), Some("maul"));
        assert_eq!(form.labels(), Labels::default());
    }

    #[test]
    fn test_escape_and_abort() {
        let mut form = Form::new_note();
        assert_eq!(form.handle_key(key(KeyCode::Esc)), FormAction::Escape);
        assert_eq!(
            form.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            FormAction::Abort
        );
        assert!(!form.dirty);
    }

    #[test]
    fn test_tackle_input() {
        let mut form = Form::tackle();
        type_text(&mut form, "Alldritt");
        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Tab));
        type_text(&mut form, "completed");
        form.focus = form.fields.len() - 1;
        form.handle_key(key(KeyCode::Backspace));
        type_text(&mut form, "y");

        let input = form.tackle_input();
        assert_eq!(input.player.as_deref(), Some("Alldritt"));
        assert_eq!(input.attempt.as_deref(), Some("1"));
        assert!(input.star);
        let tackle = input.validate().unwrap();
        assert_eq!(tackle.outcome, Outcome::Completed);
    }

    #[test]
    fn test_edit_clears_blank_fields() {
        let mut form = Form::new_note();
        form.kind = FormKind::EditNote(NoteId::new(4));
        type_text(&mut form, "new text");
        let edit = form.note_edit();
        assert_eq!(edit.category.as_deref(), Some(""));
        assert_eq!(edit.details.len(), 3);
        assert_eq!(edit.details[0].text, "new text");
        assert_eq!(edit.details[1].text, "");
    }

    #[test]
    fn test_edit_clip_keeps_description_kind() {
        use chrono::Utc;
        use filmroom_core::model::NoteDetail;

        let note = Note {
            id: NoteId::new(2),
            category: Some("attack".to_string()),
            created_at: Utc::now(),
            timings: Vec::new(),
            videos: Vec::new(),
            details: vec![NoteDetail::new(detail_kind::DESCRIPTION, "line break")],
            zones: Vec::new(),
            highlights: Vec::new(),
            tackles: Vec::new(),
        };
        let form = Form::edit_note(&note);
        assert_eq!(form.fields[0].value, "line break");
        assert_eq!(form.fields[1].value, "attack");
        assert!(!form.dirty);

        let edit = form.note_edit();
        assert_eq!(edit.details[0].kind, detail_kind::DESCRIPTION);
        assert_eq!(edit.details[0].text, "line break");
    }
}
