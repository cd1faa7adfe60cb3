use std::path::Path;

use filmroom_core::model::{Note, Outcome};
use filmroom_core::time;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};

use super::form::Form;
use super::{Model, Overlay};

const HELP: &[(&str, &str)] = &[
    ("j/k", "select"),
    ("Enter", "go to note"),
    ("Space", "pause"),
    ("\u{2190}/\u{2192}", "seek 5s"),
    ("n", "new note"),
    ("e", "edit note"),
    ("t", "tackle"),
    ("c", "clip start/end"),
    ("l/L", "loop/clear"),
    ("d", "delete"),
    ("f", "filter"),
    ("r", "reload"),
    ("q", "quit"),
];

pub fn render(frame: &mut Frame, model: &Model) {
    let [main, status_line] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());

    if model.columns.is_mini() {
        render_mini(frame, model, main);
    } else {
        let count = usize::from(model.columns.count);
        let areas = Layout::horizontal(
            model.columns.widths[..count]
                .iter()
                .map(|w| Constraint::Length(*w)),
        )
        .spacing(1)
        .split(main);

        render_list(frame, model, areas[0]);
        render_detail(frame, model, areas[1]);
        if let Some(area) = areas.get(2) {
            render_tackles(frame, model, *area);
        }
        if let Some(area) = areas.get(3) {
            render_status(frame, model, *area);
        }
    }
    render_status_line(frame, model, status_line);

    match &model.overlay {
        Overlay::Idle => {}
        Overlay::NoteForm(form) | Overlay::TackleForm(form) => render_form(frame, form),
        Overlay::ConfirmDiscard(_) => render_confirm(frame, "Discard changes? (y/n)"),
        Overlay::ConfirmDelete(id) => render_confirm(frame, &format!("Delete note {id}? (y/n)")),
    }
}

fn render_list(frame: &mut Frame, model: &Model, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Time").style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(""),
        Cell::from("Note"),
    ])
    .height(1);

    // Borders and header take three rows.
    let viewport = usize::from(area.height.saturating_sub(3)).max(1);
    let offset = model.selected.saturating_sub(viewport - 1);
    let total = model.visible().count();

    let rows: Vec<Row> = model
        .visible()
        .enumerate()
        .skip(offset)
        .take(viewport)
        .map(|(i, note)| {
            let style = if i == model.selected {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            let kind = if note.is_tackle {
                "T"
            } else if note.is_clip() {
                "C"
            } else {
                ""
            };
            let text = note
                .text
                .clone()
                .or_else(|| note.category.clone())
                .unwrap_or_default();
            Row::new(vec![
                Cell::from(time::format(note.start)),
                Cell::from(kind).style(Style::default().fg(Color::Cyan)),
                Cell::from(text),
            ])
            .style(style)
        })
        .collect();

    let title = format!("Notes ({}) [{}]", total, model.filter.label());
    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(1),
            Constraint::Min(5),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}

fn detail_lines(note: &Note) -> Vec<Line<'_>> {
    let label = |name: &str| Span::styled(format!("{name:<10}"), Style::default().fg(Color::Cyan));

    let mut lines = vec![Line::from(Span::styled(
        format!("Note {}", note.id),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    for timing in &note.timings {
        let span = if timing.end > timing.start {
            format!("{} - {}", time::format(timing.start), time::format(timing.end))
        } else {
            time::format(timing.start)
        };
        lines.push(Line::from(vec![label("Time"), Span::raw(span)]));
    }
    if let Some(category) = &note.category {
        lines.push(Line::from(vec![label("Category"), Span::raw(category.as_str())]));
    }
    for detail in &note.details {
        lines.push(Line::from(vec![
            label(&detail.kind),
            Span::raw(detail.text.as_str()),
        ]));
    }
    for tackle in &note.tackles {
        lines.push(Line::from(vec![
            label("Tackle"),
            Span::raw(format!(
                "{} #{} {}",
                tackle.player, tackle.attempt, tackle.outcome
            )),
        ]));
        if let Some(followed) = &tackle.followed {
            lines.push(Line::from(vec![label("Followed"), Span::raw(followed.as_str())]));
        }
    }
    if !note.zones.is_empty() {
        lines.push(Line::from(vec![label("Zone"), Span::raw(note.zones.join(", "))]));
    }
    if !note.highlights.is_empty() {
        lines.push(Line::from(vec![
            label("Highlight"),
            Span::raw(note.highlights.join(", ")),
        ]));
    }
    lines.push(Line::from(Span::styled(
        format!("Created {}", note.created_at.format("%Y-%m-%d %H:%M")),
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn render_detail(frame: &mut Frame, model: &Model, area: Rect) {
    let lines = match &model.detail {
        Some(note) => detail_lines(note),
        None if model.notes.is_empty() => vec![Line::from(Span::styled(
            "  No notes yet. Press n to add one.",
            Style::default().fg(Color::Yellow),
        ))],
        None => vec![Line::from("  No note selected")],
    };
    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Detail"));
    frame.render_widget(detail, area);
}

fn render_tackles(frame: &mut Frame, model: &Model, area: Rect) {
    let total = model.tackles.len();
    let mut lines: Vec<Line<'_>> = Outcome::ALL
        .iter()
        .map(|outcome| {
            let count = model
                .tackles
                .iter()
                .filter(|t| t.tackle.outcome == *outcome)
                .count();
            Line::from(vec![
                Span::styled(format!("{:<10}", outcome.as_str()), Style::default().fg(Color::Cyan)),
                Span::raw(count.to_string()),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    for row in &model.tackles {
        let star = if row.starred { "*" } else { " " };
        lines.push(Line::from(format!(
            "{star}{} {} #{} {}",
            time::format(row.start),
            row.tackle.player,
            row.tackle.attempt,
            row.tackle.outcome
        )));
    }

    let tackles = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Tackles ({total})")),
    );
    frame.render_widget(tackles, area);
}

fn status_lines(model: &Model) -> Vec<Line<'_>> {
    let mut lines = match &model.status {
        Some(status) => {
            let name = Path::new(&status.path)
                .file_name()
                .map_or_else(|| status.path.clone(), |n| n.to_string_lossy().into_owned());
            vec![
                Line::from(Span::styled(name, Style::default().add_modifier(Modifier::BOLD))),
                Line::from(format!(
                    "{} / {}",
                    time::format(status.time_pos),
                    time::format(status.duration)
                )),
                Line::from(if status.paused { "Paused" } else { "Playing" }),
            ]
        }
        None => vec![Line::from(Span::styled(
            "Waiting for player",
            Style::default().fg(Color::Yellow),
        ))],
    };
    if let Some(start) = model.clip_start {
        lines.push(Line::from(Span::styled(
            format!("Clip from {}", time::format(start)),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

fn render_status(frame: &mut Frame, model: &Model, area: Rect) {
    let mut lines = status_lines(model);
    lines.push(Line::from(""));
    lines.extend(HELP.iter().map(|(key, action)| {
        Line::from(vec![
            Span::styled(format!("{key:<7}"), Style::default().fg(Color::Cyan)),
            Span::styled(*action, Style::default().fg(Color::DarkGray)),
        ])
    }));

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Player"));
    frame.render_widget(status, area);
}

fn render_mini(frame: &mut Frame, model: &Model, area: Rect) {
    let mut lines = status_lines(model);
    if let Some(note) = model.selected_note() {
        lines.push(Line::from(format!(
            "{} {}",
            time::format(note.start),
            note.text.as_deref().unwrap_or_default()
        )));
    }
    let mini = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("filmroom"));
    frame.render_widget(mini, area);
}

fn render_status_line(frame: &mut Frame, model: &Model, area: Rect) {
    let text = match (&model.message, model.columns.count) {
        (Some(message), _) => message.clone(),
        // Without the status column the time goes on this line.
        (None, count) if count < 4 => model.status.as_ref().map_or_else(String::new, |s| {
            format!("{} / {}", time::format(s.time_pos), time::format(s.duration))
        }),
        (None, _) => String::new(),
    };
    let line = Paragraph::new(format!(" {text}")).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(line, area);
}

/// A `width` x `height` rectangle centred in `area`, clipped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_form(frame: &mut Frame, form: &Form) {
    let lines: Vec<Line<'_>> = form
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = i == form.focus;
            let value_style = if focused {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let cursor = if focused { "_" } else { "" };
            Line::from(vec![
                Span::styled(format!("{:<12}", field.label), Style::default().fg(Color::Cyan)),
                Span::styled(format!("{}{cursor}", field.value), value_style),
            ])
        })
        .collect();

    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(3);
    let area = centered(frame.area(), 60, height);
    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(form.title())
            .title_bottom(" Tab next  Enter save  Esc cancel "),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn render_confirm(frame: &mut Frame, question: &str) {
    let area = centered(frame.area(), 40, 3);
    let popup = Paragraph::new(question)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::{update, Listing, Msg};
    use chrono::Utc;
    use filmroom_core::model::{NoteId, NoteSummary};
    use ratatui::backend::TestBackend;

    fn draw(model: &Model, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, model)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(usize::from(width))
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn model_with_note(width: u16) -> Model {
        let listing = Listing {
            notes: vec![NoteSummary {
                id: NoteId::new(1),
                category: None,
                start: 75.0,
                end: 80.0,
                text: Some("lineout steal".to_string()),
                is_tackle: false,
                created_at: Utc::now(),
            }],
            tackles: Vec::new(),
        };
        update(Model::new(width), Msg::Loaded(Ok(listing))).0
    }

    #[test]
    fn test_four_columns_show_help() {
        let screen = draw(&model_with_note(160), 160, 30);
        assert!(screen.contains("Notes (1)"));
        assert!(screen.contains("lineout steal"));
        assert!(screen.contains("Tackles (0)"));
        assert!(screen.contains("clip start/end"));
    }

    #[test]
    fn test_mini_mode() {
        let screen = draw(&model_with_note(60), 60, 10);
        assert!(screen.contains("Waiting for player"));
        assert!(!screen.contains("Tackles"));
    }

    #[test]
    fn test_form_popup() {
        let model = model_with_note(100);
        let (model, _) = update(
            model,
            Msg::Key(crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Char('t'),
                crossterm::event::KeyModifiers::NONE,
            )),
        );
        let screen = draw(&model, 100, 30);
        assert!(screen.contains("New tackle"));
        assert!(screen.contains("Outcome"));
    }

    #[test]
    fn test_centered_clips_to_area() {
        let area = Rect::new(0, 0, 20, 5);
        assert_eq!(centered(area, 60, 10), area);
        assert_eq!(centered(area, 10, 1), Rect::new(5, 2, 10, 1));
    }
}
