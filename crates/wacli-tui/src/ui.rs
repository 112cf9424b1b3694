use crate::state::{App, ComposeState, Severity};
use crate::theme::{self, icons};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use wacli_core::Entry;
use wacli_sync::ConnectionState;

const TITLE: &str = "WhatsApp Messages";

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_entries(f, app, chunks[1]);
    render_footer(f, app, chunks[2]);

    if let Some(compose) = &app.compose {
        render_compose(f, compose, area);
    }
    if app.help_open {
        render_help(f, centered_rect(60, 60, area));
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let state = app.engine.state();
    let status = connection_label(state, app.engine.lost_reason());
    let line = Line::from(vec![
        Span::styled(TITLE, theme::HEADER_STYLE),
        Span::raw("  "),
        Span::styled(
            status,
            Style::new()
                .fg(theme::connection_color(state))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {} entries", app.engine.log().len()),
            theme::HINT_STYLE,
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

pub fn connection_label(state: ConnectionState, lost_reason: Option<&str>) -> String {
    match (state, lost_reason) {
        (ConnectionState::Connected, _) => "connected".to_string(),
        (ConnectionState::Connecting, _) => "connecting...".to_string(),
        (_, Some(reason)) => format!("lost: {reason}"),
        (state, None) => state.as_str().to_string(),
    }
}

fn render_entries(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().borders(Borders::TOP);
    if app.engine.log().is_empty() {
        let p = Paragraph::new(Span::styled("No messages yet", theme::HINT_STYLE)).block(block);
        f.render_widget(p, area);
        return;
    }

    let cursor = app.engine.selection().cursor();
    let items: Vec<ListItem> = app
        .engine
        .log()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            ListItem::new(entry_line(entry, cursor == Some(index)))
                .style(theme::zebra_row_style(index))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(theme::SELECTED_STYLE);
    f.render_stateful_widget(list, area, &mut app.list_state);
}

pub fn entry_line(entry: &Entry, selected: bool) -> Line<'static> {
    entry_line_at(entry, selected, entry.formatted_time())
}

/// One row per entry; `time` is the already formatted clock.
fn entry_line_at(entry: &Entry, selected: bool, time: String) -> Line<'static> {
    let indicator = if selected { icons::CURSOR } else { " " };
    let mut spans = vec![
        Span::raw(format!("{indicator} ")),
        Span::styled(time, theme::TIME_STYLE),
        Span::raw(" "),
    ];
    match entry {
        Entry::Message(message) => {
            let title_style = if message.is_reply_to_me {
                theme::REPLY_STYLE
            } else if message.is_muted {
                theme::MUTED_STYLE
            } else {
                theme::SENDER_STYLE
            };
            spans.push(Span::styled(message.title(), title_style));
            if message.is_group {
                spans.push(Span::styled(
                    format!(" {} {}", icons::GROUP, message.chat_name),
                    theme::GROUP_STYLE,
                ));
            }
            spans.push(Span::raw(format!(": {}", message.text_oneline())));
        }
        Entry::Call(call) => {
            spans.push(Span::styled(
                format!("{} {}", icons::CALL, call.title()),
                theme::CALL_STYLE,
            ));
            spans.push(Span::raw(": Incoming call"));
        }
    }
    Line::from(spans)
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status_note {
        Some(note) => {
            let style = match note.severity {
                Severity::Info => theme::INFO_STYLE,
                Severity::Error => theme::ERROR_STYLE,
            };
            Line::from(Span::styled(note.text.clone(), style))
        }
        None => Line::from(Span::styled(
            "q quit  j/k move  g/G first/last  Enter send  r reply  y copy  ? help",
            theme::HINT_STYLE,
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_compose(f: &mut Frame, compose: &ComposeState, area: Rect) {
    let width = area.width.saturating_mul(6) / 10;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(3) / 2,
        width,
        height: 3.min(area.height),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(compose.mode.as_str())
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup);
    let text = if compose.input.is_empty() {
        Span::styled(compose.placeholder.clone(), theme::PLACEHOLDER_STYLE)
    } else {
        Span::raw(compose.input.clone())
    };
    f.render_widget(Clear, popup);
    f.render_widget(Paragraph::new(text).block(block), popup);

    f.set_cursor(compose_cursor_x(inner, &compose.input), inner.y);
}

/// Column after the typed text, kept inside the input box.
fn compose_cursor_x(inner: Rect, input: &str) -> u16 {
    let typed = u16::try_from(input.chars().count()).unwrap_or(u16::MAX);
    let max_x = inner.x.saturating_add(inner.width.saturating_sub(1));
    inner.x.saturating_add(typed).min(max_x)
}

fn help_row(keys: &'static str, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{keys:<14}"), Style::default().fg(Color::Cyan)),
        Span::raw(what),
    ])
}

fn render_help(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        help_row("j / Down", "Next entry"),
        help_row("k / Up", "Previous entry"),
        help_row("g / G", "First / latest entry"),
        help_row("Ctrl-d/Ctrl-u", "Half page down / up"),
        help_row("Enter", "Message the selected chat"),
        help_row("r", "Reply to the selected message"),
        help_row("y", "Copy message text"),
        help_row("Esc", "Cancel compose"),
        help_row("?", "Toggle help"),
        help_row("q", "Quit"),
    ];
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}
