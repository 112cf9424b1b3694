use ratatui::style::{Color, Modifier, Style};
use wacli_sync::ConnectionState;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const TIME_STYLE: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const SENDER_STYLE: Style = Style::new()
    .fg(Color::Rgb(250, 189, 47))
    .add_modifier(Modifier::BOLD);
pub const REPLY_STYLE: Style = Style::new()
    .fg(Color::Rgb(211, 134, 155))
    .add_modifier(Modifier::BOLD);
pub const GROUP_STYLE: Style = Style::new().fg(Color::Rgb(131, 165, 152));
pub const MUTED_STYLE: Style = Style::new().fg(Color::Rgb(102, 92, 84));
pub const CALL_STYLE: Style = Style::new()
    .fg(Color::Rgb(254, 128, 25))
    .add_modifier(Modifier::BOLD);
pub const HINT_STYLE: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const INFO_STYLE: Style = Style::new().fg(Color::Rgb(142, 192, 124));
pub const ERROR_STYLE: Style = Style::new()
    .fg(Color::Rgb(251, 73, 52))
    .add_modifier(Modifier::BOLD);
pub const PLACEHOLDER_STYLE: Style = Style::new()
    .fg(Color::Rgb(102, 92, 84))
    .add_modifier(Modifier::ITALIC);

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub fn connection_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Connected => Color::Rgb(142, 192, 124),
        ConnectionState::Connecting => Color::Rgb(250, 189, 47),
        ConnectionState::Failed => Color::Rgb(251, 73, 52),
        ConnectionState::Disconnected => Color::Rgb(146, 131, 116),
    }
}

pub mod icons {
    pub const CURSOR: &str = ">";
    pub const GROUP: &str = "👥";
    pub const CALL: &str = "📞";
}
