use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub normal: Style,
    pub selected: Style,
    pub header: Style,
    pub step_active: Style,
    pub step_done: Style,
    pub step_locked: Style,
    /// Text that already carries a suggestion
    pub highlight: Style,
    /// Text the user is marking for a new suggestion
    pub selection: Style,
    pub cursor: Style,
    pub error: Style,
    pub help: Style,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        if name == "light" {
            Self::light()
        } else {
            Self::dark()
        }
    }

    pub fn dark() -> Self {
        Self {
            normal: Style::default().fg(Color::White),
            selected: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            step_active: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            step_done: Style::default().fg(Color::Green),
            step_locked: Style::default().fg(Color::DarkGray),
            highlight: Style::default().fg(Color::Black).bg(Color::Yellow),
            selection: Style::default().fg(Color::Black).bg(Color::LightBlue),
            cursor: Style::default().add_modifier(Modifier::REVERSED),
            error: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            help: Style::default().fg(Color::DarkGray),
        }
    }

    pub fn light() -> Self {
        Self {
            normal: Style::default().fg(Color::Black),
            selected: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            step_active: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            step_done: Style::default().fg(Color::Green),
            step_locked: Style::default().fg(Color::Gray),
            highlight: Style::default().fg(Color::Black).bg(Color::LightYellow),
            selection: Style::default().fg(Color::Black).bg(Color::LightCyan),
            cursor: Style::default().add_modifier(Modifier::REVERSED),
            error: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            help: Style::default().fg(Color::Gray),
        }
    }
}
