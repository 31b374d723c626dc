use crate::config::Config;
use crate::editor::OptimizeOutcome;
use crate::export::{export_url, ExportTarget};
use crate::llm::PromptService;
use crate::tui::theme::Theme;
use crate::tui::widgets::{prompt_lines, PromptCursor, TextInput};
use crate::wizard::{Step, Wizard};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;

/// Run the refinement wizard. Returns the final prompt when the user quits
/// from the result step.
pub async fn run_wizard(
    config: &Config,
    service: &dyn PromptService,
    idea: Option<String>,
) -> Result<Option<String>> {
    let mut app = App::new(
        Theme::from_name(&config.ui.theme),
        config.ui.show_suggestions,
        idea.unwrap_or_default(),
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, service).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    service: &dyn PromptService,
) -> Result<Option<String>> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match app.handle_key(key) {
                Action::None => {}
                Action::Quit => return Ok(app.final_prompt()),
                Action::Call(call) => {
                    // Show the busy popup before blocking on the model
                    app.busy = Some(call.label());
                    terminal.draw(|f| draw(f, app))?;
                    app.run_call(call, service).await;
                    app.busy = None;
                }
            }
        }
    }
}

/// What the keyboard is driving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Answer,
    Replace,
    Guidance,
}

/// Model-backed work, run after the screen shows it is busy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    SubmitIdea,
    RegenerateQuestion(usize),
    AddQuestion,
    SubmitAnswers,
    RegeneratePrompt,
    Optimize,
    GoTo(Step),
}

impl Call {
    fn label(self) -> &'static str {
        match self {
            Call::SubmitIdea => "Generating questions...",
            Call::RegenerateQuestion(_) => "Regenerating question...",
            Call::AddQuestion => "Adding a question...",
            Call::SubmitAnswers => "Writing your prompt...",
            Call::RegeneratePrompt => "Regenerating prompt...",
            Call::Optimize => "Optimizing prompt...",
            Call::GoTo(_) => "Working...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Call(Call),
}

struct App {
    wizard: Wizard,
    theme: Theme,
    show_suggestions: bool,
    mode: Mode,
    idea: TextInput,
    /// Shared by the answer, replacement and guidance dialogs
    input: TextInput,
    guidance: String,
    cursor: PromptCursor,
    question: usize,
    status: Option<String>,
    error: Option<String>,
    busy: Option<&'static str>,
}

impl App {
    fn new(theme: Theme, show_suggestions: bool, idea: String) -> Self {
        Self {
            wizard: Wizard::new(),
            theme,
            show_suggestions,
            mode: Mode::Normal,
            idea: TextInput::new(idea),
            input: TextInput::default(),
            guidance: String::new(),
            cursor: PromptCursor::default(),
            question: 0,
            status: None,
            error: None,
            busy: None,
        }
    }

    fn final_prompt(&self) -> Option<String> {
        (self.wizard.step() == Step::Result).then(|| self.wizard.refined_prompt().to_string())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        self.error = None;
        self.status = None;

        if self.mode != Mode::Normal {
            self.handle_dialog_key(key);
            return Action::None;
        }

        match self.wizard.step() {
            Step::Idea => self.handle_idea_key(key),
            Step::Questions => self.handle_questions_key(key),
            Step::Prompt => self.handle_prompt_key(key),
            Step::Result => self.handle_result_key(key),
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                if self.mode == Mode::Replace {
                    self.wizard.editor_mut().clear_selection();
                }
                self.input.take();
                self.mode = Mode::Normal;
            }
            KeyCode::Enter => self.commit_dialog(),
            code => edit_input(&mut self.input, code),
        }
    }

    fn commit_dialog(&mut self) {
        match self.mode {
            Mode::Answer => {
                let answer = self.input.take();
                let question = self.question;
                let other = self
                    .wizard
                    .questions()
                    .get(question)
                    .map(|q| q.choices.len().saturating_sub(1));
                let result = self.wizard.set_answer(question, answer.trim()).and_then(|_| {
                    match other {
                        Some(other) if !answer.trim().is_empty() => {
                            self.wizard.select_choice(question, other)
                        }
                        _ => Ok(()),
                    }
                });
                if let Err(e) = result {
                    self.error = Some(e.to_string());
                }
                self.mode = Mode::Normal;
            }
            Mode::Replace => {
                let replacement = self.input.value().to_string();
                if self.wizard.editor_mut().propose_suggestion(&replacement) {
                    self.input.take();
                    self.cursor.anchor = None;
                    self.mode = Mode::Normal;
                    self.status = Some("Suggestion added".to_string());
                } else {
                    self.error = Some("Enter replacement text or press Esc".to_string());
                }
            }
            Mode::Guidance => {
                self.guidance = self.input.take().trim().to_string();
                self.mode = Mode::Normal;
            }
            Mode::Normal => {}
        }
    }

    fn handle_idea_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Enter => {
                self.wizard.set_idea(self.idea.value().trim());
                Action::Call(Call::SubmitIdea)
            }
            code => {
                edit_input(&mut self.idea, code);
                Action::None
            }
        }
    }

    fn handle_questions_key(&mut self, key: KeyEvent) -> Action {
        let count = self.wizard.questions().len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Up | KeyCode::Char('k') => self.question = self.question.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.question + 1 < count {
                    self.question += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.cycle_choice(false),
            KeyCode::Right | KeyCode::Char('l') => self.cycle_choice(true),
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(question) = self.wizard.questions().get(self.question) {
                    self.input = TextInput::new(question.answer.clone());
                    self.mode = Mode::Answer;
                }
            }
            KeyCode::Char('r') if count > 0 => {
                return Action::Call(Call::RegenerateQuestion(self.question))
            }
            KeyCode::Char('a') => return Action::Call(Call::AddQuestion),
            KeyCode::Char('d') if count > 0 => {
                if let Err(e) = self.wizard.remove_question(self.question) {
                    self.error = Some(e.to_string());
                }
                self.question = self.question.min(self.wizard.questions().len().saturating_sub(1));
            }
            KeyCode::Char('n') => return Action::Call(Call::SubmitAnswers),
            KeyCode::Char('b') => self.wizard.go_back(),
            KeyCode::Char(c) => return self.jump(c),
            _ => {}
        }
        Action::None
    }

    fn cycle_choice(&mut self, forward: bool) {
        let Some(question) = self.wizard.questions().get(self.question) else {
            return;
        };
        let len = question.choices.len();
        if len == 0 {
            return;
        }

        let next = match (question.selected, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(current), true) => (current + 1) % len,
            (Some(current), false) => (current + len - 1) % len,
        };
        if let Err(e) = self.wizard.select_choice(self.question, next) {
            self.error = Some(e.to_string());
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Action {
        let len = self.wizard.editor().len();
        match key.code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Esc => self.cursor.anchor = None,
            KeyCode::Left | KeyCode::Char('h') => self.cursor.move_left(),
            KeyCode::Right | KeyCode::Char('l') => self.cursor.move_right(len),
            KeyCode::Up | KeyCode::Char('k') => self.cursor.move_up(self.wizard.editor().text()),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor.move_down(self.wizard.editor().text())
            }
            KeyCode::Char('v') => self.cursor.toggle_mark(),
            KeyCode::Enter => {
                let selected = self
                    .cursor
                    .selection(len)
                    .is_some_and(|(start, end)| self.wizard.editor_mut().select_range(start, end));
                if selected {
                    self.input = TextInput::default();
                    self.mode = Mode::Replace;
                } else {
                    self.status = Some("Press v to start a selection".to_string());
                }
            }
            KeyCode::Char('g') => {
                self.input = TextInput::new(self.guidance.clone());
                self.mode = Mode::Guidance;
            }
            KeyCode::Char('o') => return Action::Call(Call::Optimize),
            KeyCode::Char('r') => return Action::Call(Call::RegeneratePrompt),
            KeyCode::Char('n') => {
                if let Err(e) = self.wizard.finish() {
                    self.error = Some(e.to_string());
                }
            }
            KeyCode::Char('b') => self.wizard.go_back(),
            KeyCode::Char(c) => return self.jump(c),
            _ => {}
        }
        Action::None
    }

    fn handle_result_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => return Action::Quit,
            KeyCode::Char('b') => self.wizard.go_back(),
            KeyCode::Char('s') => self.restart(),
            KeyCode::Char(c) => return self.jump(c),
            _ => {}
        }
        Action::None
    }

    /// Digits jump straight to a step
    fn jump(&mut self, c: char) -> Action {
        let Some(step) = c
            .to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .and_then(Step::from_number)
        else {
            return Action::None;
        };
        if step == self.wizard.step() {
            return Action::None;
        }
        Action::Call(Call::GoTo(step))
    }

    fn restart(&mut self) {
        self.wizard.restart();
        self.idea = TextInput::default();
        self.input = TextInput::default();
        self.guidance.clear();
        self.cursor.reset();
        self.question = 0;
        self.mode = Mode::Normal;
    }

    async fn run_call(&mut self, call: Call, service: &dyn PromptService) {
        let result = match call {
            Call::SubmitIdea => self.wizard.submit_idea(service).await.map(|_| {
                self.question = 0;
            }),
            Call::RegenerateQuestion(index) => {
                self.wizard.regenerate_question(service, index).await
            }
            Call::AddQuestion => self.wizard.add_question(service).await.map(|_| {
                self.question = self.wizard.questions().len().saturating_sub(1);
            }),
            Call::SubmitAnswers => self.wizard.submit_answers(service).await.map(|_| {
                self.cursor.reset();
            }),
            Call::RegeneratePrompt => self.wizard.regenerate_prompt(service).await.map(|_| {
                self.cursor.reset();
            }),
            Call::Optimize => {
                let guidance = self.guidance.clone();
                self.wizard
                    .optimize(service, &guidance)
                    .await
                    .map(|outcome| match outcome {
                        OptimizeOutcome::Rewritten => {
                            self.cursor.reset();
                            self.status = Some("Prompt optimized".to_string());
                        }
                        OptimizeOutcome::Unchanged => {
                            self.status =
                                Some("Add a suggestion or guidance before optimizing".to_string());
                        }
                    })
            }
            Call::GoTo(step) => self.wizard.go_to(service, step).await,
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, ?call, "Wizard action failed");
            self.error = Some(e.to_string());
        }
    }
}

fn edit_input(input: &mut TextInput, code: KeyCode) {
    match code {
        KeyCode::Backspace => input.delete_char(),
        KeyCode::Delete => input.delete_forward(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Char(c) => input.insert_char(c),
        _ => {}
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Steps
            Constraint::Min(8),    // Step body
            Constraint::Length(1), // Status
            Constraint::Length(2), // Help
        ])
        .split(f.area());

    draw_steps(f, app, chunks[0]);

    match app.wizard.step() {
        Step::Idea => draw_idea(f, app, chunks[1]),
        Step::Questions => draw_questions(f, app, chunks[1]),
        Step::Prompt => draw_prompt(f, app, chunks[1]),
        Step::Result => draw_result(f, app, chunks[1]),
    }

    let theme = &app.theme;
    let status = match (&app.error, &app.status) {
        (Some(error), _) => Line::from(Span::styled(error.clone(), theme.error)),
        (None, Some(status)) => Line::from(Span::styled(status.clone(), theme.selected)),
        (None, None) => Line::default(),
    };
    f.render_widget(Paragraph::new(status), chunks[2]);

    let help = Paragraph::new(help_text(app))
        .style(theme.help)
        .wrap(Wrap { trim: true });
    f.render_widget(help, chunks[3]);

    match app.mode {
        Mode::Normal => {}
        Mode::Answer => draw_answer_dialog(f, app),
        Mode::Replace => draw_replace_dialog(f, app),
        Mode::Guidance => draw_input_dialog(
            f,
            app,
            "Guidance",
            vec![Line::from("How should the prompt change?")],
        ),
    }

    if let Some(label) = app.busy {
        let area = centered_rect(40, 15, f.area());
        f.render_widget(Clear, area);
        let popup = Paragraph::new(Line::from(Span::styled(label, theme.selected)))
            .block(Block::default().title("Working").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        f.render_widget(popup, area);
    }
}

fn help_text(app: &App) -> &'static str {
    match (app.mode, app.wizard.step()) {
        (Mode::Answer, _) | (Mode::Guidance, _) => "Enter: save | Esc: cancel",
        (Mode::Replace, _) => "Enter: add suggestion | Esc: cancel",
        (Mode::Normal, Step::Idea) => "Type your idea | Enter: continue | Esc: quit",
        (Mode::Normal, Step::Questions) => {
            "↑/↓: question | ←/→: choice | Enter: type answer | r: regenerate | a: add | d: remove | n: next | b: back | q: quit"
        }
        (Mode::Normal, Step::Prompt) => {
            "arrows: move | v: mark | Enter: suggest replacement | g: guidance | o: optimize | r: regenerate | n: next | b: back | q: quit"
        }
        (Mode::Normal, Step::Result) => "s: start over | b: back | Enter/q: quit and print the prompt",
    }
}

fn draw_steps(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let mut spans = Vec::new();
    for (i, step) in Step::ALL.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" › ", theme.help));
        }
        let style = if step == app.wizard.step() {
            theme.step_active
        } else if app.wizard.is_completed(step) {
            theme.step_done
        } else if app.wizard.can_access(step) {
            theme.normal
        } else {
            theme.step_locked
        };
        spans.push(Span::styled(format!(" {} ", step), style));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(Span::styled("Prompt refiner", theme.header))
            .borders(Borders::BOTTOM),
    );
    f.render_widget(header, area);
}

fn draw_idea(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let content = vec![
        Line::from(Span::styled(
            "What would you like the AI to help you with?",
            theme.header,
        )),
        Line::default(),
        app.idea.line(theme, true),
    ];
    let paragraph = Paragraph::new(content)
        .block(Block::default().title("Your idea").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_questions(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let items: Vec<ListItem> = app
        .wizard
        .questions()
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let title_style = if i == app.question {
                theme.selected
            } else {
                theme.normal
            };
            let mut lines = vec![Line::from(Span::styled(
                format!("{}. {}", i + 1, question.question),
                title_style,
            ))];

            let mut choices = vec![Span::raw("   ")];
            for (c, choice) in question.choices.iter().enumerate() {
                let (marker, style) = if question.selected == Some(c) {
                    ("(•)", theme.selected)
                } else {
                    ("( )", theme.normal)
                };
                choices.push(Span::styled(format!("{} {}  ", marker, choice), style));
            }
            lines.push(Line::from(choices));

            let typed = question
                .selected
                .map_or(!question.answer.is_empty(), |c| question.is_other(c));
            if typed {
                lines.push(Line::from(Span::styled(
                    format!("   Answer: {}", question.answer),
                    theme.normal,
                )));
            }
            lines.push(Line::default());

            ListItem::new(lines)
        })
        .collect();

    let title = format!(
        "Clarifying questions ({} unanswered)",
        app.wizard.unanswered_count()
    );
    let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));

    let mut state = ListState::default();
    state.select(Some(app.question));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_prompt(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let editor = app.wizard.editor();

    let suggestion_rows = if app.show_suggestions {
        editor.suggestions().len() as u16 + 1
    } else {
        0
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length((suggestion_rows + 3).min(area.height / 2)),
        ])
        .split(area);

    let cursor = (app.mode == Mode::Normal).then_some(app.cursor.position);
    let lines = prompt_lines(
        editor.render_projection(),
        theme,
        app.cursor.selection(editor.len()),
        cursor,
    );
    let row = editor
        .text()
        .chars()
        .take(app.cursor.position)
        .filter(|c| *c == '\n')
        .count() as u16;
    let scroll = row.saturating_sub(chunks[0].height.saturating_sub(3));

    let prompt = Paragraph::new(lines)
        .block(Block::default().title("Your prompt").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(prompt, chunks[0]);

    let mut notes = Vec::new();
    if app.show_suggestions {
        for (i, suggestion) in editor.suggestions().iter().enumerate() {
            notes.push(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), theme.help),
                Span::styled(format!("\"{}\"", suggestion.original_text), theme.highlight),
                Span::raw(" → "),
                Span::styled(format!("\"{}\"", suggestion.replacement_text), theme.selected),
            ]));
        }
    }
    notes.push(Line::from(vec![
        Span::styled("Guidance: ", theme.header),
        Span::raw(if app.guidance.is_empty() {
            "(none)".to_string()
        } else {
            app.guidance.clone()
        }),
    ]));

    let panel = Paragraph::new(notes)
        .block(Block::default().title("Suggestions").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, chunks[1]);
}

fn draw_result(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let prompt = app.wizard.refined_prompt();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(ExportTarget::ALL.len() as u16 + 2),
        ])
        .split(area);

    let paragraph = Paragraph::new(prompt.to_string())
        .style(theme.normal)
        .block(
            Block::default()
                .title("Your refined prompt")
                .borders(Borders::ALL),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, chunks[0]);

    let targets: Vec<Line> = ExportTarget::ALL
        .into_iter()
        .map(|target| {
            Line::from(vec![
                Span::styled(format!("{:<10}", target.name()), theme.header),
                Span::styled(export_url(target, prompt), theme.help),
            ])
        })
        .collect();
    let export = Paragraph::new(targets)
        .block(Block::default().title("Open in").borders(Borders::ALL));
    f.render_widget(export, chunks[1]);
}

fn draw_answer_dialog(f: &mut Frame, app: &App) {
    let question = app
        .wizard
        .questions()
        .get(app.question)
        .map(|q| q.question.clone())
        .unwrap_or_default();
    draw_input_dialog(f, app, "Your answer", vec![Line::from(question)]);
}

fn draw_replace_dialog(f: &mut Frame, app: &App) {
    let theme = &app.theme;
    let editor = app.wizard.editor();
    let mut lines = Vec::new();

    if let Some(selection) = editor.selection() {
        lines.push(Line::from(vec![
            Span::raw("Replace "),
            Span::styled(format!("\"{}\"", selection.text), theme.selection),
            Span::raw(" with:"),
        ]));
        if editor.overlaps_existing(selection.start, selection.end) {
            lines.push(Line::from(Span::styled(
                "This overlaps an existing suggestion",
                theme.error,
            )));
        }
    }

    draw_input_dialog(f, app, "Suggest a replacement", lines);
}

fn draw_input_dialog(f: &mut Frame, app: &App, title: &str, mut lines: Vec<Line<'static>>) {
    let area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, area);

    lines.push(Line::default());
    lines.push(app.input.line(&app.theme, true));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

/// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
