use crate::agent::memory::ConversationMemory;
use crate::agent::turn::{AgentConfig, TurnReply, run_turn};
use crate::cli::commands::{Command, HELP_TEXT, is_command_line, parse_command};
use crate::cli::theme::Theme;
use crate::cli::timeline::{ChatTurnState, OutputKind, Timeline};
use crate::config::{ThemeConfig, ThemeToken};
use crate::llm::gemini::GeminiProvider;
use crate::tools::wiki::WikiClient;
use crate::trace::SessionTrace;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use std::time::Duration;

pub struct AppState {
    pub session_id: String,
    pub llm: Option<GeminiProvider>,
    pub wiki: WikiClient,
    pub memory: ConversationMemory,
    pub agent_config: AgentConfig,
    pub theme_config: ThemeConfig,
    pub color_enabled: bool,
    pub trace: SessionTrace,
}

const INPUT_PROMPT: &str = "you> ";
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

enum KeyAction {
    None,
    Exit,
    Submit(String),
}

struct ReplApp {
    timeline: Timeline,
    theme: Theme,
    input: String,
    scroll: u16,
    follow_bottom: bool,
    show_memory: bool,
    last_timeline_height: u16,
    last_line_count: usize,
}

impl ReplApp {
    fn new(state: &AppState) -> Self {
        Self {
            timeline: Timeline::new(),
            theme: Theme::from_config(state.color_enabled, &state.theme_config),
            input: String::new(),
            scroll: 0,
            follow_bottom: true,
            show_memory: false,
            last_timeline_height: 0,
            last_line_count: 0,
        }
    }

    fn render(&mut self, frame: &mut Frame, memory: &ConversationMemory) {
        let [timeline_area, input_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(3)]).areas(frame.area());

        let timeline_area = if self.show_memory {
            let [left, right] =
                Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)])
                    .areas(timeline_area);
            self.render_memory_panel(frame, right, memory);
            left
        } else {
            timeline_area
        };

        self.render_timeline(frame, timeline_area);
        self.render_input(frame, input_area);
    }

    fn render_timeline(&mut self, frame: &mut Frame, area: Rect) {
        let lines = self.timeline.render_lines(&self.theme);
        self.last_line_count = lines.len();
        self.last_timeline_height = area.height;

        let max_scroll = (lines.len() as u16).saturating_sub(area.height);
        if self.follow_bottom {
            self.scroll = max_scroll;
        } else {
            self.scroll = self.scroll.min(max_scroll);
        }

        let paragraph = Paragraph::new(lines).scroll((self.scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn render_memory_panel(&self, frame: &mut Frame, area: Rect, memory: &ConversationMemory) {
        let mut lines: Vec<Line<'static>> = Vec::new();
        if memory.is_empty() {
            lines.push(Line::from(Span::styled(
                "Memory is empty.",
                self.theme.style(ThemeToken::SystemInfo),
            )));
        } else {
            for entry in memory.iter() {
                lines.push(Line::from(Span::styled(
                    entry.render(),
                    self.theme.style(ThemeToken::MemoryText),
                )));
            }
        }

        let paragraph = Paragraph::new(lines).block(Block::bordered().title("Memory"));
        frame.render_widget(paragraph, area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(INPUT_PROMPT, self.theme.style(ThemeToken::UserPrompt)),
            Span::styled(self.input.clone(), self.theme.style(ThemeToken::UserInput)),
        ]);
        let paragraph = Paragraph::new(line)
            .style(self.theme.style(ThemeToken::InputBlock))
            .block(Block::bordered());
        frame.render_widget(paragraph, area);

        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(INPUT_PROMPT.len() as u16)
            .saturating_add(self.input.chars().count() as u16);
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        if key.kind != KeyEventKind::Press {
            return KeyAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => KeyAction::Exit,
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => KeyAction::Exit,
            KeyCode::Char('b') if ctrl => {
                self.show_memory = !self.show_memory;
                KeyAction::None
            }
            KeyCode::Char('l') if ctrl => {
                self.timeline.clear();
                self.follow_bottom = true;
                KeyAction::None
            }
            KeyCode::Enter => KeyAction::Submit(std::mem::take(&mut self.input)),
            KeyCode::Backspace => {
                self.input.pop();
                KeyAction::None
            }
            KeyCode::Char(ch) if !ctrl => {
                self.input.push(ch);
                KeyAction::None
            }
            KeyCode::Up => {
                self.scroll_by(-1);
                KeyAction::None
            }
            KeyCode::Down => {
                self.scroll_by(1);
                KeyAction::None
            }
            KeyCode::PageUp => {
                self.scroll_by(-(self.last_timeline_height.max(1) as i32));
                KeyAction::None
            }
            KeyCode::PageDown => {
                self.scroll_by(self.last_timeline_height.max(1) as i32);
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    fn scroll_by(&mut self, delta: i32) {
        let max_scroll =
            (self.last_line_count as u16).saturating_sub(self.last_timeline_height.max(1));
        let target = (self.scroll as i32 + delta).clamp(0, max_scroll as i32) as u16;
        self.scroll = target;
        // Scrolling back to the bottom re-enables following new output.
        self.follow_bottom = target == max_scroll;
    }

    fn run_command(&mut self, state: &mut AppState, line: &str) {
        self.timeline.push_user_input_command(line);
        match parse_command(line) {
            Ok(Command::Help) => {
                self.timeline.push_output(OutputKind::SystemInfo, HELP_TEXT);
            }
            Ok(Command::Clear) => {
                self.timeline.clear();
            }
            Ok(Command::Memory(count)) => {
                if state.memory.is_empty() {
                    self.timeline
                        .push_output(OutputKind::SystemInfo, "Memory is empty.");
                } else {
                    let count = count.unwrap_or(state.memory.len());
                    let block = state.memory.context_block(count);
                    self.timeline.push_output(OutputKind::MemoryText, &block);
                }
            }
            Ok(Command::Forget) => {
                state.memory.clear();
                self.timeline
                    .push_output(OutputKind::SystemInfo, "Memory erased.");
            }
            Ok(Command::Trace) => {
                let message = format!("Trace file: {}", state.trace.file_path().display());
                self.timeline.push_output(OutputKind::SystemInfo, &message);
            }
            Err(err) => {
                self.timeline
                    .push_output(OutputKind::SystemError, err.message());
            }
        }
        self.follow_bottom = true;
    }

    fn begin_chat_turn(&mut self, prompt: String) -> usize {
        self.follow_bottom = true;
        self.timeline.push_chat_turn(prompt)
    }

    fn finish_chat_turn(&mut self, index: usize, state: &AppState, reply: TurnReply) {
        let turn_state = match reply {
            TurnReply::Tool { tool, output } => {
                state.trace.log_tool_output(tool.trace_kind(), &output);
                ChatTurnState::CompletedTool { tool, output }
            }
            TurnReply::Chat(text) => {
                state.trace.log_agent_output(&text);
                ChatTurnState::CompletedText(text)
            }
            TurnReply::Degraded(message) => {
                state.trace.log_system(&message);
                ChatTurnState::CompletedError(message)
            }
        };

        if let Some(turn) = self.timeline.chat_turn_mut(index) {
            turn.state = turn_state;
        }
    }
}

pub async fn run_repl(state: &mut AppState) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, state).await;
    ratatui::restore();
    result
}

async fn event_loop(terminal: &mut ratatui::DefaultTerminal, state: &mut AppState) -> Result<()> {
    let mut app = ReplApp::new(state);

    loop {
        terminal.draw(|frame| app.render(frame, &state.memory))?;

        if !event::poll(EVENT_POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        match app.handle_key(key) {
            KeyAction::None => {}
            KeyAction::Exit => break,
            KeyAction::Submit(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                if is_command_line(&line) {
                    app.run_command(state, &line);
                    continue;
                }

                state.trace.log_user_input(&line);
                let index = app.begin_chat_turn(line.clone());
                terminal.draw(|frame| app.render(frame, &state.memory))?;

                let reply = run_turn(
                    state.llm.as_ref(),
                    &state.wiki,
                    &mut state.memory,
                    &state.agent_config,
                    &line,
                )
                .await;
                app.finish_chat_turn(index, state, reply);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AppState, KeyAction, ReplApp};
    use crate::agent::memory::{ConversationMemory, MemoryEntry};
    use crate::agent::turn::{AgentConfig, TurnReply};
    use crate::cli::timeline::ChatTurnState;
    use crate::config::ThemeConfig;
    use crate::http::{HttpClient, HttpDebugConfig};
    use crate::tools::ToolKind;
    use crate::tools::wiki::WikiClient;
    use crate::trace::SessionTrace;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn test_state(dir: &std::path::Path) -> AppState {
        let http = HttpClient::new(reqwest::Client::new(), HttpDebugConfig::from_verbose(false));
        AppState {
            session_id: "test".to_string(),
            llm: None,
            wiki: WikiClient::new(http, "http://127.0.0.1:9".to_string()),
            memory: ConversationMemory::default(),
            agent_config: AgentConfig::default(),
            theme_config: ThemeConfig::default(),
            color_enabled: false,
            trace: SessionTrace::create_in_dir("test", dir).expect("trace"),
        }
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        let area = *buffer.area();
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    fn draw(app: &mut ReplApp, state: &AppState, terminal: &mut Terminal<TestBackend>) {
        terminal
            .draw(|frame| app.render(frame, &state.memory))
            .expect("draw");
    }

    #[test]
    fn initial_render_shows_welcome_and_prompt() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = test_state(tmp.path());
        let mut app = ReplApp::new(&state);
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).expect("terminal");

        draw(&mut app, &state, &mut terminal);

        let rows = buffer_text(&terminal);
        assert!(rows[0].contains("Welcome to toolchat."));
        assert!(rows.iter().any(|row| row.contains("you>")));
    }

    #[test]
    fn typing_and_backspace_edit_the_input_line() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = test_state(tmp.path());
        let mut app = ReplApp::new(&state);

        for ch in "hi!".chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }
        app.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.input, "hi");

        let action = app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        match action {
            KeyAction::Submit(line) => assert_eq!(line, "hi"),
            _ => panic!("enter should submit the input line"),
        }
        assert!(app.input.is_empty());
    }

    #[test]
    fn ctrl_keys_toggle_panels_and_exit() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = test_state(tmp.path());
        let mut app = ReplApp::new(&state);

        app.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL));
        assert!(app.show_memory);
        app.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL));
        assert!(!app.show_memory);

        assert!(matches!(
            app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Exit
        ));
        assert!(matches!(
            app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            KeyAction::Exit
        ));
    }

    #[test]
    fn memory_panel_renders_entries() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut state = test_state(tmp.path());
        state.memory.push(MemoryEntry::User("hello".to_string()));
        let mut app = ReplApp::new(&state);
        app.show_memory = true;
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).expect("terminal");

        draw(&mut app, &state, &mut terminal);

        let rows = buffer_text(&terminal);
        assert!(rows.iter().any(|row| row.contains("Memory")));
        assert!(rows.iter().any(|row| row.contains("User: hello")));
    }

    #[test]
    fn help_command_prints_command_list() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut state = test_state(tmp.path());
        let mut app = ReplApp::new(&state);
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).expect("terminal");

        app.run_command(&mut state, "/help");
        draw(&mut app, &state, &mut terminal);

        let rows = buffer_text(&terminal);
        assert!(rows.iter().any(|row| row.contains("you> /help")));
        assert!(rows.iter().any(|row| row.contains("/memory [n]")));
    }

    #[test]
    fn memory_command_shows_entries_or_empty_notice() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut state = test_state(tmp.path());
        let mut app = ReplApp::new(&state);
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).expect("terminal");

        app.run_command(&mut state, "/memory");
        draw(&mut app, &state, &mut terminal);
        let rows = buffer_text(&terminal);
        assert!(rows.iter().any(|row| row.contains("Memory is empty.")));

        state.memory.push(MemoryEntry::User("first".to_string()));
        state.memory.push(MemoryEntry::Agent("second".to_string()));
        app.run_command(&mut state, "/memory 1");
        draw(&mut app, &state, &mut terminal);
        let rows = buffer_text(&terminal);
        assert!(rows.iter().any(|row| row.contains("Agent: second")));
        assert!(!rows.iter().any(|row| row.contains("User: first")));
    }

    #[test]
    fn forget_command_erases_memory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut state = test_state(tmp.path());
        state.memory.push(MemoryEntry::User("hello".to_string()));
        let mut app = ReplApp::new(&state);

        app.run_command(&mut state, "/forget");

        assert!(state.memory.is_empty());
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).expect("terminal");
        draw(&mut app, &state, &mut terminal);
        let rows = buffer_text(&terminal);
        assert!(rows.iter().any(|row| row.contains("Memory erased.")));
    }

    #[test]
    fn unknown_command_reports_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut state = test_state(tmp.path());
        let mut app = ReplApp::new(&state);
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).expect("terminal");

        app.run_command(&mut state, "/bogus");
        draw(&mut app, &state, &mut terminal);

        let rows = buffer_text(&terminal);
        assert!(
            rows.iter()
                .any(|row| row.contains("unknown command '/bogus'. Try /help"))
        );
    }

    #[test]
    fn finished_tool_turn_renders_labeled_output() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = test_state(tmp.path());
        let mut app = ReplApp::new(&state);
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).expect("terminal");

        let index = app.begin_chat_turn("calculate 5 * 10".to_string());
        app.finish_chat_turn(
            index,
            &state,
            TurnReply::Tool {
                tool: ToolKind::Calculator,
                output: "Calculated Result: 50".to_string(),
            },
        );
        draw(&mut app, &state, &mut terminal);

        let rows = buffer_text(&terminal);
        assert!(rows.iter().any(|row| row.contains("you> calculate 5 * 10")));
        assert!(
            rows.iter()
                .any(|row| row.contains("[Calculator] Calculated Result: 50"))
        );
        assert!(matches!(
            app.timeline.chat_turn_mut(index).map(|turn| &turn.state),
            Some(ChatTurnState::CompletedTool { .. })
        ));
    }

    #[test]
    fn scrolling_up_stops_following_and_bottom_resumes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut state = test_state(tmp.path());
        let mut app = ReplApp::new(&state);
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).expect("terminal");

        for i in 0..20 {
            app.run_command(&mut state, &format!("/unknown{i}"));
        }
        draw(&mut app, &state, &mut terminal);
        assert!(app.follow_bottom);
        let bottom_scroll = app.scroll;
        assert!(bottom_scroll > 0);

        app.handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert!(!app.follow_bottom);
        assert_eq!(app.scroll, bottom_scroll - 1);

        app.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        assert!(app.follow_bottom);
        assert_eq!(app.scroll, bottom_scroll);

        app.handle_key(KeyEvent::new(KeyCode::PageUp, KeyModifiers::NONE));
        assert!(!app.follow_bottom);
        app.handle_key(KeyEvent::new(KeyCode::PageDown, KeyModifiers::NONE));
        assert!(app.follow_bottom);
    }
}
