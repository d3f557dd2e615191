use crate::cli::theme::Theme;
use crate::config::ThemeToken;
use crate::tools::ToolKind;
use ratatui::text::{Line, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputKind {
    AgentText,
    ToolOutput,
    SystemInfo,
    SystemError,
    MemoryText,
}

#[derive(Debug, Clone)]
pub(crate) enum TimelineEntry {
    UserInputCommand(String),
    OutputLine { kind: OutputKind, text: String },
    ChatTurn(ChatTurn),
}

#[derive(Debug, Clone)]
pub(crate) struct ChatTurn {
    pub(crate) prompt: String,
    pub(crate) state: ChatTurnState,
}

#[derive(Debug, Clone)]
pub(crate) enum ChatTurnState {
    InFlight,
    CompletedText(String),
    CompletedTool { tool: ToolKind, output: String },
    CompletedError(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Timeline {
    entries: Vec<TimelineEntry>,
}

pub(crate) const WELCOME_TEXT: &str =
    "Welcome to toolchat. I remember our chat and can use tools (Calculator & Wikipedia) to help you! Type /help for commands.";

impl Timeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_output(&mut self, kind: OutputKind, text: &str) {
        for line in split_output_lines(text) {
            self.entries.push(TimelineEntry::OutputLine {
                kind,
                text: line.to_string(),
            });
        }
    }

    pub(crate) fn push_user_input_command(&mut self, text: &str) {
        for line in split_output_lines(text) {
            self.entries
                .push(TimelineEntry::UserInputCommand(line.to_string()));
        }
    }

    pub(crate) fn push_chat_turn(&mut self, prompt: String) -> usize {
        let index = self.entries.len();
        self.entries.push(TimelineEntry::ChatTurn(ChatTurn {
            prompt,
            state: ChatTurnState::InFlight,
        }));
        index
    }

    pub(crate) fn chat_turn_mut(&mut self, index: usize) -> Option<&mut ChatTurn> {
        match self.entries.get_mut(index) {
            Some(TimelineEntry::ChatTurn(turn)) => Some(turn),
            _ => None,
        }
    }

    pub(crate) fn render_lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        if self.entries.is_empty() {
            return vec![Line::from(Span::styled(
                WELCOME_TEXT,
                theme.style(ThemeToken::SystemInfo),
            ))];
        }

        let mut lines = Vec::new();
        for entry in &self.entries {
            render_entry(entry, theme, &mut lines);
        }

        lines
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

fn render_entry(entry: &TimelineEntry, theme: &Theme, lines: &mut Vec<Line<'static>>) {
    match entry {
        TimelineEntry::UserInputCommand(text) => {
            lines.push(Line::from(vec![
                Span::styled("you> ", theme.style(ThemeToken::UserPrompt)),
                Span::styled(text.to_string(), theme.style(ThemeToken::UserInput)),
            ]));
        }
        TimelineEntry::OutputLine { kind, text } => {
            lines.push(Line::from(Span::styled(
                text.to_string(),
                theme.style(output_token_for(*kind)),
            )));
        }
        TimelineEntry::ChatTurn(turn) => render_chat_turn(turn, theme, lines),
    }
}

fn render_chat_turn(turn: &ChatTurn, theme: &Theme, lines: &mut Vec<Line<'static>>) {
    lines.push(Line::from(vec![
        Span::styled("you> ", theme.style(ThemeToken::UserPrompt)),
        Span::styled(turn.prompt.clone(), theme.style(ThemeToken::UserInput)),
    ]));

    match &turn.state {
        ChatTurnState::InFlight => {
            lines.push(Line::from(Span::styled(
                "  Thinking...",
                theme.style(ThemeToken::AgentWaiting),
            )));
        }
        ChatTurnState::CompletedText(text) => {
            for line in split_output_lines(text) {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    theme.style(ThemeToken::AgentText),
                )));
            }
        }
        ChatTurnState::CompletedTool { tool, output } => {
            let mut output_lines = split_output_lines(output).into_iter();
            let first = output_lines.next().unwrap_or("");
            lines.push(Line::from(vec![
                Span::styled(format!("[{tool}] "), theme.style(ThemeToken::ToolHeader)),
                Span::styled(first.to_string(), theme.style(ThemeToken::ToolOutput)),
            ]));
            for line in output_lines {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    theme.style(ThemeToken::ToolOutput),
                )));
            }
        }
        ChatTurnState::CompletedError(message) => {
            for line in split_output_lines(message) {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    theme.style(ThemeToken::SystemError),
                )));
            }
        }
    }
}

fn split_output_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    text.lines().collect()
}

fn output_token_for(kind: OutputKind) -> ThemeToken {
    match kind {
        OutputKind::AgentText => ThemeToken::AgentText,
        OutputKind::ToolOutput => ThemeToken::ToolOutput,
        OutputKind::SystemInfo => ThemeToken::SystemInfo,
        OutputKind::SystemError => ThemeToken::SystemError,
        OutputKind::MemoryText => ThemeToken::MemoryText,
    }
}
