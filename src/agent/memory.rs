//! Conversation memory: an explicit, bounded, caller-owned ordered log of
//! prior turns. Nothing here is ambient; the REPL owns the buffer and hands
//! it to the turn logic.

use crate::tools::ToolKind;
use std::collections::VecDeque;

pub const DEFAULT_MEMORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEntry {
    User(String),
    Agent(String),
    Tool { tool: ToolKind, output: String },
}

impl MemoryEntry {
    /// One-line rendering used both for prompt context and the memory panel.
    pub fn render(&self) -> String {
        match self {
            Self::User(text) => format!("User: {text}"),
            Self::Agent(text) => format!("Agent: {text}"),
            Self::Tool { tool, output } => format!("Tool ({tool}): {output}"),
        }
    }
}

/// Fixed-capacity ring buffer of conversation turns. Pushing past capacity
/// evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    entries: VecDeque<MemoryEntry>,
    capacity: usize,
}

impl ConversationMemory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "memory capacity must be at least 1");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: MemoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Last `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &MemoryEntry> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }

    /// Rendered recent history for the prompt's CONTEXT block.
    pub fn context_block(&self, count: usize) -> String {
        self.recent(count)
            .map(MemoryEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}
