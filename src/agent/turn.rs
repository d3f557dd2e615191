//! One conversation turn: route to a tool, or fall back to the model.

use crate::agent::memory::{ConversationMemory, MemoryEntry};
use crate::agent::prompt::build_chat_prompt;
use crate::agent::router::{calculator_candidate, wikipedia_query};
use crate::llm::{AssistantInput, LlmProvider};
use crate::tools::calc::CalcError;
use crate::tools::wiki::WikiClient;
use crate::tools::{calc, ToolKind};
use std::time::Duration;

pub const MISSING_KEY_MESSAGE: &str = "Assistant unavailable: missing GEMINI_API_KEY. \
     Configure it in your shell or .env file (example: GEMINI_API_KEY=your_key).";
pub const TIMEOUT_MESSAGE: &str = "Assistant request timed out.";

pub const DEFAULT_CONTEXT_TURNS: usize = 10;
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Number of recent memory entries included in the chat prompt.
    pub context_turns: usize,
    /// Upper bound on a single model call.
    pub llm_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            context_turns: DEFAULT_CONTEXT_TURNS,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }
}

/// Outcome of a turn, already folded to user-presentable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    /// A tool ran; its output is the reply.
    Tool { tool: ToolKind, output: String },
    /// The model replied.
    Chat(String),
    /// The model path failed; the message is shown but NOT remembered, so a
    /// transient outage does not pollute future prompts.
    Degraded(String),
}

/// Run one turn. The user message is remembered first; tool output or the
/// model reply is remembered after, mirroring what the user saw on screen.
pub async fn run_turn<P: LlmProvider>(
    llm: Option<&P>,
    wiki: &WikiClient,
    memory: &mut ConversationMemory,
    config: &AgentConfig,
    user_message: &str,
) -> TurnReply {
    memory.push(MemoryEntry::User(user_message.to_string()));

    if let Some(expression) = calculator_candidate(user_message) {
        // A bare "calculate" with nothing after it is not a real request;
        // let it fall through to the chat path.
        match calc::try_evaluate(&expression) {
            Err(CalcError::EmptyExpression) => {}
            Ok(output) => return remember_tool(memory, ToolKind::Calculator, output),
            Err(err) => {
                let output = err.user_message(&expression);
                return remember_tool(memory, ToolKind::Calculator, output);
            }
        }
    }

    if let Some(query) = wikipedia_query(user_message) {
        let output = wiki.summary(&query).await;
        return remember_tool(memory, ToolKind::Wikipedia, output);
    }

    let Some(provider) = llm else {
        return TurnReply::Degraded(MISSING_KEY_MESSAGE.to_string());
    };

    let input = AssistantInput {
        user_message: user_message.to_string(),
        system_instruction: Some(build_chat_prompt(memory, config.context_turns)),
    };
    match tokio::time::timeout(config.llm_timeout, provider.generate(input)).await {
        Ok(Ok(reply)) => {
            memory.push(MemoryEntry::Agent(reply.text.clone()));
            TurnReply::Chat(reply.text)
        }
        Ok(Err(err)) => TurnReply::Degraded(format!("Error calling AI model: {err}")),
        Err(_) => TurnReply::Degraded(TIMEOUT_MESSAGE.to_string()),
    }
}

fn remember_tool(memory: &mut ConversationMemory, tool: ToolKind, output: String) -> TurnReply {
    memory.push(MemoryEntry::Tool {
        tool,
        output: output.clone(),
    });
    TurnReply::Tool { tool, output }
}
