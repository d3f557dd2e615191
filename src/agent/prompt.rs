//! Prompt assembly for the chat fallback path.

use crate::agent::memory::ConversationMemory;

/// Build the system prompt for a plain chat turn: a short persona preamble,
/// a CONTEXT block with the recent conversation, and the reply instruction.
pub fn build_chat_prompt(memory: &ConversationMemory, context_turns: usize) -> String {
    let history = memory.context_block(context_turns);
    format!(
        "You are a helpful and friendly AI assistant.\n\
         \n\
         CONTEXT:\n\
         {history}\n\
         \n\
         INSTRUCTION:\n\
         Reply to the user's last message naturally.\n\
         If they asked a question you can't answer, suggest using a tool like \
         \"Calculate...\" or \"Search wiki...\".\n\
         Keep your answer concise (under 3 sentences)."
    )
}
