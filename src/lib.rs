pub mod agent;
pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod tools;
pub mod trace;

use agent::memory::ConversationMemory;
use agent::turn::AgentConfig;
use anyhow::Result;
use cli::{AppState, CliArgs, run_repl};
use config::AppConfig;
use http::{HttpClient, HttpDebugConfig};
use llm::gemini::GeminiProvider;
use std::time::{SystemTime, UNIX_EPOCH};
use tools::wiki::WikiClient;
use trace::SessionTrace;

pub async fn run(args: CliArgs) -> Result<()> {
    let config = AppConfig::load_with_path(args.config.as_deref())?;
    let session_id = generate_session_id();
    let trace = SessionTrace::create(&session_id)?;
    let debug = HttpDebugConfig::from_verbose(args.verbose);
    let http =
        HttpClient::new(reqwest::Client::new(), debug).with_trace(trace.clone());
    let llm = GeminiProvider::new(
        http.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    )
    .ok();
    let wiki = WikiClient::new(http, config.wikipedia_base_url.clone());

    let mut app_state = AppState {
        session_id,
        llm,
        wiki,
        memory: ConversationMemory::new(config.memory_capacity),
        agent_config: AgentConfig::default(),
        theme_config: config.theme.clone(),
        color_enabled: !args.no_color,
        trace,
    };

    run_repl(&mut app_state).await
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::generate_session_id;

    #[test]
    fn generated_session_id_has_expected_shape() {
        let session_id = generate_session_id();
        let mut parts = session_id.split('-');
        let ts = parts.next().expect("timestamp segment");
        let pid = parts.next().expect("pid segment");
        assert!(
            parts.next().is_none(),
            "session id should contain one delimiter"
        );
        assert!(!ts.is_empty(), "timestamp segment should not be empty");
        assert!(!pid.is_empty(), "pid segment should not be empty");
        assert!(
            ts.chars().all(|ch| ch.is_ascii_hexdigit()),
            "timestamp segment should be hex"
        );
        assert!(
            pid.chars().all(|ch| ch.is_ascii_hexdigit()),
            "pid segment should be hex"
        );
    }
}
