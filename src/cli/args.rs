use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "toolchat")]
#[command(
    about = "Chat assistant with conversation memory and calculator/Wikipedia tools",
    long_about = "Chat assistant with conversation memory and calculator/Wikipedia tools\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/toolchat/config.toml\n    2. ~/.config/toolchat/config.toml"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log HTTP requests and responses to stderr (secrets redacted).
    #[arg(long)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}
