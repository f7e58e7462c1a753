use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the titlekeeper binary.
#[derive(Debug, Parser)]
#[command(
    name = "titlekeeper",
    version,
    about = "Resolve and cache display titles for vault files"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "TITLEKEEPER_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Resolve titles for the given files and print them.
    Resolve(ResolveArgs),
    /// Print the effective settings.
    Config,
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    /// Vault root the file paths are relative to.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Front matter key holding the title.
    #[arg(long = "title-key", value_name = "KEY", default_value = "title")]
    pub title_key: String,

    /// Files to resolve.
    #[arg(value_name = "FILE", required = true, value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the title cache capacity.
    #[arg(long = "cache-capacity", value_name = "COUNT", global = true)]
    pub cache_capacity: Option<usize>,

    /// Override the batch debounce window.
    #[arg(long = "batch-window-ms", value_name = "MILLISECONDS", global = true)]
    pub batch_window_ms: Option<u64>,
}
