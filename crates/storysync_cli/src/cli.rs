use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "storysync")]
#[command(about = "Synchronize an Aeon Timeline 2 project with a yWriter 7 novel")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Update the sibling document of FILE, or create a novel from a timeline.
    Sync {
        file: PathBuf,
        /// Do not ask before overwriting the target.
        #[arg(long)]
        silent: bool,
        /// Use this config file instead of the user and project layers.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long = "log-dir")]
        log_dir: Option<PathBuf>,
        #[arg(long = "log-level")]
        log_level: Option<String>,
    },
    /// Write the default settings to FILE (user config file when omitted).
    InitConfig { file: Option<PathBuf> },
}
