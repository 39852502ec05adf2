//! Command-line front end.
//!
//! # Responsibility
//! - Map arguments to configuration, logging, and one conversion run.
//! - Provide terminal prompts for the conversion callbacks.
//! - Exit non-zero when the run reports an error message.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storysync_core::config::{load_for_source, load_layers, user_config_path, write_default_config};
use storysync_core::{
    default_log_dir, default_log_level, init_logging, is_error_message, Converter, SyncConfig, Ui,
};

/// Prompts on stdin, reports on stdout.
struct TerminalUi;

impl Ui for TerminalUi {
    fn ask_yes_no(&mut self, prompt: &str) -> bool {
        print!("{prompt} (y/n) ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }

    fn set_info(&mut self, message: &str) {
        println!("{message}");
    }
}

fn load_config(file: &Path, explicit: Option<&PathBuf>) -> SyncConfig {
    match explicit {
        Some(path) => load_layers(std::slice::from_ref(path)),
        None => load_for_source(file),
    }
}

fn run_sync(
    file: &Path,
    silent: bool,
    config: Option<&PathBuf>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
) -> ExitCode {
    let level = log_level.unwrap_or_else(|| default_log_level().to_string());
    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    if let Err(err) = init_logging(&level, &log_dir) {
        eprintln!("logging disabled: {err}");
    }
    log::info!(
        "event=cli_sync module=cli status=ok silent={} explicit_config={}",
        silent,
        config.is_some()
    );

    let config = load_config(file, config);
    let mut ui = TerminalUi;
    let message = Converter::new(&mut ui, config, silent).run(file);
    if is_error_message(&message) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_init_config(file: Option<PathBuf>) -> ExitCode {
    let Some(path) = file.or_else(user_config_path) else {
        eprintln!("no config location known; pass a file path");
        return ExitCode::FAILURE;
    };
    match write_default_config(&path) {
        Ok(()) => {
            println!("\"{}\" written.", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Sync {
            file,
            silent,
            config,
            log_dir,
            log_level,
        } => run_sync(&file, silent, config.as_ref(), log_dir, log_level),
        Command::InitConfig { file } => run_init_config(file),
    }
}
