pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "thunai",
    about = "Thunai operator CLI",
    long_about = "Inspect configuration, apply migrations, check readiness and chat with the Thunai culture assistant locally.",
    after_help = "Examples:\n  thunai doctor --json\n  thunai config\n  thunai chat --user U123 --offline"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, backend and model readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Chat with the assistant from the terminal")]
    Chat {
        #[arg(long, default_value = "local-user", help = "Sender id used for every message")]
        user: String,
        #[arg(long, help = "Keep records in memory instead of calling the backend API")]
        offline: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Chat { user, offline } => {
            commands::chat::run(commands::chat::ChatOptions { user_id: user, offline })
        }
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
