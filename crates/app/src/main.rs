use agent_host::{AgentHost, CommandReport, Credential, PromptOutcome, ResumeToken};
use anyhow::Context;
use clap::{Parser, Subcommand};
use services::{CommandHistoryStore, FileCommandHistory, JsonConversationLog};
use shared::settings::AppSettings;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

mod modals;
mod utils;

use modals::{CredentialPrompt, ModalResult};

/// Ask for a command in plain language and run it, elevating when needed.
#[derive(Parser, Debug)]
#[command(name = "promptsh", version, about)]
struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Completion endpoint URL
    #[arg(long, env = "PROMPTSH_URL", global = true)]
    url: Option<String>,

    /// File holding the last received command
    #[arg(long, env = "PROMPTSH_HISTORY_FILE", global = true)]
    history_file: Option<PathBuf>,

    /// Conversation log (JSON array of messages)
    #[arg(long, env = "PROMPTSH_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session (default)
    Chat,
    /// Run a single prompt
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Write default settings and create the history file and conversation log
    Init,
    /// Print the last received command
    Last,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.clone().or_else(utils::config_path);
    let command = cli.command.unwrap_or(Command::Chat);

    let mut settings = match (&cli.config, &command) {
        (Some(path), Command::Init) if !path.exists() => utils::initial_settings(),
        (Some(path), _) => utils::load_settings(path)?,
        (None, Command::Init) => match utils::load_settings_or_default() {
            (settings, true) => settings,
            (_, false) => utils::initial_settings(),
        },
        (None, _) => utils::load_settings_or_default().0,
    };
    utils::apply_overrides(
        &mut settings,
        utils::Overrides {
            url: cli.url,
            history_file: cli.history_file,
            log_file: cli.log_file,
        },
    );

    match command {
        Command::Init => init(&settings, config_path)?,
        Command::Last => match FileCommandHistory::new(settings.history_file.clone()).load() {
            Some(command) => println!("{command}"),
            None => println!("No command stored yet."),
        },
        Command::Ask { prompt } => {
            let (runtime, host) = start(settings)?;
            // Let scripts branch on whether the command worked
            if !run_turn(&runtime, &host, &prompt.join(" "))? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Chat => {
            let (runtime, host) = start(settings)?;
            repl(&runtime, &host)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn start(settings: AppSettings) -> anyhow::Result<(Runtime, AgentHost)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let host = AgentHost::from_settings(settings)
        .context("completion endpoint is not configured; set --url or PROMPTSH_URL")?;
    Ok((runtime, host))
}

fn init(settings: &AppSettings, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = config_path.context("no configuration directory on this platform")?;
    if config_path.exists() {
        println!("Settings already exist at {}", config_path.display());
    } else {
        utils::save_settings(&config_path, settings)?;
        println!("Wrote settings to {}", config_path.display());
    }

    if let Some(history) = &settings.history_file {
        if let Some(parent) = history.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        if !history.exists() {
            std::fs::write(history, "")
                .with_context(|| format!("failed to create {}", history.display()))?;
        }
        println!("History file: {}", history.display());
    }

    if let Some(parent) = settings.conversation_log.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let system_message = settings
        .system_message
        .clone()
        .unwrap_or_else(agent_host::default_system_message);
    JsonConversationLog::new(settings.conversation_log.clone(), system_message).ensure_exists()?;
    println!("Conversation log: {}", settings.conversation_log.display());

    Ok(())
}

fn repl(runtime: &Runtime, host: &AgentHost) -> anyhow::Result<()> {
    println!("Describe what you want to do. /exit to leave.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }
        let prompt = line.trim();
        match prompt {
            "" => continue,
            "/exit" | "/quit" => return Ok(()),
            _ => {
                run_turn(runtime, host, prompt)?;
            }
        }
    }
}

/// One prompt, start to finish. Returns whether the command succeeded.
fn run_turn(runtime: &Runtime, host: &AgentHost, prompt: &str) -> anyhow::Result<bool> {
    let outcome = runtime
        .block_on(host.handle_prompt(prompt))
        .context("conversation log is unusable")?;

    let succeeded = match outcome {
        PromptOutcome::Completed(report) => print_report(&report),
        PromptOutcome::Unavailable(e) => {
            println!("{e}");
            false
        }
        PromptOutcome::AwaitingCredential(token) => elevate(runtime, host, token)?,
    };
    Ok(succeeded)
}

fn elevate(runtime: &Runtime, host: &AgentHost, token: ResumeToken) -> anyhow::Result<bool> {
    println!("Permission denied. Elevated privileges are needed to run:");
    println!("  {}", token.command());

    let answer = CredentialPrompt::new("Password: ")
        .run()
        .context("failed to read password")?;

    match answer {
        ModalResult::Confirmed(secret) => {
            let report = runtime.block_on(host.submit_credential(token, Credential::from(secret)));
            Ok(print_report(&report))
        }
        ModalResult::Cancelled | ModalResult::Pending => {
            println!("Elevation cancelled.");
            Ok(false)
        }
    }
}

fn print_report(report: &CommandReport) -> bool {
    println!("{report}");
    if report.credential_rejected {
        println!("Incorrect password");
    }
    report.succeeded()
}
