mod endpoint;
mod register;
mod status;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use console::style;
use tokio_util::sync::CancellationToken;

use crate::core::config::Settings;
use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Setup")
        .command("init", "Register your organization with the onboarding wizard")
        .command("register", "Register non-interactively from --config <file>")
        .print();

    GuideSection::new("Endpoint")
        .command("verify", "Send one test request and check the response path")
        .command("preview", "Show the request a test would send (key masked)")
        .command("run", "Generate text through a configured endpoint")
        .print();

    GuideSection::new("Credentials")
        .command("status", "List organizations with a stored access token")
        .command("forget", "Remove the stored token for --email <address>")
        .print();

    GuideSection::new("Flags")
        .text("--config, -c <file>   Endpoint descriptor (TOML)")
        .text("--prompt, -p <text>   Prompt for `run`")
        .text("--email <address>     Organization email for `forget`")
        .text("--verbose, -v         Debug logging to stderr")
        .blank()
        .hint("llm-onboard verify --config acme.toml", "")
        .hint("llm-onboard run -c acme.toml -p \"Summarize our refund policy\"", "")
        .print();

    println!(
        "\n {} {} <command> [flags]\n",
        style("Usage:").bold(),
        style("llm-onboard").green()
    );
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CommandArgs {
    pub config: Option<PathBuf>,
    pub prompt: String,
    pub email: Option<String>,
    pub verbose: bool,
}

pub(crate) fn parse_command_args(args: &[String], start: usize) -> CommandArgs {
    let mut parsed = CommandArgs::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--prompt" | "-p" => {
                if i + 1 < args.len() {
                    parsed.prompt = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--email" => {
                if i + 1 < args.len() {
                    parsed.email = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                parsed.verbose = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    parsed
}

fn require_config(parsed: &CommandArgs, command: &str) -> Result<PathBuf> {
    parsed
        .config
        .clone()
        .ok_or_else(|| anyhow!("--config <file> is required for `{}`", command))
}

/// Cancelled when the user presses Ctrl+C, aborting any in-flight call.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("help");
    let parsed = parse_command_args(&args, 2);

    crate::logging::init(parsed.verbose);

    if matches!(cmd, "help" | "--help" | "-h") {
        print_help();
        return Ok(());
    }

    let settings = Settings::load()?;

    match cmd {
        "init" | "onboard" => register::run_wizard(&settings).await,
        "register" => {
            let path = require_config(&parsed, "register")?;
            register::run_from_file(&settings, &path).await
        }
        "verify" => {
            let path = require_config(&parsed, "verify")?;
            endpoint::run_verify(&settings, &path).await
        }
        "preview" => {
            let path = require_config(&parsed, "preview")?;
            endpoint::run_preview(&path)
        }
        "run" => {
            let path = require_config(&parsed, "run")?;
            if parsed.prompt.is_empty() {
                print_error("Error: --prompt is required for run mode.");
                print_help();
                return Ok(());
            }
            endpoint::run_prompt(&settings, &path, &parsed.prompt).await
        }
        "status" => status::run_status(&settings).await,
        "forget" => {
            let email = parsed
                .email
                .clone()
                .ok_or_else(|| anyhow!("--email <address> is required for `forget`"))?;
            status::run_forget(&settings, &email).await
        }
        other => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            Ok(())
        }
    }
}
