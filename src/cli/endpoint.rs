use std::path::Path;

use anyhow::{Result, anyhow};
use console::style;

use super::cancel_on_ctrl_c;
use crate::core::config::{API_KEY_ENV, DescriptorFile, Settings};
use crate::core::endpoint::EndpointConfig;
use crate::core::endpoint::mapper;
use crate::core::endpoint::verifier::{ConnectionVerifier, VerificationOutcome};
use crate::core::llm::LlmProvider;
use crate::core::llm::mapped_provider::MappedProvider;
use crate::core::terminal::{self, print_status, print_success};

pub(super) fn load_endpoint(path: &Path) -> Result<DescriptorFile> {
    DescriptorFile::load(path, std::env::var(API_KEY_ENV).ok())
}

pub(super) fn print_outcome(config: &EndpointConfig, outcome: &VerificationOutcome) -> Result<()> {
    match outcome {
        VerificationOutcome::Verified { text } => {
            print_success("LLM connection successful!");
            print_status("Response path", &config.response_path);
            print_status("Extracted", text);
            Ok(())
        }
        VerificationOutcome::Failed(err) => Err(anyhow!("Test failed ({}): {}", err.kind(), err)),
    }
}

pub async fn run_verify(settings: &Settings, path: &Path) -> Result<()> {
    let file = load_endpoint(path)?;
    let verifier = ConnectionVerifier::new(settings.verifier_settings())?;

    terminal::print_testing(&file.endpoint.url);
    let outcome = verifier.verify(&file.endpoint, &cancel_on_ctrl_c()).await;
    print_outcome(&file.endpoint, &outcome)
}

pub fn run_preview(path: &Path) -> Result<()> {
    let file = load_endpoint(path)?;
    let preview = mapper::preview(&file.endpoint);
    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}

pub async fn run_prompt(settings: &Settings, path: &Path, prompt: &str) -> Result<()> {
    let file = load_endpoint(path)?;
    let verifier = ConnectionVerifier::new(settings.verifier_settings())?;
    let provider = MappedProvider::new(file.endpoint, verifier);

    let ctrl_c = cancel_on_ctrl_c();
    let cancel = provider.cancel_token();
    tokio::spawn(async move {
        ctrl_c.cancelled().await;
        cancel.cancel();
    });

    eprintln!("{}", style(format!("→ {}", provider.provider_id())).dim());
    let text = provider.generate(prompt).await?;
    println!("{}", text);
    Ok(())
}
