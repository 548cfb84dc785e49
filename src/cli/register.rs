use std::path::Path;

use anyhow::{Result, anyhow};
use console::style;
use inquire::CustomUserError;
use inquire::validator::Validation;

use super::cancel_on_ctrl_c;
use super::endpoint::{load_endpoint, print_outcome};
use crate::core::config::Settings;
use crate::core::endpoint::verifier::ConnectionVerifier;
use crate::core::endpoint::{
    ApiSecret, AuthConfig, EndpointConfig, FieldRole, MAX_MAX_TOKENS, MAX_TEMPERATURE,
    MIN_MAX_TOKENS, MIN_TEMPERATURE, PayloadDefaults, RequestMapping,
};
use crate::core::registration::backend::{HttpRegistrationBackend, RegistrationBackend};
use crate::core::registration::persister::ConfigPersister;
use crate::core::registration::session::{CommitFailure, RegistrationSession, SessionState};
use crate::core::registration::{OrgInfo, RegistrationReceipt};
use crate::core::terminal::{
    self, print_error, print_info, print_status, print_step, print_success, print_warn,
};
use crate::core::vault::CredentialVault;

const PREVIEW: &str = "Preview request";
const TEST: &str = "Test connection";
const EDIT: &str = "Edit endpoint";
const EDIT_ORG: &str = "Edit organization";
const REGISTER: &str = "Register organization";
const QUIT: &str = "Quit without registering";

const FIELD_URL: &str = "Endpoint URL";
const FIELD_KEY: &str = "API key";
const FIELD_MODEL: &str = "Model name";
const FIELD_AUTH: &str = "Auth header";
const FIELD_DEFAULTS: &str = "Temperature / max tokens";
const FIELD_MAPPING: &str = "Request field mapping";
const FIELD_RESPONSE: &str = "Response path";

fn required(input: &str) -> Result<Validation, CustomUserError> {
    if input.trim().is_empty() {
        Ok(Validation::Invalid("This field is required".into()))
    } else {
        Ok(Validation::Valid)
    }
}

fn email_shape(input: &str) -> Result<Validation, CustomUserError> {
    match input.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(Validation::Valid)
        }
        _ => Ok(Validation::Invalid("Enter a valid email address".into())),
    }
}

fn absolute_url(input: &str) -> Result<Validation, CustomUserError> {
    match url::Url::parse(input.trim()) {
        Ok(_) => Ok(Validation::Valid),
        Err(e) => Ok(Validation::Invalid(format!("Invalid URL: {}", e).into())),
    }
}

fn temperature_in_range(value: &f64) -> Result<Validation, CustomUserError> {
    if (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(value) {
        Ok(Validation::Valid)
    } else {
        Ok(Validation::Invalid(
            format!("Must be between {} and {}", MIN_TEMPERATURE, MAX_TEMPERATURE).into(),
        ))
    }
}

fn max_tokens_in_range(value: &u32) -> Result<Validation, CustomUserError> {
    if (MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(value) {
        Ok(Validation::Valid)
    } else {
        Ok(Validation::Invalid(
            format!("Must be between {} and {}", MIN_MAX_TOKENS, MAX_MAX_TOKENS).into(),
        ))
    }
}

fn persister(settings: &Settings) -> Result<ConfigPersister<HttpRegistrationBackend>> {
    let verifier = ConnectionVerifier::new(settings.verifier_settings())?;
    let backend = HttpRegistrationBackend::new(&settings.backend.url, settings.backend_timeout())?;
    Ok(ConfigPersister::new(verifier, backend))
}

async fn store_receipt(
    settings: &Settings,
    org: &OrgInfo,
    receipt: &RegistrationReceipt,
) -> Result<()> {
    let vault = CredentialVault::open(&settings.vault_path()).await?;
    vault.store(org, receipt).await?;

    print_success(&format!("{} is registered!", org.company_name.trim()));
    if let Some(id) = &receipt.org_id {
        print_status("Organization id", id);
    }
    if let Some(version) = receipt.model_version {
        print_status("Model version", &version.to_string());
    }
    print_info(&format!(
        "Access token stored in {}",
        settings.vault_path().display()
    ));
    Ok(())
}

fn prompt_org(current: Option<&OrgInfo>) -> Result<OrgInfo> {
    let text = |label: &str, value: Option<&str>| -> Result<String> {
        let mut prompt = inquire::Text::new(label).with_validator(required);
        if let Some(v) = value {
            prompt = prompt.with_default(v);
        }
        Ok(prompt.prompt()?.trim().to_string())
    };

    let company_name = text("Company name:", current.map(|o| o.company_name.as_str()))?;
    let contact_name = text("Contact name:", current.map(|o| o.contact_name.as_str()))?;

    let mut email_prompt = inquire::Text::new("Email:").with_validator(email_shape);
    if let Some(org) = current {
        email_prompt = email_prompt.with_default(&org.email);
    }
    let email = email_prompt.prompt()?.trim().to_string();

    let password = inquire::Password::new("Password:")
        .with_validator(required)
        .with_custom_confirmation_message("Confirm password:")
        .with_custom_confirmation_error_message("Passwords do not match.")
        .prompt()?;

    let mut webhook_prompt = inquire::Text::new("Webhook endpoint (optional):")
        .with_help_message("Called when your deployed model is reloaded");
    if let Some(hook) = current.and_then(|o| o.webhook()) {
        webhook_prompt = webhook_prompt.with_default(hook);
    }
    let webhook = webhook_prompt.prompt()?;

    let org = OrgInfo {
        company_name,
        contact_name,
        email,
        password,
        webhook_endpoint: Some(webhook.trim().to_string()).filter(|w| !w.is_empty()),
    };
    org.validate()?;
    Ok(org)
}

fn ask_url(current: &str) -> Result<String> {
    let mut prompt = inquire::Text::new("LLM endpoint URL:")
        .with_placeholder("https://llm.example.com/v1/chat")
        .with_validator(absolute_url);
    if !current.is_empty() {
        prompt = prompt.with_default(current);
    }
    Ok(prompt.prompt()?.trim().to_string())
}

fn ask_api_key() -> Result<String> {
    Ok(inquire::Password::new("API key:")
        .without_confirmation()
        .with_validator(required)
        .with_help_message("Sent only to your endpoint and to the platform on registration")
        .prompt()?)
}

fn ask_model(current: Option<&str>) -> Result<Option<String>> {
    let mut prompt = inquire::Text::new("Model name (optional):")
        .with_help_message("Leave blank if your endpoint serves a single model");
    if let Some(model) = current {
        prompt = prompt.with_default(model);
    }
    let model = prompt.prompt()?;
    Ok(Some(model.trim().to_string()).filter(|m| !m.is_empty()))
}

fn ask_auth(current: &AuthConfig) -> Result<AuthConfig> {
    let header_name = inquire::Text::new("Auth header name:")
        .with_default(&current.header_name)
        .with_validator(required)
        .prompt()?;
    let prefix = inquire::Text::new("Auth value prefix:")
        .with_default(&current.prefix)
        .with_help_message("Prepended to the key, e.g. \"Bearer \"; clear it for raw keys")
        .prompt()?;
    Ok(AuthConfig {
        header_name: header_name.trim().to_string(),
        prefix,
    })
}

fn ask_defaults(current: &PayloadDefaults) -> Result<PayloadDefaults> {
    let temperature = inquire::CustomType::<f64>::new("Temperature:")
        .with_default(current.temperature)
        .with_error_message("Enter a number")
        .with_validator(temperature_in_range)
        .prompt()?;
    let max_tokens = inquire::CustomType::<u32>::new("Max tokens:")
        .with_default(current.max_tokens)
        .with_error_message("Enter a whole number")
        .with_validator(max_tokens_in_range)
        .prompt()?;
    Ok(PayloadDefaults {
        temperature,
        max_tokens,
    })
}

fn ask_mapping(current: &RequestMapping) -> Result<RequestMapping> {
    let mut mapping = current.clone();

    let messages_key = inquire::Text::new("Request key for messages (always sent):")
        .with_default(&current.messages.target_key)
        .with_validator(required)
        .prompt()?;
    mapping.messages.target_key = messages_key.trim().to_string();

    let optional = [FieldRole::Model, FieldRole::Temperature, FieldRole::MaxTokens];
    let enabled: Vec<usize> = current
        .fields()
        .iter()
        .filter(|f| f.enabled)
        .filter_map(|f| optional.iter().position(|r| *r == f.role))
        .collect();
    let chosen = inquire::MultiSelect::new("Optional fields to send:", optional.to_vec())
        .with_default(&enabled)
        .prompt()?;

    for role in optional {
        let Some(field) = mapping.optional_mut(role) else {
            continue;
        };
        field.enabled = chosen.contains(&role);
        if field.enabled {
            let key = inquire::Text::new(&format!("Request key for {}:", role))
                .with_default(&field.target_key)
                .with_validator(required)
                .prompt()?;
            field.target_key = key.trim().to_string();
        }
    }
    Ok(mapping)
}

fn ask_response_path(current: &str) -> Result<String> {
    Ok(inquire::Text::new("Response path to the generated text:")
        .with_default(current)
        .with_validator(required)
        .with_help_message("Dot/bracket path, e.g. choices[0].message.content or output.text")
        .prompt()?
        .trim()
        .to_string())
}

fn prompt_endpoint() -> Result<EndpointConfig> {
    let mut config = EndpointConfig::new(ask_url("")?, ask_api_key()?);
    config.model_name = ask_model(None)?;

    let customize = inquire::Confirm::new("Customize auth, defaults or field mapping?")
        .with_default(false)
        .with_help_message("Defaults fit OpenAI-style chat endpoints")
        .prompt()?;
    if customize {
        config.auth = ask_auth(&config.auth)?;
        config.defaults = ask_defaults(&config.defaults)?;
        config.mapping = ask_mapping(&config.mapping)?;
    }

    config.response_path = ask_response_path(&config.response_path)?;
    Ok(config)
}

fn edit_endpoint<B: RegistrationBackend>(session: &mut RegistrationSession<B>) -> Result<()> {
    let field = inquire::Select::new(
        "Which setting?",
        vec![
            FIELD_URL,
            FIELD_KEY,
            FIELD_MODEL,
            FIELD_AUTH,
            FIELD_DEFAULTS,
            FIELD_MAPPING,
            FIELD_RESPONSE,
        ],
    )
    .prompt()?;

    let config = session.config();
    match field {
        FIELD_URL => {
            let url = ask_url(&config.url)?;
            session.edit_config(|c| c.url = url);
        }
        FIELD_KEY => {
            let key = ask_api_key()?;
            session.edit_config(|c| c.api_key_secret = ApiSecret::new(key));
        }
        FIELD_MODEL => {
            let model = ask_model(config.model())?;
            session.edit_config(|c| c.model_name = model);
        }
        FIELD_AUTH => {
            let auth = ask_auth(&config.auth)?;
            session.edit_config(|c| c.auth = auth);
        }
        FIELD_DEFAULTS => {
            let defaults = ask_defaults(&config.defaults)?;
            session.edit_config(|c| c.defaults = defaults);
        }
        FIELD_MAPPING => {
            let mapping = ask_mapping(&config.mapping)?;
            session.edit_config(|c| c.mapping = mapping);
        }
        _ => {
            let path = ask_response_path(&config.response_path)?;
            session.edit_config(|c| c.response_path = path);
        }
    }
    Ok(())
}

fn state_hint<B: RegistrationBackend>(session: &RegistrationSession<B>) -> &'static str {
    match session.state() {
        SessionState::Verified { .. } if session.can_commit() => "Connection verified",
        SessionState::Failed(_) => "Last test failed; edit and test again",
        _ => "Test the connection to enable registration",
    }
}

pub async fn run_wizard(settings: &Settings) -> Result<()> {
    terminal::print_banner();
    println!(
        "  {}\n",
        style("Welcome to the Onboarding Wizard. Let's connect your organization's LLM.").bold()
    );

    print_step("Step 1: Organization");
    let org = prompt_org(None)?;

    print_step("Step 2: LLM endpoint");
    let config = prompt_endpoint()?;
    if let Err(e) = config.validate(settings.verifier.allow_plain_http) {
        print_warn(&e.to_string());
    }

    let mut session = RegistrationSession::new(org, config, persister(settings)?);

    loop {
        let mut actions = vec![PREVIEW, TEST, EDIT, EDIT_ORG];
        if session.can_commit() {
            actions.push(REGISTER);
        }
        actions.push(QUIT);

        let choice = inquire::Select::new("What next?", actions)
            .with_help_message(state_hint(&session))
            .prompt()?;

        match choice {
            PREVIEW => {
                println!("{}", serde_json::to_string_pretty(&session.preview())?);
            }
            TEST => {
                terminal::print_testing(&session.config().url);
                let outcome = session.test_connection(&cancel_on_ctrl_c()).await;
                if let Err(e) = print_outcome(session.config(), &outcome) {
                    print_error(&e.to_string());
                }
            }
            EDIT => edit_endpoint(&mut session)?,
            EDIT_ORG => {
                let org = prompt_org(Some(session.org()))?;
                session.edit_org(|o| *o = org);
            }
            REGISTER => {
                let org = session.org().clone();
                print_step("Re-testing the connection and registering...");
                match session.commit(&cancel_on_ctrl_c()).await {
                    Ok(receipt) => {
                        store_receipt(settings, &org, &receipt).await?;
                        return Ok(());
                    }
                    Err(CommitFailure {
                        session: back,
                        error,
                    }) => {
                        print_error(&error.to_string());
                        session = back;
                    }
                }
            }
            _ => {
                print_info("Registration not submitted.");
                return Ok(());
            }
        }
    }
}

pub async fn run_from_file(settings: &Settings, path: &Path) -> Result<()> {
    let file = load_endpoint(path)?;
    let org = file
        .org
        .ok_or_else(|| anyhow!("{} has no [org] section", path.display()))?;
    org.validate()?;

    let persister = persister(settings)?;
    print_status("Platform", &persister.backend().register_url());
    let mut session = RegistrationSession::new(org, file.endpoint, persister);
    let cancel = cancel_on_ctrl_c();

    terminal::print_testing(&session.config().url);
    let outcome = session.test_connection(&cancel).await;
    print_outcome(session.config(), &outcome)?;

    let org = session.org().clone();
    print_step("Registering organization...");
    let receipt = session
        .commit(&cancel)
        .await
        .map_err(|failure| anyhow::Error::new(failure.error))?;
    store_receipt(settings, &org, &receipt).await
}
