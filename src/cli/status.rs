use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use console::style;

use crate::core::config::Settings;
use crate::core::terminal::{GuideSection, print_info, print_success, print_warn};
use crate::core::vault::CredentialVault;

fn age(stored_at: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    match (now - stored_at).max(0) / 86_400 {
        0 => "today".to_string(),
        1 => "1 day ago".to_string(),
        days => format!("{} days ago", days),
    }
}

pub async fn run_status(settings: &Settings) -> Result<()> {
    GuideSection::new("Platform")
        .status("Backend", &settings.backend.url)
        .status("Data dir", &settings.data_dir.display().to_string())
        .print();

    let vault = CredentialVault::open(&settings.vault_path()).await?;
    let stored = vault.list().await?;
    if stored.is_empty() {
        println!();
        print_info("No organizations registered yet. Run `llm-onboard init`.");
        return Ok(());
    }

    println!("\n{}", style("Registered organizations").bold().underlined());
    for cred in stored {
        let token = match vault.token(&cred.email).await {
            Ok(Some(_)) => style("token stored").green(),
            Ok(None) => style("no token").yellow(),
            Err(_) => style("token unreadable on this machine").red(),
        };
        println!(
            "  {} <{}>  {}  {}  {}",
            style(&cred.company_name).bold(),
            cred.email,
            style(cred.org_id.as_deref().unwrap_or("-")).dim(),
            token,
            style(age(cred.stored_at)).dim()
        );
    }
    Ok(())
}

pub async fn run_forget(settings: &Settings, email: &str) -> Result<()> {
    let vault = CredentialVault::open(&settings.vault_path()).await?;
    if vault.remove(email.trim()).await? {
        print_success(&format!("Removed stored token for {}", email.trim()));
    } else {
        print_warn(&format!("No stored token for {}", email.trim()));
    }
    Ok(())
}
