mod cli;
mod core;
mod logging;

use inquire::InquireError;

use crate::core::terminal;

/// True only when the user backed out of an interactive prompt.
fn is_prompt_exit(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<InquireError>(),
        Some(InquireError::OperationCanceled | InquireError::OperationInterrupted)
    )
}

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_main().await {
        if is_prompt_exit(&e) {
            terminal::print_goodbye();
        } else {
            terminal::print_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}
