use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::backend::RegistrationBackend;
use super::{OrgInfo, RegistrationError, RegistrationPayload, RegistrationReceipt};
use crate::core::endpoint::EndpointConfig;
use crate::core::endpoint::verifier::{ConnectionVerifier, VerificationOutcome};

/// Re-verifies an endpoint and, only if that passes, submits the registration.
pub struct ConfigPersister<B> {
    verifier: ConnectionVerifier,
    backend: B,
}

impl<B: RegistrationBackend> ConfigPersister<B> {
    pub fn new(verifier: ConnectionVerifier, backend: B) -> Self {
        Self { verifier, backend }
    }

    pub fn verifier(&self) -> &ConnectionVerifier {
        &self.verifier
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Earlier test results are never consulted; the endpoint is called again
    /// here and the backend is contacted only if that call verifies.
    pub async fn commit(
        &self,
        org: &OrgInfo,
        config: &EndpointConfig,
        cancel: &CancellationToken,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        org.validate()?;

        match self.verifier.verify(config, cancel).await {
            VerificationOutcome::Verified { .. } => {}
            VerificationOutcome::Failed(err) => {
                warn!("Pre-commit verification failed; registration not submitted");
                return Err(RegistrationError::Verification(err));
            }
        }

        if cancel.is_cancelled() {
            return Err(RegistrationError::Transport(
                "Registration cancelled before submission".to_string(),
            ));
        }

        let payload = RegistrationPayload::snapshot(org, config);
        let receipt = self.backend.submit(&payload).await?;
        info!(
            "Organization '{}' registered{}",
            payload.company_name,
            receipt
                .org_id
                .as_deref()
                .map(|id| format!(" (id {})", id))
                .unwrap_or_default()
        );
        Ok(receipt)
    }
}
