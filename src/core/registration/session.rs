use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::backend::RegistrationBackend;
use super::persister::ConfigPersister;
use super::{OrgInfo, RegistrationError, RegistrationReceipt};
use crate::core::endpoint::mapper::{self, RequestPreview};
use crate::core::endpoint::verifier::VerificationOutcome;
use crate::core::endpoint::{ConfigFingerprint, EndpointConfig, EndpointError};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Testing,
    Verified {
        text: String,
        fingerprint: ConfigFingerprint,
    },
    Failed(EndpointError),
}

/// One registration attempt: owns the editable config and the result of its
/// last connection test.
///
/// Test and commit take `&mut self` / `self`, so only one of them can be
/// outstanding at a time. A successful commit consumes the session.
pub struct RegistrationSession<B> {
    org: OrgInfo,
    config: EndpointConfig,
    state: SessionState,
    persister: ConfigPersister<B>,
}

/// A failed commit hands the session back so the user can edit and retry.
pub struct CommitFailure<B> {
    pub session: RegistrationSession<B>,
    pub error: RegistrationError,
}

impl<B: RegistrationBackend> RegistrationSession<B> {
    pub fn new(org: OrgInfo, config: EndpointConfig, persister: ConfigPersister<B>) -> Self {
        Self {
            org,
            config,
            state: SessionState::Idle,
            persister,
        }
    }

    pub fn org(&self) -> &OrgInfo {
        &self.org
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Apply an edit. Any change to the config drops a previous verification.
    pub fn edit_config(&mut self, edit: impl FnOnce(&mut EndpointConfig)) {
        let before = self.config.fingerprint();
        edit(&mut self.config);
        if self.config.fingerprint() != before {
            debug!("Endpoint config edited; previous test result discarded");
            self.state = SessionState::Idle;
        }
    }

    /// Organization fields are not part of the endpoint test.
    pub fn edit_org(&mut self, edit: impl FnOnce(&mut OrgInfo)) {
        edit(&mut self.org);
    }

    pub fn preview(&self) -> RequestPreview {
        mapper::preview(&self.config)
    }

    pub async fn test_connection(&mut self, cancel: &CancellationToken) -> VerificationOutcome {
        self.state = SessionState::Testing;
        let outcome = self.persister.verifier().verify(&self.config, cancel).await;
        self.state = match &outcome {
            VerificationOutcome::Verified { text } => SessionState::Verified {
                text: text.clone(),
                fingerprint: self.config.fingerprint(),
            },
            VerificationOutcome::Failed(err) => SessionState::Failed(err.clone()),
        };
        outcome
    }

    /// True only when the last test verified this exact config.
    pub fn can_commit(&self) -> bool {
        match &self.state {
            SessionState::Verified { fingerprint, .. } => *fingerprint == self.config.fingerprint(),
            _ => false,
        }
    }

    /// Re-verify and register. The earlier test result is not reused.
    pub async fn commit(
        mut self,
        cancel: &CancellationToken,
    ) -> Result<RegistrationReceipt, CommitFailure<B>> {
        self.state = SessionState::Testing;
        match self.persister.commit(&self.org, &self.config, cancel).await {
            Ok(receipt) => Ok(receipt),
            Err(error) => {
                self.state = match &error {
                    RegistrationError::Verification(err) => SessionState::Failed(err.clone()),
                    _ => SessionState::Idle,
                };
                Err(CommitFailure {
                    session: self,
                    error,
                })
            }
        }
    }
}
