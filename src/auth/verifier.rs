//! Credential verification and session establishment.

use crate::auth::{
    audit::{AuditLog, AuditSeverity},
    hasher::PasswordHasher,
    session::SessionStore,
    store::RecordStore,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, instrument};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    pub username: String,
}

/// Verification failures. Unknown usernames and wrong passwords are
/// intentionally conflated so callers cannot enumerate accounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("username and password are required")]
    MissingInput,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("credential store unavailable")]
    StorageUnavailable,
}

pub struct CredentialVerifier<S> {
    store: S,
    hasher: PasswordHasher,
    audit: Arc<dyn AuditLog>,
}

impl<S: RecordStore> CredentialVerifier<S> {
    pub fn new(store: S, hasher: PasswordHasher, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            store,
            hasher,
            audit,
        }
    }

    /// Check `candidate_password` against the stored credential record for
    /// `username` and, on success, establish a permanent session for the
    /// subject.
    ///
    /// Empty input fails before the record store is touched. Lookups are
    /// exact and case-sensitive; when no record exists a dummy hash
    /// verification burns equivalent work so the outcome stays in the timing
    /// class of a wrong password. Audit entries carry the username only.
    ///
    /// # Errors
    /// [`AuthFailure::MissingInput`] on empty input,
    /// [`AuthFailure::InvalidCredentials`] for unknown username or wrong
    /// password alike, [`AuthFailure::StorageUnavailable`] when the record
    /// store cannot answer.
    #[instrument(skip_all)]
    pub async fn verify(
        &self,
        username: &str,
        candidate_password: &str,
        session: &mut dyn SessionStore,
    ) -> Result<AuthenticatedSubject, AuthFailure> {
        if username.is_empty() || candidate_password.is_empty() {
            return Err(AuthFailure::MissingInput);
        }

        let record = match self.store.find_by_username(username).await {
            Ok(record) => record,
            Err(err) => {
                error!("credential lookup failed: {err}");
                self.audit.record(
                    AuditSeverity::Error,
                    &format!("credential lookup unavailable for user '{username}'"),
                );
                return Err(AuthFailure::StorageUnavailable);
            }
        };

        let verified = match &record {
            Some(record) => self.hasher.verify(candidate_password, &record.password_hash),
            None => self.hasher.verify_dummy(candidate_password),
        };

        if verified {
            self.audit.record(
                AuditSeverity::Info,
                &format!("user '{username}' logged in successfully"),
            );
            session.establish(username, true);

            Ok(AuthenticatedSubject {
                username: username.to_string(),
            })
        } else {
            self.audit.record(
                AuditSeverity::Warn,
                &format!("login failed for user '{username}'"),
            );

            Err(AuthFailure::InvalidCredentials)
        }
    }
}
