//! Credential verification and its collaborators.
//!
//! [`CredentialVerifier`] owns the authentication contract; the record store,
//! session store, rate limiter and audit sink are injected at the seams so the
//! HTTP layer stays thin and tests stay deterministic.

pub mod audit;
pub mod hasher;
pub mod rate_limit;
pub mod session;
pub mod store;
pub mod verifier;

pub use audit::{AuditLog, AuditSeverity, TracingAuditLog};
pub use hasher::PasswordHasher;
pub use rate_limit::{FixedWindowLimiter, NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter};
pub use session::{CookieSession, SessionStore, Sessions};
pub use store::{CredentialRecord, RecordStore, SqliteRecordStore, StoreError};
pub use verifier::{AuthFailure, AuthenticatedSubject, CredentialVerifier};
