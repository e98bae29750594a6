//! Two-factor authentication state machine.
//!
//! Flow overview:
//! 1) Primary checkpoint: bind to the directory with the submitted
//!    credentials, then check that the required group for the requested
//!    department is among the subject's memberships.
//! 2) On success a single-use pending record is stored; no access is granted.
//! 3) Second checkpoint: validate a 6-digit TOTP code against the subject's
//!    enrolled secret (30s step, one window of drift either way).
//! 4) Promotion consumes the pending record atomically and issues the
//!    session cookie (absolute expiry).
//!
//! Security boundaries:
//! - Bind failures and unknown users surface one generic message.
//! - A wrong code keeps the pending record; only success consumes it.
//! - Raw tokens exist only in cookies; stores key by SHA-256 hash.

pub mod error;
pub mod flow;
pub mod session;
pub mod totp;

pub use error::AuthError;
pub use flow::AuthFlow;
pub use session::{AuthenticatedSession, Identity, PendingAuthentication, SessionStore};
pub use totp::{FileSecretStore, SecretStore, TotpVerifier};
