//! # Varco (Employee Portal Gateway)
//!
//! `varco` is the authentication and routing edge for an employee portal. It
//! verifies directory credentials and a TOTP second factor, establishes a
//! cookie session, and reverse-proxies authenticated users to the dashboard
//! backend that matches their primary role.
//!
//! ## Authentication (two checkpoints)
//!
//! Login is a strict two-step state machine: `Anonymous` →
//! `PendingSecondFactor` → `Authenticated`. The first checkpoint binds to the
//! directory with the submitted credentials and checks that the subject's
//! group memberships authorize the requested department. The second
//! checkpoint validates a 6-digit TOTP code (30-second step, one window of
//! drift either way). Only then is the pending record promoted, exactly once,
//! into a session.
//!
//! - **No enumeration:** bind failures and unknown users surface the same
//!   generic message; the distinction lives in audit events only.
//! - **Single-use promotion:** a pending record is consumed atomically; two
//!   racing submissions of the same valid code yield one session.
//!
//! ## Routing (pick exactly one)
//!
//! A subject holding several roles is collapsed to a single *primary role* by
//! a fixed precedence list; the primary role selects exactly one backend.
//! Requests are forwarded once, with normalized identity headers attached,
//! and the backend's response is relayed verbatim.
//!
//! ## Trust boundaries
//!
//! The `X-Auth-Request-*` header evidence path is only meaningful when an
//! upstream, network-trusted proxy injects those headers; enabling it
//! (`--trust-proxy-headers`) is a deployment decision, not something this
//! process can verify. Identity tokens are verified (signature, issuer,
//! audience, expiry) unless the development-only decode mode is explicitly
//! enabled.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod directory;
pub mod observe;
pub mod routing;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
