//! Player identity and session verification.
//!
//! This crate owns the [`Profile`] type produced at login, the
//! two's-complement SHA-1 fingerprint that keys the external has-joined
//! lookup, and the asynchronous HTTP client performing that lookup.

pub mod client;
pub mod error;
pub mod fingerprint;
pub mod profile;

pub use client::{HttpSessionVerifier, SessionVerifier, DEFAULT_SESSION_URL};
pub use error::{Result, SessionError};
pub use fingerprint::login_fingerprint;
pub use profile::Profile;
