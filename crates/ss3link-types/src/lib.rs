//! Shared types for the ss3link crates.
//!
//! These are the seams between the token lifecycle, the HTTP façade and the
//! event stream: a [`Clock`] so expiry math can run against mock time, and a
//! [`CredentialSource`] so request and handshake code can read the current
//! bearer credential without owning the token manager.

pub mod clock;
pub mod credential;

pub use clock::{Clock, MockClock, SharedClock, SystemClock};
pub use credential::{CredentialSource, SharedCredentialSource, StaticCredential};
