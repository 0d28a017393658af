//! SimpliSafe alarm and lock API.
//!
//! Maps REST payloads to alarm/lock states and stream event codes to
//! [`EventKind`]s. Identifiers (user, subscription, lock) are fetched on first
//! use and cached for the life of the client.

pub mod client;
pub mod error;
pub mod events;
pub mod types;

pub use client::{DEFAULT_API_BASE, Ss3Client};
pub use error::{ClientError, Result};
pub use events::EventKind;
pub use types::{AlarmState, Lock, LockState, SetAlarmState, SetLockState, Subscription};
