//! JSON HTTP request façade.
//!
//! Every call builds its own short-lived `reqwest` client for the trust tier
//! of the target host, optionally injects the bearer credential, and decodes
//! the response through a [`FieldFilter`] so callers on small targets can ask
//! for just the part of a large payload they need.
//!
//! # Components
//!
//! - [`trust`]: host → pinned anchor selection
//! - [`filter`]: streaming JSON projection with a nesting limit
//! - [`request`]: request description and response value
//! - [`facade`]: the executor

pub mod error;
pub mod facade;
pub mod filter;
pub mod request;
pub mod trust;

pub use error::{HttpError, Result};
pub use facade::{HttpFacade, HttpFacadeBuilder};
pub use filter::{DEFAULT_NESTING_LIMIT, FieldFilter};
pub use request::{ApiRequest, ApiResponse, Body};
pub use trust::{TrustAnchors, TrustTier};
