//! Records portal HTTP plumbing.
//!
//! This module owns everything that knows about the portal's wire dialect:
//! resource paths, browser-like headers, cache-busting tokens and cookie
//! propagation through [`SessionState`](crate::session::SessionState).

mod client;
mod endpoints;
mod error;

pub use client::{
    CACHE_BUST_PARAM, CacheBuster, DEFAULT_REQUEST_TIMEOUT, PortalClient, PortalResponse,
    encode_form,
};
pub use endpoints::{DEFAULT_BASE_URL, PortalEndpoints, SESSION_COOKIE};
pub use error::PortalError;
