//! Core types and request handling logic for the opentrack email open tracker.
//!
//! This crate provides:
//! - Email identifiers and the identifier recording policy
//! - The [`OpenEvent`] record and its NDJSON line encoding
//! - Request classification (client IP extraction, mail-proxy detection)
//! - The tracking pixel payload and its cache-defeating headers
//! - Prometheus metrics helpers
//! - Shared error types

mod classify;
mod error;
mod event;
mod identifier;
pub mod metrics;
pub mod pixel;

pub use classify::{
    ClassifiedEvent, PROXY_USER_AGENT_MARKERS, RequestMeta, UNKNOWN_CLIENT_IP,
    WEBMAIL_REFERRER_MARKERS, classify, client_ip, is_automated_proxy,
};
pub use error::{Error, Result};
pub use event::{OpenEvent, format_timestamp};
pub use identifier::{EmailId, IdentifierPolicy};
