//! opentrack Serve - HTTP front end for the email open tracker.
//!
//! Serves the tracking pixel and answers open-status queries from the
//! append-only event log.
//!
//! # Architecture
//!
//! - **AppState**: Shared state (configuration, event recorder, status aggregator)
//! - **Routes**: Pixel, status and health handlers
//!
//! The pixel route never fails: recording is handed to a background writer
//! and the image is returned whatever happens to the event.

mod error;
mod routes;
mod state;

pub use self::error::ApiError;
pub use self::routes::router;
pub use self::state::{AppState, Config};
