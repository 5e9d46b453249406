//! Tracking pixel endpoint.
//!
//! Always answers `200 image/gif`. Whether the identifier is malformed,
//! rejected by policy, or the recorder is gone only changes what gets
//! logged, never the response.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use opentrack_core::metrics::{self, EVENTS_REJECTED, PIXELS_SERVED};
use opentrack_core::{EmailId, RequestMeta, classify, pixel};
use serde::Deserialize;

use crate::state::AppState;

/// Path parameters for the pixel routes. Extra segments after the
/// identifier (`/track/{email_id}/{*rest}`) are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct TrackPath {
    email_id: String,
}

/// `GET /track/{email_id}` and `GET /track/{email_id}/{*rest}`
pub async fn track(
    State(state): State<AppState>,
    Path(TrackPath { email_id }): Path<TrackPath>,
    request: Request,
) -> Response {
    serve_pixel(&state, EmailId::from(email_id), &request)
}

/// `GET /track/` with no identifier at all.
pub async fn track_without_id(State(state): State<AppState>, request: Request) -> Response {
    serve_pixel(&state, EmailId::from(""), &request)
}

fn serve_pixel(state: &AppState, email_id: EmailId, request: &Request) -> Response {
    metrics::increment(PIXELS_SERVED, 1);

    match state.config.identifier_policy.check(&email_id) {
        Ok(()) => {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip());
            let classified = classify(&request_meta(request.headers(), peer));

            if let Err(e) = state.recorder.record(email_id, classified) {
                tracing::warn!(error = %e, "open event not recorded");
            }
        }
        Err(e) => {
            metrics::increment(EVENTS_REJECTED, 1);
            tracing::debug!(error = %e, "identifier rejected, serving pixel without recording");
        }
    }

    pixel_response()
}

/// Collect the classifier inputs from request headers.
pub fn request_meta(headers: &HeaderMap, peer_addr: Option<IpAddr>) -> RequestMeta {
    let text = |name: header::HeaderName| {
        headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    };

    RequestMeta {
        user_agent: text(header::USER_AGENT).unwrap_or_default(),
        referrer: text(header::REFERER).unwrap_or_default(),
        forwarded_for: text(header::HeaderName::from_static("x-forwarded-for")),
        peer_addr,
    }
}

/// The pixel with headers that defeat every cache between us and the reader.
pub fn pixel_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, pixel::CONTENT_TYPE.to_string()),
            (header::CACHE_CONTROL, pixel::CACHE_CONTROL.to_string()),
            (header::PRAGMA, pixel::PRAGMA.to_string()),
            (header::EXPIRES, pixel::EXPIRES.to_string()),
            (header::ETAG, pixel::fresh_etag()),
            (
                header::CONTENT_SECURITY_POLICY,
                pixel::CONTENT_SECURITY_POLICY.to_string(),
            ),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                pixel::CONTENT_TYPE_OPTIONS.to_string(),
            ),
        ],
        pixel::TRACKING_PIXEL.as_slice(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn request_meta_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("ua"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://example.com/"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5, 10.0.0.1"));

        let meta = request_meta(&headers, Some("10.0.0.2".parse().unwrap()));
        assert_eq!(meta.user_agent, "ua");
        assert_eq!(meta.referrer, "https://example.com/");
        assert_eq!(meta.forwarded_for.as_deref(), Some("203.0.113.5, 10.0.0.1"));
        assert_eq!(classify(&meta).client_ip, "203.0.113.5");
    }

    #[test]
    fn request_meta_defaults_to_empty() {
        let meta = request_meta(&HeaderMap::new(), None);
        assert_eq!(meta, RequestMeta::default());
    }

    #[test]
    fn pixel_response_headers() {
        let response = pixel_response();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "image/gif");
        assert_eq!(headers[header::CACHE_CONTROL], pixel::CACHE_CONTROL);
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(headers.contains_key(header::ETAG));
    }
}
