//! The tracking pixel payload and the headers served with it.
//!
//! Every render must reach the server, so the response forbids caching at
//! every layer and carries a fresh validator each time.

/// 1x1 transparent GIF, byte-for-byte the decoding of
/// `R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7`.
pub const TRACKING_PIXEL: [u8; 42] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

pub const CONTENT_TYPE: &str = "image/gif";

pub const CACHE_CONTROL: &str =
    "no-store, no-cache, must-revalidate, proxy-revalidate, max-age=0, s-maxage=0";

pub const PRAGMA: &str = "no-cache";

pub const EXPIRES: &str = "0";

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'none'";

pub const CONTENT_TYPE_OPTIONS: &str = "nosniff";

/// A validator that never repeats, so no intermediary can revalidate a
/// stored copy.
pub fn fresh_etag() -> String {
    format!("\"{}\"", uuid::Uuid::new_v4().simple())
}
