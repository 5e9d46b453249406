//! Request classification: client IP extraction and mail-proxy detection.
//!
//! Mail providers increasingly fetch remote images through their own relays
//! (Gmail's image proxy, Yahoo's mail proxy, Outlook prefetchers, Apple Mail
//! privacy fetches). Those fetches still produce an open event, but they are
//! flagged so the status API can separate them from genuine renders.
//!
//! Detection is a best-effort substring heuristic over the user-agent and
//! referrer. Unknown relays are missed and an unusual browser may be flagged;
//! both outcomes are expected.
//!
//! Everything here is pure: the same [`RequestMeta`] always yields the same
//! [`ClassifiedEvent`].

use std::net::IpAddr;

/// User-agent fragments (lowercase) sent by provider image proxies.
pub const PROXY_USER_AGENT_MARKERS: &[&str] = &[
    // Gmail: "Mozilla/5.0 (Windows NT 5.1; rv:11.0) Gecko Firefox/11.0 (via ggpht.com GoogleImageProxy)"
    "googleimageproxy",
    "ggpht.com",
    // Yahoo / AOL
    "yahoomailproxy",
    // Microsoft / Outlook
    "bingpreview",
    "ms-office",
    "microsoft office",
    "outlook",
    // Apple Mail privacy protection
    "applemail",
    "apple mail",
];

/// Referrer fragments (lowercase) identifying webmail clients.
pub const WEBMAIL_REFERRER_MARKERS: &[&str] = &[
    "mail.google.com",
    "outlook.live.com",
    "outlook.office.com",
    "outlook.office365.com",
    "mail.yahoo.com",
    "mail.aol.com",
    "icloud.com/mail",
];

/// Value recorded when neither a forwarding header nor a peer address exists.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// Raw request metadata handed over by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// `User-Agent` header, empty if absent.
    pub user_agent: String,
    /// `Referer` header, empty if absent.
    pub referrer: String,
    /// `X-Forwarded-For` header, verbatim.
    pub forwarded_for: Option<String>,
    /// Address of the directly connected peer.
    pub peer_addr: Option<IpAddr>,
}

/// Classification result carried into an [`OpenEvent`](crate::OpenEvent).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub client_ip: String,
    pub user_agent: String,
    pub referrer: String,
    pub is_automated_proxy: bool,
}

/// Classify a pixel request.
pub fn classify(meta: &RequestMeta) -> ClassifiedEvent {
    ClassifiedEvent {
        client_ip: client_ip(meta.forwarded_for.as_deref(), meta.peer_addr),
        user_agent: meta.user_agent.clone(),
        referrer: meta.referrer.clone(),
        is_automated_proxy: is_automated_proxy(&meta.user_agent, &meta.referrer),
    }
}

/// Extract the originating client address.
///
/// The left-most entry of `X-Forwarded-For` is the client as seen by the
/// first proxy hop; later entries were appended by proxies closer to us.
/// Falls back to the peer address when the header is missing or its first
/// entry is blank.
pub fn client_ip(forwarded_for: Option<&str>, peer_addr: Option<IpAddr>) -> String {
    let forwarded = forwarded_for
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());

    match (forwarded, peer_addr) {
        (Some(first), _) => first.to_string(),
        (None, Some(peer)) => peer.to_string(),
        (None, None) => UNKNOWN_CLIENT_IP.to_string(),
    }
}

/// Whether the request looks like a provider image proxy rather than a
/// genuine client render.
pub fn is_automated_proxy(user_agent: &str, referrer: &str) -> bool {
    contains_any(user_agent, PROXY_USER_AGENT_MARKERS)
        || contains_any(referrer, WEBMAIL_REFERRER_MARKERS)
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    if haystack.is_empty() {
        return false;
    }
    let haystack = haystack.to_ascii_lowercase();
    markers.iter().any(|marker| haystack.contains(marker))
}
