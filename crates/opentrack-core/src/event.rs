//! The open event record and its NDJSON line encoding.
//!
//! One [`OpenEvent`] is written per recorded pixel fetch. The serialized form
//! is a single JSON object with camelCase keys, so the log stays readable
//! with `jq` and `grep`:
//!
//! ```text
//! {"emailId":"et_...","timestamp":"2026-01-15T10:30:45.123Z","clientIp":"203.0.113.5","userAgent":"...","referrer":"","isAutomatedProxy":false}
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::classify::ClassifiedEvent;
use crate::error::Result;
use crate::identifier::EmailId;

/// One recorded open of a tracking pixel. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenEvent {
    pub email_id: EmailId,
    /// Server-side capture time (UTC).
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub user_agent: String,
    pub referrer: String,
    pub is_automated_proxy: bool,
}

impl OpenEvent {
    /// Build an event stamped with the given capture time.
    pub fn new(email_id: EmailId, classified: ClassifiedEvent, timestamp: DateTime<Utc>) -> Self {
        let ClassifiedEvent {
            client_ip,
            user_agent,
            referrer,
            is_automated_proxy,
        } = classified;

        Self {
            email_id,
            timestamp,
            client_ip,
            user_agent,
            referrer,
            is_automated_proxy,
        }
    }

    /// Build an event stamped with the current server time.
    pub fn capture(email_id: EmailId, classified: ClassifiedEvent) -> Self {
        Self::new(email_id, classified, Utc::now())
    }

    /// Encode as one log line, including the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one log line. Surrounding whitespace is ignored.
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_millis<S>(ts: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> OpenEvent {
        OpenEvent::new(
            EmailId::from("et_0123456789abcdef0"),
            ClassifiedEvent {
                client_ip: "203.0.113.5".to_string(),
                user_agent: "Mozilla/5.0".to_string(),
                referrer: String::new(),
                is_automated_proxy: false,
            },
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 45).unwrap(),
        )
    }

    #[test]
    fn line_uses_camel_case_keys() {
        let line = sample().to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["emailId"], "et_0123456789abcdef0");
        assert_eq!(value["timestamp"], "2026-01-15T10:30:45.000Z");
        assert_eq!(value["clientIp"], "203.0.113.5");
        assert_eq!(value["userAgent"], "Mozilla/5.0");
        assert_eq!(value["referrer"], "");
        assert_eq!(value["isAutomatedProxy"], false);
    }

    #[test]
    fn line_decodes_back() {
        let event = sample();
        let line = event.to_line().unwrap();
        assert_eq!(OpenEvent::from_line(&line).unwrap(), event);
    }

    #[test]
    fn newlines_in_header_values_stay_on_one_line() {
        let mut event = sample();
        event.user_agent = "evil\nagent".to_string();
        let line = event.to_line().unwrap();
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(OpenEvent::from_line(&line).unwrap().user_agent, "evil\nagent");
    }

    #[test]
    fn from_line_rejects_garbage() {
        assert!(OpenEvent::from_line("{\"emailId\":").is_err());
        assert!(OpenEvent::from_line("not json").is_err());
        assert!(OpenEvent::from_line("{\"emailId\":\"x\"}").is_err());
    }

    #[test]
    fn capture_uses_current_time() {
        let before = Utc::now();
        let event = OpenEvent::capture(EmailId::from("x"), ClassifiedEvent::default());
        let after = Utc::now();
        assert!(event.timestamp >= before && event.timestamp <= after);
    }
}
