//! Per-identifier open statistics, rebuilt from the log on every query.
//!
//! Nothing here is cached or stored: the append-only log is the only state,
//! and repeated queries over an unchanged log return identical results.

use chrono::{DateTime, Utc};
use opentrack_core::metrics::{self, STATUS_QUERIES};
use opentrack_core::{EmailId, OpenEvent};

use crate::error::Result;
use crate::reader::EventLogReader;

/// Whether automated mail-proxy fetches count as opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProxyPolicy {
    /// Every recorded event counts.
    #[default]
    Include,
    /// Only events not flagged as automated-proxy fetches count.
    Exclude,
}

impl ProxyPolicy {
    fn counts(&self, event: &OpenEvent) -> bool {
        match self {
            Self::Include => true,
            Self::Exclude => !event.is_automated_proxy,
        }
    }
}

/// Everything known about one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierAggregate {
    pub email_id: EmailId,
    /// Opens counted under the active [`ProxyPolicy`].
    pub total_opens: usize,
    /// Events flagged as automated-proxy fetches, counted or not.
    pub proxy_opens: usize,
    pub first_opened: Option<DateTime<Utc>>,
    pub last_opened: Option<DateTime<Utc>>,
    /// Every matching event in log order, regardless of policy.
    pub history: Vec<OpenEvent>,
}

impl IdentifierAggregate {
    /// Fold events (already filtered to `email_id`, in log order).
    pub fn from_events(email_id: EmailId, history: Vec<OpenEvent>, policy: ProxyPolicy) -> Self {
        let mut total_opens = 0;
        let mut proxy_opens = 0;
        let mut first_opened = None;
        let mut last_opened = None;

        for event in &history {
            if event.is_automated_proxy {
                proxy_opens += 1;
            }
            if !policy.counts(event) {
                continue;
            }
            total_opens += 1;
            first_opened.get_or_insert(event.timestamp);
            last_opened = Some(event.timestamp);
        }

        Self {
            email_id,
            total_opens,
            proxy_opens,
            first_opened,
            last_opened,
            history,
        }
    }

    pub fn opened(&self) -> bool {
        self.total_opens > 0
    }

    pub fn status(&self) -> OpenStatus {
        OpenStatus {
            opened: self.opened(),
            open_count: self.total_opens,
            proxy_opens: self.proxy_opens,
            first_opened: self.first_opened,
            last_opened: self.last_opened,
        }
    }
}

/// Summary answer to a status query.
///
/// An identifier that was never opened and one that was never issued look
/// the same: `opened == false`, zero counts, no timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenStatus {
    pub opened: bool,
    pub open_count: usize,
    pub proxy_opens: usize,
    pub first_opened: Option<DateTime<Utc>>,
    pub last_opened: Option<DateTime<Utc>>,
}

/// Query facade over the event log.
#[derive(Debug, Clone)]
pub struct StatusAggregator {
    reader: EventLogReader,
    policy: ProxyPolicy,
}

impl StatusAggregator {
    pub fn new(reader: EventLogReader, policy: ProxyPolicy) -> Self {
        Self { reader, policy }
    }

    /// Full aggregate including history.
    pub fn aggregate(&self, email_id: &EmailId) -> Result<IdentifierAggregate> {
        metrics::increment(STATUS_QUERIES, 1);
        let history = self.reader.read_for(email_id)?;
        Ok(IdentifierAggregate::from_events(
            email_id.clone(),
            history,
            self.policy,
        ))
    }

    /// Open status for one identifier.
    pub fn get_status(&self, email_id: &EmailId) -> Result<OpenStatus> {
        Ok(self.aggregate(email_id)?.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use opentrack_core::ClassifiedEvent;
    use std::fs;
    use tempfile::TempDir;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 8, 15, second).unwrap()
    }

    fn event(id: &str, second: u32, proxy: bool) -> OpenEvent {
        OpenEvent::new(
            EmailId::from(id),
            ClassifiedEvent {
                client_ip: "192.0.2.5".to_string(),
                user_agent: String::new(),
                referrer: String::new(),
                is_automated_proxy: proxy,
            },
            at(second),
        )
    }

    fn aggregator(dir: &TempDir, lines: &[String], policy: ProxyPolicy) -> StatusAggregator {
        let path = dir.path().join("opens.jsonl");
        fs::write(&path, lines.concat()).unwrap();
        StatusAggregator::new(EventLogReader::new(path), policy)
    }

    #[test]
    fn test_status_reflects_log() {
        let tmp = TempDir::new().unwrap();
        let lines = [
            event("id1", 1, false).to_line().unwrap(),
            event("other", 2, false).to_line().unwrap(),
            event("id1", 3, false).to_line().unwrap(),
            event("id1", 5, false).to_line().unwrap(),
        ];
        let agg = aggregator(&tmp, &lines, ProxyPolicy::Include);

        let status = agg.get_status(&EmailId::from("id1")).unwrap();
        assert!(status.opened);
        assert_eq!(status.open_count, 3);
        assert_eq!(status.first_opened, Some(at(1)));
        assert_eq!(status.last_opened, Some(at(5)));
    }

    #[test]
    fn test_unknown_identifier_is_empty_state() {
        let tmp = TempDir::new().unwrap();
        let lines = [event("id1", 1, false).to_line().unwrap()];
        let agg = aggregator(&tmp, &lines, ProxyPolicy::Include);

        let status = agg.get_status(&EmailId::from("id2")).unwrap();
        assert_eq!(status, OpenStatus::default());
        assert!(!status.opened);
        assert_eq!(status.first_opened, None);
    }

    #[test]
    fn test_corrupt_line_between_records() {
        let tmp = TempDir::new().unwrap();
        let lines = [
            event("id1", 1, false).to_line().unwrap(),
            "{{{ not json\n".to_string(),
            event("id1", 2, false).to_line().unwrap(),
        ];
        let agg = aggregator(&tmp, &lines, ProxyPolicy::Include);

        assert_eq!(agg.get_status(&EmailId::from("id1")).unwrap().open_count, 2);
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let tmp = TempDir::new().unwrap();
        let lines = [
            event("id1", 1, true).to_line().unwrap(),
            event("id1", 2, false).to_line().unwrap(),
        ];
        let agg = aggregator(&tmp, &lines, ProxyPolicy::Include);
        let id = EmailId::from("id1");

        let first = agg.aggregate(&id).unwrap();
        for _ in 0..5 {
            assert_eq!(agg.aggregate(&id).unwrap(), first);
        }
    }

    #[test]
    fn test_exclude_policy_skips_proxy_opens() {
        let tmp = TempDir::new().unwrap();
        let lines = [
            event("id1", 1, true).to_line().unwrap(),
            event("id1", 2, false).to_line().unwrap(),
            event("id1", 3, false).to_line().unwrap(),
            event("id1", 4, true).to_line().unwrap(),
        ];
        let agg = aggregator(&tmp, &lines, ProxyPolicy::Exclude);

        let aggregate = agg.aggregate(&EmailId::from("id1")).unwrap();
        assert_eq!(aggregate.total_opens, 2);
        assert_eq!(aggregate.proxy_opens, 2);
        assert_eq!(aggregate.first_opened, Some(at(2)));
        assert_eq!(aggregate.last_opened, Some(at(3)));
        assert_eq!(aggregate.history.len(), 4);
    }

    #[test]
    fn test_exclude_policy_with_only_proxy_opens() {
        let aggregate = IdentifierAggregate::from_events(
            EmailId::from("id1"),
            vec![event("id1", 1, true)],
            ProxyPolicy::Exclude,
        );
        assert!(!aggregate.opened());
        assert_eq!(aggregate.proxy_opens, 1);
        assert_eq!(aggregate.first_opened, None);
    }

    #[test]
    fn test_include_policy_counts_proxy_opens() {
        let aggregate = IdentifierAggregate::from_events(
            EmailId::from("id1"),
            vec![event("id1", 1, true), event("id1", 2, false)],
            ProxyPolicy::Include,
        );
        let status = aggregate.status();
        assert_eq!(status.open_count, 2);
        assert_eq!(status.proxy_opens, 1);
        assert_eq!(status.first_opened, Some(at(1)));
    }
}
