use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, info, warn};

use docketwatch_common::FilingRecord;

use crate::sink::{Delivery, NotifySink};

/// What happened to one record across all sinks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub duplicates: usize,
    pub skipped: usize,
    /// Names of sinks that failed for this record.
    pub failed: Vec<&'static str>,
}

impl DispatchReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans a finalized record out to every configured sink. A failing (or
/// panicking) sink is logged and never stops the remaining sinks.
pub struct Dispatcher {
    sinks: Vec<Box<dyn NotifySink>>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Box<dyn NotifySink>>) -> Self {
        Self { sinks }
    }

    /// Dispatcher with no sinks, used while calibrating.
    pub fn noop() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub async fn dispatch(&self, record: &FilingRecord) -> DispatchReport {
        let mut report = DispatchReport::default();

        for sink in &self.sinks {
            let name = sink.name();

            if sink.requires_document_number() && !record.is_numbered() {
                debug!(sink = name, case = %record.case, "Skipping unnumbered record");
                report.skipped += 1;
                continue;
            }

            match AssertUnwindSafe(sink.deliver(record)).catch_unwind().await {
                Ok(Ok(Delivery::Delivered)) => report.delivered += 1,
                Ok(Ok(Delivery::Duplicate)) => {
                    info!(sink = name, case = %record.case, "Backend reports duplicate, ignoring");
                    report.duplicates += 1;
                }
                Ok(Ok(Delivery::Skipped)) => report.skipped += 1,
                Ok(Err(e)) => {
                    warn!(sink = name, case = %record.case, error = %e, "Sink delivery failed");
                    report.failed.push(name);
                }
                Err(_) => {
                    warn!(sink = name, case = %record.case, "Sink panicked during delivery");
                    report.failed.push(name);
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::sink::SinkError;

    struct Recording {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
        numbered_only: bool,
    }

    #[async_trait]
    impl NotifySink for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn requires_document_number(&self) -> bool {
            self.numbered_only
        }

        async fn deliver(&self, record: &FilingRecord) -> Result<Delivery, SinkError> {
            self.seen.lock().unwrap().push(record.title.clone());
            Ok(Delivery::Delivered)
        }
    }

    struct Broken;

    #[async_trait]
    impl NotifySink for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn deliver(&self, _record: &FilingRecord) -> Result<Delivery, SinkError> {
            Err(SinkError::Config("no credentials".to_string()))
        }
    }

    struct Panicky;

    #[async_trait]
    impl NotifySink for Panicky {
        fn name(&self) -> &'static str {
            "panicky"
        }

        async fn deliver(&self, _record: &FilingRecord) -> Result<Delivery, SinkError> {
            panic!("sink blew up")
        }
    }

    struct AlreadyPosted;

    #[async_trait]
    impl NotifySink for AlreadyPosted {
        fn name(&self) -> &'static str {
            "already_posted"
        }

        async fn deliver(&self, _record: &FilingRecord) -> Result<Delivery, SinkError> {
            Ok(Delivery::Duplicate)
        }
    }

    fn record(number: u32) -> FilingRecord {
        FilingRecord {
            court: "cand".to_string(),
            case: "3:12-cv-02396".to_string(),
            case_name: "AF Holdings v. Navasca".to_string(),
            title: "Order".to_string(),
            number,
            link: "https://ecf.cand.uscourts.gov/doc1/035111".to_string(),
            docket_link: "https://ecf.cand.uscourts.gov/cgi-bin/DktRpt.pl?254869".to_string(),
            pacer_num: 254869,
            filed_at: Utc.with_ymd_and_hms(2013, 10, 7, 12, 0, 0).unwrap(),
        }
    }

    fn recording(
        name: &'static str,
        numbered_only: bool,
    ) -> (Box<dyn NotifySink>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Recording {
            name,
            seen: seen.clone(),
            numbered_only,
        };
        (Box::new(sink), seen)
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_later_sinks() {
        let (a, a_seen) = recording("a", false);
        let (c, c_seen) = recording("c", false);
        let dispatcher = Dispatcher::new(vec![a, Box::new(Broken), c]);

        let report = dispatcher.dispatch(&record(3)).await;

        assert_eq!(a_seen.lock().unwrap().len(), 1);
        assert_eq!(c_seen.lock().unwrap().len(), 1);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec!["broken"]);
        assert!(!report.all_ok());
    }

    #[tokio::test]
    async fn panicking_sink_is_contained() {
        let (c, c_seen) = recording("c", false);
        let dispatcher = Dispatcher::new(vec![Box::new(Panicky), c]);

        let report = dispatcher.dispatch(&record(3)).await;

        assert_eq!(c_seen.lock().unwrap().len(), 1);
        assert_eq!(report.failed, vec!["panicky"]);
    }

    #[tokio::test]
    async fn unnumbered_record_skips_number_keyed_sinks() {
        let (keyed, keyed_seen) = recording("keyed", true);
        let (plain, plain_seen) = recording("plain", false);
        let dispatcher = Dispatcher::new(vec![keyed, plain]);

        let report = dispatcher.dispatch(&record(0)).await;

        assert!(keyed_seen.lock().unwrap().is_empty());
        assert_eq!(plain_seen.lock().unwrap().len(), 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn duplicate_is_not_a_failure() {
        let dispatcher = Dispatcher::new(vec![Box::new(AlreadyPosted)]);
        let report = dispatcher.dispatch(&record(1)).await;
        assert_eq!(report.duplicates, 1);
        assert!(report.all_ok());
    }

    #[tokio::test]
    async fn noop_dispatcher_does_nothing() {
        let dispatcher = Dispatcher::noop();
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.dispatch(&record(1)).await, DispatchReport::default());
    }
}
