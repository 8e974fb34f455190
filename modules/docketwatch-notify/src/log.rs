use async_trait::async_trait;
use tracing::info;

use docketwatch_common::{format_time, FilingRecord};

use crate::sink::{Delivery, NotifySink, SinkError};

/// Writes each record to the process log. Accepts unnumbered records.
pub struct LogSink;

#[async_trait]
impl NotifySink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, record: &FilingRecord) -> Result<Delivery, SinkError> {
        info!(
            court = %record.court,
            case = %record.case,
            case_name = %record.case_name,
            number = record.number,
            title = %record.title,
            link = %record.link,
            filed_at = %format_time(&record.filed_at),
            "New filing"
        );
        Ok(Delivery::Delivered)
    }
}
