// Archive cross-reference log.
// One row per numbered filing keyed by LREF. Inserts are idempotent, so a
// record re-dispatched after a restart is reported as a duplicate.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use docketwatch_common::FilingRecord;

use crate::sink::{Delivery, NotifySink, SinkError};

pub struct ArchiveLog {
    pool: SqlitePool,
}

impl ArchiveLog {
    /// Open (creating if needed) the database and ensure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, SinkError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        let log = Self { pool };
        log.ensure_schema().await?;
        Ok(log)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), SinkError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS filings (
                time INTEGER NOT NULL,
                lref TEXT PRIMARY KEY,
                case_name TEXT NOT NULL,
                number INTEGER NOT NULL,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                court TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl NotifySink for ArchiveLog {
    fn name(&self) -> &'static str {
        "archive_log"
    }

    /// The LREF of an unnumbered filing doesn't identify a document.
    fn requires_document_number(&self) -> bool {
        true
    }

    async fn deliver(&self, record: &FilingRecord) -> Result<Delivery, SinkError> {
        let xref = record.cross_reference();
        if !xref.reliable {
            return Ok(Delivery::Skipped);
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO filings (time, lref, case_name, number, title, link, court)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.filed_at.timestamp())
        .bind(&xref.key)
        .bind(&record.case_name)
        .bind(i64::from(record.number))
        .bind(&record.title)
        .bind(&record.link)
        .bind(&record.court)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(Delivery::Duplicate);
        }

        debug!(lref = %xref.key, "archive-logged filing");
        Ok(Delivery::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(number: u32) -> FilingRecord {
        FilingRecord {
            court: "ilnd".to_string(),
            case: "1:13-cv-04341".to_string(),
            case_name: "Prenda Law v. Godfread".to_string(),
            title: "Motion to Dismiss".to_string(),
            number,
            link: "https://ecf.ilnd.uscourts.gov/doc1/067112345".to_string(),
            docket_link: "https://ecf.ilnd.uscourts.gov/cgi-bin/DktRpt.pl?284511".to_string(),
            pacer_num: 284511,
            filed_at: Utc.with_ymd_and_hms(2013, 10, 7, 18, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn numbered_record_is_stored_by_lref() {
        let log = ArchiveLog::connect("sqlite::memory:").await.unwrap();

        let outcome = log.deliver(&record(12)).await.unwrap();
        assert_eq!(outcome, Delivery::Delivered);

        let rows: Vec<(String, i64, i64)> =
            sqlx::query_as("SELECT lref, number, time FROM filings")
                .fetch_all(log.pool())
                .await
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "gov.uscourts.ilnd.1-13-cv-04341.12.0");
        assert_eq!(rows[0].1, 12);
        assert_eq!(rows[0].2, record(12).filed_at.timestamp());
    }

    #[tokio::test]
    async fn redelivery_is_reported_as_duplicate() {
        let log = ArchiveLog::connect("sqlite::memory:").await.unwrap();
        log.deliver(&record(12)).await.unwrap();
        assert_eq!(log.deliver(&record(12)).await.unwrap(), Delivery::Duplicate);
    }

    #[tokio::test]
    async fn unnumbered_record_is_skipped() {
        let log = ArchiveLog::connect("sqlite::memory:").await.unwrap();
        assert!(log.requires_document_number());
        assert_eq!(log.deliver(&record(0)).await.unwrap(), Delivery::Skipped);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM filings")
            .fetch_one(log.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
