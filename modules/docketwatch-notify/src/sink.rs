use async_trait::async_trait;

use docketwatch_common::FilingRecord;

/// Outcome of a delivery that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The backend already has this record (e.g. a repeated post). Not an error.
    Duplicate,
    /// The sink chose not to handle this record.
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} rejected delivery with HTTP {status}: {body}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Sink misconfigured: {0}")]
    Config(String),
}

/// Pluggable notification backend.
#[async_trait]
pub trait NotifySink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sinks whose output is keyed on the document number (the archive
    /// cross-reference log) return true; unnumbered records are never handed
    /// to them.
    fn requires_document_number(&self) -> bool {
        false
    }

    async fn deliver(&self, record: &FilingRecord) -> Result<Delivery, SinkError>;
}
