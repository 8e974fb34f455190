use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use docketwatch_common::{EmailConfig, FilingRecord};

use crate::sink::{Delivery, NotifySink, SinkError};

/// Submits one message per filing to an HTTP mail-submission API.
pub struct EmailSink {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
    to: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

impl EmailSink {
    pub fn new(config: &EmailConfig, api_key: String) -> Result<Self, SinkError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| SinkError::Config("email.endpoint is not set".to_string()))?;
        let from = config
            .from
            .clone()
            .ok_or_else(|| SinkError::Config("email.from is not set".to_string()))?;
        if config.to.is_empty() {
            return Err(SinkError::Config("email.to is empty".to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            from,
            to: config.to.clone(),
        })
    }

    pub fn compose(&self, record: &FilingRecord) -> EmailMessage {
        compose_email(record, &self.from, &self.to)
    }
}

pub fn compose_email(record: &FilingRecord, from: &str, to: &[String]) -> EmailMessage {
    EmailMessage {
        from: from.to_string(),
        to: to.to_vec(),
        subject: format!("New PACER entry in {}", record.case_name),
        text: record.to_string(),
    }
}

#[async_trait]
impl NotifySink for EmailSink {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, record: &FilingRecord) -> Result<Delivery, SinkError> {
        let message = self.compose(record);

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Mail submission returned non-success");
            return Err(SinkError::Rejected {
                service: "email",
                status: status.as_u16(),
                body,
            });
        }

        debug!(subject = %message.subject, "Email submitted");
        Ok(Delivery::Delivered)
    }
}
