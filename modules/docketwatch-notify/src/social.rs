use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use docketwatch_common::{FilingRecord, SocialConfig, UNKNOWN_TEXT};

use crate::sink::{Delivery, NotifySink, SinkError};

/// Posts a short status per filing to a social-media API (bearer-token auth).
pub struct SocialPoster {
    http: reqwest::Client,
    token: String,
    config: SocialConfig,
}

impl SocialPoster {
    pub fn new(config: SocialConfig, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            config,
        }
    }
}

#[async_trait]
impl NotifySink for SocialPoster {
    fn name(&self) -> &'static str {
        "social"
    }

    async fn deliver(&self, record: &FilingRecord) -> Result<Delivery, SinkError> {
        let text = compose_post(record, &self.config);

        let resp = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let outcome = classify_response(status, &body)?;
        if outcome == Delivery::Delivered {
            info!(text = %text, "Posted filing");
        }
        Ok(outcome)
    }
}

/// Rejections for repeated content come back as 403 with "duplicate" in the
/// body; those are expected after a restart and are not failures.
pub fn classify_response(status: u16, body: &str) -> Result<Delivery, SinkError> {
    match status {
        200..=299 => Ok(Delivery::Delivered),
        403 if body.to_ascii_lowercase().contains("duplicate") => Ok(Delivery::Duplicate),
        _ => Err(SinkError::Rejected {
            service: "social",
            status,
            body: truncate_chars(body, 200),
        }),
    }
}

/// `{case} ({court}): #{number} {title}. {link}`, pre-truncated to fit the
/// service's limit.
pub fn compose_post(record: &FilingRecord, config: &SocialConfig) -> String {
    let mut case = record.case_name.clone();
    for (from, to) in &config.shorten {
        case = case.replace(from.as_str(), to.as_str());
    }
    let mut title = record.title.clone();

    let budget = config.text_budget;
    if case.chars().count() + title.chars().count() > budget {
        if case.chars().count() > 60 {
            case = format!("{}...", truncate_chars(&case, 57));
        }
        let space = budget.saturating_sub(case.chars().count());
        title = format!("{}...", truncate_chars(&title, space.saturating_sub(3)));
    }

    let number = if record.is_numbered() {
        record.number.to_string()
    } else {
        UNKNOWN_TEXT.to_string()
    };

    let message = format!(
        "{case} ({}): #{number} {title}. {}",
        record.court, record.link
    );
    truncate_chars(&message, config.max_chars)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
