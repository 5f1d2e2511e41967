use crate::traits::DurationLookup;
use crate::types::{AggregatorError, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

/// `lengthSeconds` followed by three URL-encoded characters (`":"`), then the value.
const LENGTH_SECONDS_PATTERN: &str = "lengthSeconds(%[0-9A-Fa-f]{2}){3}([^%]+)";

/// Looks up a video's length from a URL-encoded video info endpoint.
pub struct VideoInfoLookup {
    client: Client,
    url_template: String,
    length_seconds: Regex,
}

impl VideoInfoLookup {
    pub fn new(client: Client, url_template: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            url_template: url_template.into(),
            length_seconds: Regex::new(LENGTH_SECONDS_PATTERN)?,
        })
    }

    fn lookup_url(&self, item_id: &str) -> String {
        self.url_template.replace("{id}", item_id)
    }

    pub fn extract_length_seconds(&self, body: &str) -> Option<u64> {
        self.length_seconds
            .captures(body)
            .and_then(|caps| caps.get(2))
            .and_then(|m| m.as_str().trim().parse().ok())
    }
}

#[async_trait]
impl DurationLookup for VideoInfoLookup {
    async fn duration(&self, item_id: &str) -> Result<String> {
        let url = self.lookup_url(item_id);
        debug!("Looking up duration for {}", item_id);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(AggregatorError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let seconds = self.extract_length_seconds(&body).ok_or_else(|| {
            AggregatorError::Parse(format!("no lengthSeconds in lookup for {}", item_id))
        })?;

        Ok(format_duration(seconds))
    }
}

/// `HH:MM:SS` for an hour or more, `MM:SS` otherwise.
pub fn format_duration(total_seconds: u64) -> String {
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
