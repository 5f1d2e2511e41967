use crate::parser::FeedParser;
use crate::traits::DurationLookup;
use crate::types::{AggregatorError, FetchConfig, Item, Result, Target};
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use url::Url;

/// Everything one fetcher run needs to know about its target.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub group: String,
    pub target: Target,
    pub cutoff: DateTime<FixedOffset>,
    pub max_entries: usize,
    pub enrich: bool,
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    parser: FeedParser,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            parser: FeedParser::new(),
        })
    }

    /// Shared HTTP client, for lookups that should reuse the connection pool.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// One GET against the target's endpoint, returning the body on a 2xx.
    pub async fn fetch_feed(&self, target: &Target) -> Result<String> {
        let url = Url::parse(&target.url)?;
        let start_time = Instant::now();

        debug!("Fetching feed: {} ({})", target.name, url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(content_length) = response.content_length() {
            self.check_size(content_length)?;
        }

        let content = response.text().await?;
        // Chunked responses carry no Content-Length.
        self.check_size(content.len() as u64)?;
        debug!(
            "Fetched feed: {} ({} bytes in {}ms)",
            target.name,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }

    fn check_size(&self, bytes: u64) -> Result<()> {
        let size_mb = bytes / (1024 * 1024);
        if size_mb > self.config.max_feed_size_mb as u64 {
            return Err(AggregatorError::FeedTooLarge { size_mb });
        }
        Ok(())
    }

    /// Fetch one target and push its in-window items to `sink`, newest first.
    ///
    /// Returns the number of items emitted. Fetch and parse failures are
    /// returned as errors with nothing emitted; entry-level failures are
    /// logged and skipped. The scan stops at the first entry older than the
    /// cutoff, which assumes the source lists entries newest first.
    pub async fn run(
        &self,
        job: &FetchJob,
        lookup: &dyn DurationLookup,
        sink: &UnboundedSender<Item>,
    ) -> Result<usize> {
        let body = self.fetch_feed(&job.target).await?;
        let entries = self.parser.parse_feed(&body)?;
        let offset = job.cutoff.timezone();
        let mut emitted = 0;

        for entry in entries {
            if emitted >= job.max_entries {
                break;
            }

            let published = match entry.timestamp() {
                Ok(published) => published,
                Err(e) => {
                    warn!(feed = %job.target.name, "Skipping entry: {}", e);
                    continue;
                }
            };

            let timestamp = published.with_timezone(&offset);
            if timestamp < job.cutoff {
                debug!(
                    "{}: entry {} is older than the cutoff, stopping scan",
                    job.target.name, entry.id
                );
                break;
            }

            let duration = if job.enrich {
                match lookup.duration(&entry.id).await {
                    Ok(duration) => duration,
                    Err(e) => {
                        debug!("Duration lookup failed for {}: {}", entry.id, e);
                        String::new()
                    }
                }
            } else {
                String::new()
            };

            let item = Item {
                group: job.group.clone(),
                target: job.target.name.clone(),
                title: entry.title,
                id: entry.id,
                link: entry.link,
                duration,
                raw_timestamp: entry.published.unwrap_or_default(),
                timestamp,
            };

            if sink.send(item).is_err() {
                warn!("{}: item receiver closed, stopping early", job.target.name);
                break;
            }
            emitted += 1;
        }

        info!(
            "{} / {}: emitted {} items",
            job.group, job.target.name, emitted
        );
        Ok(emitted)
    }
}
