use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use serde::Serialize;

/// Display flags a group carries into the rendered digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupFlags {
    pub selected: bool,
    pub muted: bool,
}

/// One fetchable feed belonging to a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub url: String,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A named collection of targets, decoded once from its source identifier.
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub flags: GroupFlags,
    pub targets: Vec<Target>,
}

impl Group {
    pub const SELECTED_MARKER: char = '#';
    pub const MUTED_MARKER: char = '!';

    /// Build a group from an identifier such as `music#` or `news!`.
    pub fn from_identifier(identifier: &str, targets: Vec<Target>) -> Self {
        let (name, flags) = Self::decode_identifier(identifier);
        Self {
            name,
            flags,
            targets,
        }
    }

    /// Split trailing flag markers off an identifier and title-case the rest.
    /// Markers may be combined in any order (`name#!` and `name!#` are both selected and muted).
    pub fn decode_identifier(identifier: &str) -> (String, GroupFlags) {
        let mut flags = GroupFlags::default();
        let mut base = identifier;
        loop {
            if let Some(rest) = base.strip_suffix(Self::SELECTED_MARKER) {
                flags.selected = true;
                base = rest;
            } else if let Some(rest) = base.strip_suffix(Self::MUTED_MARKER) {
                flags.muted = true;
                base = rest;
            } else {
                break;
            }
        }
        (title_case(base), flags)
    }

    /// The identifier with any flag markers removed, case untouched.
    pub fn bare_identifier(identifier: &str) -> &str {
        identifier.trim_end_matches([Self::SELECTED_MARKER, Self::MUTED_MARKER])
    }
}

fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

/// One fetched feed entry, ready for bucketing.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub group: String,
    pub target: String,
    pub title: String,
    pub id: String,
    pub link: Option<String>,
    /// Empty unless enrichment ran and succeeded.
    pub duration: String,
    /// Publication date as the source wrote it.
    pub raw_timestamp: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl Item {
    pub fn display_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// A group's flags plus its items, newest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankedGroup {
    pub selected: bool,
    pub muted: bool,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "feed-digest/0.1".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Upper bound on items emitted per target.
    pub max_entries: usize,
    pub enrich: bool,
    pub window_days: i64,
    /// `None` launches every fetcher at once.
    pub max_concurrency: Option<usize>,
    pub report_offset: FixedOffset,
    /// Enrichment endpoint; `{id}` is replaced with the item id.
    pub lookup_url: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_entries: 5,
            enrich: false,
            window_days: 7,
            max_concurrency: None,
            report_offset: *Local::now().offset(),
            lookup_url: "http://youtube.com/get_video_info?video_id={id}".to_string(),
        }
    }
}

impl DigestConfig {
    /// Oldest instant still eligible for inclusion, in the reporting offset.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        (now - Duration::days(self.window_days)).with_timezone(&self.report_offset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(AggregatorError::General(
                "max_entries must be at least 1".to_string(),
            ));
        }
        if self.window_days < 0 {
            return Err(AggregatorError::General(
                "window_days must not be negative".to_string(),
            ));
        }
        if self.max_concurrency == Some(0) {
            return Err(AggregatorError::General(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: u64 },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid timestamp: {value}")]
    Timestamp { value: String },

    #[error("Could not resolve group {group}: {reason}")]
    SourceResolution { group: String, reason: String },

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
