use crate::types::{AggregatorError, Result};
use chrono::{DateTime, FixedOffset};
use feed_rs::parser;
use tracing::{debug, warn};

/// Atom ids on video feeds are `yt:video:<id>`; items keep only the trailing id.
const VIDEO_ID_PREFIX: &str = "yt:video:";

#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub id: String,
    pub title: String,
    pub link: Option<String>,
    /// Publication date exactly as the source wrote it.
    pub published: Option<String>,
}

impl ParsedEntry {
    /// The entry's publication instant. Only RFC 3339 with an explicit offset
    /// is accepted; anything else, or no date at all, is a timestamp error.
    pub fn timestamp(&self) -> Result<DateTime<FixedOffset>> {
        let raw = self.published.as_deref().ok_or_else(|| AggregatorError::Timestamp {
            value: format!("no published date on entry {}", self.id),
        })?;

        DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| AggregatorError::Timestamp {
            value: format!("{:?} on entry {}: {}", raw, self.id, e),
        })
    }
}

#[derive(Debug, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an RSS or Atom body into entries, preserving source order.
    pub fn parse_feed(&self, content: &str) -> Result<Vec<ParsedEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut dates = published_dates(content)?;
        if dates.len() != feed.entries.len() {
            warn!(
                "Found {} entry dates for {} entries, dates will be ignored",
                dates.len(),
                feed.entries.len()
            );
            dates = vec![None; feed.entries.len()];
        }

        let entries: Vec<ParsedEntry> = feed
            .entries
            .into_iter()
            .zip(dates)
            .map(|(entry, published)| Self::parse_entry(entry, published))
            .collect();

        debug!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    fn parse_entry(entry: feed_rs::model::Entry, published: Option<String>) -> ParsedEntry {
        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string());
        let link = entry.links.first().map(|l| l.href.clone());

        ParsedEntry {
            id: item_id(&entry.id),
            title,
            link,
            published,
        }
    }
}

/// Raw publication text of every Atom `<entry>` (`<published>`) or RSS
/// `<item>` (`<pubDate>`), in document order.
///
/// feed-rs normalises dates on its own terms and drops the source text, so
/// the raw values are read separately.
fn published_dates(content: &str) -> Result<Vec<Option<String>>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(content, options)
        .map_err(|e| AggregatorError::Parse(format!("Failed to read feed XML: {}", e)))?;

    let dates: Vec<Option<String>> = doc
        .descendants()
        .filter(|node| is_entry(node))
        .map(|entry| {
            entry
                .children()
                .find(|child| {
                    child.is_element()
                        && matches!(child.tag_name().name(), "published" | "pubDate")
                })
                .and_then(|child| child.text())
                .map(str::to_string)
        })
        .collect();

    Ok(dates)
}

fn is_entry(node: &roxmltree::Node) -> bool {
    if !node.is_element() || !matches!(node.tag_name().name(), "entry" | "item") {
        return false;
    }
    // Atom entries hang off the root, RSS 2 items off <channel>, RSS 1 items off <rdf:RDF>.
    node.parent_element()
        .map(|parent| {
            parent == node.document().root_element() || parent.tag_name().name() == "channel"
        })
        .unwrap_or(false)
}

pub fn item_id(entry_id: &str) -> String {
    entry_id
        .strip_prefix(VIDEO_ID_PREFIX)
        .unwrap_or(entry_id)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://www.youtube.com/xml/schemas/2015">
  <title>Channel</title>
  <entry>
    <id>yt:video:first</id>
    <title>Newest upload</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=first"/>
    <published>2026-10-14T10:00:00+00:00</published>
  </entry>
  <entry>
    <id>urn:entry:second</id>
    <title>Older post</title>
    <published>2026-10-13T08:30:00+02:00</published>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_preserves_order_and_ids() {
        let entries = FeedParser::new().parse_feed(FEED).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "first");
        assert_eq!(entries[0].title, "Newest upload");
        assert_eq!(
            entries[0].link.as_deref(),
            Some("https://www.youtube.com/watch?v=first")
        );
        assert_eq!(entries[1].id, "urn:entry:second");
        assert_eq!(
            entries[1].published.as_deref(),
            Some("2026-10-13T08:30:00+02:00")
        );
        assert_eq!(
            entries[1].timestamp().unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 13, 6, 30, 0).unwrap()
        );
        assert_eq!(entries[1].timestamp().unwrap().offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        let err = FeedParser::new().parse_feed("this is not a feed").unwrap_err();
        assert!(matches!(err, AggregatorError::Parse(_)));
    }

    #[test]
    fn test_missing_published_is_a_timestamp_error() {
        let feed = FEED.replace("<published>2026-10-14T10:00:00+00:00</published>", "");
        let entries = FeedParser::new().parse_feed(&feed).unwrap();

        assert!(matches!(
            entries[0].timestamp(),
            Err(AggregatorError::Timestamp { .. })
        ));
        assert!(entries[1].timestamp().is_ok());
    }

    #[test]
    fn test_only_rfc3339_with_offset_is_accepted() {
        let dates = [
            "2026-10-14T10:00:00",
            "Wed, 14 Oct 2026 10:00:00 +0000",
            "not a date",
            "2026-10-14T10:00:00Z",
        ];
        for (raw, ok) in dates.iter().zip([false, false, false, true]) {
            let entry = ParsedEntry {
                id: "x".to_string(),
                title: String::new(),
                link: None,
                published: Some(raw.to_string()),
            };
            assert_eq!(entry.timestamp().is_ok(), ok, "{}", raw);
        }
    }

    #[test]
    fn test_rss_items_keep_their_raw_pub_date() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Radio</title>
    <item>
      <guid>ep-2</guid>
      <title>Episode 2</title>
      <pubDate>2026-10-14T10:00:00+01:00</pubDate>
    </item>
    <item>
      <guid>ep-1</guid>
      <title>Episode 1</title>
      <pubDate>Mon, 12 Oct 2026 10:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;
        let entries = FeedParser::new().parse_feed(rss).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].published.as_deref(), Some("2026-10-14T10:00:00+01:00"));
        assert!(entries[0].timestamp().is_ok());
        assert!(matches!(
            entries[1].timestamp(),
            Err(AggregatorError::Timestamp { .. })
        ));
    }
}
