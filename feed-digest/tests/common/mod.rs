#![allow(dead_code)]

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// An entry for `atom_feed`: id and age.
pub struct TestEntry {
    pub id: String,
    pub published: Option<String>,
}

impl TestEntry {
    pub fn aged(id: &str, now: DateTime<Utc>, age: Duration) -> Self {
        Self {
            id: id.to_string(),
            published: Some((now - age).to_rfc3339_opts(SecondsFormat::Secs, false)),
        }
    }

    pub fn undated(id: &str) -> Self {
        Self {
            id: id.to_string(),
            published: None,
        }
    }
}

/// A YouTube-style Atom feed with entries in the given order.
pub fn atom_feed(channel: &str, entries: &[TestEntry]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://www.youtube.com/xml/schemas/2015">
"#,
    );
    xml.push_str(&format!("  <title>{}</title>\n", channel));
    for entry in entries {
        xml.push_str("  <entry>\n");
        xml.push_str(&format!("    <id>yt:video:{}</id>\n", entry.id));
        xml.push_str(&format!("    <yt:videoId>{}</yt:videoId>\n", entry.id));
        xml.push_str(&format!("    <title>{} upload {}</title>\n", channel, entry.id));
        xml.push_str(&format!(
            "    <link rel=\"alternate\" href=\"https://www.youtube.com/watch?v={}\"/>\n",
            entry.id
        ));
        if let Some(published) = &entry.published {
            xml.push_str(&format!("    <published>{}</published>\n", published));
        }
        xml.push_str("  </entry>\n");
    }
    xml.push_str("</feed>\n");
    xml
}

/// `count` entries an hour apart, newest first, ids prefixed with `prefix`.
pub fn recent_entries(prefix: &str, count: usize, now: DateTime<Utc>) -> Vec<TestEntry> {
    (0..count)
        .map(|i| TestEntry::aged(&format!("{}{}", prefix, i), now, Duration::hours(i as i64 + 1)))
        .collect()
}
