mod common;

use common::init_tracing;
use feed_digest::render::{render_html, write_output};
use feed_digest::{AggregatorError, GroupSelector, SourceRegistry};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn opml(targets: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\"?>\n<opml version=\"1.1\">\n<body>\n<outline text=\"Subscriptions\">\n",
    );
    for (title, url) in targets {
        xml.push_str(&format!(
            "<outline text=\"{0}\" title=\"{0}\" type=\"rss\" xmlUrl=\"{1}\"/>\n",
            title, url
        ));
    }
    xml.push_str("</outline>\n</body>\n</opml>\n");
    xml
}

fn registry_with(files: &[(&str, String)]) -> (TempDir, SourceRegistry) {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("opml");
    fs::create_dir_all(&dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
    let registry = SourceRegistry::new(root.path());
    (root, registry)
}

#[test]
fn test_single_group_is_found_by_bare_name_and_selected() {
    init_tracing();

    let (_root, registry) = registry_with(&[
        ("music#", opml(&[("Band", "https://example.com/band.xml")])),
        ("news", opml(&[("Daily", "https://example.com/daily.xml")])),
    ]);

    assert_eq!(registry.find("music").unwrap().as_deref(), Some("music#"));
    assert_eq!(registry.find("news").unwrap().as_deref(), Some("news"));
    assert_eq!(registry.find("sports").unwrap(), None);

    let groups = registry
        .resolve(&GroupSelector::Single("news".to_string()))
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "News");
    assert!(groups[0].flags.selected);
    assert_eq!(groups[0].targets[0].url, "https://example.com/daily.xml");
}

#[test]
fn test_single_group_failures_are_fatal() {
    init_tracing();

    let (_root, registry) = registry_with(&[("broken", "<opml><body>".to_string())]);

    let err = registry
        .resolve(&GroupSelector::Single("missing".to_string()))
        .unwrap_err();
    assert!(matches!(err, AggregatorError::GroupNotFound(_)));

    let err = registry
        .resolve(&GroupSelector::Single("broken".to_string()))
        .unwrap_err();
    assert!(matches!(err, AggregatorError::SourceResolution { .. }));
}

#[test]
fn test_all_groups_skips_unreadable_descriptors() {
    init_tracing();

    let (_root, registry) = registry_with(&[
        ("music#", opml(&[("Band", "https://example.com/band.xml")])),
        ("broken", "<opml><body>".to_string()),
        (
            "late night!",
            opml(&[
                ("Host", "https://example.com/host.xml"),
                ("Guest", "https://example.com/guest.xml"),
            ]),
        ),
    ]);

    let groups = registry.resolve(&GroupSelector::All).unwrap();
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();

    assert_eq!(names, vec!["Late Night", "Music"]);
    assert!(groups[0].flags.muted);
    assert!(!groups[0].flags.selected);
    assert_eq!(groups[0].targets.len(), 2);
    assert!(groups[1].flags.selected);
}

#[test]
fn test_missing_descriptor_directory_is_a_resolution_error() {
    let root = tempfile::tempdir().unwrap();
    let registry = SourceRegistry::new(root.path());

    let err = registry.resolve(&GroupSelector::All).unwrap_err();
    assert!(matches!(err, AggregatorError::SourceResolution { .. }));
}

#[test]
fn test_write_output_creates_index() {
    let root = tempfile::tempdir().unwrap();
    let html = render_html(&BTreeMap::new());

    let path = write_output(root.path(), &html).unwrap();

    assert_eq!(path, root.path().join("out").join("index.html"));
    assert!(Path::new(&path).exists());
    assert_eq!(fs::read_to_string(path).unwrap(), html);
}
