use crate::types::{Item, RankedGroup, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

const STYLE: &str = "body{font-family:sans-serif;margin:2em;background:#fafafa}\
details{margin-bottom:1.5em}summary{font-size:1.4em;font-weight:bold;cursor:pointer}\
.muted{opacity:.5}table{border-collapse:collapse;width:100%}\
td{padding:.25em .75em;border-bottom:1px solid #ddd}.when,.duration{white-space:nowrap;color:#555}";

/// Render ranked groups as a standalone HTML page, groups in name order.
pub fn render_html(groups: &BTreeMap<String, RankedGroup>) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Feed digest</title>\n");
    let _ = writeln!(html, "<style>{}</style>", STYLE);
    html.push_str("</head>\n<body>\n");

    for (name, group) in groups {
        let class = if group.muted { "group muted" } else { "group" };
        let open = if group.selected { " open" } else { "" };
        let _ = writeln!(
            html,
            "<details class=\"{}\"{}>\n<summary>{} ({})</summary>\n<table>",
            class,
            open,
            escape(name),
            group.items.len()
        );
        for item in &group.items {
            render_item(&mut html, item);
        }
        html.push_str("</table>\n</details>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_item(html: &mut String, item: &Item) {
    let title = match &item.link {
        Some(link) => format!("<a href=\"{}\">{}</a>", escape(link), escape(&item.title)),
        None => escape(&item.title),
    };
    let _ = writeln!(
        html,
        "<tr><td class=\"when\">{}</td><td>{}</td><td>{}</td><td class=\"duration\">{}</td></tr>",
        escape(&item.display_timestamp()),
        escape(&item.target),
        title,
        escape(&item.duration)
    );
}

pub fn render_json(groups: &BTreeMap<String, RankedGroup>) -> Result<String> {
    Ok(serde_json::to_string_pretty(groups)?)
}

/// Write the page to `<root>/out/index.html`.
pub fn write_output(root: &Path, html: &str) -> Result<PathBuf> {
    let dir = root.join("out");
    fs::create_dir_all(&dir)?;
    let path = dir.join("index.html");
    fs::write(&path, html)?;
    Ok(path)
}

/// Hand the page to the desktop's default viewer. Failures are only logged.
pub fn open_in_viewer(path: &Path) {
    debug!("Opening {}", path.display());
    match Command::new("xdg-open").arg(path).spawn() {
        Ok(_) => {}
        Err(e) => warn!("Could not open {}: {}", path.display(), e),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
