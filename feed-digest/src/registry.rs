use crate::types::{AggregatorError, Group, Result, Target};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which groups a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    All,
    Single(String),
}

impl From<&str> for GroupSelector {
    fn from(value: &str) -> Self {
        if value == "all" {
            GroupSelector::All
        } else {
            GroupSelector::Single(value.to_string())
        }
    }
}

/// Resolves group identifiers to targets from a directory of OPML files.
///
/// Each file in `<root>/opml/` is one group; its file name is the group
/// identifier, including any flag markers.
pub struct SourceRegistry {
    dir: PathBuf,
}

impl SourceRegistry {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join("opml"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Descriptor file names, sorted.
    pub fn list_identifiers(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| AggregatorError::SourceResolution {
            group: "all".to_string(),
            reason: format!("could not read {}: {}", self.dir.display(), e),
        })?;

        let mut identifiers = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                identifiers.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        identifiers.sort();
        Ok(identifiers)
    }

    /// Find the descriptor for a bare or marked group name.
    pub fn find(&self, name: &str) -> Result<Option<String>> {
        let identifiers = self.list_identifiers()?;
        if identifiers.iter().any(|id| id == name) {
            return Ok(Some(name.to_string()));
        }
        Ok(identifiers
            .into_iter()
            .find(|id| Group::bare_identifier(id) == name))
    }

    pub fn load(&self, identifier: &str) -> Result<Group> {
        let path = self.dir.join(identifier);
        let content = fs::read_to_string(&path).map_err(|e| AggregatorError::SourceResolution {
            group: identifier.to_string(),
            reason: format!("could not read {}: {}", path.display(), e),
        })?;

        let group = parse_opml(identifier, &content)?;
        debug!("Loaded group {} with {} targets", group.name, group.targets.len());
        Ok(group)
    }

    /// Resolve a selector into groups.
    ///
    /// A single group that cannot be found or loaded is an error and is always
    /// marked selected. In `All` mode, descriptors that fail to load are skipped.
    pub fn resolve(&self, selector: &GroupSelector) -> Result<Vec<Group>> {
        match selector {
            GroupSelector::Single(name) => {
                let identifier = self
                    .find(name)?
                    .ok_or_else(|| AggregatorError::GroupNotFound(name.clone()))?;
                let mut group = self.load(&identifier)?;
                group.flags.selected = true;
                Ok(vec![group])
            }
            GroupSelector::All => {
                let mut groups = Vec::new();
                for identifier in self.list_identifiers()? {
                    match self.load(&identifier) {
                        Ok(group) => groups.push(group),
                        Err(e) => warn!("Ignoring descriptor {}: {}", identifier, e),
                    }
                }
                Ok(groups)
            }
        }
    }
}

/// Parse an OPML subscription list. Targets are the children of the body's
/// first outline; outlines without an `xmlUrl` are skipped.
pub fn parse_opml(identifier: &str, content: &str) -> Result<Group> {
    let resolution_error = |reason: String| AggregatorError::SourceResolution {
        group: identifier.to_string(),
        reason,
    };

    let doc = roxmltree::Document::parse(content)
        .map_err(|e| resolution_error(format!("malformed OPML: {}", e)))?;

    let outline = doc
        .descendants()
        .find(|n| n.has_tag_name("body"))
        .and_then(|body| body.children().find(|n| n.has_tag_name("outline")))
        .ok_or_else(|| resolution_error("OPML has no body outline".to_string()))?;

    let targets = outline
        .children()
        .filter(|n| n.has_tag_name("outline"))
        .filter_map(|n| {
            let url = n.attribute("xmlUrl")?;
            let name = n.attribute("title").or_else(|| n.attribute("text")).unwrap_or(url);
            Some(Target::new(name, url))
        })
        .collect();

    Ok(Group::from_identifier(identifier, targets))
}
