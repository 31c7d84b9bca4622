//! Page snapshots
//!
//! Loads a saved log page into a [`LogDocument`]. HTML snapshots contribute
//! every `<span>` inside a container `<div>`; any other file contributes
//! one element per non-blank line.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};
use thiserror::Error;
use tracing::{debug, warn};

use kdlogs_core::LogDocument;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid container class: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiled patterns for pulling log elements out of HTML
pub struct SnapshotParser {
    container: Regex,
    class_attr: Regex,
    span: Regex,
    tag: Regex,
    entity: Regex,
    container_class: String,
}

impl SnapshotParser {
    pub fn new(container_class: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            container: Regex::new(r"(?is)<div\b([^>]*)>(.*?)</div\s*>")?,
            class_attr: Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            span: Regex::new(r"(?is)<span\b[^>]*>(.*?)</span\s*>")?,
            tag: Regex::new(r"<[^>]*>")?,
            entity: Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")?,
            container_class: container_class.to_string(),
        })
    }

    /// Load a snapshot file
    pub fn load(&self, path: &Path) -> Result<LogDocument, SnapshotError> {
        let content = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = if is_html(path, &content) {
            self.parse_html(&content)
        } else {
            parse_lines(&content)
        };
        if document.is_empty() {
            warn!(path = %path.display(), "Snapshot has no log elements");
        }
        debug!(path = %path.display(), elements = document.len(), "Loaded snapshot");
        Ok(document)
    }

    /// Every span inside a container div, in document order, as text
    pub fn parse_html(&self, html: &str) -> LogDocument {
        let mut document = LogDocument::new();
        for container in self.container.captures_iter(html) {
            if !self.has_container_class(&container[1]) {
                continue;
            }
            for span in self.span.captures_iter(&container[2]) {
                document.push(self.text_content(&span[1]));
            }
        }
        document
    }

    fn has_container_class(&self, attrs: &str) -> bool {
        self.class_attr.captures(attrs).is_some_and(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .is_some_and(|m| m.as_str().split_whitespace().any(|c| c == self.container_class))
        })
    }

    /// Strip markup and decode entities
    fn text_content(&self, inner: &str) -> String {
        let stripped = self.tag.replace_all(inner, "");
        self.entity
            .replace_all(&stripped, |caps: &Captures| decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string()))
            .into_owned()
    }
}

fn is_html(path: &Path, content: &str) -> bool {
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    by_extension || content.trim_start().starts_with('<')
}

/// One element per non-blank line
pub fn parse_lines(content: &str) -> LogDocument {
    LogDocument::from_texts(
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty()),
    )
}

fn decode_entity(name: &str) -> Option<String> {
    let decoded = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(decoded.to_string())
}
