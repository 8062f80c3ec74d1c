use crate::version::{IncrementLevel, Version, VersionError};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use quick_xml::NsReader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";
pub const VERSION_TAG: &str = "version";
pub const DEFAULT_POM_PATH: &str = "pom.xml";

#[derive(Debug, Error)]
pub enum PomError {
    #[error("Failed to read POM document '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse POM document '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },
    #[error("Malformed POM document '{}': {}", path.display(), message)]
    Malformed { path: PathBuf, message: String },
    #[error("Failed to serialize POM document '{}': {}", path.display(), message)]
    Serialize { path: PathBuf, message: String },
    #[error("Failed to write POM document '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a single [`update_parent_version`] run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { previous: Version, current: Version },
    /// No usable version element; the file was left untouched.
    VersionNotFound,
}

/// One event of the document, with the element name already resolved
/// against the namespaces in scope where it appeared.
#[derive(Debug, Clone)]
struct Node {
    event: Event<'static>,
    is_version: bool,
}

impl Node {
    fn plain(event: Event<'static>) -> Self {
        Node { event, is_version: false }
    }
}

/// Location of a version element as indices into the document's events.
/// `start == end` for a self-closing `<version/>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VersionElement {
    start: usize,
    end: usize,
}

/// Finds the first descendant of the root, in document order, named `version`
/// in the POM namespace. The root itself is never a match.
pub fn find_version_element(document: &PomDocument) -> Option<VersionElement> {
    let mut depth = 0usize;
    let mut open: Option<(usize, usize)> = None;
    for (index, node) in document.nodes.iter().enumerate() {
        match &node.event {
            Event::Start(_) => {
                if open.is_none() && depth > 0 && node.is_version {
                    open = Some((index, depth));
                }
                depth += 1;
            }
            Event::Empty(_) if open.is_none() && depth > 0 && node.is_version => {
                return Some(VersionElement { start: index, end: index });
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if let Some((start, at)) = open {
                    if depth == at {
                        return Some(VersionElement { start, end: index });
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn serialize_error(path: &Path, error: impl std::fmt::Display) -> PomError {
    PomError::Serialize {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

fn is_version_start(resolved: &ResolveResult, local_name: &[u8]) -> bool {
    local_name == VERSION_TAG.as_bytes()
        && matches!(resolved, ResolveResult::Bound(Namespace(ns)) if *ns == POM_NAMESPACE.as_bytes())
}

/// An XML POM held as its event stream, tied to the path it will be written
/// back to. Events other than the version text are written back as read.
#[derive(Debug, Clone)]
pub struct PomDocument {
    path: PathBuf,
    nodes: Vec<Node>,
}

impl PomDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PomError> {
        let path = path.as_ref();
        debug!("Reading POM document: '{}'", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| PomError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> Result<Self, PomError> {
        let path = path.into();
        let malformed = |message: &str| PomError::Malformed {
            path: path.clone(),
            message: message.to_string(),
        };

        let mut reader = NsReader::from_str(contents);
        let mut nodes = Vec::new();
        let mut depth = 0usize;
        let mut roots = 0usize;
        loop {
            let (resolved, event) = reader.read_resolved_event().map_err(|source| PomError::Parse {
                path: path.clone(),
                source,
            })?;
            let is_version = match &event {
                Event::Start(e) | Event::Empty(e) => {
                    is_version_start(&resolved, e.local_name().as_ref())
                }
                _ => false,
            };
            match &event {
                Event::Start(_) => {
                    if depth == 0 {
                        roots += 1;
                    }
                    depth += 1;
                }
                Event::Empty(_) if depth == 0 => roots += 1,
                Event::End(_) => {
                    depth = depth.checked_sub(1).ok_or_else(|| malformed("unexpected closing tag"))?;
                }
                Event::Eof => break,
                _ => {}
            }
            nodes.push(Node { event: event.into_owned(), is_version });
        }

        if depth != 0 {
            return Err(malformed("unclosed element at end of document"));
        }
        if roots != 1 {
            return Err(malformed("expected exactly one root element"));
        }
        Ok(PomDocument { path, nodes })
    }

    /// Text content of `element`, CDATA included and entities resolved.
    pub fn text(&self, element: VersionElement) -> Result<String, VersionError> {
        let mut text = String::new();
        let mut depth = 0usize;
        let inner = self.nodes.get(element.start + 1..element.end).unwrap_or_default();
        for node in inner {
            match &node.event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Text(t) if depth == 0 => {
                    let unescaped = t
                        .unescape()
                        .map_err(|_| VersionError::Invalid(String::from_utf8_lossy(t).into_owned()))?;
                    text.push_str(&unescaped);
                }
                Event::CData(c) if depth == 0 => text.push_str(&String::from_utf8_lossy(c)),
                _ => {}
            }
        }
        Ok(text)
    }

    /// Reads the current version. An element with empty text counts as missing.
    pub fn current_version(&self) -> Result<Option<Version>, VersionError> {
        let Some(element) = find_version_element(self) else {
            return Ok(None);
        };
        let text = self.text(element)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Version::parse(&text).map(Some)
    }

    /// Replaces the text of the version element. Returns `false` if there is none.
    pub fn set_version(&mut self, version: &Version) -> bool {
        let Some(element) = find_version_element(self) else {
            return false;
        };
        let text = Node::plain(Event::Text(BytesText::new(&version.to_string()).into_owned()));

        if element.start == element.end {
            let Event::Empty(start) = &self.nodes[element.start].event else {
                return false;
            };
            let start = start.clone();
            let end = start.to_end().into_owned();
            self.nodes.splice(
                element.start..=element.start,
                [
                    Node { event: Event::Start(start), is_version: true },
                    text,
                    Node::plain(Event::End(end)),
                ],
            );
            return true;
        }

        // nested markup and comments stay, direct text is replaced
        let mut depth = 0usize;
        let mut kept = vec![text];
        for node in &self.nodes[element.start + 1..element.end] {
            match &node.event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Text(_) | Event::CData(_) if depth == 0 => continue,
                _ => {}
            }
            kept.push(node.clone());
        }
        self.nodes.splice(element.start + 1..element.end, kept);
        true
    }

    /// Whether the root already carries whitespace between its children.
    fn is_indented(&self) -> bool {
        let mut depth = 0usize;
        for node in &self.nodes {
            match &node.event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Text(t) if depth > 0 && t.iter().all(u8::is_ascii_whitespace) => return true,
                _ => {}
            }
        }
        false
    }

    /// Serializes the document behind a UTF-8 XML declaration. Existing
    /// formatting is kept byte for byte; a document with no whitespace between
    /// elements is indented with two spaces.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PomError> {
        let indented = self.is_indented();
        let mut writer = if indented {
            Writer::new(Vec::new())
        } else {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        };

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| serialize_error(&self.path, e))?;
        let has_declaration = matches!(self.nodes.first().map(|n| &n.event), Some(Event::Decl(_)));
        if indented && !has_declaration {
            writer.write_event(Event::Text(BytesText::new("\n"))).map_err(|e| serialize_error(&self.path, e))?;
        }
        for node in &self.nodes {
            if matches!(node.event, Event::Decl(_) | Event::Eof) {
                continue;
            }
            writer.write_event(node.event.clone()).map_err(|e| serialize_error(&self.path, e))?;
        }

        let mut buffer = writer.into_inner();
        if !buffer.ends_with(b"\n") {
            buffer.push(b'\n');
        }
        Ok(buffer)
    }

    /// Overwrites the source file. The document is serialized in full before
    /// the file is opened.
    pub fn save(&self) -> Result<(), PomError> {
        let contents = self.to_bytes()?;
        std::fs::write(&self.path, contents).map_err(|source| PomError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!("Wrote POM document: '{}'", self.path.display());
        Ok(())
    }
}

/// Bumps the version of the POM at `path` by `level` and writes it back.
pub fn update_parent_version(path: impl AsRef<Path>, level: IncrementLevel) -> Result<UpdateOutcome> {
    let path = path.as_ref();
    let mut document = PomDocument::open(path)?;

    let Some(previous) = document
        .current_version()
        .with_context(|| format!("Failed to read version from '{}'", path.display()))?
    else {
        warn!("No <version> element in namespace {} found in '{}'", POM_NAMESPACE, path.display());
        return Ok(UpdateOutcome::VersionNotFound);
    };

    let current = previous.increment(level)?;
    info!("Incrementing {} version from {} -> {}", level, previous, current);

    document.set_version(&current);
    document.save()?;

    Ok(UpdateOutcome::Updated { previous, current })
}
