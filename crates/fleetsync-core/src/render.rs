//! Config artifact rendering.
//!
//! Templates use `{{name}}` placeholders filled from an [`EnvironmentSnapshot`].
//! Rendering is a pure function of the template text and the snapshot.

use std::borrow::Cow;
use std::path::Path;

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

use crate::error::RenderError;
use crate::snapshot::EnvironmentSnapshot;

/// Built-in template for a Restate server node.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/restate.toml.tmpl");

/// Default port peers are reached on.
pub const DEFAULT_PEER_PORT: u16 = 5122;

/// Placeholders understood by [`ConfigTemplate::render`].
pub const PLACEHOLDERS: &[&str] = &[
    "app_name",
    "region",
    "host",
    "node_name",
    "ipv4",
    "ipv6",
    "timestamp",
    "peers",
    "peer_urls",
    "peer_count",
    "peer_port",
];

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder regex is valid"));

/// A static config template.
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    source: Cow<'static, str>,
    peer_port: u16,
}

impl ConfigTemplate {
    /// The compiled-in Restate template.
    pub fn builtin() -> Self {
        Self {
            source: Cow::Borrowed(DEFAULT_TEMPLATE),
            peer_port: DEFAULT_PEER_PORT,
        }
    }

    /// Template from an in-memory string.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Cow::Owned(source.into()),
            peer_port: DEFAULT_PEER_PORT,
        }
    }

    /// Load a template from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| RenderError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(source))
    }

    /// Set the port used for `{{peer_urls}}` and `{{peer_port}}`.
    pub fn with_peer_port(mut self, port: u16) -> Self {
        self.peer_port = port;
        self
    }

    pub fn peer_port(&self) -> u16 {
        self.peer_port
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Check that every placeholder in the template is known.
    pub fn validate(&self) -> Result<(), RenderError> {
        for caps in PLACEHOLDER_RE.captures_iter(&self.source) {
            let name = &caps[1];
            if !PLACEHOLDERS.contains(&name) {
                return Err(RenderError::UnknownPlaceholder(name.to_string()));
            }
        }
        Ok(())
    }

    /// Render the template for `snapshot`.
    pub fn render(&self, snapshot: &EnvironmentSnapshot) -> Result<String, RenderError> {
        self.validate()?;

        let rendered = PLACEHOLDER_RE.replace_all(&self.source, |caps: &Captures<'_>| {
            self.value_of(&caps[1], snapshot).unwrap_or_default()
        });

        Ok(rendered.into_owned())
    }

    fn value_of(&self, name: &str, snapshot: &EnvironmentSnapshot) -> Option<String> {
        let value = match name {
            "app_name" => snapshot.app_name.clone(),
            "region" => snapshot.region.clone(),
            "host" => snapshot.host.clone(),
            "node_name" => snapshot.node_id.clone(),
            "ipv4" => snapshot.ipv4.to_string(),
            "ipv6" => snapshot.ipv6.to_string(),
            "timestamp" => snapshot.timestamp.to_rfc3339(),
            "peers" => string_array(snapshot.peers.iter().cloned()),
            "peer_urls" => string_array(
                snapshot
                    .peers
                    .iter()
                    .map(|peer| peer_url(peer, self.peer_port)),
            ),
            "peer_count" => snapshot.peers.len().to_string(),
            "peer_port" => self.peer_port.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

impl Default for ConfigTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

/// URL a peer is reached on.
pub fn peer_url(host: &str, port: u16) -> String {
    format!("http://{}:{}/", host, port)
}

/// Inline array of quoted strings, valid in both TOML and JSON.
fn string_array(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string())
}
