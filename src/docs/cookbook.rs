//! Core cookbook entries and built-in SIP header descriptions

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::DocumentationError;

#[derive(Debug, Deserialize)]
struct CookbookFile {
    docs: Vec<CookbookEntry>,
}

#[derive(Debug, Deserialize)]
struct CookbookEntry {
    name: String,
    documentation: String,
}

/// Documentation keyed by core keyword, parameter or function name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookbook {
    entries: BTreeMap<String, String>,
}

impl Cookbook {
    /// Parses `{"docs": [{"name": ..., "documentation": ...}]}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: CookbookFile = serde_json::from_str(json)?;
        let entries = file
            .docs
            .into_iter()
            .map(|e| (e.name, e.documentation))
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, DocumentationError> {
        let text = fs::read_to_string(path).map_err(|source| DocumentationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cookbook = Self::from_json(&text).map_err(|source| DocumentationError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded {} cookbook entries from {:?}", cookbook.entries.len(), path);
        Ok(cookbook)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SIP headers offered as keywords.
pub const SIP_HEADERS: &[(&str, &str)] = &[
    ("Accept", "Media types acceptable in the response."),
    ("Allow", "Methods supported by the user agent."),
    ("Authorization", "Credentials of a user agent for the UAS."),
    ("Call-ID", "Uniquely identifies an invitation or all registrations of a client."),
    ("Contact", "URI at which the user agent can be reached directly."),
    ("Content-Length", "Size of the message body in bytes."),
    ("Content-Type", "Media type of the message body."),
    ("CSeq", "Sequence number and method of the request."),
    ("Event", "Event package of a SUBSCRIBE or NOTIFY."),
    ("Expires", "Relative time after which the message or content expires."),
    ("From", "Initiator of the request."),
    ("Max-Forwards", "Remaining number of hops a request may take."),
    ("Proxy-Authenticate", "Authentication challenge from a proxy."),
    ("Proxy-Authorization", "Credentials of a user agent for a proxy."),
    ("Record-Route", "Proxies that want to stay in the path of subsequent requests."),
    ("Require", "Extensions the UAS must support."),
    ("Route", "Route set the request is forced through."),
    ("Supported", "Extensions supported by the user agent."),
    ("To", "Logical recipient of the request."),
    ("User-Agent", "Software of the user agent originating the request."),
    ("Via", "Path taken by the request so far and where responses go."),
    ("WWW-Authenticate", "Authentication challenge from a UAS or registrar."),
];
