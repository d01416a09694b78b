//! Pieces shared by requests and responses.

use std::collections::HashMap;
use std::fmt;

/// HTTP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const HTTP_1_1: Version = Version { major: 1, minor: 1 };

    /// Parses the wire form `HTTP/<major>.<minor>`.
    pub fn parse(s: &str) -> Option<Version> {
        let rest = s.strip_prefix("HTTP/")?;
        let (major, minor) = rest.split_once('.')?;
        Some(Version {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::HTTP_1_1
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Case-insensitive header map.
///
/// Names are stored lowercased; repeated names keep their values in
/// insertion order. [`Headers::get_line`] joins multiple values with
/// commas, the form used on the wire.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: HashMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// All values recorded under `name`, in insertion order.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// The comma-joined header line for `name`.
    pub fn get_line(&self, name: &str) -> Option<String> {
        self.get(name).map(|values| values.join(","))
    }

    /// Replaces all values under `name`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// Appends a value, keeping any recorded earlier.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates `(lowercased name, values)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}
