// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Placeholder table consumed by the template engine.
//!
//! Keys are literal placeholders such as `{{PizzaCutter.project_name}}`. A
//! handful of keys carry a `# ` prefix so the placeholder can live inside a
//! comment of a file that must stay syntactically valid before expansion.
//! Placeholders under `PizzaCutter.option.` belong to the engine and are
//! never looked up here.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf}
};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Matches a placeholder, optionally preceded by the `# ` comment prefix.
const PLACEHOLDER: &str = r"(?:# )?\{\{PizzaCutter\.[^{}]+?\}\}";

/// Namespace reserved for engine options like `no_copy` or `no_overwrite`.
const ENGINE_OPTION_PREFIX: &str = "{{PizzaCutter.option.";

/// Values may themselves contain placeholders; substitution repeats at most
/// this many times.
const MAX_SUBSTITUTION_PASSES: usize = 4;

/// Replacement value of one placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternValue {
    /// Inserted verbatim.
    Text(String),
    /// A filesystem location. The engine may resolve it relative to the
    /// template or dereference file contents; [`PatternTable::substitute`]
    /// inserts the display string.
    Path(PathBuf)
}

impl PatternValue {
    /// Text inserted into templates.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Path(path) => path.display().to_string()
        }
    }

    /// Returns the text value, `None` for paths.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Path(_) => None
        }
    }

    /// Returns the path value, `None` for text.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Text(_) => None,
            Self::Path(path) => Some(path)
        }
    }
}

impl From<String> for PatternValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PatternValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<PathBuf> for PatternValue {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

/// Mapping from placeholder to value.
///
/// Stored sorted so serialized tables are reproducible.
///
/// # Example
///
/// ```
/// use pizzacutter_conf::PatternTable;
///
/// let mut table = PatternTable::new();
/// table.insert("{{PizzaCutter.project_name}}", "lib_demo");
/// let text = table.substitute("name = '{{PizzaCutter.project_name}}'")?;
/// assert_eq!(text, "name = 'lib_demo'");
/// assert_eq!(table.unresolved("{{PizzaCutter.author}}")?, ["{{PizzaCutter.author}}"]);
/// # Ok::<(), pizzacutter_conf::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternTable {
    entries: BTreeMap<String, PatternValue>
}

impl PatternTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value for `key`.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<PatternValue>
    {
        self.entries.insert(key.into(), value.into());
    }

    /// Looks up the value for an exact key.
    pub fn get(&self, key: &str) -> Option<&PatternValue> {
        self.entries.get(key)
    }

    /// Returns `true` if the exact key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no key is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatternValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Lists placeholders in `text` that have no entry, in order of first
    /// appearance and without repetition. Engine options are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the placeholder pattern fails to
    /// compile.
    pub fn unresolved(&self, text: &str) -> Result<Vec<String>, Error> {
        let pattern = placeholder_regex()?;
        let mut missing: Vec<String> = Vec::new();
        for found in pattern.find_iter(text) {
            let matched = found.as_str();
            if self.lookup(matched).is_some() {
                continue;
            }
            let placeholder = strip_comment_prefix(matched);
            if !missing.iter().any(|known| known == placeholder) {
                missing.push(placeholder.to_owned());
            }
        }
        Ok(missing)
    }

    /// Fails when `text` references placeholders without an entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedPlaceholders`] listing every missing key.
    pub fn ensure_resolved(&self, text: &str) -> Result<(), Error> {
        let placeholders = self.unresolved(text)?;
        if placeholders.is_empty() {
            Ok(())
        } else {
            Err(Error::UnresolvedPlaceholders {
                placeholders
            })
        }
    }

    /// Replaces every known placeholder in `text`.
    ///
    /// Values containing placeholders are expanded in further passes, so a
    /// fragment may refer to identity keys. Engine options are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedPlaceholders`] when placeholders remain
    /// after the last pass, either because they have no entry or because
    /// their values keep referring back to themselves.
    pub fn substitute(&self, text: &str) -> Result<String, Error> {
        let pattern = placeholder_regex()?;
        let mut current = text.to_owned();
        for _ in 0..MAX_SUBSTITUTION_PASSES {
            let next = pattern
                .replace_all(&current, |captures: &Captures<'_>| {
                    let matched = &captures[0];
                    self.lookup(matched).unwrap_or_else(|| matched.to_owned())
                })
                .into_owned();
            if next == current {
                break;
            }
            current = next;
        }

        let mut remaining: Vec<String> = Vec::new();
        for found in pattern.find_iter(&current) {
            let placeholder = strip_comment_prefix(found.as_str());
            if placeholder.starts_with(ENGINE_OPTION_PREFIX) {
                continue;
            }
            if !remaining.iter().any(|known| known == placeholder) {
                remaining.push(placeholder.to_owned());
            }
        }
        if remaining.is_empty() {
            Ok(current)
        } else {
            Err(Error::UnresolvedPlaceholders {
                placeholders: remaining
            })
        }
    }

    /// Serializes the table as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`] if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String, Error> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(rendered)
    }

    /// Resolves one regex match. A `# `-prefixed match uses the prefixed key
    /// when present and otherwise keeps the prefix around the bare value.
    fn lookup(&self, matched: &str) -> Option<String> {
        let placeholder = strip_comment_prefix(matched);
        if placeholder.starts_with(ENGINE_OPTION_PREFIX) {
            return Some(matched.to_owned());
        }
        if let Some(value) = self.entries.get(matched) {
            return Some(value.render());
        }
        if placeholder.len() != matched.len() {
            return self
                .entries
                .get(placeholder)
                .map(|value| format!("# {}", value.render()));
        }
        None
    }
}

fn strip_comment_prefix(matched: &str) -> &str {
    matched.strip_prefix("# ").unwrap_or(matched)
}

fn placeholder_regex() -> Result<Regex, Error> {
    Regex::new(PLACEHOLDER).map_err(|e| Error::validation(format!("invalid regex: {e}")))
}
