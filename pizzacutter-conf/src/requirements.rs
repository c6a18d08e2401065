// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Requirement lists derived from feature toggles and `requirements.txt`.
//!
//! A declaration is an opaque string. `pkg>=1` and `pkg>=2 ; python_version <
//! "3.9"` are different items, and deduplication compares whole strings.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{self, Error};

/// Ordered list of dependency declarations.
///
/// Items may be pushed more than once. [`finalize`](Self::finalize) collapses
/// duplicates and sorts the list before it is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementList {
    items: Vec<String>
}

impl RequirementList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a declaration without checking for duplicates.
    pub fn push<S>(&mut self, dependency: S)
    where
        S: Into<String>
    {
        self.items.push(dependency.into());
    }

    /// Ensures `dependency` is present when `enabled`, absent otherwise.
    ///
    /// Enabling an item that is already listed does not insert it again.
    /// Disabling removes every occurrence; disabling an absent item does
    /// nothing.
    ///
    /// # Example
    ///
    /// ```
    /// use pizzacutter_conf::RequirementList;
    ///
    /// let mut list = RequirementList::from_iter(["pytest", "mypy"]);
    /// list.toggle("mypy", false);
    /// list.toggle("codecov", false);
    /// list.toggle("flake8", true);
    /// assert_eq!(list.as_slice(), ["pytest", "flake8"]);
    /// ```
    pub fn toggle(&mut self, dependency: &str, enabled: bool) {
        if enabled {
            if !self.contains(dependency) {
                self.items.push(dependency.to_owned());
            }
        } else {
            self.items.retain(|item| item != dependency);
        }
    }

    /// Returns `true` if the exact declaration is listed.
    pub fn contains(&self, dependency: &str) -> bool {
        self.items.iter().any(|item| item == dependency)
    }

    /// Deduplicates and sorts the list in place and returns the canonical
    /// items. Calling it again leaves the list unchanged.
    pub fn finalize(&mut self) -> &[String] {
        self.items.sort();
        self.items.dedup();
        &self.items
    }

    /// Returns the canonical form without mutating `self`.
    pub fn finalized(&self) -> Vec<String> {
        let mut copy = self.clone();
        copy.finalize();
        copy.items
    }

    /// Newline-joined canonical list, as written into `requirements_test.txt`.
    pub fn render_lines(&self) -> String {
        self.finalized().join("\n")
    }

    /// Items in their current order.
    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    /// Number of items, duplicates included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when the list holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<S> FromIterator<S> for RequirementList
where
    S: Into<String>
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect()
        }
    }
}

/// Reads dependency declarations from a requirements file.
///
/// Trailing `#` comments and surrounding whitespace are stripped and blank
/// lines skipped. A missing file yields an empty list.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file exists but cannot be read.
pub fn load_from_file(path: &Path) -> Result<Vec<String>, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(error::io_error(path, source))
    };

    Ok(contents
        .lines()
        .map(line_data)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Strips a trailing `#` comment and surrounding whitespace from one line.
pub fn line_data(line: &str) -> &str {
    let line = line.trim();
    match line.split_once('#') {
        Some((head, _)) => head.trim(),
        None => line
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tempfile::tempdir;

    use super::*;

    proptest! {
        #[test]
        fn enable_then_disable_leaves_item_absent(
            existing in proptest::collection::vec("[a-c]{1,2}", 0..8),
            item in "[a-c]{1,2}"
        ) {
            let mut list = RequirementList::from_iter(existing);
            list.toggle(&item, true);
            list.toggle(&item, false);
            prop_assert!(!list.contains(&item));
        }

        #[test]
        fn finalize_is_idempotent(items in proptest::collection::vec("[a-d]{1,3}", 0..12)) {
            let mut once = RequirementList::from_iter(items);
            let first = once.finalize().to_vec();
            let second = once.finalize().to_vec();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn toggle_does_not_duplicate_existing_items() {
        let mut list = RequirementList::from_iter(["flake8"]);
        list.toggle("flake8", true);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn toggle_off_removes_every_occurrence() {
        let mut list = RequirementList::from_iter(["flake8", "pytest", "flake8"]);
        list.toggle("flake8", false);
        assert_eq!(list.as_slice(), ["pytest"]);
    }

    #[test]
    fn finalize_sorts_and_dedupes() {
        let mut list = RequirementList::from_iter(["pytest", "black", "pytest", "Mypy"]);
        assert_eq!(list.finalize(), ["Mypy", "black", "pytest"]);
    }

    #[test]
    fn differently_pinned_declarations_are_distinct() {
        let mut list = RequirementList::from_iter(["black==19.3b0", "black", "black==19.3b0"]);
        assert_eq!(list.finalize(), ["black", "black==19.3b0"]);
    }

    #[test]
    fn render_lines_joins_canonical_list() {
        let list = RequirementList::from_iter(["pytest", "coverage", "pytest"]);
        assert_eq!(list.render_lines(), "coverage\npytest");
        assert_eq!(list.len(), 3, "render_lines must not mutate the list");
    }

    #[test]
    fn line_data_strips_comments_and_whitespace() {
        assert_eq!(line_data("pkg  # pinned for CVE-1234"), "pkg");
        assert_eq!(line_data("# comment"), "");
        assert_eq!(line_data("   click   "), "click");
    }

    #[test]
    fn load_from_file_skips_blank_and_comment_lines() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("requirements.txt");
        fs::write(
            &path,
            "click\n\n# only a comment\ntoml  # parsing\n  pip>=24.0   # CVE-2023-5752\n"
        )
        .expect("failed to write requirements");

        let items = load_from_file(&path).expect("load failed");
        assert_eq!(items, vec!["click", "toml", "pip>=24.0"]);
    }

    #[test]
    fn load_from_file_returns_empty_list_when_missing() {
        let dir = tempdir().expect("failed to create tempdir");
        let items = load_from_file(&dir.path().join("requirements.txt")).expect("must not fail");
        assert!(items.is_empty());
    }

    #[test]
    fn load_from_file_reports_directories() {
        let dir = tempdir().expect("failed to create tempdir");
        let error = load_from_file(dir.path()).expect_err("directory is not readable as text");
        assert!(matches!(error, Error::Io { .. }));
    }
}
