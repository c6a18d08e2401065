#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the pizzacutter-conf crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.

use std::path::{Path, PathBuf};

/// Unified error type returned by the settings loader, the pattern builder,
/// the post-build hooks and the CLI.
///
/// Missing optional inputs are never reported through this type; they are
/// logged as warnings through [`crate::Diagnostics`] and processing continues.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors raised while reading or writing project files.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Location of the file that could not be accessed.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors of the settings document.
    #[error("failed to parse settings: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when the settings violate invariants.
    #[error("invalid settings: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Wraps serialization errors when writing the pattern table.
    #[error("failed to serialize patterns: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// Returned by the TOML formatter for a delimiter other than `"`, `'` or
    /// the empty string.
    #[error("unsupported quote character <{quote}>")]
    UnsupportedQuote {
        /// The rejected delimiter.
        quote: String
    },
    /// A CI addon snippet is required by an enabled toggle but could not be
    /// read.
    #[error("failed to read CI addon snippet {path:?}: {source}")]
    Addon {
        /// Location of the addon snippet.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// A template references placeholders that have no pattern table entry.
    #[error("unresolved placeholders: {placeholders:?}")]
    UnresolvedPlaceholders {
        /// Placeholders in order of first appearance.
        placeholders: Vec<String>
    },
    /// A helper process could not be spawned.
    #[error("failed to run `{command}`: {source}")]
    Subprocess {
        /// Command line that was attempted.
        command: String,
        /// Underlying I/O error.
        source:  std::io::Error
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

/// Creates an [`Error::Addon`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the addon snippet that could not be read.
/// * `source` - I/O error reported by the operating system.
pub fn addon_error(path: &Path, source: std::io::Error) -> Error {
    Error::Addon {
        path: path.to_path_buf(),
        source
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn validation_constructor_populates_message() {
        let error = Error::validation("something went wrong");
        match error {
            Error::Validation {
                ref message
            } => {
                assert_eq!(message, "something went wrong");
            }
            other => panic!("expected validation error, got {other:?}")
        }
    }

    #[test]
    fn to_display_string_matches_display() {
        let error = Error::validation("display me");
        assert_eq!(error.to_string(), error.to_display_string());
    }

    #[test]
    fn io_error_helper_wraps_path_and_source() {
        let path = std::path::Path::new("/tmp/requirements.txt");
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = super::io_error(path, io_error);

        match error {
            Error::Io {
                path: ref stored_path,
                ref source
            } => {
                assert_eq!(stored_path, path);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected io error, got {other:?}")
        }
    }

    #[test]
    fn addon_error_helper_wraps_path_and_source() {
        let path = std::path::Path::new("/tmp/gha_template_osx_addon.yml");
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = super::addon_error(path, io_error);

        match error {
            Error::Addon {
                path: ref stored_path,
                ref source
            } => {
                assert_eq!(stored_path, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected addon error, got {other:?}")
        }
    }

    #[test]
    fn unsupported_quote_names_the_delimiter() {
        let error = Error::UnsupportedQuote {
            quote: "x".to_owned()
        };
        assert_eq!(error.to_string(), "unsupported quote character <x>");
    }

    #[test]
    fn serde_yaml_conversion_maps_to_parse_variant() {
        let error = serde_yaml::from_str::<usize>("not-a-number").unwrap_err();
        let mapped: Error = error.into();
        assert!(matches!(mapped, Error::Parse { .. }));
    }

    #[test]
    fn serde_json_conversion_maps_to_serialize_variant() {
        let invalid = serde_json::from_str::<serde_json::Value>("not-json").unwrap_err();
        let mapped: Error = invalid.into();
        assert!(matches!(mapped, Error::Serialize { .. }));
    }
}
