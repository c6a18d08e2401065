// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Project configuration for the PizzaCutter default Python template.
//!
//! A build runs in three stages. [`load_settings`] reads the YAML settings
//! into a [`ProjectSettings`] record, [`ProjectSettings::resolve`] applies the
//! defaults and yields a [`ResolvedConfig`], and
//! [`ResolvedConfig::build_patterns`] produces the [`PatternTable`] the
//! template engine substitutes into every file. The post-build hooks in
//! [`ResolvedConfig::after_build`] finish the generated project.
//!
//! Warnings about missing optional inputs never abort a build; they go to
//! the [`Diagnostics`] sink passed into each stage.

mod builder;
mod config;
mod diagnostics;
mod error;
mod hooks;
mod matrix;
mod patterns;
pub mod py_literal;
mod requirements;
mod resolve;
mod toml_fmt;

pub use config::{
    BlackSettings, CliSettings, CoverageSettings, DocsSettings, EnvVariable, Flake8Settings,
    GhaSettings, Identity, MYPY_STRICT_OPTIONS_FOLLOW_IMPORTS, MypySettings, ProjectSettings,
    PypiSettings, PytestSettings, SetupSettings, TestscriptSettings, load_settings, parse_settings,
};
pub use diagnostics::{Diagnostics, MemoryDiagnostics, TracingDiagnostics};
pub use error::{Error, addon_error, io_error};
pub use hooks::{
    BuildHooks, ConfigHooks, TemplateEngine, ToolCommands, generate_cli_help_doc,
    reformat_as_code_block,
};
pub use matrix::{CiMatrixEntry, LinuxMatrix, PlatformMatrix};
pub use patterns::{PatternTable, PatternValue};
pub use requirements::{RequirementList, line_data, load_from_file};
pub use resolve::{
    BuildPaths, FALLBACK_VERSION, PyprojectFields, ResolvedConfig, default_linux_matrix,
    find_version_in_changelog,
};
pub use toml_fmt::{clean_quotes, dict_to_toml, list_of_dicts_to_toml, list_to_toml};
