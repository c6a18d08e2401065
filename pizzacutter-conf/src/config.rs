// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Settings document describing the project a template is expanded into.
//!
//! The types in this module mirror the YAML document consumed by the CLI.
//! Every group carries `#[serde(default)]`, so a document that only names the
//! project is valid and yields the stock template defaults. Values that
//! depend on other values (package directory, CLI module, pyproject fields)
//! are derived later by [`ProjectSettings::resolve`](crate::ProjectSettings::resolve).

use std::{fs, path::Path, path::PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Error},
    matrix::{LinuxMatrix, PlatformMatrix},
    requirements::RequirementList,
};

/// Root settings document.
///
/// # Examples
///
/// ```
/// use pizzacutter_conf::ProjectSettings;
///
/// let yaml = r#"
/// identity:
///   project_name: lib_demo
///   package_name: lib_demo
/// flake8:
///   do_tests_in_gha: false
/// "#;
/// let settings: ProjectSettings = serde_yaml::from_str(yaml,).expect("valid settings",);
/// assert_eq!(settings.identity.project_name, "lib_demo");
/// assert!(settings.flake8.do_tests_in_local_testscript);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize,)]
#[serde(default)]
pub struct ProjectSettings
{
    /// Project identity and authorship.
    pub identity:                 Identity,
    /// PyPI publishing.
    pub pypi:                     PypiSettings,
    /// Command line entry point generation.
    pub cli:                      CliSettings,
    /// Test requirements before toggles are applied.
    pub requirements_test:        RequirementList,
    /// Directories excluded by lint tools.
    pub common_excludes:          Vec<String,>,
    /// Local test script paths.
    pub testscript:               TestscriptSettings,
    /// pytest options.
    pub pytest:                   PytestSettings,
    /// flake8 options.
    pub flake8:                   Flake8Settings,
    /// black options.
    pub black:                    BlackSettings,
    /// mypy options.
    pub mypy:                     MypySettings,
    /// Coverage collection and upload.
    pub coverage:                 CoverageSettings,
    /// GitHub Actions jobs.
    pub gha:                      GhaSettings,
    /// Extra environment variables exported by the workflow.
    pub additional_env_variables: Vec<EnvVariable,>,
    /// README and docs fragments.
    pub docs:                     DocsSettings,
    /// Packaging metadata.
    pub setup:                    SetupSettings,
}

/// Project identity.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct Identity
{
    /// Repository name, used in URLs and the repository slug.
    pub project_name:      String,
    /// Directory below the target directory. Defaults to `project_name`.
    pub project_dir:       Option<String,>,
    /// Python package name; also the default shell command.
    pub package_name:      String,
    /// One-line description, shown on PyPI.
    pub short_description: String,
    /// Explicit version. When absent it is read from `CHANGES.rst`.
    pub version:           Option<String,>,
    /// Author name.
    pub author:            String,
    /// Author e-mail.
    pub author_email:      String,
    /// GitHub account owning the repository.
    pub github_account:    String,
    /// Ship `py.typed` and stub files.
    pub is_typed_package:  bool,
}

impl Default for Identity
{
    fn default() -> Self
    {
        Self {
            project_name:      "pct_python_default_test".to_owned(),
            project_dir:       None,
            package_name:      "pct_python_default_test".to_owned(),
            short_description: "a pizzacutter default test project, crated with PizzaCutter and \
                                the PizzaCutter default python template"
                .to_owned(),
            version:           None,
            author:            "put Your Name here".to_owned(),
            author_email:      "some_email_address@gmail.com".to_owned(),
            github_account:    "your_github_account".to_owned(),
            is_typed_package:  false,
        }
    }
}

/// PyPI publishing.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct PypiSettings
{
    /// Upload tagged builds and show the PyPI badges.
    pub is_pypi_package: bool,
    /// PyPI account name.
    pub account:         String,
}

impl Default for PypiSettings
{
    fn default() -> Self
    {
        Self {
            is_pypi_package: false, account: "your_pypi_account".to_owned(),
        }
    }
}

/// Command line entry point generation.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct CliSettings
{
    /// Generate `<package>_cli.py` and register a console script.
    pub create_cli_file: bool,
}

impl Default for CliSettings
{
    fn default() -> Self
    {
        Self {
            create_cli_file: true,
        }
    }
}

/// Paths exported by the local test script.
#[derive(Debug, Clone, Default, Serialize, Deserialize,)]
#[serde(default)]
pub struct TestscriptSettings
{
    /// Directories appended to `PYTHONPATH`.
    pub additional_pythonpaths:     Vec<PathBuf,>,
    /// Directories appended to `MYPYPATH`.
    pub additional_mypy_paths:      Vec<PathBuf,>,
    /// Directories whose immediate subdirectories are appended to `MYPYPATH`.
    pub additional_mypy_root_paths: Vec<PathBuf,>,
}

/// pytest options.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct PytestSettings
{
    /// Run pytest in GitHub Actions.
    pub do_gha:              bool,
    /// Run pytest in the local test script.
    pub do_local_testscript: bool,
    /// Extra pytest arguments written into `conftest.py`.
    pub additional_args:     Vec<String,>,
    /// Paths pytest must not collect.
    pub collect_ignores:     Vec<String,>,
}

impl Default for PytestSettings
{
    fn default() -> Self
    {
        Self {
            do_gha:              true,
            do_local_testscript: true,
            additional_args:     Vec::new(),
            collect_ignores:     Vec::new(),
        }
    }
}

/// flake8 options.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct Flake8Settings
{
    /// Run flake8 in the local test script.
    pub do_tests_in_local_testscript: bool,
    /// Run flake8 in GitHub Actions.
    pub do_tests_in_gha:              bool,
    /// Error codes to ignore.
    pub ignores:                      Vec<String,>,
    /// Maximum line length.
    pub max_line_length:              u32,
    /// Maximum McCabe complexity.
    pub max_complexity:               u32,
    /// Excluded directories. Defaults to `common_excludes`.
    pub exclude:                      Option<Vec<String,>,>,
}

impl Default for Flake8Settings
{
    fn default() -> Self
    {
        Self {
            do_tests_in_local_testscript: true,
            do_tests_in_gha:              true,
            ignores:                      to_strings(&[
                "E123", "E203", "E402", "F401", "F403", "F405", "W503",
            ],),
            max_line_length:              88,
            max_complexity:               10,
            exclude:                      None,
        }
    }
}

/// black options.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct BlackSettings
{
    /// Reformat sources in the local test script.
    pub auto_in_local_testscript: bool,
    /// Show the black badge. Defaults to `auto_in_local_testscript`.
    pub show_badge:               Option<bool,>,
    /// Maximum line length.
    pub line_length:              u32,
    /// Target interpreter versions.
    pub target_versions:          Vec<String,>,
    /// Files to include.
    pub include_regexp:           String,
    /// Paths to exclude.
    pub exclude_regexp:           String,
}

impl Default for BlackSettings
{
    fn default() -> Self
    {
        Self {
            auto_in_local_testscript: true,
            show_badge:               None,
            line_length:              88,
            target_versions:          to_strings(&["py38", "py39", "py310", "py311", "py312",],),
            include_regexp:           r"\.pyi?$".to_owned(),
            exclude_regexp:           r"/(\.eggs|\.git|\.hg|\.mypy_cache|\.nox|\.tox|\.venv|_build|buck-out|build|dist)/"
                .to_owned(),
        }
    }
}

/// Options used when mypy follows imports of untyped dependencies.
pub const MYPY_STRICT_OPTIONS_FOLLOW_IMPORTS: &[&str] = &[
    "--strict",
    "--no-warn-unused-ignores",
    "--follow-imports=normal",
    "--ignore-missing-imports",
    "--install-types",
    "--non-interactive",
];

/// mypy options.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct MypySettings
{
    /// Run mypy in the local test script.
    pub do_tests_in_local_testscript: bool,
    /// Run mypy in GitHub Actions.
    pub do_tests_in_gha:              bool,
    /// Options for the local test script.
    pub options_testscript:           Vec<String,>,
    /// Options for GitHub Actions.
    pub options_gha:                  Vec<String,>,
}

impl Default for MypySettings
{
    fn default() -> Self
    {
        Self {
            do_tests_in_local_testscript: true,
            do_tests_in_gha:              true,
            options_testscript:           to_strings(MYPY_STRICT_OPTIONS_FOLLOW_IMPORTS,),
            options_gha:                  to_strings(MYPY_STRICT_OPTIONS_FOLLOW_IMPORTS,),
        }
    }
}

/// Coverage collection and upload.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct CoverageSettings
{
    /// Collect coverage in GitHub Actions.
    pub do_gha:              bool,
    /// Collect coverage in the local test script.
    pub do_local_testscript: bool,
    /// Upload to codecov.
    pub upload_codecov:      bool,
    /// Upload to Code Climate.
    pub upload_code_climate: bool,
}

impl Default for CoverageSettings
{
    fn default() -> Self
    {
        Self {
            do_gha:              true,
            do_local_testscript: true,
            upload_codecov:      true,
            upload_code_climate: true,
        }
    }
}

/// GitHub Actions jobs.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct GhaSettings
{
    /// Keep `.github/workflows/python-package.yml` in the project.
    pub add_github_actions: bool,
    /// Run the Linux matrix.
    pub linux_tests:        bool,
    /// Run the macOS job.
    pub osx_tests:          bool,
    /// Run the Windows job.
    pub windows_tests:      bool,
    /// Run the Wine job.
    pub wine_tests:         bool,
    /// Windows job flags.
    pub windows:            PlatformMatrix,
    /// macOS job flags.
    pub osx:                PlatformMatrix,
    /// Linux rows. When absent the stock matrix is used.
    pub linux_matrix:       Option<LinuxMatrix,>,
    /// Raw `services:` block for the Linux job.
    pub services:           String,
}

impl Default for GhaSettings
{
    fn default() -> Self
    {
        Self {
            add_github_actions: true,
            linux_tests:        true,
            osx_tests:          true,
            windows_tests:      true,
            wine_tests:         false,
            windows:            PlatformMatrix {
                build: false,
                build_test: false,
                ..PlatformMatrix::default()
            },
            osx:                PlatformMatrix::default(),
            linux_matrix:       None,
            services:           String::new(),
        }
    }
}

/// Extra workflow environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct EnvVariable
{
    /// Variable name.
    pub key:   String,
    /// Literal value or `${{ secrets.* }}` expression.
    pub value: String,
}

/// README and docs fragments.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct DocsSettings
{
    /// Show the Binder badge; expects `<package>.ipynb` in the project.
    pub badges_with_jupyter:    bool,
    /// Text of the coverage claim, for example `100%`.
    pub code_coverage_bragging: String,
    /// Which CI badge to show. Only `gha` produces badge fragments.
    pub show_which_ci_badge:    String,
}

impl Default for DocsSettings
{
    fn default() -> Self
    {
        Self {
            badges_with_jupyter:    false,
            code_coverage_bragging: "100%".to_owned(),
            show_which_ci_badge:    "gha".to_owned(),
        }
    }
}

/// Packaging metadata.
#[derive(Debug, Clone, Serialize, Deserialize,)]
#[serde(default)]
pub struct SetupSettings
{
    /// Additional package data files.
    pub included_files:                  Vec<String,>,
    /// Minimal interpreter version, without operator.
    pub minimal_python_version_required: String,
    /// Allow running from a zip file. Forced off for typed packages.
    pub zip_safe:                        bool,
    /// Trove classifiers.
    pub classifiers:                     Vec<String,>,
    /// Search keywords.
    pub keywords:                        Vec<String,>,
    /// `[project] license` table.
    pub licence:                         IndexMap<String, String,>,
    /// `[build-system] requires`.
    pub build_system_requires:           Vec<String,>,
    /// `[build-system] build-backend`.
    pub build_system_backend:            String,
}

impl Default for SetupSettings
{
    fn default() -> Self
    {
        Self {
            included_files:                  Vec::new(),
            minimal_python_version_required: "3.8.0".to_owned(),
            zip_safe:                        false,
            classifiers:                     to_strings(&[
                "Development Status :: 5 - Production/Stable",
                "Intended Audience :: Developers",
                "License :: OSI Approved :: MIT License",
                "Natural Language :: English",
                "Operating System :: OS Independent",
                "Programming Language :: Python",
                "Programming Language :: Python :: 3.8",
                "Programming Language :: Python :: 3.9",
                "Programming Language :: Python :: 3.10",
                "Programming Language :: Python :: 3.11",
                "Programming Language :: Python :: 3.12",
                "Programming Language :: Python :: Implementation :: PyPy",
                "Topic :: Software Development :: Libraries :: Python Modules",
            ],),
            keywords:                        Vec::new(),
            licence:                         IndexMap::from([(
                "text".to_owned(),
                "MIT".to_owned(),
            )],),
            build_system_requires:           to_strings(&["setuptools", "setuptools-scm",],),
            build_system_backend:            "setuptools.build_meta".to_owned(),
        }
    }
}

impl ProjectSettings
{
    /// Settings of the stock template: the default identity plus the base
    /// test requirements and lint excludes.
    pub fn stock() -> Self
    {
        Self {
            requirements_test: RequirementList::from_iter([
                "flake8",
                "black",
                "coloredlogs",
                "pytest",
                "pytest-runner",
            ],),
            common_excludes: to_strings(&[
                ".git",
                "__pycache__",
                "build",
                "dist",
                ".eggs",
                ".hg",
                ".mypy_cache",
                ".nox",
                ".tox",
                ".venv",
                "_build",
                "buck-out",
            ],),
            ..Self::default()
        }
    }
}

/// Loads settings from the provided YAML file path.
///
/// Keys missing from the document fall back to [`ProjectSettings::stock`].
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be read, the YAML cannot be
/// deserialized, or the identity is incomplete.
pub fn load_settings(path: &Path,) -> Result<ProjectSettings, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_settings(&contents,)
}

/// Parses settings from a YAML document string.
///
/// # Errors
///
/// Propagates [`Error::Parse`](Error::Parse) when the YAML cannot be decoded
/// and [`Error::Validation`](Error::Validation) when the project or package
/// name is blank.
pub fn parse_settings(contents: &str,) -> Result<ProjectSettings, Error,>
{
    let stock = serde_yaml::to_value(ProjectSettings::stock(),)?;
    let mut merged = stock;
    if !contents.trim().is_empty() {
        let overrides: serde_yaml::Value = serde_yaml::from_str(contents,)?;
        merge_yaml(&mut merged, overrides,);
    }
    let settings: ProjectSettings = serde_yaml::from_value(merged,)?;
    validate(&settings,)?;
    Ok(settings,)
}

/// Overlays `overrides` onto `base`. Mappings merge key by key; any other
/// value replaces the base value wholesale.
fn merge_yaml(base: &mut serde_yaml::Value, overrides: serde_yaml::Value,)
{
    match (base, overrides,) {
        (serde_yaml::Value::Mapping(base,), serde_yaml::Value::Mapping(overrides,),) => {
            for (key, value,) in overrides {
                match base.get_mut(&key,) {
                    Some(existing,) => merge_yaml(existing, value,),
                    None => {
                        base.insert(key, value,);
                    }
                }
            }
        }
        (base, overrides,) => *base = overrides,
    }
}

fn validate(settings: &ProjectSettings,) -> Result<(), Error,>
{
    if settings.identity.project_name.trim().is_empty() {
        return Err(Error::validation("identity.project_name must not be empty",),);
    }
    if settings.identity.package_name.trim().is_empty() {
        return Err(Error::validation("identity.package_name must not be empty",),);
    }
    Ok((),)
}

fn to_strings(values: &[&str],) -> Vec<String,>
{
    values.iter().map(|value| (*value).to_owned(),).collect()
}
