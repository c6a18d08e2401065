// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! GitHub Actions test matrix model.
//!
//! Linux runs one job per [`CiMatrixEntry`]; the rendered block lists them in
//! insertion order. Windows and macOS run a single job each, described by a
//! [`PlatformMatrix`] flag set.

use serde::{Deserialize, Serialize};

use crate::py_literal::py_bool;

/// One row of the Linux test matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct CiMatrixEntry
{
    /// Runner architecture, for example `amd64`.
    pub arch:                  String,
    /// Interpreter version passed to `actions/setup-python`.
    pub python_version:        String,
    /// Build the wheel and sdist.
    #[serde(default = "enabled")]
    pub build:                 bool,
    /// Test the built artifacts.
    #[serde(default = "enabled")]
    pub build_test:            bool,
    /// Rebuild the documentation.
    #[serde(default)]
    pub build_docs:            bool,
    /// Run mypy, further gated by the global mypy switch.
    #[serde(default = "enabled")]
    pub mypy_test:             bool,
    /// Install the package with pip.
    #[serde(default = "enabled")]
    pub do_setup_install:      bool,
    /// Import-test the installed package.
    #[serde(default = "enabled")]
    pub do_setup_install_test: bool,
    /// Call the registered shell command.
    #[serde(default = "enabled")]
    pub do_cli_test:           bool,
}

impl CiMatrixEntry
{
    /// Creates an entry with every job flag enabled except `build_docs`.
    pub fn new(arch: &str, python_version: &str,) -> Self
    {
        Self {
            arch:                  arch.to_owned(),
            python_version:        python_version.to_owned(),
            build:                 true,
            build_test:            true,
            build_docs:            false,
            mypy_test:             true,
            do_setup_install:      true,
            do_setup_install_test: true,
            do_cli_test:           true,
        }
    }

    /// Sets `build_docs`.
    pub fn with_build_docs(mut self, build_docs: bool,) -> Self
    {
        self.build_docs = build_docs;
        self
    }

    /// Sets `do_cli_test`.
    pub fn with_cli_test(mut self, do_cli_test: bool,) -> Self
    {
        self.do_cli_test = do_cli_test;
        self
    }

    /// Renders the YAML fragment for this row.
    ///
    /// `MYPY_DO_TESTS` is only true when both the row and the global switch
    /// ask for it.
    pub fn render(&self, mypy_enabled_in_ci: bool,) -> String
    {
        format!(
            concat!(
                "\n",
                "          - os: ubuntu-latest\n",
                "            python-version: \"{python_version}\"\n",
                "            env:\n",
                "              BUILD_DOCS: \"{build_docs}\"\n",
                "              BUILD: \"{build}\"  \n",
                "              BUILD_TEST: \"{build_test}\"\n",
                "              MYPY_DO_TESTS: \"{mypy}\"\n",
                "              DO_SETUP_INSTALL: \"{setup_install}\"\n",
                "              DO_SETUP_INSTALL_TEST: \"{setup_install_test}\"\n",
                "              DO_CLI_TEST: \"{cli_test}\"\n",
            ),
            python_version = self.python_version,
            build_docs = py_bool(self.build_docs),
            build = py_bool(self.build),
            build_test = py_bool(self.build_test),
            mypy = py_bool(self.mypy_test && mypy_enabled_in_ci),
            setup_install = py_bool(self.do_setup_install),
            setup_install_test = py_bool(self.do_setup_install_test),
            cli_test = py_bool(self.do_cli_test),
        )
    }
}

/// Ordered Linux matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(transparent)]
pub struct LinuxMatrix
{
    entries: Vec<CiMatrixEntry,>,
}

impl LinuxMatrix
{
    /// Creates an empty matrix.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Appends a row. Contradictory flag combinations are accepted as-is.
    pub fn add_entry(&mut self, entry: CiMatrixEntry,)
    {
        self.entries.push(entry,);
    }

    /// Rows in insertion order.
    pub fn entries(&self,) -> &[CiMatrixEntry]
    {
        &self.entries
    }

    /// Returns `true` when no row was added.
    pub fn is_empty(&self,) -> bool
    {
        self.entries.is_empty()
    }

    /// Concatenates the fragments of every row in insertion order.
    pub fn render_linux_block(&self, mypy_enabled_in_ci: bool,) -> String
    {
        self.entries.iter().map(|entry| entry.render(mypy_enabled_in_ci,),).collect()
    }

    /// Distinct interpreter versions in first-seen order.
    ///
    /// # Example
    ///
    /// ```
    /// use pizzacutter_conf::{CiMatrixEntry, LinuxMatrix};
    ///
    /// let mut matrix = LinuxMatrix::new();
    /// for version in ["3.9", "3.8", "3.9", "3.10"] {
    ///     matrix.add_entry(CiMatrixEntry::new("amd64", version,),);
    /// }
    /// assert_eq!(matrix.distinct_versions(), ["3.9", "3.8", "3.10"]);
    /// ```
    pub fn distinct_versions(&self,) -> Vec<&str,>
    {
        first_seen(self.entries.iter().map(|entry| entry.python_version.as_str(),),)
    }

    /// Distinct architectures in first-seen order.
    pub fn distinct_architectures(&self,) -> Vec<&str,>
    {
        first_seen(self.entries.iter().map(|entry| entry.arch.as_str(),),)
    }
}

impl FromIterator<CiMatrixEntry,> for LinuxMatrix
{
    fn from_iter<I: IntoIterator<Item = CiMatrixEntry,>,>(iter: I,) -> Self
    {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn enabled() -> bool
{
    true
}

fn first_seen<'a,>(values: impl Iterator<Item = &'a str,>,) -> Vec<&'a str,>
{
    let mut seen: Vec<&str,> = Vec::new();
    for value in values {
        if !seen.contains(&value,) {
            seen.push(value,);
        }
    }
    seen
}

/// Single-job flag set for Windows or macOS runners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(default)]
pub struct PlatformMatrix
{
    /// Build the wheel and sdist.
    pub build:              bool,
    /// Test the built artifacts.
    pub build_test:         bool,
    /// Rebuild the documentation.
    pub build_docs:         bool,
    /// Run mypy, further gated by the global mypy switch.
    pub mypy_test:          bool,
    /// Install the package with pip.
    pub setup_install:      bool,
    /// Import-test the installed package.
    pub setup_install_test: bool,
    /// Call the registered shell command. Overwritten from `create_cli_file`
    /// when the settings are resolved.
    pub cli_test:           bool,
    /// Interpreter version for the job.
    pub python_version:     String,
}

impl Default for PlatformMatrix
{
    fn default() -> Self
    {
        Self {
            build:              true,
            build_test:         true,
            build_docs:         false,
            mypy_test:          true,
            setup_install:      true,
            setup_install_test: true,
            cli_test:           true,
            python_version:     "3.12".to_owned(),
        }
    }
}

impl PlatformMatrix
{
    /// Placeholder/value pairs for `{{PizzaCutter.gha.<os>.*}}`.
    pub fn patterns(&self, os: &str, mypy_enabled_in_ci: bool,) -> Vec<(String, String,),>
    {
        let key = |field: &str| format!("{{{{PizzaCutter.gha.{os}.{field}}}}}");
        vec![
            (key("build",), py_bool(self.build,).to_owned(),),
            (key("build_test",), py_bool(self.build_test,).to_owned(),),
            (key("build_docs",), py_bool(self.build_docs,).to_owned(),),
            (key("mypy_test",), py_bool(self.mypy_test && mypy_enabled_in_ci,).to_owned(),),
            (key("setup.py.install",), py_bool(self.setup_install,).to_owned(),),
            (key("setup.py.test",), py_bool(self.setup_install_test,).to_owned(),),
            (key("cli.test",), py_bool(self.cli_test,).to_owned(),),
            (key("python.version",), self.python_version.clone(),),
        ]
    }
}
