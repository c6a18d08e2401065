// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Defaults stage turning [`ProjectSettings`] into a [`ResolvedConfig`].
//!
//! Resolution derives every name the templates need from the identity,
//! applies the requirement toggles, reads `requirements.txt` and
//! `CHANGES.rst` from the target project and fills the pyproject fields. The
//! result is read-only; the pattern table is built from it by
//! [`ResolvedConfig::build_patterns`](crate::ResolvedConfig::build_patterns).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::{
    config::ProjectSettings,
    diagnostics::Diagnostics,
    error::{self, Error},
    matrix::{CiMatrixEntry, LinuxMatrix, PlatformMatrix},
    requirements::{self, RequirementList},
};

/// Version used when neither the settings nor `CHANGES.rst` provide one.
pub const FALLBACK_VERSION: &str = "0.0.1";

/// Package data entries that only make sense for typed packages.
const TYPED_PACKAGE_FILES: [&str; 3] = ["py.typed", "*.pyi", "__init__.pyi",];

/// First version heading of a changelog, with optional `v` prefix.
const CHANGELOG_VERSION: &str = r"(?m)^\s*v?(\d+(?:\.\d+)+(?:[-.]?(?:a|b|rc|dev|post)\d*)?)\b";

/// Locations and date of one template build.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct BuildPaths
{
    /// Settings file driving the build.
    pub conf_file:    PathBuf,
    /// Root of the template tree.
    pub template_dir: PathBuf,
    /// Directory the project is generated into.
    pub target_dir:   PathBuf,
    /// Build date, used for copyright years and the `date` placeholder.
    pub today:        NaiveDate,
}

impl BuildPaths
{
    /// Creates build paths dated today in local time.
    pub fn new(
        conf_file: impl Into<PathBuf,>,
        template_dir: impl Into<PathBuf,>,
        target_dir: impl Into<PathBuf,>,
    ) -> Self
    {
        Self {
            conf_file:    conf_file.into(),
            template_dir: template_dir.into(),
            target_dir:   target_dir.into(),
            today:        chrono::Local::now().date_naive(),
        }
    }

    /// Replaces the build date.
    pub fn with_date(mut self, today: NaiveDate,) -> Self
    {
        self.today = today;
        self
    }
}

/// Fields rendered into `pyproject.toml`.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PyprojectFields
{
    /// `[build-system] requires`.
    pub build_system_requires: Vec<String,>,
    /// `[build-system] build-backend`.
    pub build_system_backend:  String,
    /// Distribution name.
    pub name:                  String,
    /// One `{name, email}` table per author.
    pub authors:               Vec<IndexMap<String, String,>,>,
    /// One-line project summary.
    pub description:           String,
    /// Lower bound such as `>=3.8.0`.
    pub requires_python:       String,
    /// PyPI keywords.
    pub keywords:              Vec<String,>,
    /// `license` inline table.
    pub licence:               IndexMap<String, String,>,
    /// Trove classifiers.
    pub classifiers:           Vec<String,>,
    /// Runtime dependencies read from `<project>/requirements.txt`.
    pub dependencies:          Vec<String,>,
    /// Project version.
    pub version:               String,
}

/// Settings with every derived value filled in.
///
/// Only [`ProjectSettings::resolve`] constructs this type, so a pattern table
/// can never be built from settings whose defaults were not applied.
#[derive(Debug, Clone,)]
#[non_exhaustive]
pub struct ResolvedConfig
{
    /// Settings after toggles and typed-package adjustments.
    pub settings:          ProjectSettings,
    /// Directories and date of this build.
    pub paths:             BuildPaths,
    /// Configured or discovered version.
    pub version:           String,
    /// Directory name of the generated project.
    pub project_dir:       String,
    /// Docs directory relative to the project.
    pub docs_dir:          String,
    /// Console script name.
    pub shell_command:     String,
    /// Package directory inside the project.
    pub package_dir:       String,
    /// Module holding the package entry point.
    pub main_module:       String,
    /// Module holding the CLI, `<package>_cli`.
    pub cli_module:        String,
    /// CLI entry function.
    pub cli_method:        String,
    /// `__title__` of the generated package.
    pub init_title:        String,
    /// `__name__` of the generated package.
    pub init_name:         String,
    /// Absolute project directory under the target.
    pub path_project_dir:  PathBuf,
    /// Absolute package directory.
    pub path_package_dir:  PathBuf,
    /// GitHub project URL.
    pub url:               String,
    /// `git+https` URL of the default branch.
    pub github_master:     String,
    /// `<account>/<project>`.
    pub repository_slug:   String,
    /// Linux CI rows after the CLI toggle was applied.
    pub linux_matrix:      LinuxMatrix,
    /// Windows CI flags.
    pub windows:           PlatformMatrix,
    /// macOS CI flags.
    pub osx:               PlatformMatrix,
    /// Effective flake8 exclude list.
    pub flake8_exclude:    Vec<String,>,
    /// Whether the README shows the black badge.
    pub black_show_badge:  bool,
    /// `setup.py` `entry_points`.
    pub entry_points:      IndexMap<String, Vec<String,>,>,
    /// `setup.py` `package_data`.
    pub package_data:      IndexMap<String, Vec<String,>,>,
    /// Values for the generated `pyproject.toml`.
    pub pyproject:         PyprojectFields,
}

impl ProjectSettings
{
    /// Applies the defaults stage.
    ///
    /// Reads `<target>/<project_dir>/requirements.txt` and, when no version
    /// is configured, `<target>/<project_dir>/CHANGES.rst`. Neither file is
    /// required; a missing changelog falls back to [`FALLBACK_VERSION`] with
    /// a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when one of those files exists but cannot be
    /// read.
    pub fn resolve(
        self,
        paths: &BuildPaths,
        diagnostics: &dyn Diagnostics,
    ) -> Result<ResolvedConfig, Error,>
    {
        let mut settings = self;
        let identity = &settings.identity;

        let project_dir =
            identity.project_dir.clone().unwrap_or_else(|| identity.project_name.clone(),);
        let package_name = identity.package_name.clone();
        let path_project_dir = paths.target_dir.join(&project_dir,);
        let path_package_dir = path_project_dir.join(&package_name,);

        let version = match &identity.version {
            Some(version,) => version.clone(),
            None => version_from_changelog(&path_project_dir.join("CHANGES.rst",), diagnostics,)?,
        };

        apply_requirement_toggles(&mut settings,);
        apply_typed_package(&mut settings,);

        let identity = &settings.identity;
        let create_cli = settings.cli.create_cli_file;
        let shell_command = package_name.clone();
        let package_dir = package_name.clone();
        let cli_module = format!("{package_name}_cli");
        let cli_method = "cli_main".to_owned();
        let url = format!("https://github.com/{}/{}", identity.github_account, identity.project_name);
        let github_master =
            format!("git+https://github.com/{}/{}.git", identity.github_account, identity.project_name);
        let repository_slug = format!("{}/{}", identity.github_account, identity.project_name);

        let mut entry_points = IndexMap::new();
        entry_points.insert(
            "console_scripts".to_owned(),
            vec![format!("{shell_command} = {package_dir}.{cli_module}:{cli_method}")],
        );
        let mut package_data = IndexMap::new();
        package_data.insert(package_name.clone(), settings.setup.included_files.clone(),);

        let linux_matrix = match settings.gha.linux_matrix.clone() {
            Some(matrix,) => matrix
                .entries()
                .iter()
                .cloned()
                .map(|entry| {
                    let cli_test = entry.do_cli_test && create_cli;
                    entry.with_cli_test(cli_test,)
                },)
                .collect(),
            None => default_linux_matrix(create_cli,),
        };
        let windows = PlatformMatrix {
            cli_test: create_cli, ..settings.gha.windows.clone()
        };
        let osx = PlatformMatrix {
            cli_test: create_cli, ..settings.gha.osx.clone()
        };

        let dependencies = requirements::load_from_file(&path_project_dir.join("requirements.txt",),)?;
        let setup = &settings.setup;
        let pyproject = PyprojectFields {
            build_system_requires: setup.build_system_requires.clone(),
            build_system_backend:  setup.build_system_backend.clone(),
            name:                  identity.project_name.clone(),
            authors:               vec![IndexMap::from([
                ("name".to_owned(), identity.author.clone(),),
                ("email".to_owned(), identity.author_email.clone(),),
            ],)],
            description:           identity.short_description.clone(),
            requires_python:       format!(">={}", setup.minimal_python_version_required),
            keywords:              setup.keywords.clone(),
            licence:               setup.licence.clone(),
            classifiers:           setup.classifiers.clone(),
            dependencies,
            version:               version.clone(),
        };

        let flake8_exclude =
            settings.flake8.exclude.clone().unwrap_or_else(|| settings.common_excludes.clone(),);
        let black_show_badge =
            settings.black.show_badge.unwrap_or(settings.black.auto_in_local_testscript,);

        debug!(
            project = %identity.project_name,
            version = %version,
            linux_rows = linux_matrix.entries().len(),
            "resolved project settings"
        );

        Ok(ResolvedConfig {
            init_title: identity.short_description.clone(),
            init_name: package_name.clone(),
            main_module: package_name,
            docs_dir: ".docs".to_owned(),
            paths: paths.clone(),
            version,
            project_dir,
            shell_command,
            package_dir,
            cli_module,
            cli_method,
            path_project_dir,
            path_package_dir,
            url,
            github_master,
            repository_slug,
            linux_matrix,
            windows,
            osx,
            flake8_exclude,
            black_show_badge,
            entry_points,
            package_data,
            pyproject,
            settings,
        },)
    }
}

impl ResolvedConfig
{
    /// `<cli_module>.py` inside the package directory.
    pub fn path_cli_module(&self,) -> PathBuf
    {
        self.path_package_dir.join(format!("{}.py", self.cli_module),)
    }

    /// `<project>/<docs_dir>/commandline_help.rst`.
    pub fn path_cli_help_file(&self,) -> PathBuf
    {
        self.path_project_dir.join(&self.docs_dir,).join("commandline_help.rst",)
    }
}

fn apply_requirement_toggles(settings: &mut ProjectSettings,)
{
    let flake8 = settings.flake8.do_tests_in_local_testscript || settings.flake8.do_tests_in_gha;
    let mypy = settings.mypy.do_tests_in_local_testscript || settings.mypy.do_tests_in_gha;
    let coverage = settings.coverage.do_local_testscript || settings.coverage.do_gha;
    let codecov = settings.coverage.upload_codecov;

    let requirements: &mut RequirementList = &mut settings.requirements_test;
    requirements.toggle("flake8", flake8,);
    requirements.toggle("mypy", mypy,);
    requirements.toggle("pytest-cov", coverage,);
    requirements.toggle("coverage", coverage,);
    requirements.toggle("codecov", codecov,);
    requirements.push("pytest",);
    requirements.push("pytest-runner",);
    requirements.push("readme_renderer",);
}

fn apply_typed_package(settings: &mut ProjectSettings,)
{
    let included = &mut settings.setup.included_files;
    if settings.identity.is_typed_package {
        for file in TYPED_PACKAGE_FILES {
            included.push(file.to_owned(),);
        }
        settings.setup.zip_safe = false;
    } else {
        included.retain(|file| !TYPED_PACKAGE_FILES.contains(&file.as_str(),),);
    }
}

/// The stock Linux rows: CPython 3.8 to 3.12, PyPy and GraalPy on amd64.
pub fn default_linux_matrix(cli_test: bool,) -> LinuxMatrix
{
    [
        ("3.8", false,),
        ("3.9", false,),
        ("3.10", false,),
        ("3.11", true,),
        ("3.12", true,),
        ("pypy-3.9", false,),
        ("pypy-3.10", false,),
        ("graalpy-24.1", true,),
    ]
    .into_iter()
    .map(|(version, docs,)| {
        CiMatrixEntry::new("amd64", version,).with_build_docs(docs,).with_cli_test(cli_test,)
    },)
    .collect()
}

/// Finds the newest version heading in a changelog.
///
/// Returns `None` when the file is missing or has no version heading.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file exists but cannot be read.
pub fn find_version_in_changelog(path: &Path,) -> Result<Option<String,>, Error,>
{
    let contents = match fs::read_to_string(path,) {
        Ok(contents,) => contents,
        Err(source,) if source.kind() == io::ErrorKind::NotFound => return Ok(None,),
        Err(source,) => return Err(error::io_error(path, source,),),
    };
    let pattern = Regex::new(CHANGELOG_VERSION,)
        .map_err(|e| Error::validation(format!("invalid regex: {e}"),),)?;
    Ok(pattern
        .captures(&contents,)
        .and_then(|captures| captures.get(1,),)
        .map(|version| version.as_str().to_owned(),),)
}

fn version_from_changelog(path: &Path, diagnostics: &dyn Diagnostics,) -> Result<String, Error,>
{
    match find_version_in_changelog(path,)? {
        Some(version,) => Ok(version,),
        None => {
            diagnostics.warn(&format!(
                "no version found in \"{}\", using {FALLBACK_VERSION}",
                path.display()
            ),);
            Ok(FALLBACK_VERSION.to_owned(),)
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{BuildPaths, FALLBACK_VERSION, find_version_in_changelog};
    use crate::{MemoryDiagnostics, config::parse_settings};

    fn paths(target: &std::path::Path,) -> BuildPaths
    {
        BuildPaths::new("conf.yml", "template", target,)
            .with_date(NaiveDate::from_ymd_opt(2024, 3, 9,).expect("valid date",),)
    }

    #[test]
    fn derives_names_from_package()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let settings = parse_settings(
            "identity:\n  project_name: lib_demo\n  package_name: demo\n  version: 1.2.3\n",
        )
        .expect("valid settings",);
        let resolved =
            settings.resolve(&paths(dir.path(),), &MemoryDiagnostics::default(),).expect("resolve",);

        assert_eq!(resolved.project_dir, "lib_demo");
        assert_eq!(resolved.cli_module, "demo_cli");
        assert_eq!(resolved.shell_command, "demo");
        assert_eq!(resolved.path_package_dir, dir.path().join("lib_demo").join("demo"));
        assert_eq!(resolved.repository_slug, "your_github_account/lib_demo");
        assert_eq!(resolved.pyproject.requires_python, ">=3.8.0");
        assert_eq!(resolved.entry_points["console_scripts"], ["demo = demo.demo_cli:cli_main"]);
    }

    #[test]
    fn toggles_shape_test_requirements()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let settings = parse_settings(
            "identity:\n  version: '1.0'\ncoverage:\n  do_gha: false\n  do_local_testscript: \
             false\n  upload_codecov: false\n",
        )
        .expect("valid settings",);
        let resolved =
            settings.resolve(&paths(dir.path(),), &MemoryDiagnostics::default(),).expect("resolve",);
        let requirements = resolved.settings.requirements_test.finalized();

        assert!(!requirements.iter().any(|item| item == "pytest-cov"));
        assert!(!requirements.iter().any(|item| item == "coverage"));
        assert!(!requirements.iter().any(|item| item == "codecov"));
        assert!(requirements.iter().any(|item| item == "mypy"));
        assert!(requirements.iter().any(|item| item == "readme_renderer"));
        assert_eq!(requirements.iter().filter(|item| *item == "pytest").count(), 1);
    }

    #[test]
    fn disabling_mypy_everywhere_removes_it()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let settings = parse_settings(
            "identity:\n  version: '1.0'\nrequirements_test: [mypy, pytest]\nmypy:\n  \
             do_tests_in_local_testscript: false\n  do_tests_in_gha: false\n",
        )
        .expect("valid settings",);
        let resolved =
            settings.resolve(&paths(dir.path(),), &MemoryDiagnostics::default(),).expect("resolve",);
        assert!(!resolved.settings.requirements_test.contains("mypy"));
    }

    #[test]
    fn typed_package_adds_stub_files_and_disables_zip_safe()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let settings = parse_settings(
            "identity:\n  version: '1.0'\n  is_typed_package: true\nsetup:\n  zip_safe: true\n",
        )
        .expect("valid settings",);
        let resolved =
            settings.resolve(&paths(dir.path(),), &MemoryDiagnostics::default(),).expect("resolve",);

        assert!(!resolved.settings.setup.zip_safe);
        let data = &resolved.package_data["pct_python_default_test"];
        assert_eq!(data, &["py.typed", "*.pyi", "__init__.pyi"]);
    }

    #[test]
    fn untyped_package_drops_stub_files()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let settings = parse_settings(
            "identity:\n  version: '1.0'\nsetup:\n  included_files: [py.typed, data.json]\n",
        )
        .expect("valid settings",);
        let resolved =
            settings.resolve(&paths(dir.path(),), &MemoryDiagnostics::default(),).expect("resolve",);
        assert_eq!(resolved.settings.setup.included_files, ["data.json"]);
    }

    #[test]
    fn cli_test_flags_follow_create_cli_file()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let settings = parse_settings("identity:\n  version: '1.0'\ncli:\n  create_cli_file: false\n",)
            .expect("valid settings",);
        let resolved =
            settings.resolve(&paths(dir.path(),), &MemoryDiagnostics::default(),).expect("resolve",);

        assert!(!resolved.windows.cli_test);
        assert!(!resolved.osx.cli_test);
        assert!(resolved.linux_matrix.entries().iter().all(|entry| !entry.do_cli_test));
        assert_eq!(resolved.linux_matrix.entries().len(), 8);
    }

    #[test]
    fn version_and_dependencies_come_from_project_files()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let project = dir.path().join("pct_python_default_test",);
        fs::create_dir_all(&project,).expect("failed to create project dir",);
        fs::write(project.join("CHANGES.rst",), "Changelog\n=========\n\nv2.1.0\n--------\n- fix\n\nv2.0.0\n",)
            .expect("failed to write changelog",);
        fs::write(project.join("requirements.txt",), "click\ntoml  # parser\n",)
            .expect("failed to write requirements",);

        let diagnostics = MemoryDiagnostics::default();
        let resolved = parse_settings("",)
            .expect("valid settings",)
            .resolve(&paths(dir.path(),), &diagnostics,)
            .expect("resolve",);

        assert_eq!(resolved.version, "2.1.0");
        assert_eq!(resolved.pyproject.version, "2.1.0");
        assert_eq!(resolved.pyproject.dependencies, ["click", "toml"]);
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn missing_changelog_falls_back_with_warning()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let diagnostics = MemoryDiagnostics::default();
        let resolved = parse_settings("",)
            .expect("valid settings",)
            .resolve(&paths(dir.path(),), &diagnostics,)
            .expect("resolve",);

        assert_eq!(resolved.version, FALLBACK_VERSION);
        assert!(diagnostics.contains("CHANGES.rst"));
    }

    #[test]
    fn changelog_without_heading_yields_none()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let path = dir.path().join("CHANGES.rst",);
        fs::write(&path, "Changelog\n=========\n\nnothing released yet\n",)
            .expect("failed to write changelog",);
        assert_eq!(find_version_in_changelog(&path,).expect("readable",), None);
    }
}
