// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Populates the [`PatternTable`] from a [`ResolvedConfig`].
//!
//! Routines run in a fixed order and only insert keys. The docs routines
//! read the repository slug and the Linux matrix; the pyproject routines
//! read the finalized test requirements.

use std::{fmt::Write as _, fs, path::PathBuf};

use chrono::Datelike;
use tracing::{debug, info};

use crate::{
    diagnostics::Diagnostics,
    error::{self, Error},
    patterns::PatternTable,
    py_literal::{py_bool, py_dict_of_lists, py_list},
    resolve::ResolvedConfig,
    toml_fmt::{dict_to_toml, list_of_dicts_to_toml, list_to_toml}
};

/// Operating systems with an optional GitHub Actions addon snippet.
const ADDON_SYSTEMS: [&str; 5] = ["windows", "linux", "pypy", "osx", "wine"];

fn key(name: &str) -> String {
    format!("{{{{PizzaCutter.{name}}}}}")
}

fn sorted_unique(items: &[String]) -> Vec<String> {
    let mut items = items.to_vec();
    items.sort();
    items.dedup();
    items
}

fn sorted(items: &[String]) -> Vec<String> {
    let mut items = items.to_vec();
    items.sort();
    items
}

impl ResolvedConfig {
    /// Builds the full placeholder table.
    ///
    /// Reads the CI addon snippets of enabled jobs from
    /// `<template>/{{PizzaCutter.project_dir}}/gha_addons{{PizzaCutter.option.no_copy}}/`.
    /// Missing optional inputs such as testscript directories only produce
    /// warnings. Calling it twice yields identical tables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Addon`] when the snippet of an enabled job cannot be
    /// read and [`Error::UnsupportedQuote`] if a TOML list is rendered with
    /// an invalid delimiter.
    pub fn build_patterns(&self, diagnostics: &dyn Diagnostics) -> Result<PatternTable, Error> {
        let mut table = PatternTable::new();
        self.insert_identity(&mut table);
        self.insert_badges(&mut table);
        self.insert_docs_test_info(&mut table);
        self.insert_docs_installation_pypi(&mut table);
        self.insert_docs_python_test_info(&mut table, diagnostics);
        self.insert_testscripts(&mut table, diagnostics);
        self.insert_actions_yaml(&mut table)?;
        self.insert_gha_linux(&mut table);
        self.insert_gha_platform(&mut table, "windows");
        self.insert_gha_platform(&mut table, "osx");
        self.insert_requirements_test(&mut table);
        self.insert_setup_py(&mut table);
        self.insert_coverage(&mut table);
        self.insert_flake8(&mut table);
        self.insert_mypy(&mut table);
        self.insert_black(&mut table);
        self.insert_pytest(&mut table);
        self.insert_pyproject_build_system(&mut table);
        self.insert_pyproject_project(&mut table)?;
        info!(
            project = %self.settings.identity.project_name,
            patterns = table.len(),
            "built pattern table"
        );
        Ok(table)
    }

    fn insert_identity(&self, table: &mut PatternTable) {
        let identity = &self.settings.identity;
        let conf_file_name = self
            .paths
            .conf_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        table.insert(key("project_name"), identity.project_name.as_str());
        table.insert(key("project_dir"), self.project_dir.as_str());
        table.insert(key("package_name"), identity.package_name.as_str());
        table.insert(key("path.package_dir"), self.path_package_dir.clone());
        table.insert(key("short_description"), identity.short_description.as_str());
        table.insert(key("repository_slug"), self.repository_slug.as_str());
        table.insert(key("repository"), identity.project_name.as_str());
        table.insert(
            key("double_underline_repository"),
            "=".repeat(identity.project_name.chars().count())
        );
        table.insert(key("repository_dashed"), identity.project_name.replace('_', "-"));
        table.insert(key("version"), self.version.as_str());
        table.insert(key("title"), self.init_title.as_str());
        table.insert(key("name"), self.init_name.as_str());
        table.insert(key("url"), self.url.as_str());
        table.insert(key("author"), identity.author.as_str());
        table.insert(key("author_email"), identity.author_email.as_str());
        table.insert(key("shell_command"), self.shell_command.as_str());
        table.insert(key("pypi_account"), self.settings.pypi.account.as_str());
        table.insert(key("github_master"), self.github_master.as_str());
        table.insert(key("package_dir"), self.package_dir.as_str());
        table.insert(key("main_module"), self.main_module.as_str());
        table.insert(key("main_module_filename"), self.main_module.as_str());
        table.insert(key("cli_module"), self.cli_module.as_str());
        table.insert(key("cli_module_filename"), self.cli_module.as_str());
        table.insert(key("cli_method"), self.cli_method.as_str());
        table.insert(key("docs_dir"), self.docs_dir.as_str());
        table.insert(key("test_dir"), "tests");
        table.insert(key("conf_file_name"), conf_file_name);
        table.insert(key("current_year"), self.paths.today.year().to_string());
        table.insert(key("date"), self.paths.today.format("%Y-%m-%d").to_string());
    }

    fn insert_badges(&self, table: &mut PatternTable) {
        let (jupyter, try_in_jupyter, index_entry) = if self.settings.docs.badges_with_jupyter {
            ("|jupyter| ", ".. include:: ./try_in_jupyter.rst", "- `Try it Online`_")
        } else {
            ("", "", "")
        };
        table.insert(key("|jupyter| "), jupyter);
        table.insert(key("try_in_jupyter"), try_in_jupyter);
        table.insert(key("index_entry_jupyter"), index_entry);

        let (pypi, downloads) = if self.settings.pypi.is_pypi_package {
            ("|pypi| ", "|pypi-downloads| ")
        } else {
            ("", "")
        };
        table.insert(key("|pypi|"), pypi);
        table.insert(key("|pypi-downloads|"), downloads);
    }

    fn shows_gha_badge(&self) -> bool {
        self.settings.docs.show_which_ci_badge.eq_ignore_ascii_case("gha")
    }

    fn insert_docs_test_info(&self, table: &mut PatternTable) {
        let settings = &self.settings;
        let slug = &self.repository_slug;

        let link_coverage = if settings.coverage.upload_code_climate {
            format!("https://codeclimate.com/github/{slug}/test_coverage")
        } else {
            String::new()
        };
        let mut test_info = String::new();
        if settings.coverage.do_local_testscript || settings.coverage.do_gha {
            let _ = write!(
                test_info,
                "`{} code coverage <{link_coverage}>`_, ",
                settings.docs.code_coverage_bragging
            );
        }
        if settings.flake8.do_tests_in_gha {
            test_info.push_str("flake8 style checking ,");
        }
        if settings.mypy.do_tests_in_gha {
            test_info.push_str("mypy static type checking ,");
        }

        let tested_under: Vec<&str> = [
            (settings.gha.linux_tests, "Linux"),
            (settings.gha.osx_tests, "macOS"),
            (settings.gha.windows_tests, "Windows"),
            (settings.gha.wine_tests, "Wine")
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect();

        let (build_badge, build_badge_link, test_link) = if self.shows_gha_badge() {
            (
                "|build_badge| ",
                concat!(
                    "\n",
                    ".. |build_badge| image:: https://github.com/{{PizzaCutter.repository_slug}}/actions/workflows/python-package.yml/badge.svg\n",
                    "   :target: https://github.com/{{PizzaCutter.repository_slug}}/actions/workflows/python-package.yml\n"
                ),
                format!(
                    " <https://github.com/{slug}/actions/workflows/python-package.yml>`_, automatic daily builds and monitoring"
                )
            )
        } else {
            ("", "", String::new())
        };
        table.insert(key("docs.build_badge"), build_badge);
        table.insert(key("docs.build_badge_link"), build_badge_link);

        if !tested_under.is_empty() {
            test_info.push_str("tested under `");
            test_info.push_str(&tested_under.join(", "));
            test_info.push_str(&test_link);
        }
        table.insert(key("docs.test_info"), test_info);
    }

    fn insert_docs_installation_pypi(&self, table: &mut PatternTable) {
        let (requirements, include) = if self.settings.pypi.is_pypi_package {
            (
                format!(
                    "# for the latest Release on pypi:\n    {}\n",
                    self.settings.identity.project_name
                ),
                ".. include:: ./installation_via_pypi.rst"
            )
        } else {
            (String::new(), "")
        };
        table.insert(key("docs.pypi_requirements"), requirements);
        table.insert(key("docs.include_installation_via_pypi"), include);
    }

    fn insert_docs_python_test_info(&self, table: &mut PatternTable, diagnostics: &dyn Diagnostics) {
        let test_info = if self.shows_gha_badge() {
            format!(
                "tested on recent linux with python {} - architectures: {}",
                self.linux_matrix.distinct_versions().join(", "),
                self.linux_matrix.distinct_architectures().join(", ")
            )
        } else {
            diagnostics.warn(&format!(
                "unsupported parameter docs.show_which_ci_badge: {}",
                self.settings.docs.show_which_ci_badge
            ));
            String::new()
        };
        table.insert(key("docs.python_test_info"), test_info);
        table.insert(
            key("docs.python_required"),
            self.settings.setup.minimal_python_version_required.as_str()
        );
    }

    fn insert_testscripts(&self, table: &mut PatternTable, diagnostics: &dyn Diagnostics) {
        let testscript = &self.settings.testscript;

        let export_lines = |paths: &[PathBuf], variable: &str, helper: &str, warning: &dyn Fn(&str) -> String| {
            let mut lines: Vec<String> = Vec::with_capacity(paths.len());
            for path in paths {
                let shown = path.display().to_string();
                if !path.is_dir() {
                    diagnostics.warn(&warning(&shown));
                }
                lines.push(format!(
                    "export {variable}=\"$(python3 ./testing_tools.py {helper} \"{shown}\")\""
                ));
            }
            lines.join("\n")
        };

        table.insert(
            format!("# {}", key("testscript.append_additional_python_paths")),
            export_lines(
                &testscript.additional_pythonpaths,
                "PYTHONPATH",
                "append_directory_to_python_path",
                &|path| format!("PYTHONPATH \"{path}\" does not exist, skipping")
            )
        );
        table.insert(
            format!("# {}", key("testscript.append_additional_mypy_paths")),
            export_lines(
                &testscript.additional_mypy_paths,
                "MYPYPATH",
                "append_directory_to_python_path",
                &|path| format!("MYPYPATH \"{path}\" does not exist, skipping")
            )
        );
        table.insert(
            format!("# {}", key("testscript.append_additional_mypy_paths_from_root_dir")),
            export_lines(
                &testscript.additional_mypy_root_paths,
                "MYPYPATH",
                "append_immediate_subdirs_to_mypy_path",
                &|path| {
                    format!(
                        "we can not add the immediate subdirs to MYPYPATH, because \"{path}\" does not exist, skipping"
                    )
                }
            )
        );
    }

    fn insert_actions_yaml(&self, table: &mut PatternTable) -> Result<(), Error> {
        let gha = &self.settings.gha;
        for os in ADDON_SYSTEMS {
            let enabled = match os {
                "windows" => gha.windows_tests,
                "osx" => gha.osx_tests,
                "wine" => gha.wine_tests,
                _ => false
            };
            let addon = if enabled {
                self.read_addon(os)?
            } else {
                String::new()
            };
            table.insert(key(&format!("gha_{os}_addon")), addon);
        }

        table.insert(
            key("gha.rst_include_source"),
            format!("./{}/README_template.rst", self.docs_dir)
        );
        table.insert(key("gha.rst_include_target"), "./README.rst");

        let mut variables = String::new();
        for variable in &self.settings.additional_env_variables {
            let _ = writeln!(variables, "        {}: {}", variable.key, variable.value);
        }
        table.insert(key("gha_additional_environment_variables"), variables);
        Ok(())
    }

    /// Location of the addon snippet for `os` inside the template tree.
    pub fn addon_path(&self, os: &str) -> PathBuf {
        self.paths
            .template_dir
            .join("{{PizzaCutter.project_dir}}")
            .join("gha_addons{{PizzaCutter.option.no_copy}}")
            .join(format!("gha_template_{os}_addon.yml"))
    }

    fn read_addon(&self, os: &str) -> Result<String, Error> {
        let path = self.addon_path(os);
        debug!(path = %path.display(), "reading CI addon snippet");
        fs::read_to_string(&path).map_err(|source| error::addon_error(&path, source))
    }

    fn insert_gha_linux(&self, table: &mut PatternTable) {
        let gha = &self.settings.gha;
        let block = if gha.linux_tests {
            self.linux_matrix
                .render_linux_block(self.settings.mypy.do_tests_in_gha)
        } else {
            String::new()
        };
        table.insert(key("gha.linux.tests"), block);
        table.insert(key("gha.services"), gha.services.as_str());
    }

    fn insert_gha_platform(&self, table: &mut PatternTable, os: &str) {
        let matrix = if os == "windows" { &self.windows } else { &self.osx };
        for (name, value) in matrix.patterns(os, self.settings.mypy.do_tests_in_gha) {
            table.insert(name, value);
        }
    }

    fn insert_requirements_test(&self, table: &mut PatternTable) {
        table.insert(
            format!("# {}", key("requirements_test")),
            self.settings.requirements_test.render_lines()
        );
    }

    fn insert_setup_py(&self, table: &mut PatternTable) {
        let setup = &self.settings.setup;
        table.insert(
            key("setup_python_requires"),
            format!("\">={}\"", setup.minimal_python_version_required)
        );
        table.insert(key("setup_package_data"), py_dict_of_lists(&self.package_data));
        table.insert(key("setup_classifiers"), py_list(&setup.classifiers));
        let entry_points = if self.settings.cli.create_cli_file {
            py_dict_of_lists(&self.entry_points)
        } else {
            "{}".to_owned()
        };
        table.insert(key("setup_entry_points"), entry_points);
        table.insert(key("setup_zip_safe"), py_bool(setup.zip_safe));
    }

    fn insert_coverage(&self, table: &mut PatternTable) {
        let coverage = &self.settings.coverage;
        table.insert(key("gha.do_coverage"), py_bool(coverage.do_gha));
        table.insert(key("gha.do_coverage_upload_codecov"), py_bool(coverage.upload_codecov));
        table.insert(
            key("gha.do_coverage_upload_code_climate"),
            py_bool(coverage.upload_code_climate)
        );
        table.insert(key("testscript.do_coverage"), py_bool(coverage.do_local_testscript));
        let option = if coverage.do_local_testscript {
            "--cov=\"${project_root_dir}\" --cov-config=.coveragerc"
        } else {
            ""
        };
        table.insert(key("testscript.pytest_coverage_option"), option);
    }

    fn insert_flake8(&self, table: &mut PatternTable) {
        let flake8 = &self.settings.flake8;
        table.insert(
            key("flake8_do_tests_in_local_testscript"),
            py_bool(flake8.do_tests_in_local_testscript)
        );
        table.insert(key("flake8_do_tests_in_gha"), py_bool(flake8.do_tests_in_gha));
        table.insert(key("flake8_ignores"), flake8.ignores.join(", "));
        table.insert(key("flake8_max_line_length"), flake8.max_line_length.to_string());
        table.insert(key("flake8_max_complexity"), flake8.max_complexity.to_string());
        table.insert(key("flake8_exclude"), self.flake8_exclude.join(", "));
    }

    fn insert_mypy(&self, table: &mut PatternTable) {
        let mypy = &self.settings.mypy;
        table.insert(key("gha.mypy_do_tests"), py_bool(mypy.do_tests_in_gha));
        table.insert(
            key("testscript.do_mypy_tests"),
            py_bool(mypy.do_tests_in_local_testscript)
        );
        table.insert(key("gha.mypy_options"), sorted_unique(&mypy.options_gha).join(" "));
        table.insert(
            key("testscript.mypy_options"),
            sorted_unique(&mypy.options_testscript).join(" ")
        );
    }

    fn insert_black(&self, table: &mut PatternTable) {
        let black = &self.settings.black;
        table.insert(key("black_line_length"), black.line_length.to_string());
        table.insert(key("black_target_versions"), py_list(&black.target_versions));
        table.insert(key("black_include_regexp"), black.include_regexp.as_str());
        table.insert(key("black_exclude_regexp"), black.exclude_regexp.as_str());
        table.insert(key("auto_black_files"), py_bool(black.auto_in_local_testscript));
        table.insert(key("|black|"), if self.black_show_badge { "|black|" } else { "" });
    }

    fn insert_pytest(&self, table: &mut PatternTable) {
        let pytest = &self.settings.pytest;
        table.insert(key("pytest.additional_args"), py_list(&sorted_unique(&pytest.additional_args)));
        table.insert(key("pytest.collect_ignore"), py_list(&sorted_unique(&pytest.collect_ignores)));
        table.insert(key("pytest_do_in_local_testscript"), py_bool(pytest.do_local_testscript));
        table.insert(key("gha.pytest_do_tests"), py_bool(pytest.do_gha));
    }

    fn insert_pyproject_build_system(&self, table: &mut PatternTable) {
        table.insert(
            key("pyproject.build_system.requires"),
            py_list(&self.pyproject.build_system_requires)
        );
        table.insert(
            key("pyproject.build_system.backend"),
            self.pyproject.build_system_backend.as_str()
        );
    }

    fn insert_pyproject_project(&self, table: &mut PatternTable) -> Result<(), Error> {
        let pyproject = &self.pyproject;
        table.insert(key("pyproject.project.name"), pyproject.name.as_str());
        table.insert(key("pyproject.project.authors"), list_of_dicts_to_toml(&pyproject.authors));
        table.insert(key("pyproject.project.description"), pyproject.description.as_str());
        table.insert(key("pyproject.project.requires_python"), pyproject.requires_python.as_str());
        table.insert(
            key("pyproject.project.keywords"),
            list_to_toml(&sorted(&pyproject.keywords), "\"")?
        );
        table.insert(key("pyproject.project.licence"), dict_to_toml(&pyproject.licence));
        table.insert(
            key("pyproject.project.classifiers"),
            list_to_toml(&pyproject.classifiers, "\"")?
        );
        table.insert(
            key("pyproject.project.dependencies"),
            list_to_toml(&sorted(&pyproject.dependencies), "\"")?
        );
        table.insert(key("pyproject.project.version"), pyproject.version.as_str());
        table.insert(
            key("pyproject.optional_dependencies.test"),
            list_to_toml(&self.settings.requirements_test.finalized(), "\"")?
        );
        table.insert(
            key("pyproject.zip_safe"),
            py_bool(self.settings.setup.zip_safe).to_lowercase()
        );
        table.insert(
            key("pyproject.package_data"),
            format!(
                "[tool.setuptools.package-data]\n{} = {}",
                self.settings.identity.package_name,
                list_to_toml(&sorted(&self.settings.setup.included_files), "\"")?
            )
        );
        table.insert(key("pyproject.url"), self.url.as_str());
        let scripts = if self.settings.cli.create_cli_file {
            format!(
                "[project.scripts]\n    {} = \"{}.{}:{}\"",
                self.shell_command, self.package_dir, self.cli_module, self.cli_method
            )
        } else {
            String::new()
        };
        table.insert(key("pyproject.scripts"), scripts);
        Ok(())
    }
}
