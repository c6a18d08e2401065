// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Hooks run by the template engine around a build.
//!
//! [`ResolvedConfig::after_build`] finishes a freshly expanded project: it
//! generates the command line help page, adds or removes the typed-package
//! marker, drops CLI files when no CLI is wanted and runs the formatters.
//! External tools are best effort; only the help generator treats a missing
//! interpreter as an error.

use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info};

use crate::{
    diagnostics::Diagnostics,
    error::{self, Error},
    patterns::PatternTable,
    resolve::ResolvedConfig,
};

/// Header of a reStructuredText code block.
const CODE_BLOCK_HEADER: &str = ".. code-block::\n\n";

/// Body written when the help source does not exist.
const NO_OPTIONS_BODY: &str = "    there are no commandline options\n";

/// Help text used when the CLI module prints nothing.
const EMPTY_HELP: &str = "can not get help - probably not a proper click application";

/// External programs invoked by the hooks.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ToolCommands
{
    /// Interpreter used to run `<cli_module> -h`.
    pub python:      String,
    /// Formatter run over the generated sources.
    pub black:       String,
    /// Tool rebuilding `README.rst` from the docs template.
    pub rst_include: String,
}

impl Default for ToolCommands
{
    fn default() -> Self
    {
        Self {
            python:      "python3".to_owned(),
            black:       "black".to_owned(),
            rst_include: "rst_include".to_owned(),
        }
    }
}

/// Template engine driving a build. Implemented outside this crate.
pub trait TemplateEngine
{
    /// Expands `template_dir` into `target_dir` using the hooks' pattern
    /// table, calling [`ConfigHooks::before_build`] and
    /// [`ConfigHooks::after_build`] around the copy.
    ///
    /// # Errors
    ///
    /// Implementations report failures through [`Error`].
    fn build(
        &self,
        hooks: &dyn ConfigHooks,
        template_dir: &Path,
        target_dir: &Path,
        allow_overwrite: bool,
    ) -> Result<(), Error,>;
}

/// Configuration side of a build as seen by a [`TemplateEngine`].
pub trait ConfigHooks
{
    /// Placeholder table for the build.
    ///
    /// # Errors
    ///
    /// See [`ResolvedConfig::build_patterns`].
    fn pattern_table(&self,) -> Result<PatternTable, Error,>;

    /// Runs before any template file is copied.
    ///
    /// # Errors
    ///
    /// Implementations report failures through [`Error`].
    fn before_build(&self,) -> Result<(), Error,>;

    /// Runs after every template file was expanded.
    ///
    /// # Errors
    ///
    /// Implementations report failures through [`Error`].
    fn after_build(&self,) -> Result<(), Error,>;
}

/// Binds a [`ResolvedConfig`] to the diagnostics sink and tools used for one
/// build.
pub struct BuildHooks<'a,>
{
    config:      &'a ResolvedConfig,
    tools:       &'a ToolCommands,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a,> BuildHooks<'a,>
{
    /// Creates hooks for one build.
    pub fn new(
        config: &'a ResolvedConfig,
        tools: &'a ToolCommands,
        diagnostics: &'a dyn Diagnostics,
    ) -> Self
    {
        Self {
            config,
            tools,
            diagnostics,
        }
    }
}

impl ConfigHooks for BuildHooks<'_,>
{
    fn pattern_table(&self,) -> Result<PatternTable, Error,>
    {
        self.config.build_patterns(self.diagnostics,)
    }

    fn before_build(&self,) -> Result<(), Error,>
    {
        self.config.before_build()
    }

    fn after_build(&self,) -> Result<(), Error,>
    {
        self.config.after_build(self.tools, self.diagnostics,)
    }
}

impl ResolvedConfig
{
    /// Nothing to prepare before the copy.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn before_build(&self,) -> Result<(), Error,>
    {
        debug!(project = %self.settings.identity.project_name, "before build");
        Ok((),)
    }

    /// Finishes the generated project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when project files cannot be created or removed
    /// and [`Error::Subprocess`] when the interpreter for the help page
    /// cannot be started. Formatter failures are only logged.
    pub fn after_build(
        &self,
        tools: &ToolCommands,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), Error,>
    {
        let settings = &self.settings;
        info!(project = %settings.identity.project_name, "running after build hook");

        if settings.docs.badges_with_jupyter {
            let notebook = self
                .path_project_dir
                .join(format!("{}.ipynb", settings.identity.package_name),);
            if !notebook.is_file() {
                diagnostics.warn(&format!(
                    "You selected Binder (Jupyter) Badge, but the Jupyter File is not present : \"{}\"",
                    notebook.display()
                ),);
            }
        }

        let marker = self.path_package_dir.join("py.typed",);
        if settings.identity.is_typed_package {
            touch(&marker,)?;
        } else {
            remove_if_exists(&marker,)?;
        }

        let help_file = self.path_cli_help_file();
        if settings.cli.create_cli_file {
            generate_cli_help_doc(
                &tools.python,
                &self.path_cli_module(),
                &help_file,
                &self.shell_command,
                diagnostics,
            )?;
        } else {
            remove_if_exists(&self.path_cli_module(),)?;
            remove_if_exists(&self.path_project_dir.join("tests",).join("test_cli.py",),)?;
            fs::write(&help_file, "there are no cli commands",)
                .map_err(|source| error::io_error(&help_file, source,),)?;
        }

        self.rebuild_readme(tools, diagnostics,)?;

        let setup_py = self.path_project_dir.join("setup.py",);
        if setup_py.is_file() {
            if settings.black.auto_in_local_testscript {
                run_best_effort(
                    Command::new(&tools.black,).arg(&self.path_project_dir,),
                    &tools.black,
                    diagnostics,
                );
            }
            info!("reformatting \"{}\"", setup_py.display());
            run_best_effort(Command::new(&tools.black,).arg(&setup_py,), &tools.black, diagnostics,);
        }

        if !settings.gha.add_github_actions {
            remove_if_exists(
                &self.path_project_dir.join(".github",).join("workflows",).join("python-package.yml",),
            )?;
        }
        Ok((),)
    }

    /// Regenerates `README.rst` from the docs template and restores
    /// placeholders that were escaped as `{{\PizzaCutter` in the docs.
    fn rebuild_readme(&self, tools: &ToolCommands, diagnostics: &dyn Diagnostics,)
    -> Result<(), Error,>
    {
        let source = self.path_project_dir.join(&self.docs_dir,).join("README_template.rst",);
        let target = self.path_project_dir.join("README.rst",);
        if source.is_file() {
            run_best_effort(
                Command::new(&tools.rst_include,).arg("include",).arg(&source,).arg(&target,),
                &tools.rst_include,
                diagnostics,
            );
        }
        if !target.is_file() {
            return Ok((),);
        }
        let text = fs::read_to_string(&target,).map_err(|source| error::io_error(&target, source,),)?;
        let unescaped = text.replace("{{\\PizzaCutter", "{{PizzaCutter",);
        if unescaped != text {
            fs::write(&target, unescaped,).map_err(|source| error::io_error(&target, source,),)?;
        }
        Ok((),)
    }
}

/// Writes the `-h` output of a CLI module as an rst code block.
///
/// A missing module only produces a warning and leaves `output` untouched.
/// The module's file name is replaced by `shell_command` in the captured
/// text, and click's stray backspaces are removed. A non-zero exit status is
/// tolerated with a warning since many CLIs exit non-zero after printing
/// help.
///
/// # Errors
///
/// Returns [`Error::Subprocess`] when `python` cannot be started and
/// [`Error::Io`] when `output` cannot be written.
pub fn generate_cli_help_doc(
    python: &str,
    cli_module: &Path,
    output: &Path,
    shell_command: &str,
    diagnostics: &dyn Diagnostics,
) -> Result<(), Error,>
{
    if !cli_module.is_file() {
        diagnostics.warn(&format!("can not find cli_module: \"{}\"", cli_module.display()),);
        return Ok((),);
    }

    let command_line = format!("{python} {} -h", cli_module.display());
    debug!(command = %command_line, "capturing command line help");
    let result = Command::new(python,).arg(cli_module,).arg("-h",).output().map_err(|source| {
        Error::Subprocess {
            command: command_line.clone(),
            source,
        }
    },)?;
    if !result.status.success() {
        diagnostics.warn(&format!("`{command_line}` exited with {}", result.status),);
    }

    let mut help = String::from_utf8_lossy(&result.stdout,).replace("\u{8} ", "",);
    if let Some(file_name,) = cli_module.file_name() {
        help = help.replace(file_name.to_string_lossy().as_ref(), shell_command,);
    }
    if help.is_empty() {
        help = EMPTY_HELP.to_owned();
    }
    fs::write(output, help,).map_err(|source| error::io_error(output, source,),)?;
    reformat_as_code_block(output, output,)
}

/// Rewrites a text file as an rst code block.
///
/// Every source line is indented by three spaces and right-trimmed; a UTF-8
/// byte order mark is dropped. A missing source produces a block stating
/// that there are no options. `source` and `target` may be the same file, in
/// which case the original is replaced only after the new content was fully
/// written.
///
/// # Errors
///
/// Returns [`Error::Io`] when reading or writing fails. On failure an
/// in-place target keeps its original content.
///
/// # Example
///
/// ```
/// use pizzacutter_conf::reformat_as_code_block;
///
/// let dir = tempfile::tempdir()?;
/// let help = dir.path().join("help.rst");
/// std::fs::write(&help, "usage: demo [OPTIONS]\n")?;
/// reformat_as_code_block(&help, &help)?;
/// assert_eq!(std::fs::read_to_string(&help)?, ".. code-block::\n\n   usage: demo [OPTIONS]\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn reformat_as_code_block(source: &Path, target: &Path,) -> Result<(), Error,>
{
    reformat_with_commit(source, target, |temp, target| fs::rename(temp, target,),)
}

fn reformat_with_commit<F,>(source: &Path, target: &Path, commit: F,) -> Result<(), Error,>
where
    F: FnOnce(&Path, &Path,) -> io::Result<(),>,
{
    let content = code_block_content(source,)?;

    if !is_same_file(source, target,) {
        return fs::write(target, content,).map_err(|e| error::io_error(target, e,),);
    }

    let temp = temp_path(target,);
    if let Err(e,) = fs::write(&temp, &content,) {
        let _ = fs::remove_file(&temp,);
        return Err(error::io_error(&temp, e,),);
    }
    if let Err(e,) = commit(&temp, target,) {
        let _ = fs::remove_file(&temp,);
        return Err(error::io_error(target, e,),);
    }
    Ok((),)
}

fn code_block_content(source: &Path,) -> Result<String, Error,>
{
    let mut content = String::from(CODE_BLOCK_HEADER,);
    if !source.is_file() {
        content.push_str(NO_OPTIONS_BODY,);
        return Ok(content,);
    }
    let text = fs::read_to_string(source,).map_err(|e| error::io_error(source, e,),)?;
    let text = text.strip_prefix('\u{feff}',).unwrap_or(&text,);
    for line in text.lines() {
        content.push_str(format!("   {line}").trim_end(),);
        content.push('\n',);
    }
    Ok(content,)
}

fn is_same_file(source: &Path, target: &Path,) -> bool
{
    match (fs::canonicalize(source,), fs::canonicalize(target,),) {
        (Ok(source,), Ok(target,),) => source == target,
        _ => source == target,
    }
}

fn temp_path(target: &Path,) -> PathBuf
{
    let mut name = target.file_name().map(|name| name.to_os_string(),).unwrap_or_default();
    name.push(".tmp",);
    target.with_file_name(name,)
}

fn touch(path: &Path,) -> Result<(), Error,>
{
    OpenOptions::new()
        .create(true,)
        .append(true,)
        .open(path,)
        .map(|_| (),)
        .map_err(|e| error::io_error(path, e,),)
}

fn remove_if_exists(path: &Path,) -> Result<(), Error,>
{
    match fs::remove_file(path,) {
        Ok((),) => Ok((),),
        Err(e,) if e.kind() == io::ErrorKind::NotFound => Ok((),),
        Err(e,) => Err(error::io_error(path, e,),),
    }
}

fn run_best_effort(command: &mut Command, program: &str, diagnostics: &dyn Diagnostics,)
{
    debug!(command = ?command, "running external tool");
    match command.status() {
        Ok(status,) if status.success() => {}
        Ok(status,) => diagnostics.warn(&format!("`{program}` exited with {status}"),),
        Err(e,) => diagnostics.warn(&format!("`{program}` could not be started: {e}"),),
    }
}

#[cfg(test)]
mod tests
{
    use std::{fs, io};

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::{BuildPaths, MemoryDiagnostics, config::parse_settings};

    const EXPECTED: &str = ".. code-block::\n\n   usage: demo [OPTIONS]\n\n   Options:\n     -h, --help  Show this message\n";
    const SOURCE: &str = "usage: demo [OPTIONS]\n\nOptions:\n  -h, --help  Show this message   \n";

    #[test]
    fn reformat_to_separate_target()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let source = dir.path().join("input.txt",);
        let target = dir.path().join("output.rst",);
        fs::write(&source, SOURCE,).expect("failed to write source",);

        reformat_as_code_block(&source, &target,).expect("reformat failed",);
        assert_eq!(fs::read_to_string(&target,).expect("read target",), EXPECTED);
        assert_eq!(fs::read_to_string(&source,).expect("read source",), SOURCE);
    }

    #[test]
    fn reformat_in_place_leaves_no_temp_file()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let path = dir.path().join("help.rst",);
        fs::write(&path, SOURCE,).expect("failed to write source",);

        reformat_as_code_block(&path, &path,).expect("reformat failed",);
        assert_eq!(fs::read_to_string(&path,).expect("read result",), EXPECTED);
        assert!(!dir.path().join("help.rst.tmp").exists());
    }

    #[test]
    fn reformat_strips_byte_order_mark()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let path = dir.path().join("help.rst",);
        fs::write(&path, format!("\u{feff}{SOURCE}"),).expect("failed to write source",);

        reformat_as_code_block(&path, &path,).expect("reformat failed",);
        assert_eq!(fs::read_to_string(&path,).expect("read result",), EXPECTED);
    }

    #[test]
    fn missing_source_writes_placeholder_block()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let missing = dir.path().join("missing.txt",);
        let target = dir.path().join("output.rst",);
        let expected = ".. code-block::\n\n    there are no commandline options\n";

        reformat_as_code_block(&missing, &target,).expect("reformat failed",);
        assert_eq!(fs::read_to_string(&target,).expect("read target",), expected);

        reformat_as_code_block(&missing, &missing,).expect("reformat failed",);
        assert_eq!(fs::read_to_string(&missing,).expect("read target",), expected);
    }

    #[test]
    fn failed_commit_keeps_original_and_removes_temp_file()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let path = dir.path().join("help.rst",);
        fs::write(&path, SOURCE,).expect("failed to write source",);

        let error = reformat_with_commit(&path, &path, |_, _| {
            Err(io::Error::other("rename interrupted",),)
        },)
        .expect_err("commit failure must surface",);

        assert!(matches!(error, Error::Io { .. }));
        assert_eq!(fs::read_to_string(&path,).expect("read original",), SOURCE);
        assert!(!dir.path().join("help.rst.tmp").exists());
    }

    #[test]
    fn missing_cli_module_only_warns()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let output = dir.path().join("commandline_help.rst",);
        let diagnostics = MemoryDiagnostics::default();

        generate_cli_help_doc(
            "python3",
            &dir.path().join("demo_cli.py",),
            &output,
            "demo",
            &diagnostics,
        )
        .expect("missing module is not an error",);

        assert!(diagnostics.contains("can not find cli_module"));
        assert!(!output.exists());
    }

    #[test]
    fn unknown_interpreter_is_a_subprocess_error()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let module = dir.path().join("demo_cli.py",);
        fs::write(&module, "",).expect("failed to write module",);

        let error = generate_cli_help_doc(
            "pizzacutter-no-such-interpreter",
            &module,
            &dir.path().join("help.rst",),
            "demo",
            &MemoryDiagnostics::default(),
        )
        .expect_err("spawn must fail",);
        assert!(matches!(error, Error::Subprocess { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn help_output_is_cleaned_and_reformatted()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let module = dir.path().join("demo_cli.py",);
        fs::write(&module, "printf 'usage: demo_cli.py [OPTIONS]\\n\\b Options\\n'\n",)
            .expect("failed to write module",);
        let output = dir.path().join("help.rst",);

        generate_cli_help_doc("sh", &module, &output, "demo", &MemoryDiagnostics::default(),)
            .expect("help generation failed",);
        assert_eq!(
            fs::read_to_string(&output,).expect("read help",),
            ".. code-block::\n\n   usage: demo [OPTIONS]\n   Options\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn empty_help_uses_fallback_text()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let module = dir.path().join("demo_cli.py",);
        fs::write(&module, "exit 0\n",).expect("failed to write module",);
        let output = dir.path().join("help.rst",);

        generate_cli_help_doc("sh", &module, &output, "demo", &MemoryDiagnostics::default(),)
            .expect("help generation failed",);
        assert_eq!(
            fs::read_to_string(&output,).expect("read help",),
            format!(".. code-block::\n\n   {EMPTY_HELP}\n")
        );
    }

    fn resolved(yaml: &str, target: &Path,) -> ResolvedConfig
    {
        let paths = BuildPaths::new("conf.yml", target.join("template",), target,)
            .with_date(NaiveDate::from_ymd_opt(2024, 1, 1,).expect("valid date",),);
        parse_settings(yaml,)
            .expect("valid settings",)
            .resolve(&paths, &MemoryDiagnostics::default(),)
            .expect("resolve",)
    }

    fn missing_tools() -> ToolCommands
    {
        ToolCommands {
            python:      "pizzacutter-no-such-python".to_owned(),
            black:       "pizzacutter-no-such-black".to_owned(),
            rst_include: "pizzacutter-no-such-rst-include".to_owned(),
        }
    }

    #[test]
    fn after_build_without_cli_removes_cli_files()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let config = resolved(
            "identity:\n  project_name: demo\n  package_name: demo\n  version: '1.0'\ncli:\n  \
             create_cli_file: false\ngha:\n  add_github_actions: false\n",
            dir.path(),
        );
        let project = dir.path().join("demo",);
        fs::create_dir_all(project.join("demo",),).expect("create package",);
        fs::create_dir_all(project.join("tests",),).expect("create tests",);
        fs::create_dir_all(project.join(".docs",),).expect("create docs",);
        fs::create_dir_all(project.join(".github/workflows",),).expect("create workflows",);
        fs::write(project.join("demo/demo_cli.py",), "",).expect("write cli",);
        fs::write(project.join("tests/test_cli.py",), "",).expect("write cli test",);
        fs::write(project.join(".github/workflows/python-package.yml",), "",).expect("write workflow",);
        fs::write(project.join("demo/py.typed",), "",).expect("write marker",);

        let diagnostics = MemoryDiagnostics::default();
        config.after_build(&missing_tools(), &diagnostics,).expect("after build",);

        assert!(!project.join("demo/demo_cli.py").exists());
        assert!(!project.join("tests/test_cli.py").exists());
        assert!(!project.join(".github/workflows/python-package.yml").exists());
        assert!(!project.join("demo/py.typed").exists());
        assert_eq!(
            fs::read_to_string(project.join(".docs/commandline_help.rst"),).expect("read help",),
            "there are no cli commands"
        );
    }

    #[test]
    fn after_build_marks_typed_packages_and_unescapes_readme()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let config = resolved(
            "identity:\n  project_name: demo\n  package_name: demo\n  version: '1.0'\n  \
             is_typed_package: true\ndocs:\n  badges_with_jupyter: true\n",
            dir.path(),
        );
        let project = dir.path().join("demo",);
        fs::create_dir_all(project.join("demo",),).expect("create package",);
        fs::write(project.join("README.rst",), "use {{\\PizzaCutter.project_name}}\n",)
            .expect("write readme",);
        fs::write(project.join("setup.py",), "",).expect("write setup.py",);

        let diagnostics = MemoryDiagnostics::default();
        config.after_build(&missing_tools(), &diagnostics,).expect("after build",);

        assert!(project.join("demo/py.typed").is_file());
        assert_eq!(
            fs::read_to_string(project.join("README.rst"),).expect("read readme",),
            "use {{PizzaCutter.project_name}}\n"
        );
        assert!(diagnostics.contains("Jupyter File is not present"));
        assert!(diagnostics.contains("can not find cli_module"));
        assert!(diagnostics.contains("pizzacutter-no-such-black"));
    }

    #[test]
    fn build_hooks_delegate_to_config()
    {
        let dir = tempdir().expect("failed to create tempdir",);
        let config = resolved(
            "identity:\n  version: '1.0'\ngha:\n  windows_tests: false\n  osx_tests: false\n",
            dir.path(),
        );
        let tools = ToolCommands::default();
        let diagnostics = MemoryDiagnostics::default();
        let hooks = BuildHooks::new(&config, &tools, &diagnostics,);

        hooks.before_build().expect("before build",);
        let table = hooks.pattern_table().expect("pattern table",);
        assert!(table.contains_key("{{PizzaCutter.project_name}}"));
    }
}
