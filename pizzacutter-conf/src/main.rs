// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface for the pizzacutter-conf binary.
//!
//! The CLI prints the placeholder table for a settings file, checks template
//! files for unresolved placeholders and runs the post-build hooks against a
//! generated project.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use pizzacutter_conf::{
    BuildPaths, Error, PatternTable, ResolvedConfig, ToolCommands, TracingDiagnostics,
    generate_cli_help_doc, io_error, load_settings, reformat_as_code_block,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line interface for the PizzaCutter Python template configuration.
#[derive(Debug, Parser,)]
#[command(
    name = "pizzacutter-conf",
    version,
    about = "Resolve PizzaCutter template settings into placeholder values"
)]
/// Top-level CLI options parsed from user input.
struct Cli
{
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Print the placeholder table as JSON.
    Patterns(PatternsArgs,),
    /// Fail when template files reference placeholders without a value.
    Check(CheckArgs,),
    /// Run the post-build hooks against a generated project.
    #[command(name = "after-build")]
    AfterBuild(AfterBuildArgs,),
    /// Rewrite a text file as an rst code block.
    #[command(name = "code-block")]
    CodeBlock(CodeBlockArgs,),
    /// Capture `<module> -h` into an rst code block.
    #[command(name = "cli-help")]
    CliHelp(CliHelpArgs,),
}

/// Locations shared by every command that resolves settings.
#[derive(Debug, Args,)]
struct BuildArgs
{
    /// Path to the YAML settings file.
    #[arg(long = "config", value_name = "PATH")]
    config: PathBuf,

    /// Root of the template tree.
    #[arg(long = "template-dir", value_name = "DIR")]
    template_dir: PathBuf,

    /// Directory the project is generated into.
    #[arg(long = "target-dir", value_name = "DIR")]
    target_dir: PathBuf,

    /// Name reported as the configuration file. Defaults to `--config`.
    #[arg(long = "conf-file", value_name = "PATH")]
    conf_file: Option<PathBuf,>,
}

#[derive(Debug, Args,)]
struct PatternsArgs
{
    #[command(flatten)]
    build: BuildArgs,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Debug, Args,)]
struct CheckArgs
{
    #[command(flatten)]
    build: BuildArgs,

    /// Template file to check. May be repeated.
    #[arg(long = "template", value_name = "FILE", required = true)]
    templates: Vec<PathBuf,>,
}

#[derive(Debug, Args,)]
struct AfterBuildArgs
{
    #[command(flatten)]
    build: BuildArgs,

    /// Interpreter used to run the CLI module.
    #[arg(long = "python", value_name = "PROGRAM", default_value = "python3")]
    python: String,

    /// Formatter run over the generated sources.
    #[arg(long = "black", value_name = "PROGRAM", default_value = "black")]
    black: String,

    /// Tool rebuilding README.rst.
    #[arg(long = "rst-include", value_name = "PROGRAM", default_value = "rst_include")]
    rst_include: String,
}

#[derive(Debug, Args,)]
struct CodeBlockArgs
{
    /// Text file to reformat.
    #[arg(long = "source", value_name = "FILE")]
    source: PathBuf,

    /// Output file. Defaults to rewriting the source in place.
    #[arg(long = "target", value_name = "FILE")]
    target: Option<PathBuf,>,
}

#[derive(Debug, Args,)]
struct CliHelpArgs
{
    /// Python module implementing the CLI.
    #[arg(long = "module", value_name = "FILE")]
    module: PathBuf,

    /// rst file receiving the help text.
    #[arg(long = "output", value_name = "FILE")]
    output: PathBuf,

    /// Shell command replacing the module file name in the help text.
    #[arg(long = "command", value_name = "NAME")]
    command: String,

    /// Interpreter used to run the module.
    #[arg(long = "interpreter", value_name = "PROGRAM", default_value = "python3")]
    interpreter: String,
}

/// Entry point that reports errors and sets the appropriate exit status.
fn main()
{
    init_tracing();
    if let Err(error,) = run() {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Logs to stderr so JSON on stdout stays parseable. `RUST_LOG` overrides
/// the default `info` level.
fn init_tracing()
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter,)
        .with_writer(io::stderr,)
        .with_target(false,)
        .without_time()
        .try_init();
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates errors from settings loading, pattern building and the hooks.
fn run() -> Result<(), Error,>
{
    let cli = Cli::parse();

    match cli.command {
        Command::Patterns(args,) => run_patterns(args,),
        Command::Check(args,) => run_check(args,),
        Command::AfterBuild(args,) => run_after_build(args,),
        Command::CodeBlock(args,) => run_code_block(args,),
        Command::CliHelp(args,) => run_cli_help(args,),
    }
}

fn resolve(args: &BuildArgs,) -> Result<ResolvedConfig, Error,>
{
    let settings = load_settings(&args.config,)?;
    let conf_file = args.conf_file.clone().unwrap_or_else(|| args.config.clone(),);
    let paths = BuildPaths::new(conf_file, &args.template_dir, &args.target_dir,);
    settings.resolve(&paths, &TracingDiagnostics,)
}

fn build_table(args: &BuildArgs,) -> Result<PatternTable, Error,>
{
    resolve(args,)?.build_patterns(&TracingDiagnostics,)
}

fn run_patterns(args: PatternsArgs,) -> Result<(), Error,>
{
    let table = build_table(&args.build,)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_pattern_table(&mut handle, &table, args.pretty,)
}

fn write_pattern_table<W: io::Write,>(
    writer: &mut W,
    table: &PatternTable,
    pretty: bool,
) -> Result<(), Error,>
{
    let rendered = table.to_json(pretty,)?;
    writeln!(writer, "{rendered}").map_err(|source| io_error(Path::new("<stdout>",), source,),)
}

fn run_check(args: CheckArgs,) -> Result<(), Error,>
{
    let table = build_table(&args.build,)?;
    check_templates(&table, &args.templates,)?;
    info!(templates = args.templates.len(), "all placeholders resolved");
    Ok((),)
}

/// Collects unresolved placeholders across all templates, each reported once.
fn check_templates(table: &PatternTable, templates: &[PathBuf],) -> Result<(), Error,>
{
    let mut placeholders: Vec<String,> = Vec::new();
    for template in templates {
        let text = read_template(template,)?;
        for placeholder in table.unresolved(&text,)? {
            if !placeholders.contains(&placeholder,) {
                placeholders.push(placeholder,);
            }
        }
    }

    if placeholders.is_empty() {
        Ok((),)
    } else {
        Err(Error::UnresolvedPlaceholders {
            placeholders,
        },)
    }
}

fn read_template(path: &Path,) -> Result<String, Error,>
{
    fs::read_to_string(path,).map_err(|source| io_error(path, source,),)
}

fn run_after_build(args: AfterBuildArgs,) -> Result<(), Error,>
{
    let config = resolve(&args.build,)?;
    let tools = ToolCommands {
        python:      args.python,
        black:       args.black,
        rst_include: args.rst_include,
    };
    config.after_build(&tools, &TracingDiagnostics,)
}

fn run_code_block(args: CodeBlockArgs,) -> Result<(), Error,>
{
    let target = args.target.as_deref().unwrap_or(&args.source,);
    reformat_as_code_block(&args.source, target,)
}

fn run_cli_help(args: CliHelpArgs,) -> Result<(), Error,>
{
    generate_cli_help_doc(
        &args.interpreter,
        &args.module,
        &args.output,
        &args.command,
        &TracingDiagnostics,
    )
}
