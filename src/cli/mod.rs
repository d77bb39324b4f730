//! Command-line front end for cidflow
//!
//! - `plan`: Compile a catalog into an ordered execution plan
//! - `validate`: Check catalog files
//! - `eval`: Evaluate a rule expression against the project context
//! - `completions`: Generate shell completions

pub mod completions;
pub mod eval;
pub mod plan;
pub mod validate;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use cidflow::infrastructure::{Config, OutputFormat, init_logging};

/// CLI arguments for cidflow
#[derive(Parser, Debug)]
#[command(name = "cidflow")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the catalog into an execution plan
    Plan {
        /// Catalog file, repeatable; later files override earlier ones
        #[arg(short, long = "catalog")]
        catalogs: Vec<PathBuf>,
        /// Module list (YAML or JSON)
        #[arg(short, long)]
        modules: Option<PathBuf>,
        /// Project root directory
        #[arg(short = 'd', long, default_value = ".")]
        project_dir: PathBuf,
        /// Extra environment entry visible to rules
        #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        env: Vec<(String, String)>,
        /// Hide the process environment from rules
        #[arg(long)]
        no_process_env: bool,
        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate catalog files
    Validate {
        /// Catalog file, repeatable
        #[arg(short, long = "catalog")]
        catalogs: Vec<PathBuf>,
        /// Project root directory, used to find .cidflow.yaml
        #[arg(short = 'd', long, default_value = ".")]
        project_dir: PathBuf,
        /// Fail if any rule does not compile
        #[arg(long)]
        strict: bool,
    },

    /// Evaluate a rule expression
    Eval {
        /// Expression to evaluate
        expression: String,
        /// Project root directory
        #[arg(short = 'd', long, default_value = ".")]
        project_dir: PathBuf,
        /// Variable override, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
        /// Evaluate in the context of this module
        #[arg(long, requires = "modules")]
        module: Option<String>,
        /// Module list (YAML or JSON)
        #[arg(long)]
        modules: Option<PathBuf>,
        /// Hide the process environment from the expression
        #[arg(long)]
        no_process_env: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Parse and execute CLI arguments
pub fn run() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        init_logging("debug");
    }

    match args.command {
        Command::Plan {
            catalogs,
            modules,
            project_dir,
            env,
            no_process_env,
            format,
            output,
        } => {
            let config = Config::discover(&project_dir)?;
            init_logging(&config.log_level);

            let options = plan::PlanOptions {
                catalogs,
                modules,
                project_dir,
                env,
                process_env: !no_process_env,
            };
            let generated = plan::plan(&options, &config)?;
            let rendered = plan::render(&generated, format.unwrap_or(config.format))?;
            plan::write_output(&rendered, output.as_deref())?;
        }
        Command::Validate {
            catalogs,
            project_dir,
            strict,
        } => {
            let config = Config::discover(&project_dir)?;
            init_logging(&config.log_level);

            let catalogs = if catalogs.is_empty() {
                config.catalogs
            } else {
                catalogs
            };
            let report = validate::validate_catalogs(&catalogs, strict)?;
            println!("{}", report.summary());
        }
        Command::Eval {
            expression,
            project_dir,
            vars,
            module,
            modules,
            no_process_env,
        } => {
            let env = plan::collect_env(!no_process_env, &[]);
            let module = module.as_deref().zip(modules.as_deref());
            let value = eval::eval_expression(&expression, &project_dir, &env, module, &vars)?;
            println!("{value}");
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
        }
    }

    Ok(())
}
