//! knit CLI: the command-line front end of the incremental linker.
//!
//! Provides `knit build` to link a project's modules into bundles, `knit
//! inspect` to dump a module's cached header record, and `knit clean` to drop
//! the module caches.

#![warn(missing_docs)]

mod build;
mod clean;
mod emit;
mod inspect;
mod logging;
mod project;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// knit — incremental multi-module linker.
#[derive(Parser, Debug)]
#[command(name = "knit", version, about = "Incremental multi-module linker")]
pub struct Cli {
    /// Only print diagnostics, no progress lines.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log invalidation and generation decisions at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// When to color diagnostic headers.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `knit.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of `knit`.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Link the project's modules into bundles.
    Build(BuildArgs),
    /// Show the cached header record of a module.
    Inspect(InspectArgs),
    /// Remove all module caches.
    Clean(CleanArgs),
}

/// Arguments for the `knit build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Override the build mode from `knit.toml`.
    #[arg(short, long, value_enum)]
    pub mode: Option<CliBuildMode>,

    /// Override the output directory from `knit.toml`.
    #[arg(short, long)]
    pub out: Option<String>,

    /// Output format for diagnostics and the build summary.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `knit inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Name of the module to inspect.
    pub module: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `knit clean` subcommand.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Also remove the output directory.
    #[arg(long)]
    pub all: bool,
}

/// Build mode selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliBuildMode {
    /// One bundle per module, rebuilt incrementally.
    Multi,
    /// One merged bundle.
    Single,
}

/// `--color` setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color unless `NO_COLOR` is set or there is no terminal.
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => {
                std::env::var_os("NO_COLOR").is_none() && std::env::var_os("TERM").is_some()
            }
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// How a command reports its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// rustc-style diagnostics and a one-line summary on stderr.
    Text,
    /// A single JSON document on stdout.
    Json,
}

/// Flags shared by every subcommand, with `--color` already resolved.
pub struct GlobalArgs {
    /// `--quiet`.
    pub quiet: bool,
    /// `--verbose`.
    pub verbose: bool,
    /// Whether diagnostic headers get ANSI colors.
    pub color: bool,
    /// `--config`: a `knit.toml` path or the directory holding it.
    pub config: Option<String>,
}

impl GlobalArgs {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            quiet: cli.quiet,
            verbose: cli.verbose,
            color: cli.color.enabled(),
            config: cli.config.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);
    let global = GlobalArgs::from_cli(&cli);

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Inspect(ref args) => inspect::run(args, &global),
        Command::Clean(ref args) => clean::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("knit: {e}");
            process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[test]
    fn parse_build_default() {
        let cli = Cli::parse_from(["knit", "build"]);
        match cli.command {
            Command::Build(ref args) => {
                assert!(args.mode.is_none());
                assert!(args.out.is_none());
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_build_with_args() {
        let cli = Cli::parse_from([
            "knit", "build", "--mode", "single", "--out", "dist", "--format", "json",
        ]);
        match cli.command {
            Command::Build(ref args) => {
                assert_eq!(args.mode, Some(CliBuildMode::Single));
                assert_eq!(args.out.as_deref(), Some("dist"));
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_inspect() {
        let cli = Cli::parse_from(["knit", "inspect", "lib", "-f", "json"]);
        match cli.command {
            Command::Inspect(ref args) => {
                assert_eq!(args.module, "lib");
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Inspect command"),
        }
    }

    #[test]
    fn inspect_requires_module() {
        assert!(Cli::try_parse_from(["knit", "inspect"]).is_err());
    }

    #[test]
    fn parse_clean_all() {
        let cli = Cli::parse_from(["knit", "clean", "--all"]);
        match cli.command {
            Command::Clean(ref args) => assert!(args.all),
            _ => panic!("expected Clean command"),
        }
    }

    #[test]
    fn quiet_and_no_color_before_subcommand() {
        let cli = Cli::parse_from(["knit", "--quiet", "--color", "never", "build"]);
        let global = GlobalArgs::from_cli(&cli);
        assert!(global.quiet);
        assert!(!global.verbose);
        assert!(!global.color);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["knit", "build", "--verbose", "--config", "/p/knit.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("/p/knit.toml"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["knit", "build", "--mode", "dual"]).is_err());
    }

    #[test]
    fn every_subcommand_has_help() {
        let command = Cli::command();
        command.clone().debug_assert();
        for sub in command.get_subcommands() {
            assert!(sub.get_about().is_some(), "`{}` has no help", sub.get_name());
        }
    }
}
