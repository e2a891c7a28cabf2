use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// bugscan CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "bugscan",
    version,
    about = "Scan Java code for bug patterns and apply suggested fixes",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub scan: ScanArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan files or directories.
    Scan(ScanArgs),

    /// List available rules.
    ListRules,

    /// Explain a rule.
    Explain {
        /// Rule name.
        rule: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ScanArgs {
    /// Files/directories to scan. Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Only run these rules (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these rules (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Exit with code 1 if any diagnostics are emitted.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Apply the non-conflicting subset of suggested fixes and print a diff.
    #[arg(long)]
    pub fix: bool,

    /// With --fix, write fixed sources back instead of printing a diff.
    #[arg(long, requires = "fix")]
    pub write: bool,

    /// With --fix, also apply fixes whose rules mark them as unsafe.
    #[arg(long, requires = "fix")]
    pub unsafe_fixes: bool,

    /// Explicit config file. Defaults to the nearest `bugscan.toml`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Github,
}
