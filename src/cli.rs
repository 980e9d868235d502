use std::path::PathBuf;

use clap::Parser;

use crate::docs::DEFAULT_GENERATOR;

#[derive(Parser)]
#[command(
    name = "tsds-docs",
    about = "Generate API documentation for a package.",
    arg_required_else_help = false,
    subcommand_required = false
)]
pub struct Cli {
    /// The package directory. Defaults to the current directory.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// The path to the package manifest.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where the package is linked while the generator runs.
    #[arg(long)]
    pub install_path: Option<PathBuf>,

    /// Generator executable name or path.
    #[arg(long, default_value = DEFAULT_GENERATOR)]
    pub generator: String,

    /// Run the whole command through another program instead.
    #[arg(long)]
    pub delegate: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `tsds_docs=trace`. Overrides RUST_LOG.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Arguments for the generator. `--dry-run`/`-d` is picked out of these.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
