//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// trellis: serve a directory tree as a web site
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: trellis.toml)
    #[arg(short = 'C', long, global = true, default_value = "trellis.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Site root directory (relative to the config file)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// URL prefix the site is mounted under
    #[arg(short, long, global = true)]
    pub mount: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the development server
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable file watching for cache invalidation
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Show how request paths resolve
    #[command(visible_alias = "r")]
    Route {
        /// Request paths to resolve, e.g. `/blog/2024/post`
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,
    },
}

impl Cli {
    pub fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}
