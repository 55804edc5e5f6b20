//! Configuration for `trellis.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [site] and [serve]
//! ├── error          # ConfigError
//! ├── util           # config discovery, tilde expansion
//! └── mod.rs         # TrellisConfig (this file)
//! ```
//!
//! A missing config file is not an error: defaults apply and paths resolve
//! against the current directory. CLI flags override file values.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{ServeConfig, SiteConfig};
pub use util::{expand_tilde, find_config_file, find_config_file_from};

use crate::cli::{Cli, Commands};
use crate::log;
use crate::utils::path::normalize_path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Extensions the resolver claims for itself.
const RESERVED_EXTS: &[&str] = &["html", "md"];

/// Root configuration structure representing trellis.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrellisConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directory relative paths resolve against (internal use only)
    #[serde(skip)]
    pub base: PathBuf,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl TrellisConfig {
    /// Load configuration for a CLI invocation.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file_from(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.base = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.clone());
                config.config_path = Some(normalize_path(&path));
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    base: cwd,
                    ..Self::default()
                }
            }
        };

        config.apply_cli(cli);
        config.finalize();
        config.validate(cli.is_serve())?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::from)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Apply command line overrides.
    fn apply_cli(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        Self::update_option(&mut self.site.root, cli.root.as_ref());
        Self::update_option(&mut self.site.mount, cli.mount.as_ref());

        if let Commands::Serve { interface, port, watch } = &cli.command {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Make paths absolute and tidy string settings.
    fn finalize(&mut self) {
        let root = expand_tilde(&self.site.root);
        self.site.root = normalize_path(&self.base.join(root));

        let ext = self.site.module_ext.trim().trim_start_matches('.');
        self.site.module_ext = ext.to_string();
        self.site.layout_dir = self.site.layout_dir.trim_matches('/').to_string();
    }

    /// Check settings. `serving` also requires the root to exist.
    pub fn validate(&self, serving: bool) -> Result<(), ConfigError> {
        if !self.site.mount.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "[site] mount `{}` must start with `/`",
                self.site.mount
            )));
        }
        if self.site.module_ext.is_empty() {
            return Err(ConfigError::Validation("[site] module_ext must not be empty".into()));
        }
        if RESERVED_EXTS.contains(&self.site.module_ext.as_str()) {
            return Err(ConfigError::Validation(format!(
                "[site] module_ext `{}` is reserved",
                self.site.module_ext
            )));
        }
        if self.serve.workers == 0 {
            return Err(ConfigError::Validation("[serve] workers must be at least 1".into()));
        }
        if serving && !self.site.root.is_dir() {
            return Err(ConfigError::Validation(format!(
                "[site] root `{}` is not a directory",
                self.site.root.display()
            )));
        }
        Ok(())
    }

    /// Directory of the site being served.
    pub fn root(&self) -> &Path {
        &self.site.root
    }
}

/// Parse a config snippet for tests (panics on error).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> TrellisConfig {
    let (config, ignored) = TrellisConfig::parse_with_ignored(content).unwrap();
    assert!(ignored.is_empty(), "unexpected unknown fields: {ignored:?}");
    config
}
