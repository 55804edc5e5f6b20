//! `[site]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [site]
//! root = "site"          # Directory served (relative to trellis.toml, `~` expanded)
//! mount = "/"            # URL prefix the site lives under
//! module_ext = "cgi"     # Extension of handler/template modules
//! layout_dir = "_layout" # Markdown layouts, relative to root
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Site layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub root: PathBuf,
    pub mount: String,
    pub module_ext: String,
    pub layout_dir: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("site"),
            mount: "/".to_string(),
            module_ext: "cgi".to_string(),
            layout_dir: "_layout".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_site_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.site.root, PathBuf::from("site"));
        assert_eq!(config.site.mount, "/");
        assert_eq!(config.site.module_ext, "cgi");
        assert_eq!(config.site.layout_dir, "_layout");
    }

    #[test]
    fn test_site_config() {
        let config = test_parse_config(
            "[site]\nroot = \"public\"\nmount = \"/app\"\nmodule_ext = \"py\"\nlayout_dir = \"_layouts\"",
        );
        assert_eq!(config.site.root, PathBuf::from("public"));
        assert_eq!(config.site.mount, "/app");
        assert_eq!(config.site.module_ext, "py");
        assert_eq!(config.site.layout_dir, "_layouts");
    }
}
