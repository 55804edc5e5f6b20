//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/site/blog/posts/  ← cwd
/// /home/user/site/trellis.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_file_from(&cwd, config_name)
}

/// Same as [`find_config_file`], starting from `start`.
pub fn find_config_file_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Expand a leading `~` in a configured path.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("trellis.toml"), "").unwrap();
        let nested = dir.path().join("site/blog/posts");
        fs::create_dir_all(&nested).unwrap();

        let found = find_config_file_from(&nested, Path::new("trellis.toml")).unwrap();
        assert_eq!(found, dir.path().join("trellis.toml"));
    }

    #[test]
    fn test_find_config_file_missing() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_file_from(dir.path(), Path::new("no-such-config-xyz.toml")).is_none());
    }

    #[test]
    fn test_expand_tilde_keeps_plain_paths() {
        assert_eq!(expand_tilde(Path::new("site")), PathBuf::from("site"));
        assert!(!expand_tilde(Path::new("~/site")).starts_with("~"));
    }
}
