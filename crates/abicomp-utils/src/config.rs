//! # Configuration
//!
//! Where abicomp finds its files when the command line doesn't say.
//!
//! ## Environment Variables
//!
//! - `ABICOMP_DEFAULT_SUPPRESSIONS`: Suppression file applied to every
//!   comparison unless `--no-default-suppression` is given. An empty value
//!   disables the default file.
//! - `HOME`: When the variable above is unset, `$HOME/.abicomp/default.toml`
//!   is used if it exists.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Environment variable naming the default suppression file
pub const DEFAULT_SUPPRESSIONS_ENV: &str = "ABICOMP_DEFAULT_SUPPRESSIONS";

/// Per-user configuration directory, relative to `$HOME`
pub const CONFIG_DIR: &str = ".abicomp";

/// File name of the per-user default suppression file
pub const DEFAULT_SUPPRESSIONS_FILE: &str = "default.toml";

/// The default suppression file of this process, if there is one.
pub fn default_suppression_file() -> Option<PathBuf>
{
    resolve_default_suppression_file(|key| env::var(key).ok(), Path::exists)
}

/// Resolve the default suppression file from `lookup` (environment variables)
/// and `exists` (filesystem check).
///
/// An explicit `ABICOMP_DEFAULT_SUPPRESSIONS` is returned even if the file is
/// missing, so that loading it reports the mistake. The per-user file is only
/// returned when it exists.
pub fn resolve_default_suppression_file(
    lookup: impl Fn(&str) -> Option<String>,
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf>
{
    if let Some(value) = lookup(DEFAULT_SUPPRESSIONS_ENV) {
        if value.is_empty() {
            debug!("default suppression file disabled");
            return None;
        }
        return Some(PathBuf::from(value));
    }

    let home = lookup("HOME").filter(|home| !home.is_empty())?;
    let candidate = PathBuf::from(home).join(CONFIG_DIR).join(DEFAULT_SUPPRESSIONS_FILE);
    if exists(&candidate) {
        debug!(path = %candidate.display(), "using per-user default suppression file");
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a
    {
        move |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn test_explicit_file_wins()
    {
        let vars = [(DEFAULT_SUPPRESSIONS_ENV, "/etc/abicomp.toml"), ("HOME", "/home/dev")];
        assert_eq!(
            resolve_default_suppression_file(lookup(&vars), |_| false),
            Some(PathBuf::from("/etc/abicomp.toml"))
        );
    }

    #[test]
    fn test_empty_value_disables_default()
    {
        let vars = [(DEFAULT_SUPPRESSIONS_ENV, ""), ("HOME", "/home/dev")];
        assert_eq!(resolve_default_suppression_file(lookup(&vars), |_| true), None);
    }

    #[test]
    fn test_per_user_file_only_if_present()
    {
        let vars = [("HOME", "/home/dev")];
        let expected = PathBuf::from("/home/dev/.abicomp/default.toml");
        assert_eq!(
            resolve_default_suppression_file(lookup(&vars), |_| true),
            Some(expected)
        );
        assert_eq!(resolve_default_suppression_file(lookup(&vars), |_| false), None);
        assert_eq!(resolve_default_suppression_file(lookup(&[]), |_| true), None);
    }

    #[test]
    fn test_real_file_on_disk()
    {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join(CONFIG_DIR)).unwrap();
        let file = home.path().join(CONFIG_DIR).join(DEFAULT_SUPPRESSIONS_FILE);
        std::fs::write(&file, "").unwrap();

        let home_str = home.path().to_string_lossy().into_owned();
        let vars = [("HOME", home_str.as_str())];
        assert_eq!(resolve_default_suppression_file(lookup(&vars), Path::exists), Some(file));
    }
}
