//! Config path resolution

use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "RDL2_CONFIG";

/// Returns the context config path.
///
/// `$RDL2_CONFIG` when set and non-empty, otherwise `etc/rdl2.toml` next to
/// the directory holding the executable:
/// `<prefix>/bin/rdl2-print` -> `<prefix>/etc/rdl2.toml`
pub fn default_config_path() -> ConfigResult<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let exe = std::env::current_exe().map_err(ConfigError::Io)?;
    exe.parent() // bin/
        .and_then(|p| p.parent()) // prefix/
        .map(|prefix| prefix.join("etc").join("rdl2.toml"))
        .ok_or(ConfigError::NoConfigDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path_format() {
        // Only meaningful without an override in the environment.
        if std::env::var_os(CONFIG_ENV).is_some() {
            return;
        }
        let path = default_config_path().unwrap();
        assert!(path.ends_with("etc/rdl2.toml"));
    }
}
