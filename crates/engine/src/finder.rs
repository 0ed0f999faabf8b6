//! DSO search path discovery
//!
//! The default search path is `.`, then `RDL2_DSO_PATH`, then a path guessed
//! from where the renderer binary is installed. Command line flags can put
//! extra directories in front.

use std::path::PathBuf;

/// Environment variable holding extra plugin directories
pub const DSO_PATH_ENV: &str = "RDL2_DSO_PATH";

const RENDERER_BINARY: &str = "raas_render";
const DSO_DIR_NAME: &str = "rdl2dso";

/// Search each directory of a colon separated path for `file_name`
///
/// Returns the first existing match. Empty entries are skipped.
pub fn find_file(file_name: &str, search_path: &str) -> Option<PathBuf> {
    search_path
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(dir).join(file_name))
        .find(|candidate| candidate.is_file())
}

/// Guess the plugin directory from the renderer's install location
///
/// Looks for the renderer binary on `PATH` and returns `<its dir>/../rdl2dso`.
pub fn guess_dso_path() -> Option<PathBuf> {
    let path_env = std::env::var_os("PATH")?;
    let bin_dir = std::env::split_paths(&path_env).find(|dir| dir.join(RENDERER_BINARY).exists())?;

    let resolved = std::fs::canonicalize(&bin_dir).unwrap_or(bin_dir);
    let prefix = resolved.parent()?;
    Some(prefix.join(DSO_DIR_NAME))
}

/// Build the default DSO search path
pub fn find_dso_path() -> String {
    let mut dso_path = String::from(".");

    if let Ok(extra) = std::env::var(DSO_PATH_ENV) {
        dso_path.push(':');
        dso_path.push_str(&extra);
    }

    if let Some(guessed) = guess_dso_path() {
        dso_path.push(':');
        dso_path.push_str(&guessed.to_string_lossy());
    }

    dso_path
}

/// Build the search path from command line arguments
///
/// Accepts `-d <path>`, `--dso-path <path>` and `--dso_path <path>`; `-d`
/// takes precedence, and the last occurrence of a flag wins. The value is
/// prepended to [`find_dso_path`].
pub fn parse_dso_path<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<S> = args.into_iter().collect();
    let last_value = |flag: &str| {
        args.windows(2)
            .filter(|pair| pair[0].as_ref() == flag)
            .map(|pair| pair[1].as_ref().to_string())
            .last()
    };

    let explicit = last_value("-d")
        .or_else(|| last_value("--dso-path"))
        .or_else(|| last_value("--dso_path"));

    let found = find_dso_path();
    match explicit {
        Some(dir) if !dir.is_empty() => format!("{}:{}", dir, found),
        _ => found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_file_first_match_wins() {
        let base = std::env::temp_dir().join(format!("rdl2_finder_test_{}", std::process::id()));
        let first = base.join("first");
        let second = base.join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(second.join("Light.so"), b"").unwrap();

        let search = format!("{}::{}", first.display(), second.display());
        assert_eq!(find_file("Light.so", &search), Some(second.join("Light.so")));
        assert_eq!(find_file("Camera.so", &search), None);

        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_find_dso_path_starts_with_cwd() {
        assert!(find_dso_path().starts_with('.'));
    }

    #[test]
    fn test_parse_dso_path_precedence() {
        let path = parse_dso_path(["render", "--dso-path", "/a", "-d", "/b", "-d", "/c"]);
        assert!(path.starts_with("/c:."));

        let path = parse_dso_path(["render", "--dso_path", "/x"]);
        assert!(path.starts_with("/x:."));

        let path = parse_dso_path(["render"]);
        assert!(path.starts_with('.'));
    }
}
