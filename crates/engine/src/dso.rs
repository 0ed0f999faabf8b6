//! Scene class DSO handles
//!
//! A scene class plugin is a shared object named after its class
//! (`Camera.so` declares the class `Camera`) that exports three entry
//! points. Proxy plugins (`Camera.so.proxy`) only need to export the
//! declare entry point, since tools loading them never build real objects.

use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::DsoError;
use crate::finder::find_file;

/// Declares the attributes of a scene class
pub const DECLARE_SYMBOL: &str = "rdl2_declare";
/// Creates the behavior for a new scene object
pub const CREATE_SYMBOL: &str = "rdl2_create";
/// Destroys a scene object behavior created by the same DSO
pub const DESTROY_SYMBOL: &str = "rdl2_destroy";

const DSO_EXTENSION: &str = ".so";
const PROXY_EXTENSION: &str = ".so.proxy";

/// An opened scene class plugin
///
/// Symbols resolved through [`Dso::symbol`] are only valid while the `Dso`
/// is alive; owners keep it next to whatever holds the resolved functions.
pub struct Dso {
    path: PathBuf,
    library: Library,
}

impl std::fmt::Debug for Dso {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dso").field("path", &self.path).finish()
    }
}

impl Dso {
    /// Find and open the plugin for `class_name`
    ///
    /// # Arguments
    /// * `class_name` - Scene class name, also the file stem
    /// * `search_path` - Colon separated directories; empty means the file name is used as is
    /// * `proxy` - Look for `<class>.so.proxy` instead of `<class>.so`
    ///
    /// # Safety
    /// Opening a shared object runs its initializers. The caller must trust
    /// every plugin on the search path.
    pub unsafe fn open(class_name: &str, search_path: &str, proxy: bool) -> Result<Self, DsoError> {
        let extension = if proxy { PROXY_EXTENSION } else { DSO_EXTENSION };
        let file_name = format!("{}{}", class_name, extension);

        let path = if search_path.is_empty() {
            Some(PathBuf::from(&file_name))
        } else {
            find_file(&file_name, search_path)
        };

        let path = path.ok_or_else(|| DsoError::NotFound {
            class_name: class_name.to_string(),
            search_path: search_path.to_string(),
        })?;

        Self::open_path(path)
    }

    /// Open a plugin by explicit path
    ///
    /// # Safety
    /// Same as [`Dso::open`].
    pub unsafe fn open_path(path: impl Into<PathBuf>) -> Result<Self, DsoError> {
        let path = path.into();
        let library = Library::new(&path).map_err(|source| DsoError::LoadFailed {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Opened RDL2 DSO {:?}", path);
        Ok(Self { path, library })
    }

    /// Resolve an exported symbol and copy its value out
    ///
    /// # Safety
    /// `T` must match the exported item's real type, and the returned value
    /// must not be used after this `Dso` is dropped.
    pub unsafe fn symbol<T: Copy>(&self, name: &'static str) -> Result<T, DsoError> {
        let symbol = self
            .library
            .get::<T>(name.as_bytes())
            .map_err(|source| DsoError::MissingSymbol {
                symbol: name,
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(*symbol)
    }

    /// Location the plugin was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn strip_extension<'a>(base_name: &'a str, extension: &str) -> Option<&'a str> {
    if base_name.len() < extension.len() + 1 {
        return None;
    }
    let split = base_name.len() - extension.len();
    let (stem, tail) = (base_name.get(..split)?, base_name.get(split..)?);
    tail.eq_ignore_ascii_case(extension).then_some(stem)
}

/// Derive the scene class name from a plugin file path
///
/// Recognizes `.so.proxy` before `.so`; the extension match is case
/// insensitive. Returns `None` for anything else.
pub fn class_name_from_file_name(path: impl AsRef<Path>) -> Option<String> {
    let base_name = path.as_ref().file_name()?.to_str()?;
    strip_extension(base_name, PROXY_EXTENSION)
        .or_else(|| strip_extension(base_name, DSO_EXTENSION))
        .map(str::to_string)
}

/// Check that `path` names a loadable plugin exporting the required entry points
///
/// In proxy mode only `.so.proxy` files with a declare entry point qualify;
/// otherwise `.so` files must export all three entry points.
pub fn is_valid_dso(path: impl AsRef<Path>, proxy: bool) -> bool {
    let path = path.as_ref();
    let Some(base_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let extension = if proxy { PROXY_EXTENSION } else { DSO_EXTENSION };
    if strip_extension(base_name, extension).is_none() {
        return false;
    }

    // SAFETY: symbols are only probed for existence, never called.
    let result = unsafe {
        Dso::open_path(path).and_then(|dso| {
            dso.symbol::<*const ()>(DECLARE_SYMBOL)?;
            if !proxy {
                dso.symbol::<*const ()>(CREATE_SYMBOL)?;
                dso.symbol::<*const ()>(DESTROY_SYMBOL)?;
            }
            Ok(())
        })
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Skipping {:?}: {}", path, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_from_file_name() {
        assert_eq!(class_name_from_file_name("/dso/Camera.so").as_deref(), Some("Camera"));
        assert_eq!(
            class_name_from_file_name("MeshLight.so.proxy").as_deref(),
            Some("MeshLight")
        );
        assert_eq!(class_name_from_file_name("Upper.SO").as_deref(), Some("Upper"));
        assert_eq!(class_name_from_file_name(".so"), None);
        assert_eq!(class_name_from_file_name("notes.txt"), None);
    }

    #[test]
    fn test_is_valid_dso_rejects_extension() {
        assert!(!is_valid_dso("/nonexistent/Camera.txt", false));
        assert!(!is_valid_dso("/nonexistent/Camera.so", true));
    }

    #[test]
    fn test_is_valid_dso_rejects_garbage_file() {
        let dir = std::env::temp_dir().join(format!("rdl2_dso_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Garbage.so");
        std::fs::write(&path, b"not an elf file").unwrap();

        assert!(!is_valid_dso(&path, false));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_open_missing_reports_search_path() {
        let err = unsafe { Dso::open("NoSuchClass", "/nonexistent_a:/nonexistent_b", false) }
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Couldn't find DSO for 'NoSuchClass' in search path '/nonexistent_a:/nonexistent_b'."
        );
    }
}
