//! Error types for scene class DSO loading

/// Error type for DSO discovery and symbol loading
#[derive(Debug, thiserror::Error)]
pub enum DsoError {
    /// No `<class>.so` (or `.so.proxy`) file on the search path
    #[error("Couldn't find DSO for '{class_name}' in search path '{search_path}'.")]
    NotFound {
        class_name: String,
        search_path: String,
    },

    /// The file exists but the dynamic loader rejected it
    #[error("Found RDL2 DSO '{path}', but failed to load it: {source}")]
    LoadFailed {
        path: String,
        #[source]
        source: libloading::Error,
    },

    /// A required entry point is not exported
    #[error("Failed to load symbol '{symbol}' from RDL2 DSO '{path}': {source}")]
    MissingSymbol {
        symbol: &'static str,
        path: String,
        #[source]
        source: libloading::Error,
    },
}
