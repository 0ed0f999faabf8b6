//! RDL2 Engine - Scene Class DSO Loading
//!
//! This crate handles:
//! - Locating scene class plugins (`<ClassName>.so`) on a colon separated search path
//! - Opening them and resolving the `rdl2_declare`/`rdl2_create`/`rdl2_destroy` entry points
//! - Building the default search path from the environment
//!
//! # Architecture
//!
//! [`finder`] produces a search path string, [`dso::Dso`] opens one plugin
//! from it, and the core crate wraps the resolved entry points in an object
//! factory. Nothing here knows about scene classes beyond their file names.

pub mod dso;
pub mod error;
pub mod finder;

pub use dso::{class_name_from_file_name, is_valid_dso, Dso, CREATE_SYMBOL, DECLARE_SYMBOL, DESTROY_SYMBOL};
pub use error::DsoError;
pub use finder::{find_dso_path, find_file, guess_dso_path, parse_dso_path};
