//! RDL2 SDK - Attribute Value Type Definitions
//!
//! This crate contains the plain value types that scene object attributes
//! store, and the closed set of type tags describing them. It has no
//! dependencies so that both the engine and DSO plugins can share it.
//!
//! # Modules
//!
//! - [`math`] - Vector, color and matrix value types plus interpolation
//! - [`types`] - Attribute type tags and motion blur timesteps

pub mod math;
pub mod types;

pub use math::*;
pub use types::*;
