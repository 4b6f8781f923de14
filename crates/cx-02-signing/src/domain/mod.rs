//! # Domain Layer
//!
//! Canonical serialization and the closed set of signing definitions.
//! Pure functions, no I/O and no keys.

pub mod canonical;
pub mod definitions;
pub mod errors;
