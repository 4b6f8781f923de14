//! # Domain Layer
//!
//! Identities, rotation windows and key store errors. No I/O.

pub mod entities;
pub mod errors;
