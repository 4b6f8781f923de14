//! # Consent-Exchange Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Vendor node + operator pair on a manual clock
//! ├── integration/      # End-to-end REST and redirect flows, key rotation
//! └── exploits/         # Tampering, forgery and replay attempts
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cx-tests
//! cargo test -p cx-tests integration::
//! cargo test -p cx-tests exploits::
//!
//! # Benchmarks
//! cargo bench -p cx-tests
//! ```

#[cfg(test)]
pub(crate) mod fixtures;

pub mod integration;
