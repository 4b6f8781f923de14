//! # Adapters
//!
//! Identity sources: HTTP for live counterparties, in-memory for pinned
//! configuration and tests.

pub mod fixed;
pub mod http;

pub use fixed::StaticIdentityFetcher;
pub use http::HttpIdentityFetcher;
