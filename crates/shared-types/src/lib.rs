//! # Shared Types Crate
//!
//! Wire model exchanged between vendors, CMPs and the operator.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a domain boundary is
//!   defined here, so both ends of a redirect chain parse the same shapes.
//! - **Envelope Integrity**: a `SignedMessage<T>` cannot be mutated after it is
//!   built. Changing any field means building (and signing) a new message.
//! - **Integer Time**: all timestamps are whole seconds since the Unix epoch.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod identity;
pub mod time;

pub use entities::*;
pub use envelope::*;
pub use errors::*;
pub use identity::*;
pub use time::{Clock, ManualClock, SystemClock};

/// Protocol version stamped on every envelope, identifier, preference and seed.
pub const PROTOCOL_VERSION: &str = "0.1";
