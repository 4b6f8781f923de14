//! # Ports Layer
//!
//! - **Outbound (Driven)**: where identity documents come from

pub mod outbound;
