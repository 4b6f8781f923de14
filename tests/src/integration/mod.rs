//! # Integration Tests
//!
//! A vendor client node and an operator exchanging signed messages over both
//! transports, driven through the node's HTTP router.

pub mod key_rotation;
pub mod redirect_flows;
pub mod rest_flows;
