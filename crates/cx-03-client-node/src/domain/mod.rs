//! Domain layer: configuration, errors, request builders and the redirect
//! chain. No sockets, no handlers.

pub mod builders;
pub mod config;
pub mod error;
pub mod origins;
pub mod redirect_chain;
