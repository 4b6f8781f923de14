//! # Client Node (CX-03)
//!
//! The vendor / CMP side of the exchange. Web pages cannot hold private keys,
//! so they call this node, which signs the operator request on their behalf
//! and later verifies what the operator sent back.
//!
//! ## Architecture
//!
//! ```text
//!   browser ──▶ /proxy/v1/*  ──▶ identity gates ──▶ ClientNode ──▶ signed request
//!                                (Origin / Referer     │
//!                                 / returnUrl)         ▼
//!                                                 KeyStore (cx-01)
//!                                                 Signer / Verifier (cx-02)
//! ```
//!
//! - **Domain Layer** (`domain/`): config, errors, allowed origins, request
//!   builders and the redirect chain
//! - **Middleware** (`middleware/`): CORS and the caller identity gates
//! - **Controller** (`controller`): operations independent of HTTP
//! - **Router / Service**: axum routes and the server lifecycle
//!
//! ## Usage
//!
//! ```ignore
//! use cx_03_client_node::{ClientNodeService, NodeConfig};
//!
//! let mut service = ClientNodeService::new(config, fetcher, clock)?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod controller;
pub mod domain;
pub mod middleware;
pub mod router;
pub mod service;

// Re-export main types
pub use controller::{ClientNode, CreateSeedRequest, OperatorReply, SignPreferencesRequest};
pub use domain::builders::{OperatorEndpoint, RequestBuilder, MESSAGE_PARAM, RETURN_URL_PARAM};
pub use domain::config::{
    ConfigError, CorsConfig, HttpConfig, IdentityConfig, KeyConfig, KeyStoreSettings, NodeConfig,
    OperatorConfig,
};
pub use domain::error::{ErrorResponse, NodeError, NodeResult, ServiceError};
pub use domain::origins::AllowedOrigins;
pub use domain::redirect_chain::{
    decode_redirect_request, decode_redirect_response, encode_redirect_response, into_signed,
    ChainEvent, ChainState, FailureReason, RedirectChain, RedirectRequest,
};
pub use router::{build_router, AppState};
pub use service::ClientNodeService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
