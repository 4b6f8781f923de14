//! Middleware stack for the client node.
//!
//! Order (outermost first):
//! 1. Tracing - one span per request
//! 2. CORS - answers preflights for allowed origins
//! 3. Timeout and body limit
//! 4. Identity gates - per route group, before any handler

pub mod cors;
pub mod identity;

pub use cors::create_cors_layer;
pub use identity::{
    check_origin, check_referer, check_return_url, Caller, Gate, GatePipeline, IdentityValidatorLayer,
    IdentityValidatorService,
};
