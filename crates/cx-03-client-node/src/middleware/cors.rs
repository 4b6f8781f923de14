//! CORS for the proxy endpoints.
//!
//! Browsers call the proxy with credentials, so origins, methods and headers
//! are always explicit lists. Wildcards are never emitted.

use crate::domain::config::CorsConfig;
use crate::domain::origins::AllowedOrigins;
use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::CorsLayer as TowerCorsLayer;

/// Create CORS layer from node config
pub fn create_cors_layer(config: &CorsConfig, origins: &AllowedOrigins) -> TowerCorsLayer {
    if !config.enabled {
        // No CORS headers at all: cross-origin browser calls fail closed
        return TowerCorsLayer::new();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();

    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    let mut cors = TowerCorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.max_age));

    if !config.expose_headers.is_empty() {
        let expose: Vec<HeaderName> = config
            .expose_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        cors = cors.expose_headers(expose);
    }

    cors
}
