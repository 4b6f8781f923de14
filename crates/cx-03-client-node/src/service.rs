//! Client node service - wires configuration, key store and HTTP server.

use crate::controller::ClientNode;
use crate::domain::builders::OperatorEndpoint;
use crate::domain::config::{ConfigError, NodeConfig};
use crate::domain::error::ServiceError;
use crate::domain::origins::AllowedOrigins;
use crate::router::{build_router, AppState};
use axum::Router;
use cx_01_key_store::{IdentityFetcher, KeyStore, KeyWindow, LocalIdentity};
use shared_crypto::{DigitalSignature, EcdsaP256};
use shared_types::Clock;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Client node service state
pub struct ClientNodeService {
    config: NodeConfig,
    node: Arc<ClientNode>,
    origins: AllowedOrigins,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ClientNodeService {
    /// Create a new client node from validated configuration
    pub fn new(
        config: NodeConfig,
        fetcher: Arc<dyn IdentityFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        let local = local_identity(&config)?;
        let key_store = Arc::new(KeyStore::new(
            EcdsaP256,
            local,
            fetcher,
            clock,
            config.key_store.key_store_config(),
        ));

        for document in &config.counterparties {
            key_store.pin(document)?;
            info!(host = %document.host, "Pinned counterparty identity");
        }

        let operator = OperatorEndpoint::new(config.operator.host.clone(), config.operator.base_url()?);
        let node = ClientNode::new(key_store, operator, config.key_store.verifier_config());
        let origins = AllowedOrigins::new(&config.allowed_origins)?;

        info!(
            host = %node.host(),
            operator = %node.operator().host(),
            origins = origins.len(),
            "Client node initialized"
        );

        Ok(Self {
            config,
            node: Arc::new(node),
            origins,
            shutdown_tx: None,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn node(&self) -> Arc<ClientNode> {
        Arc::clone(&self.node)
    }

    /// HTTP router with the full middleware stack
    pub fn router(&self) -> Router {
        build_router(
            AppState {
                node: Arc::clone(&self.node),
            },
            self.origins.clone(),
            &self.config.cors,
            &self.config.http,
        )
    }

    /// Serve until `shutdown()` is called or the server fails
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting client node...");

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::Bind(format!("{addr}: {e}")))?;
        info!(addr = %addr, "HTTP server listening");

        let router = self.router();
        let server = tokio::spawn(async move { axum::serve(listener, router).await });

        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("Received shutdown signal");
            }
            result = server => {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(error = %e, "HTTP server error");
                        return Err(ServiceError::Server(e.to_string()));
                    }
                    Err(e) => {
                        error!(error = %e, "HTTP server task failed");
                        return Err(ServiceError::Server(e.to_string()));
                    }
                }
            }
        }

        info!("Client node stopped");
        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn local_identity(config: &NodeConfig) -> Result<LocalIdentity<EcdsaP256>, ServiceError> {
    let identity = &config.identity;
    let keys = identity
        .keys
        .iter()
        .map(|key| {
            let pem = key.load_pem()?;
            let private = EcdsaP256
                .parse_private_key(&pem)
                .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
            Ok(KeyWindow::new(key.start, key.end, private))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let name = if identity.name.is_empty() {
        identity.host.clone()
    } else {
        identity.name.clone()
    };

    Ok(LocalIdentity::new(identity.host.clone(), name, identity.party_type, keys)?
        .with_contact(identity.dpo_email.clone(), identity.privacy_policy_url.clone()))
}
