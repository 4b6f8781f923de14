//! Caller identity gates.
//!
//! Every proxy route runs an explicit, ordered list of gates before its
//! handler. JSON routes check the `Origin` header; redirect routes check the
//! `Referer` and then the `returnUrl` parameter against it. A request that
//! fails a gate never reaches a handler and nothing is signed for it.
//!
//! On success the established [`Caller`] is inserted as a request extension.

use crate::domain::builders::RETURN_URL_PARAM;
use crate::domain::error::{NodeError, NodeResult};
use crate::domain::origins::AllowedOrigins;
use crate::domain::redirect_chain::{parse_return_url, single_query_param};
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::debug;
use url::Url;

// =============================================================================
// CALLER
// =============================================================================

/// Who is calling, as established by the gates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    origin: Option<String>,
    referer: Option<Url>,
    return_url: Option<Url>,
}

impl Caller {
    /// Allowed `Origin`, bound into REST requests.
    pub fn origin(&self) -> NodeResult<&str> {
        self.origin
            .as_deref()
            .ok_or_else(|| NodeError::internal("route has no origin gate"))
    }

    pub fn referer(&self) -> Option<&Url> {
        self.referer.as_ref()
    }

    /// Validated return URL, bound into redirect requests.
    pub fn return_url(&self) -> NodeResult<&Url> {
        self.return_url
            .as_ref()
            .ok_or_else(|| NodeError::internal("route has no returnUrl gate"))
    }
}

// =============================================================================
// GATES
// =============================================================================

/// `Origin` must be present and allowed.
pub fn check_origin(headers: &HeaderMap, origins: &AllowedOrigins) -> NodeResult<String> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| NodeError::origin_mismatch("missing Origin header"))?;

    if !origins.allows(origin) {
        return Err(NodeError::origin_mismatch(format!(
            "origin {origin} is not allowed"
        )));
    }
    Ok(origin.to_string())
}

/// `Referer` must be present and its origin allowed.
pub fn check_referer(headers: &HeaderMap, origins: &AllowedOrigins) -> NodeResult<Url> {
    let raw = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| NodeError::origin_mismatch("missing Referer header"))?;

    let referer = Url::parse(raw)
        .map_err(|_| NodeError::origin_mismatch(format!("unparseable Referer {raw}")))?;

    if !origins.allows_url(&referer) {
        return Err(NodeError::origin_mismatch(format!(
            "referer origin {} is not allowed",
            referer.origin().ascii_serialization()
        )));
    }
    Ok(referer)
}

/// `returnUrl` must be an http(s) URL with the referer's origin: same
/// scheme, host and port.
pub fn check_return_url(uri: &Uri, referer: &Url) -> NodeResult<Url> {
    let raw = single_query_param(uri.query().unwrap_or_default(), RETURN_URL_PARAM)?
        .ok_or_else(|| NodeError::validation("missing returnUrl parameter"))?;

    let return_url = parse_return_url(&raw)?;
    if return_url.origin() != referer.origin() {
        return Err(NodeError::return_url_mismatch(format!(
            "return URL origin {} does not match referer origin {}",
            return_url.origin().ascii_serialization(),
            referer.origin().ascii_serialization()
        )));
    }
    Ok(return_url)
}

/// One caller check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    CheckOrigin,
    CheckReferer,
    CheckReturnUrl,
}

impl Gate {
    pub fn name(self) -> &'static str {
        match self {
            Gate::CheckOrigin => "check_origin",
            Gate::CheckReferer => "check_referer",
            Gate::CheckReturnUrl => "check_return_url",
        }
    }

    fn apply(
        self,
        headers: &HeaderMap,
        uri: &Uri,
        origins: &AllowedOrigins,
        caller: &mut Caller,
    ) -> NodeResult<()> {
        match self {
            Gate::CheckOrigin => {
                caller.origin = Some(check_origin(headers, origins)?);
            }
            Gate::CheckReferer => {
                caller.referer = Some(check_referer(headers, origins)?);
            }
            Gate::CheckReturnUrl => {
                let referer = caller
                    .referer
                    .as_ref()
                    .ok_or_else(|| NodeError::internal("check_return_url must follow check_referer"))?;
                caller.return_url = Some(check_return_url(uri, referer)?);
            }
        }
        Ok(())
    }
}

/// Ordered gates for one group of routes.
#[derive(Debug, Clone)]
pub struct GatePipeline {
    gates: Vec<Gate>,
    origins: AllowedOrigins,
}

impl GatePipeline {
    pub fn new(gates: impl Into<Vec<Gate>>, origins: AllowedOrigins) -> Self {
        Self {
            gates: gates.into(),
            origins,
        }
    }

    /// JSON endpoints called by page scripts.
    pub fn json(origins: AllowedOrigins) -> Self {
        Self::new([Gate::CheckOrigin], origins)
    }

    /// Top-level navigations that end in a redirect to the operator.
    pub fn redirect(origins: AllowedOrigins) -> Self {
        Self::new([Gate::CheckReferer, Gate::CheckReturnUrl], origins)
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Run every gate in order, stopping at the first failure.
    pub fn run(&self, headers: &HeaderMap, uri: &Uri) -> NodeResult<Caller> {
        let mut caller = Caller::default();
        for gate in &self.gates {
            gate.apply(headers, uri, &self.origins, &mut caller)
                .inspect_err(|e| debug!(gate = gate.name(), error = %e, "Gate rejected request"))?;
        }
        Ok(caller)
    }
}

// =============================================================================
// TOWER LAYER
// =============================================================================

/// Runs a [`GatePipeline`] in front of the wrapped routes.
#[derive(Clone)]
pub struct IdentityValidatorLayer {
    pipeline: Arc<GatePipeline>,
}

impl IdentityValidatorLayer {
    pub fn new(pipeline: GatePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

impl<S> Layer<S> for IdentityValidatorLayer {
    type Service = IdentityValidatorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdentityValidatorService {
            inner,
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

#[derive(Clone)]
pub struct IdentityValidatorService<S> {
    inner: S,
    pipeline: Arc<GatePipeline>,
}

impl<S> Service<Request<Body>> for IdentityValidatorService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let pipeline = Arc::clone(&self.pipeline);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match pipeline.run(req.headers(), req.uri()) {
                Ok(caller) => {
                    req.extensions_mut().insert(caller);
                    inner.call(req).await
                }
                Err(e) => Ok(e.into_response()),
            }
        })
    }
}
