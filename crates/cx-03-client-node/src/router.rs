//! HTTP surface of the client node.
//!
//! | Route | Gates |
//! |-------|-------|
//! | `/proxy/v1/ids-prefs`, `/3pc`, `/new-id`, `/verify/read`, `/sign/prefs`, `/seed` | origin |
//! | `/proxy/v1/redirect/*` | referer, returnUrl |
//! | `/v1/identity`, `/health` | none |

use crate::controller::{ClientNode, CreateSeedRequest, OperatorReply, SignPreferencesRequest};
use crate::domain::builders::MESSAGE_PARAM;
use crate::domain::config::{CorsConfig, HttpConfig};
use crate::domain::error::{NodeError, NodeResult};
use crate::domain::origins::AllowedOrigins;
use crate::domain::redirect_chain::single_query_param;
use crate::middleware::{create_cors_layer, Caller, GatePipeline, IdentityValidatorLayer};
use axum::error_handling::HandleErrorLayer;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, OriginalUri, RawQuery, State};
use axum::http::Method;
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post, MethodRouter};
use axum::{BoxError, Extension, Json, Router};
use shared_types::{
    IdentityDocument, IdsAndPreferences, Operation, Preferences, PreparedRequest, Seed,
};
use std::sync::Arc;
use std::time::Duration;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<ClientNode>,
}

/// Build the full router: proxy routes behind their gates, plus the public
/// identity and health endpoints.
pub fn build_router(
    state: AppState,
    origins: AllowedOrigins,
    cors: &CorsConfig,
    http: &HttpConfig,
) -> Router {
    let json_routes = Router::new()
        .route(
            "/ids-prefs",
            strict(
                get(read_ids_prefs)
                    .post(write_ids_prefs)
                    .delete(delete_ids_prefs),
            ),
        )
        .route("/3pc", strict(get(check_third_party_cookie)))
        .route("/new-id", strict(get(new_id)))
        .route("/verify/read", strict(post(verify_read)))
        .route("/sign/prefs", strict(post(sign_preferences)))
        .route("/seed", strict(post(create_seed)))
        .route_layer(IdentityValidatorLayer::new(GatePipeline::json(
            origins.clone(),
        )));

    let redirect_routes = Router::new()
        .route("/redirect/get-ids-prefs", strict(get(redirect_read)))
        .route("/redirect/post-ids-prefs", strict(get(redirect_write)))
        .route("/redirect/delete-ids-prefs", strict(get(redirect_delete)))
        .route_layer(IdentityValidatorLayer::new(GatePipeline::redirect(
            origins.clone(),
        )));

    let routes = Router::new()
        .nest("/proxy/v1", json_routes.merge(redirect_routes))
        .route("/v1/identity", strict(get(identity_document)))
        .route("/health", strict(get(health_check)))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(http.max_body_size));

    with_request_timeout(routes, http.request_timeout)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors, &origins)),
        )
        .with_state(state)
}

/// Bound every request by `timeout`; an elapsed request answers `Transient`.
pub fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_middleware_error(err: BoxError) -> NodeError {
    if err.is::<Elapsed>() {
        NodeError::Transient("request timed out".into())
    } else {
        NodeError::internal(format!("unhandled middleware error: {err}"))
    }
}

/// Answer unsupported methods on a known path with a `MethodNotAllowed` body.
fn strict(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed)
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> NodeError {
    NodeError::MethodNotAllowed(format!("{method} not allowed on {}", uri.path()))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> NodeError {
    NodeError::NotFound(format!("no route for {}", uri.path()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> NodeResult<T> {
    body.map(|Json(value)| value)
        .map_err(|e| NodeError::validation(e.body_text()))
}

// =============================================================================
// REST REQUEST PREPARATION
// =============================================================================

async fn read_ids_prefs(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> NodeResult<Json<PreparedRequest<()>>> {
    let prepared = state
        .node
        .prepare_request(Operation::ReadIdsPrefs, caller.origin()?, ())?;
    Ok(Json(prepared))
}

async fn write_ids_prefs(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<IdsAndPreferences>, JsonRejection>,
) -> NodeResult<Json<PreparedRequest<IdsAndPreferences>>> {
    let body = json_body(body)?;
    let prepared = state
        .node
        .prepare_request(Operation::WriteIdsPrefs, caller.origin()?, body)?;
    Ok(Json(prepared))
}

async fn delete_ids_prefs(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> NodeResult<Json<PreparedRequest<()>>> {
    let prepared = state
        .node
        .prepare_request(Operation::DeleteIdsPrefs, caller.origin()?, ())?;
    Ok(Json(prepared))
}

async fn check_third_party_cookie(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> NodeResult<Json<PreparedRequest<()>>> {
    let prepared = state
        .node
        .prepare_request(Operation::CheckThirdPartyCookie, caller.origin()?, ())?;
    Ok(Json(prepared))
}

async fn new_id(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> NodeResult<Json<PreparedRequest<()>>> {
    let prepared = state
        .node
        .prepare_request(Operation::NewId, caller.origin()?, ())?;
    Ok(Json(prepared))
}

// =============================================================================
// VERIFICATION AND LOCAL SIGNING
// =============================================================================

async fn verify_read(
    State(state): State<AppState>,
    body: Result<Json<OperatorReply<IdsAndPreferences>>, JsonRejection>,
) -> NodeResult<Json<IdsAndPreferences>> {
    let reply = json_body(body)?;
    Ok(Json(state.node.verify_read_response(reply).await?))
}

async fn sign_preferences(
    State(state): State<AppState>,
    body: Result<Json<SignPreferencesRequest>, JsonRejection>,
) -> NodeResult<Json<Preferences>> {
    let request = json_body(body)?;
    Ok(Json(state.node.sign_preferences(request).await?))
}

async fn create_seed(
    State(state): State<AppState>,
    body: Result<Json<CreateSeedRequest>, JsonRejection>,
) -> NodeResult<Json<Seed>> {
    let request = json_body(body)?;
    Ok(Json(state.node.create_seed(request)?))
}

// =============================================================================
// REDIRECTS
// =============================================================================

async fn redirect_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> NodeResult<Redirect> {
    let url = state
        .node
        .redirect_url(Operation::ReadIdsPrefs, caller.return_url()?, ())?;
    Ok(Redirect::to(url.as_str()))
}

/// The unsigned ids and preferences arrive as JSON in `message`.
async fn redirect_write(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    RawQuery(query): RawQuery,
) -> NodeResult<Redirect> {
    let raw = single_query_param(query.as_deref().unwrap_or_default(), MESSAGE_PARAM)?
        .ok_or_else(|| NodeError::validation("missing message parameter"))?;
    let body: IdsAndPreferences = serde_json::from_str(&raw)?;

    let url = state
        .node
        .redirect_url(Operation::WriteIdsPrefs, caller.return_url()?, body)?;
    Ok(Redirect::to(url.as_str()))
}

async fn redirect_delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> NodeResult<Redirect> {
    let url = state
        .node
        .redirect_url(Operation::DeleteIdsPrefs, caller.return_url()?, ())?;
    Ok(Redirect::to(url.as_str()))
}

// =============================================================================
// PUBLIC
// =============================================================================

async fn identity_document(State(state): State<AppState>) -> NodeResult<Json<IdentityDocument>> {
    Ok(Json(state.node.identity_document()?))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "client-node",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
