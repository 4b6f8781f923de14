//! # Redirect Chain
//!
//! A redirect flow is a walk of top-level browser navigations:
//!
//! ```text
//! Initiated -> SentToOperator -> OperatorProcessed -> Returned -> Verified
//!      \              \                  \                \
//!       +--------------+------------------+----------------+--> Failed(reason)
//! ```
//!
//! No party keeps chain state between hops; everything travels in the URL.
//! Each party only observes its own legs: a node resumes the chain where its
//! leg starts and the state it ends in decides what the caller gets back.

use super::builders::{MESSAGE_PARAM, RETURN_URL_PARAM};
use super::error::{NodeError, NodeResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Operation, RedirectResponse, SignedMessage};
use std::fmt;
use tracing::{debug, warn};
use url::Url;

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Why a chain ended without a verified response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The operator answered with an error code.
    Operator { code: u16, message: String },
    /// The return URL carried no usable `message`.
    Malformed(String),
    /// The response did not verify.
    Verification(NodeError),
    /// An event arrived that cannot follow the current state.
    OutOfOrder { state: &'static str, event: &'static str },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Operator { code, message } => write!(f, "operator returned {code}: {message}"),
            FailureReason::Malformed(details) => write!(f, "malformed redirect: {details}"),
            FailureReason::Verification(details) => write!(f, "verification failed: {details}"),
            FailureReason::OutOfOrder { state, event } => write!(f, "{event} cannot follow {state}"),
        }
    }
}

impl FailureReason {
    /// The error a caller sees for a chain of `operation` that failed this way.
    pub fn into_error(self, operation: Operation) -> NodeError {
        match self {
            FailureReason::Operator { code, message } => NodeError::OperatorError {
                operation,
                code: Some(code),
                message,
            },
            FailureReason::Malformed(details) => NodeError::Validation(details),
            FailureReason::Verification(error) => error,
            reason @ FailureReason::OutOfOrder { .. } => {
                NodeError::internal(format!("{operation} redirect chain: {reason}"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    Initiated,
    SentToOperator,
    OperatorProcessed,
    Returned,
    Verified,
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// The browser was sent to the operator.
    Redirected,
    /// The operator handled the request and built a response.
    Processed,
    /// The browser came back to the return URL.
    ReturnedToCaller,
    /// The response verified.
    Verified,
    Failed(FailureReason),
}

impl ChainState {
    pub fn name(&self) -> &'static str {
        match self {
            ChainState::Initiated => "initiated",
            ChainState::SentToOperator => "sent-to-operator",
            ChainState::OperatorProcessed => "operator-processed",
            ChainState::Returned => "returned",
            ChainState::Verified => "verified",
            ChainState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainState::Verified | ChainState::Failed(_))
    }

    /// Next state after `event`. Terminal states absorb every event.
    pub fn on(self, event: ChainEvent) -> ChainState {
        if self.is_terminal() {
            return self;
        }

        match (self, event) {
            (_, ChainEvent::Failed(reason)) => ChainState::Failed(reason),
            (ChainState::Initiated, ChainEvent::Redirected) => ChainState::SentToOperator,
            (ChainState::SentToOperator, ChainEvent::Processed) => ChainState::OperatorProcessed,
            (ChainState::OperatorProcessed, ChainEvent::ReturnedToCaller) => ChainState::Returned,
            (ChainState::Returned, ChainEvent::Verified) => ChainState::Verified,
            (state, event) => ChainState::Failed(FailureReason::OutOfOrder {
                state: state.name(),
                event: event.name(),
            }),
        }
    }
}

impl ChainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChainEvent::Redirected => "redirected",
            ChainEvent::Processed => "processed",
            ChainEvent::ReturnedToCaller => "returned-to-caller",
            ChainEvent::Verified => "verified",
            ChainEvent::Failed(_) => "failed",
        }
    }
}

/// One operation's chain as seen by a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectChain {
    operation: Operation,
    state: ChainState,
}

impl RedirectChain {
    pub fn new(operation: Operation) -> Self {
        Self::resume(operation, ChainState::Initiated)
    }

    /// Pick the chain up at the state this node's leg starts from.
    pub fn resume(operation: Operation, state: ChainState) -> Self {
        Self { operation, state }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    pub fn advance(&mut self, event: ChainEvent) -> &ChainState {
        let from = self.state.name();
        let state = std::mem::replace(&mut self.state, ChainState::Initiated);
        self.state = state.on(event);

        match &self.state {
            ChainState::Failed(reason) => {
                warn!(operation = %self.operation, from, reason = %reason, "Redirect chain failed");
            }
            state => {
                debug!(operation = %self.operation, from, to = state.name(), "Redirect chain advanced");
            }
        }
        &self.state
    }

    /// End this node's leg with `outcome`. The value is released only if the
    /// chain reaches `Verified`; any other end state becomes the error.
    pub fn settle<T>(mut self, outcome: Result<T, FailureReason>) -> NodeResult<T> {
        let operation = self.operation;
        let (event, value) = match outcome {
            Ok(value) => (ChainEvent::Verified, Some(value)),
            Err(reason) => (ChainEvent::Failed(reason), None),
        };

        match (self.advance(event), value) {
            (ChainState::Verified, Some(value)) => Ok(value),
            (ChainState::Failed(reason), _) => Err(reason.clone().into_error(operation)),
            (state, _) => Err(NodeError::internal(format!(
                "{operation} redirect chain ended in {}",
                state.name()
            ))),
        }
    }
}

// =============================================================================
// URL CODEC
// =============================================================================

/// The single value of query parameter `name`, if present.
///
/// Repeated parameters are rejected: a second `message` or `returnUrl` could
/// otherwise be read differently by different parties.
pub fn single_param(url: &Url, name: &str) -> NodeResult<Option<String>> {
    single_query_param(url.query().unwrap_or_default(), name)
}

/// [`single_param`] over a raw query string.
pub fn single_query_param(query: &str, name: &str) -> NodeResult<Option<String>> {
    let mut values = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned());

    let first = values.next();
    if values.next().is_some() {
        return Err(NodeError::validation(format!("repeated {name} parameter")));
    }
    Ok(first)
}

/// Parse a return URL coming from the browser: http(s) only.
pub fn parse_return_url(raw: &str) -> NodeResult<Url> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(NodeError::validation(format!(
            "return URL must be http(s): {raw}"
        )));
    }
    Ok(url)
}

/// A redirect request as the operator receives it.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectRequest<T> {
    pub message: SignedMessage<T>,
    pub return_url: Url,
}

/// Decode the `message` and `returnUrl` of an operator redirect URL.
pub fn decode_redirect_request<T: DeserializeOwned>(url: &Url) -> NodeResult<RedirectRequest<T>> {
    let message = single_param(url, MESSAGE_PARAM)?
        .ok_or_else(|| NodeError::validation("missing message parameter"))?;
    let return_url = single_param(url, RETURN_URL_PARAM)?
        .ok_or_else(|| NodeError::validation("missing returnUrl parameter"))?;

    Ok(RedirectRequest {
        message: serde_json::from_str(&message)?,
        return_url: parse_return_url(&return_url)?,
    })
}

/// Return URL with the operator's response appended as its `message`.
///
/// Any `message` the return URL already carried is replaced; other
/// parameters are kept in order.
pub fn encode_redirect_response<T: Serialize>(
    return_url: &Url,
    response: &RedirectResponse<T>,
) -> NodeResult<Url> {
    let json = serde_json::to_string(response)?;
    let kept: Vec<(String, String)> = return_url
        .query_pairs()
        .filter(|(key, _)| key != MESSAGE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = return_url.clone();
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in &kept {
            query.append_pair(key, value);
        }
        query.append_pair(MESSAGE_PARAM, &json);
    }
    Ok(url)
}

/// Decode the operator's response from the `message` parameter of the URL
/// the browser returned to.
pub fn decode_redirect_response<T: DeserializeOwned>(return_url: &Url) -> NodeResult<RedirectResponse<T>> {
    let message = single_param(return_url, MESSAGE_PARAM)?
        .ok_or_else(|| NodeError::validation("missing message parameter"))?;
    Ok(serde_json::from_str(&message)?)
}

/// The signed response inside a redirect response, or why there is none.
pub fn into_signed<T>(response: RedirectResponse<T>) -> Result<SignedMessage<T>, FailureReason> {
    let code = response.code;
    if code != 200 || response.error.is_some() {
        let message = response
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| format!("operator returned status {code}"));
        return Err(FailureReason::Operator { code, message });
    }
    response
        .response
        .ok_or_else(|| FailureReason::Malformed("redirect response carries no message".into()))
}
