//! Operator-side responses.

use super::signer::Signer;
use crate::domain::definitions::AsPayload;
use crate::domain::errors::SigningError;
use shared_crypto::{DigitalSignature, EcdsaP256};
use shared_types::{ErrorBody, RedirectResponse, SignedMessage};

/// Signs the response to a verified request.
///
/// The response type and receiver come from the request, so a response can
/// only ever answer the operation and party that asked.
#[derive(Debug)]
pub struct ResponseBuilder<E: DigitalSignature = EcdsaP256> {
    signer: Signer<E>,
}

impl<E: DigitalSignature> ResponseBuilder<E> {
    pub fn new(signer: Signer<E>) -> Self {
        Self { signer }
    }

    pub fn response<R, T: AsPayload>(
        &self,
        request: &SignedMessage<R>,
        payload: T,
    ) -> Result<SignedMessage<T>, SigningError> {
        let message_type = request.message_type().operation().response_type();
        self.signer
            .sign_message(message_type, request.signer_host(), None, payload)
    }

    /// Response wrapped for the `message` parameter of a return URL.
    pub fn redirect_response<R, T: AsPayload>(
        &self,
        request: &SignedMessage<R>,
        payload: T,
    ) -> Result<RedirectResponse<T>, SigningError> {
        Ok(RedirectResponse {
            code: 200,
            response: Some(self.response(request, payload)?),
            error: None,
        })
    }

    /// Unsigned failure for the return URL.
    pub fn redirect_error<T>(&self, code: u16, message: impl Into<String>) -> RedirectResponse<T> {
        RedirectResponse {
            code,
            response: None,
            error: Some(ErrorBody {
                message: message.into(),
            }),
        }
    }
}
