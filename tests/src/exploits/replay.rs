//! # Replay
//!
//! Captured messages presented again later, from the future, or in another
//! role than the one they were signed for.

#[cfg(test)]
mod tests {
    use crate::fixtures::{tamper, Exchange, SITE, VENDOR};
    use cx_02_signing::VerificationError;
    use cx_03_client_node::{NodeError, OperatorReply};
    use serde_json::json;
    use shared_types::{IdsAndPreferences, MessageType, Operation, OperatorEnvelope, SignedMessage};

    fn read_request(ex: &Exchange) -> SignedMessage<()> {
        ex.node
            .request_builder(Operation::ReadIdsPrefs)
            .build_rest_request(SITE, ())
            .unwrap()
    }

    #[tokio::test]
    async fn test_stale_request_expires() {
        let ex = Exchange::new();
        let request = read_request(&ex);

        ex.clock.advance(300);
        ex.operator.verifier.verify_message(&request, Some(SITE)).await.unwrap();

        ex.clock.advance(1);
        let result = ex.operator.verifier.verify_message(&request, Some(SITE)).await;
        assert!(matches!(result, Err(VerificationError::Expired { .. })));
    }

    #[tokio::test]
    async fn test_postdated_request_rejected() {
        let ex = Exchange::new();
        let request = read_request(&ex);
        let signed_at = request.timestamp();

        // Beyond the accepted skew: refused before any key lookup.
        let postdated = tamper(&request, |json| json["timestamp"] = json!(signed_at + 60));
        let result = ex.operator.verifier.verify_message(&postdated, Some(SITE)).await;
        assert!(matches!(result, Err(VerificationError::FutureDated { .. })));

        // Within the skew the timestamp is accepted, but it is signed over.
        let nudged = tamper(&request, |json| json["timestamp"] = json!(signed_at + 20));
        let result = ex.operator.verifier.verify_message(&nudged, Some(SITE)).await;
        assert!(matches!(result, Err(VerificationError::SignatureMismatch { .. })));
    }

    #[tokio::test]
    async fn test_identifiers_outlive_transport_window() {
        let ex = Exchange::new();
        let identifier = ex.issue_identifier("id1");

        ex.clock.advance(50_000);
        ex.operator.verifier.verify_identifier(&identifier).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_response_rejected_by_node() {
        let ex = Exchange::new();
        let request = read_request(&ex);
        let response = ex
            .operator
            .responses
            .response(
                &request,
                IdsAndPreferences {
                    identifiers: vec![ex.issue_identifier("id1")],
                    preferences: None,
                },
            )
            .unwrap();

        ex.clock.advance(600);
        let result = ex
            .node
            .verify_read_response(OperatorReply::Rest(OperatorEnvelope::Response { response }))
            .await;
        assert!(matches!(result, Err(NodeError::SignatureVerificationFailed(_))));
    }

    #[tokio::test]
    async fn test_write_response_not_accepted_as_read() {
        let ex = Exchange::new();
        let response = ex
            .operator
            .signer
            .sign_message(
                MessageType::WriteResponse,
                VENDOR,
                None,
                IdsAndPreferences {
                    identifiers: vec![ex.issue_identifier("id1")],
                    preferences: None,
                },
            )
            .unwrap();

        // Presented as is, the type does not match the operation.
        let result = ex.node.verify_response(Operation::ReadIdsPrefs, &response).await;
        assert!(matches!(result, Err(NodeError::Validation(_))));

        // Relabelled, the signature no longer matches.
        let relabelled = tamper(&response, |json| json["messageType"] = json!("readResponse"));
        let result = ex
            .node
            .verify_read_response(OperatorReply::Rest(OperatorEnvelope::Response {
                response: relabelled,
            }))
            .await;
        assert!(matches!(result, Err(NodeError::SignatureVerificationFailed(_))));
    }
}
