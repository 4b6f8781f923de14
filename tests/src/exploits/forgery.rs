//! # Forgery and Misbinding
//!
//! A foreign site trying to borrow the vendor's signature, and messages from
//! parties that are not who they should be.

#[cfg(test)]
mod tests {
    use crate::fixtures::{call, navigate, tamper, Exchange, SITE, VENDOR};
    use axum::http::{Method, StatusCode};
    use cx_02_signing::{Signer, VerificationError};
    use cx_03_client_node::{decode_redirect_request, NodeError, OperatorReply};
    use shared_types::{
        IdsAndPreferences, MessageType, Operation, OperatorEnvelope, BROWSER_ID_TYPE,
    };
    use url::Url;

    const EVIL: &str = "https://evil.example";

    #[tokio::test]
    async fn test_foreign_site_gets_nothing_signed() {
        let ex = Exchange::new();
        for (method, route) in [
            (Method::GET, "/proxy/v1/ids-prefs"),
            (Method::GET, "/proxy/v1/new-id"),
            (Method::POST, "/proxy/v1/seed"),
        ] {
            let (status, body) = call(&ex.router(), method, route, EVIL, None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{route}");
            assert_eq!(body["type"], "OriginMismatch");
            assert!(body.get("message").is_none());
        }
    }

    #[tokio::test]
    async fn test_request_bound_to_origin() {
        let ex = Exchange::new();
        let request = ex
            .node
            .request_builder(Operation::ReadIdsPrefs)
            .build_rest_request(SITE, ())
            .unwrap();

        // Relayed by a page on another site: the operator sees that Origin.
        let result = ex.operator.verifier.verify_message(&request, Some(EVIL)).await;
        assert!(matches!(result, Err(VerificationError::SignatureMismatch { .. })));
    }

    #[tokio::test]
    async fn test_return_url_swap_rejected() {
        let ex = Exchange::new();
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("returnUrl", "https://good.example/back")
            .finish();
        let (_, location) = navigate(
            &ex.router(),
            &format!("/proxy/v1/redirect/get-ids-prefs?{query}"),
            "https://good.example/",
        )
        .await;
        let operator_url = Url::parse(&location.unwrap()).unwrap();

        // Re-point the chain at the attacker before it reaches the operator.
        let mut hijacked = operator_url.clone();
        let message: String = operator_url
            .query_pairs()
            .find(|(k, _)| k == "message")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        hijacked
            .query_pairs_mut()
            .clear()
            .append_pair("message", &message)
            .append_pair("returnUrl", "https://evil.example/collect");

        let request = decode_redirect_request::<()>(&hijacked).unwrap();
        let result = ex
            .operator
            .verifier
            .verify_message(&request.message, Some(request.return_url.as_str()))
            .await;
        assert!(matches!(result, Err(VerificationError::SignatureMismatch { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_return_url_rejected() {
        let ex = Exchange::new();
        let (status, _) = navigate(
            &ex.router(),
            "/proxy/v1/redirect/get-ids-prefs?returnUrl=https%3A%2F%2Fgood.example%2F&returnUrl=https%3A%2F%2Fevil.example%2F",
            "https://good.example/",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_response_not_from_operator_rejected() {
        let ex = Exchange::new();

        // The vendor's own key store signing a read response to itself.
        let rogue = Signer::new(ex.node.key_store().clone());
        let response = rogue
            .sign_message(
                MessageType::ReadResponse,
                VENDOR,
                None,
                IdsAndPreferences {
                    identifiers: vec![ex.issue_identifier("id1")],
                    preferences: None,
                },
            )
            .unwrap();

        let result = ex.node.verify_response(Operation::ReadIdsPrefs, &response).await;
        assert!(matches!(result, Err(NodeError::SignatureVerificationFailed(_))));
    }

    #[tokio::test]
    async fn test_identifier_not_issued_by_operator_rejected() {
        let ex = Exchange::new();
        let request = ex
            .node
            .request_builder(Operation::ReadIdsPrefs)
            .build_rest_request(SITE, ())
            .unwrap();

        // Correctly signed, but by the vendor rather than the operator.
        let minted = Signer::new(ex.node.key_store().clone())
            .sign_identifier(BROWSER_ID_TYPE, "minted", Some(true))
            .unwrap();
        let response = ex
            .operator
            .responses
            .response(
                &request,
                IdsAndPreferences {
                    identifiers: vec![minted],
                    preferences: None,
                },
            )
            .unwrap();

        let result = ex
            .node
            .verify_read_response(OperatorReply::Rest(OperatorEnvelope::Response { response }))
            .await;
        match result {
            Err(NodeError::SignatureVerificationFailed(details)) => {
                assert!(details.contains("not the operator"))
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_signer_rejected() {
        let ex = Exchange::new();
        let request = ex
            .node
            .request_builder(Operation::NewId)
            .build_rest_request(SITE, ())
            .unwrap();

        let forged = tamper(&request, |json| json["signerHost"] = "ghost.example".into());
        let result = ex.operator.verifier.verify_message(&forged, Some(SITE)).await;
        assert!(matches!(result, Err(VerificationError::KeyStore(_))));
    }

    #[tokio::test]
    async fn test_response_for_other_vendor_rejected() {
        let ex = Exchange::new();
        let response = ex
            .operator
            .signer
            .sign_message(MessageType::DeleteResponse, "rival.example", None, ())
            .unwrap();

        let result = ex.node.verify_response(Operation::DeleteIdsPrefs, &response).await;
        assert!(matches!(result, Err(NodeError::SignatureVerificationFailed(_))));
    }
}
