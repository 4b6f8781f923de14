//! # REST Flows
//!
//! Page script → client node → (browser calls operator) → client node.
//!
//! 1. **Write**: sign preferences, sign the write request, operator verifies
//!    both and answers, vendor verifies the answer
//! 2. **Read**: first visit (ids only) and returning user (ids + preferences)
//! 3. **Seed**: vendor signs a transaction seed the operator can verify
//! 4. **Bodyless requests**: delete, 3pc and new-id carry the message in the URL

#[cfg(test)]
mod tests {
    use crate::fixtures::{call, Exchange, OPERATOR, SITE, VENDOR};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use shared_types::{
        IdsAndPreferences, MessageType, Operation, OperatorEnvelope, PreparedRequest, Seed,
        SignedMessage,
    };
    use url::Url;

    async fn signed_preferences(ex: &Exchange, ids: &Value) -> Value {
        let (status, preferences) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/sign/prefs",
            SITE,
            Some(json!({
                "identifiers": ids,
                "unsignedPreferences": { "version": "0.1", "data": { "optIn": true } }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        preferences
    }

    // =============================================================================
    // WRITE
    // =============================================================================

    #[tokio::test]
    async fn test_write_flow_end_to_end() {
        let ex = Exchange::new();
        let ids = json!([ex.issue_identifier("id1")]);
        let preferences = signed_preferences(&ex, &ids).await;
        assert_eq!(preferences["source"]["domain"], VENDOR);
        assert_eq!(preferences["data"]["optIn"], true);

        let (status, prepared) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/ids-prefs",
            SITE,
            Some(json!({ "identifiers": ids, "preferences": preferences })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let prepared: PreparedRequest<IdsAndPreferences> = serde_json::from_value(prepared).unwrap();
        assert_eq!(prepared.url, format!("https://{OPERATOR}/v1/ids-prefs"));
        let request = prepared.message;
        assert_eq!(request.message_type(), MessageType::WriteRequest);
        assert_eq!(request.signer_host(), VENDOR);

        // Operator side: the request is bound to the calling site.
        ex.operator.verifier.verify_message(&request, Some(SITE)).await.unwrap();
        ex.operator
            .verifier
            .verify_ids_and_preferences(request.payload())
            .await
            .unwrap();

        let response = ex
            .operator
            .responses
            .response(&request, request.payload().clone())
            .unwrap();
        assert_eq!(response.message_type(), MessageType::WriteResponse);
        assert_eq!(response.receiver_host(), VENDOR);

        ex.node
            .verify_response(Operation::WriteIdsPrefs, &response)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_without_preferences_rejected() {
        let ex = Exchange::new();
        let (status, body) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/ids-prefs",
            SITE,
            Some(json!({ "identifiers": [ex.issue_identifier("id1")] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "ValidationError");
    }

    #[tokio::test]
    async fn test_sign_preferences_requires_operator_identifiers() {
        let ex = Exchange::new();
        let (status, body) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/sign/prefs",
            SITE,
            Some(json!({
                "identifiers": [],
                "unsignedPreferences": { "data": { "optIn": false } }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "ValidationError");
    }

    // =============================================================================
    // READ
    // =============================================================================

    async fn read_request(ex: &Exchange) -> SignedMessage<()> {
        let (status, prepared) = call(&ex.router(), Method::GET, "/proxy/v1/ids-prefs", SITE, None).await;
        assert_eq!(status, StatusCode::OK);

        let prepared: PreparedRequest<()> = serde_json::from_value(prepared).unwrap();
        let url = Url::parse(&prepared.url).unwrap();
        let (name, value) = url.query_pairs().next().unwrap();
        assert_eq!(name, "message");

        // The URL carries the same message the JSON body does.
        let from_url: SignedMessage<()> = serde_json::from_str(&value).unwrap();
        assert_eq!(from_url, prepared.message);
        prepared.message
    }

    #[tokio::test]
    async fn test_read_flow_first_visit() {
        let ex = Exchange::new();
        let request = read_request(&ex).await;
        ex.operator.verifier.verify_message(&request, Some(SITE)).await.unwrap();

        let body = IdsAndPreferences {
            identifiers: vec![ex.issue_identifier("id1")],
            preferences: None,
        };
        let response = ex.operator.responses.response(&request, body).unwrap();
        let envelope = OperatorEnvelope::Response { response };

        let (status, verified) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/verify/read",
            SITE,
            Some(serde_json::to_value(&envelope).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["identifiers"][0]["value"], "id1");
        assert!(verified.get("preferences").is_none());
    }

    #[tokio::test]
    async fn test_read_flow_returning_user() {
        let ex = Exchange::new();
        let ids = json!([ex.issue_identifier("id1")]);
        let preferences = signed_preferences(&ex, &ids).await;

        let request = read_request(&ex).await;
        let body: IdsAndPreferences =
            serde_json::from_value(json!({ "identifiers": ids, "preferences": preferences })).unwrap();
        let response = ex.operator.responses.response(&request, body).unwrap();

        let (status, verified) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/verify/read",
            SITE,
            Some(json!({ "response": response })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["preferences"]["data"]["optIn"], true);
    }

    #[tokio::test]
    async fn test_operator_error_relayed() {
        let ex = Exchange::new();
        let (status, body) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/verify/read",
            SITE,
            Some(json!({ "error": { "message": "unknown browser" } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "OperatorError");
        assert!(body["details"].as_str().unwrap().contains("unknown browser"));
    }

    // =============================================================================
    // SEED
    // =============================================================================

    #[tokio::test]
    async fn test_seed_verified_by_operator() {
        let ex = Exchange::new();
        let (status, seed) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/seed",
            SITE,
            Some(json!({ "transactionIds": ["t1", "t2"], "data": { "placement": "top" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let seed: Seed = serde_json::from_value(seed).unwrap();
        assert_eq!(seed.transaction_ids(), ["t1", "t2"]);
        assert_eq!(seed.signer_host(), VENDOR);
        ex.operator.verifier.verify_seed(&seed).await.unwrap();
    }

    // =============================================================================
    // BODYLESS REQUESTS
    // =============================================================================

    #[tokio::test]
    async fn test_bodyless_requests_verify_at_operator() {
        let ex = Exchange::new();
        let cases = [
            (Method::DELETE, "/proxy/v1/ids-prefs", "/v1/ids-prefs", MessageType::DeleteRequest),
            (Method::GET, "/proxy/v1/3pc", "/v1/3pc", MessageType::ThirdPartyCookieRequest),
            (Method::GET, "/proxy/v1/new-id", "/v1/new-id", MessageType::NewIdRequest),
        ];

        for (method, route, operator_path, message_type) in cases {
            let (status, prepared) = call(&ex.router(), method, route, SITE, None).await;
            assert_eq!(status, StatusCode::OK, "{route}");

            let prepared: PreparedRequest<()> = serde_json::from_value(prepared).unwrap();
            let url = Url::parse(&prepared.url).unwrap();
            assert_eq!(url.host_str(), Some(OPERATOR));
            assert_eq!(url.path(), operator_path);
            assert_eq!(prepared.message.message_type(), message_type);

            ex.operator
                .verifier
                .verify_message(&prepared.message, Some(SITE))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_new_id_response_verified() {
        let ex = Exchange::new();
        let (_, prepared) = call(&ex.router(), Method::GET, "/proxy/v1/new-id", SITE, None).await;
        let prepared: PreparedRequest<()> = serde_json::from_value(prepared).unwrap();

        let response = ex
            .operator
            .responses
            .response(&prepared.message, ex.issue_identifier("fresh"))
            .unwrap();
        ex.node.verify_response(Operation::NewId, &response).await.unwrap();

        // Answering a new-id request with a read response does not pass.
        let wrong = ex
            .operator
            .signer
            .sign_message(
                MessageType::ReadResponse,
                VENDOR,
                None,
                IdsAndPreferences {
                    identifiers: vec![ex.issue_identifier("fresh")],
                    preferences: None,
                },
            )
            .unwrap();
        assert!(ex.node.verify_response(Operation::NewId, &wrong).await.is_err());
    }
}
