//! # Redirect Flows
//!
//! Full browser round trips without third-party cookies:
//!
//! ```text
//! page ──▶ client node /proxy/v1/redirect/* ──303──▶ operator /v1/redirect/*
//!      ◀──────────── returnUrl?message={code, response} ◀───────┘
//! page ──▶ client node /proxy/v1/verify/read
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::{call, navigate, Exchange, OPERATOR, SITE};
    use axum::http::{Method, StatusCode};
    use cx_03_client_node::{
        decode_redirect_request, decode_redirect_response, encode_redirect_response, NodeError,
    };
    use serde_json::json;
    use shared_types::{IdsAndPreferences, MessageType, RedirectResponse};
    use url::Url;

    const PAGE: &str = "https://good.example/article";
    const RETURN_URL: &str = "https://good.example/article?slot=1";

    fn proxy_uri(path: &str, extra: &[(&str, &str)]) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("returnUrl", RETURN_URL);
        for (k, v) in extra {
            query.append_pair(k, v);
        }
        format!("/proxy/v1/redirect/{path}?{}", query.finish())
    }

    async fn start_chain(ex: &Exchange, path: &str, extra: &[(&str, &str)]) -> Url {
        let (status, location) = navigate(&ex.router(), &proxy_uri(path, extra), PAGE).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        Url::parse(&location.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_read_chain_round_trip() {
        let ex = Exchange::new();

        // 1. Client node sends the browser to the operator.
        let operator_url = start_chain(&ex, "get-ids-prefs", &[]).await;
        assert_eq!(operator_url.host_str(), Some(OPERATOR));
        assert_eq!(operator_url.path(), "/v1/redirect/get-ids-prefs");

        // 2. Operator decodes and verifies, bound to the return URL.
        let request = decode_redirect_request::<()>(&operator_url).unwrap();
        assert_eq!(request.return_url.as_str(), RETURN_URL);
        assert_eq!(request.message.message_type(), MessageType::ReadRequest);
        ex.operator
            .verifier
            .verify_message(&request.message, Some(request.return_url.as_str()))
            .await
            .unwrap();

        // 3. Operator sends the browser back with its signed answer.
        let body = IdsAndPreferences {
            identifiers: vec![ex.issue_identifier("id1")],
            preferences: None,
        };
        let response = ex
            .operator
            .responses
            .redirect_response(&request.message, body)
            .unwrap();
        let landing = encode_redirect_response(&request.return_url, &response).unwrap();
        assert_eq!(landing.query_pairs().next().unwrap(), ("slot".into(), "1".into()));

        // 4. The page hands the response to its client node for verification.
        let relayed: RedirectResponse<IdsAndPreferences> = decode_redirect_response(&landing).unwrap();
        let (status, verified) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/verify/read",
            SITE,
            Some(serde_json::to_value(&relayed).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["identifiers"][0]["value"], "id1");
    }

    #[tokio::test]
    async fn test_write_chain_carries_body() {
        let ex = Exchange::new();
        let identifier = ex.issue_identifier("id1");
        let preferences = ex
            .node
            .sign_preferences(
                serde_json::from_value(json!({
                    "identifiers": [identifier],
                    "unsignedPreferences": { "data": { "optIn": true } }
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        let body = json!({ "identifiers": [identifier], "preferences": preferences }).to_string();

        let operator_url = start_chain(&ex, "post-ids-prefs", &[("message", body.as_str())]).await;
        assert_eq!(operator_url.path(), "/v1/redirect/post-ids-prefs");

        let request = decode_redirect_request::<IdsAndPreferences>(&operator_url).unwrap();
        assert_eq!(request.message.message_type(), MessageType::WriteRequest);
        assert_eq!(request.message.payload().identifiers[0].value, "id1");
        ex.operator
            .verifier
            .verify_message(&request.message, Some(RETURN_URL))
            .await
            .unwrap();
        ex.operator
            .verifier
            .verify_ids_and_preferences(request.message.payload())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_chain_verifies_at_operator() {
        let ex = Exchange::new();
        let operator_url = start_chain(&ex, "delete-ids-prefs", &[]).await;

        let request = decode_redirect_request::<()>(&operator_url).unwrap();
        assert_eq!(request.message.message_type(), MessageType::DeleteRequest);
        ex.operator
            .verifier
            .verify_message(&request.message, Some(RETURN_URL))
            .await
            .unwrap();

        let response = ex.operator.responses.redirect_response(&request.message, ()).unwrap();
        let landing = encode_redirect_response(&request.return_url, &response).unwrap();
        let relayed: RedirectResponse<()> = decode_redirect_response(&landing).unwrap();
        let message = relayed.response.unwrap();
        assert_eq!(message.message_type(), MessageType::DeleteResponse);
        ex.node
            .verify_response(shared_types::Operation::DeleteIdsPrefs, &message)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_operator_failure_ends_chain() {
        let ex = Exchange::new();
        let operator_url = start_chain(&ex, "get-ids-prefs", &[]).await;
        let request = decode_redirect_request::<()>(&operator_url).unwrap();

        let failure: RedirectResponse<IdsAndPreferences> =
            ex.operator.responses.redirect_error(503, "operator maintenance");
        let landing = encode_redirect_response(&request.return_url, &failure).unwrap();
        let relayed: RedirectResponse<IdsAndPreferences> = decode_redirect_response(&landing).unwrap();

        let (status, body) = call(
            &ex.router(),
            Method::POST,
            "/proxy/v1/verify/read",
            SITE,
            Some(serde_json::to_value(&relayed).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "OperatorError");
        assert!(body["details"].as_str().unwrap().contains("operator maintenance"));
    }

    #[tokio::test]
    async fn test_landing_without_response_is_malformed() {
        let landing = Url::parse(RETURN_URL).unwrap();
        assert!(matches!(
            decode_redirect_response::<IdsAndPreferences>(&landing),
            Err(NodeError::Validation(_))
        ));
    }
}
