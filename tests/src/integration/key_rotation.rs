//! # Key Rotation
//!
//! The operator rotates its signing key at t=2000. Messages are verified with
//! the key valid at their own timestamp, and a vendor that has not seen the
//! new key yet picks it up by refreshing the operator's identity document.

#[cfg(test)]
mod tests {
    use crate::fixtures::{Exchange, OPERATOR, SITE};
    use cx_01_key_store::KeyStoreError;
    use cx_02_signing::SigningError;
    use cx_03_client_node::NodeError;
    use shared_types::{IdsAndPreferences, Operation, SignedMessage, BROWSER_ID_TYPE};

    const ROTATION: u64 = 2_000;

    fn rotating() -> Exchange {
        Exchange::with_operator_windows(vec![(0, ROTATION), (ROTATION, 100_000)])
    }

    fn read_response(ex: &Exchange) -> Result<SignedMessage<IdsAndPreferences>, SigningError> {
        let request = ex
            .node
            .request_builder(Operation::ReadIdsPrefs)
            .build_rest_request(SITE, ())
            .unwrap();
        ex.operator.responses.response(
            &request,
            IdsAndPreferences {
                identifiers: vec![ex.issue_identifier("id1")],
                preferences: None,
            },
        )
    }

    #[tokio::test]
    async fn test_each_message_verified_with_key_at_its_timestamp() {
        let ex = rotating();

        let before = read_response(&ex).unwrap();
        ex.node.verify_response(Operation::ReadIdsPrefs, &before).await.unwrap();

        ex.clock.set(ROTATION + 100);
        let after = read_response(&ex).unwrap();
        ex.node.verify_response(Operation::ReadIdsPrefs, &after).await.unwrap();

        let document = ex.operator_document();
        assert_eq!(document.keys.len(), 2);
        assert_ne!(document.keys[0].key, document.keys[1].key);
        assert!(document.keys[1].covers(after.timestamp()));
    }

    #[tokio::test]
    async fn test_old_key_messages_expire_normally() {
        let ex = rotating();
        let before = read_response(&ex).unwrap();

        ex.clock.set(ROTATION + 100);
        let result = ex.node.verify_response(Operation::ReadIdsPrefs, &before).await;
        assert!(matches!(result, Err(NodeError::SignatureVerificationFailed(_))));
    }

    #[tokio::test]
    async fn test_new_key_picked_up_by_refresh() {
        let ex = rotating();

        // Counterparties initially only see the pre-rotation key.
        let full = ex.operator_document();
        let mut published = full.clone();
        published.keys.truncate(1);
        ex.fetcher.insert(published);

        let before = read_response(&ex).unwrap();
        ex.node.verify_response(Operation::ReadIdsPrefs, &before).await.unwrap();

        ex.clock.set(ROTATION + 100);
        let after = read_response(&ex).unwrap();
        let result = ex.node.verify_response(Operation::ReadIdsPrefs, &after).await;
        assert!(matches!(result, Err(NodeError::KeyNotFound(_))));

        // The operator publishes the new key; the next miss past the refresh
        // interval fetches it.
        ex.fetcher.insert(full);
        ex.clock.advance(31);
        ex.node.verify_response(Operation::ReadIdsPrefs, &after).await.unwrap();

        let cached = ex.node.key_store().cached(OPERATOR).unwrap();
        assert_eq!(cached.windows().len(), 2);
    }

    #[tokio::test]
    async fn test_lapsed_rotation_cannot_sign() {
        let ex = Exchange::with_operator_windows(vec![(0, ROTATION)]);
        ex.clock.set(ROTATION);

        assert!(matches!(
            ex.operator.signer.sign_identifier(BROWSER_ID_TYPE, "id1", None),
            Err(SigningError::KeyStore(KeyStoreError::NoActiveKey { .. }))
        ));
    }
}
