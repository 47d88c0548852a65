//! # Hub Properties
//!
//! Registry, authenticator, publishers and sessions wired together the way
//! the service wires them, without a network in between.
//!
//! ## Flows Tested
//!
//! 1. Join then publish reaches exactly that connection
//! 2. Closed connections leave every topic
//! 3. Rejected credentials never register a connection
//! 4. Joins are idempotent
//! 5. Cold start pushes the overview, then the alert backlog
//! 6. Alert events reach every connection regardless of topic
//! 7. A failing provider cycle is skipped and the feed keeps going

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use shared_types::{
        events, AlertRecord, ClientMessage, Principal, Role, Severity, SnapshotKind, Topic,
    };
    use sn_01_broadcast_hub::{
        Audience, AuthError, Authenticator, BroadcastHub, FeedConfig, FixedTimeSource,
        SystemTimeSource,
    };
    use tokio::sync::watch;

    use crate::fixtures::{
        self, drain, drain_kinds, expired_token, token, token_with, users, CountingProvider,
    };

    // =========================================================================
    // FIXTURES
    // =========================================================================

    fn hub_with(provider: Arc<CountingProvider>) -> BroadcastHub {
        BroadcastHub::new(provider, 64)
    }

    fn hub() -> BroadcastHub {
        hub_with(Arc::new(CountingProvider::new()))
    }

    fn authenticator() -> Authenticator {
        Authenticator::new(
            &fixtures::hub_config().auth,
            users(),
            Arc::new(SystemTimeSource),
        )
    }

    fn system_alert() -> AlertRecord {
        AlertRecord {
            id: "alert-1".into(),
            alert_type: "SYSTEM".into(),
            severity: Severity::High,
            title: "Firewall rule change".into(),
            message: "Rule 42 disabled".into(),
            created_at: chrono::Utc::now(),
        }
    }

    // =========================================================================
    // MEMBERSHIP AND DELIVERY
    // =========================================================================

    #[tokio::test]
    async fn test_join_then_publish_delivers_once() {
        let hub = hub();
        let (a, mut rx_a) = hub.open_session(Principal::new("u1", Role::Analyst)).await;
        let (_b, mut rx_b) = hub.open_session(Principal::new("u2", Role::Admin)).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        hub.handle_message(a.id(), ClientMessage::Subscribe(Topic::Threats))
            .unwrap();
        let delivered = hub.events().publish_to(
            &Topic::Threats,
            events::THREATS_UPDATE,
            serde_json::json!([{ "id": "t1" }]),
        );

        assert_eq!(delivered, 1);
        let received = drain(&mut rx_a);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind, events::THREATS_UPDATE);
        assert_eq!(received[0].data[0]["id"], "t1");
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn test_close_removes_from_every_topic() {
        let hub = hub();
        let (handle, mut rx) = hub.open_session(Principal::new("u1", Role::Analyst)).await;
        let id = handle.id();
        for topic in [Topic::Threats, Topic::Fraud, Topic::Room("war-room".into())] {
            hub.handle_message(id, ClientMessage::JoinRoom(topic)).unwrap();
        }
        assert_eq!(hub.registry().topics_of(id).len(), 5);

        hub.close(id);
        drain(&mut rx);

        let registry = hub.registry();
        assert!(registry.topics_of(id).is_empty());
        assert_eq!(registry.member_count(&Topic::Threats), 0);
        assert_eq!(registry.member_count(&Topic::role(Role::Analyst)), 0);
        assert_eq!(
            hub.events()
                .publish_to(&Topic::Fraud, events::FRAUD_UPDATE, serde_json::json!({})),
            0
        );
        assert_eq!(hub.events().publish_system(&system_alert()), 0);
        assert!(drain(&mut rx).is_empty());
        assert!(hub.connections_for_principal("u1").is_empty());
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let hub = hub();
        let (handle, _rx) = hub.open_session(Principal::new("u3", Role::Viewer)).await;

        for _ in 0..2 {
            hub.handle_message(handle.id(), ClientMessage::Subscribe(Topic::Biometric))
                .unwrap();
        }
        assert_eq!(hub.registry().member_count(&Topic::Biometric), 1);

        let mut seen = 0;
        for topic in hub.registry().topics_of(handle.id()) {
            if topic == Topic::Biometric {
                seen += 1;
            }
        }
        assert_eq!(seen, 1);
    }

    // =========================================================================
    // AUTHENTICATION
    // =========================================================================

    #[tokio::test]
    async fn test_rejected_credentials_never_register() {
        let hub = hub();
        let auth = authenticator();

        let attempts = [
            (None, AuthError::MissingToken),
            (Some("not-a-token".to_string()), AuthError::Malformed(String::new())),
            (
                Some(token_with("other-secret", "u1", Duration::from_secs(60))),
                AuthError::BadSignature,
            ),
            (Some(expired_token("u1")), AuthError::Expired),
            (Some(token("ghost")), AuthError::UnknownPrincipal),
            (Some(token("retired")), AuthError::InactivePrincipal),
        ];

        for (credential, expected) in attempts {
            let err = auth.authenticate(credential.as_deref()).await.unwrap_err();
            assert_eq!(
                std::mem::discriminant(&err),
                std::mem::discriminant(&expected),
                "unexpected rejection {err:?}"
            );
        }

        assert_eq!(hub.connected_count(), 0);
        assert_eq!(hub.registry().topic_count(), 0);
    }

    #[tokio::test]
    async fn test_role_comes_from_user_directory() {
        // A stale role claim in the token does not matter.
        let mut claims = sn_01_broadcast_hub::Claims::new("u3", 1_700_000_000, Duration::from_secs(60));
        claims.role = Some("ADMIN".into());
        let token = sn_01_broadcast_hub::TokenSigner::new(fixtures::SECRET)
            .issue(&claims)
            .unwrap();

        let auth = Authenticator::new(
            &fixtures::hub_config().auth,
            users(),
            Arc::new(FixedTimeSource(1_700_000_010)),
        );
        let principal = auth.authenticate(Some(&token)).await.unwrap();
        assert_eq!(principal, Principal::new("u3", Role::Viewer));
    }

    // =========================================================================
    // COLD START
    // =========================================================================

    #[tokio::test]
    async fn test_cold_start_sequence() {
        let provider = Arc::new(CountingProvider::new());
        let hub = hub_with(Arc::clone(&provider));
        let principal = authenticator()
            .authenticate(Some(&token("u1")))
            .await
            .unwrap();

        let (handle, mut rx) = hub.open_session(principal).await;

        let received = drain(&mut rx);
        let kinds: Vec<&str> = received.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, [events::SECURITY_OVERVIEW, events::ALERTS_RECENT]);
        assert_eq!(received[0].data["kind"], "overview");
        assert_eq!(received[1].data["kind"], "recent_alerts");

        let registry = hub.registry();
        assert!(registry.is_member(handle.id(), &Topic::role(Role::Analyst)));
        assert!(registry.is_member(handle.id(), &Topic::user("u1")));
        assert_eq!(provider.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_cold_start_survives_provider_failure() {
        let provider = Arc::new(CountingProvider::failing(SnapshotKind::Overview, &[1]));
        let hub = hub_with(provider);

        let (handle, mut rx) = hub.open_session(Principal::new("u2", Role::Admin)).await;

        assert_eq!(drain_kinds(&mut rx), [events::ALERTS_RECENT]);
        assert!(hub
            .registry()
            .is_member(handle.id(), &Topic::role(Role::Admin)));
    }

    #[tokio::test]
    async fn test_role_topic_reaches_every_session_of_that_role() {
        let hub = hub();
        let (_a, mut rx_a) = hub.open_session(Principal::new("u1", Role::Analyst)).await;
        let (_b, mut rx_b) = hub.open_session(Principal::new("u9", Role::Analyst)).await;
        let (_c, mut rx_c) = hub.open_session(Principal::new("u2", Role::Admin)).await;
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            drain(rx);
        }

        let delivered = hub.events().publish_to(
            &Topic::role(Role::Analyst),
            "shift:handover",
            serde_json::json!({ "lead": "u9" }),
        );

        assert_eq!(delivered, 2);
        assert_eq!(drain_kinds(&mut rx_a), ["shift:handover"]);
        assert_eq!(drain_kinds(&mut rx_b), ["shift:handover"]);
        assert!(drain(&mut rx_c).is_empty());
    }

    // =========================================================================
    // EVENT BROADCASTS
    // =========================================================================

    #[tokio::test]
    async fn test_system_alert_reaches_disjoint_topics() {
        let hub = hub();
        let mut receivers = Vec::new();
        for (user, topic) in [
            ("u1", Topic::Threats),
            ("u2", Topic::Fraud),
            ("u3", Topic::Blockchain),
        ] {
            let (handle, mut rx) = hub.open_session(Principal::new(user, Role::Analyst)).await;
            hub.handle_message(handle.id(), ClientMessage::Subscribe(topic))
                .unwrap();
            drain(&mut rx);
            receivers.push(rx);
        }
        assert_eq!(hub.registry().member_count(&Topic::Alerts), 0);

        assert_eq!(hub.events().publish_system(&system_alert()), 3);

        for rx in &mut receivers {
            let received = drain(rx);
            assert_eq!(received.len(), 1);
            assert_eq!(received[0].kind, events::SYSTEM_ALERT);
            assert_eq!(received[0].data["title"], "Firewall rule change");
        }
    }

    // =========================================================================
    // PERIODIC FEEDS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_skipped_feed_continues() {
        let provider = Arc::new(CountingProvider::failing(SnapshotKind::Fraud, &[3]));
        let hub = hub_with(Arc::clone(&provider));
        let (handle, mut rx) = hub.open_session(Principal::new("u1", Role::Analyst)).await;
        hub.handle_message(handle.id(), ClientMessage::Subscribe(Topic::Fraud))
            .unwrap();
        drain(&mut rx);

        let feed = FeedConfig::new(
            events::FRAUD_UPDATE,
            SnapshotKind::Fraud,
            Duration::from_secs(15),
            Audience::Topic(Topic::Fraud),
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        let tasks = hub.periodic().spawn_feeds(&[feed], stop_rx);

        tokio::time::sleep(Duration::from_secs(61)).await;

        let cycles: Vec<u64> = drain(&mut rx)
            .iter()
            .map(|e| {
                assert_eq!(e.kind, events::FRAUD_UPDATE);
                e.data["cycle"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(cycles, [1, 2, 4]);
        assert_eq!(provider.calls(SnapshotKind::Fraud), 4);
        assert!(tasks.iter().all(|t| !t.is_finished()));

        stop_tx.send(true).unwrap();
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_feeds_without_audience_do_not_query() {
        let provider = Arc::new(CountingProvider::new());
        let hub = hub_with(Arc::clone(&provider));

        let (stop_tx, stop_rx) = watch::channel(false);
        let tasks = hub.periodic().spawn_feeds(&FeedConfig::defaults(), stop_rx);
        tokio::time::sleep(Duration::from_secs(65)).await;

        assert_eq!(provider.total_calls(), 0);

        stop_tx.send(true).unwrap();
        for task in tasks {
            task.await.unwrap();
        }
    }
}
