//! # End-to-End WebSocket Scenarios
//!
//! A real `HubService` on an ephemeral port, driven by raw
//! `tokio-tungstenite` clients and by the reconnecting `RealtimeClient`.

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use shared_types::{events, AlertRecord, Envelope, Severity, Topic};
    use sn_01_broadcast_hub::{DataProvider, HubError, HubService};
    use sn_02_ws_client::{ClientConfig, ClientError, ConnectionState, RealtimeClient};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::{mpsc, oneshot};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::http::StatusCode;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    use crate::fixtures::{hub_config, token, token_with, users, CountingProvider};
    use hub_runtime::DemoDataProvider;

    type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const WAIT: Duration = Duration::from_secs(5);

    // =========================================================================
    // TEST HARNESS
    // =========================================================================

    struct RunningHub {
        service: Arc<HubService>,
        addr: SocketAddr,
        stop: Option<oneshot::Sender<()>>,
        task: JoinHandle<Result<(), HubError>>,
    }

    impl RunningHub {
        async fn start(provider: Arc<dyn DataProvider>) -> Self {
            let service = Arc::new(HubService::new(hub_config(), users(), provider).unwrap());
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (stop, stopped) = oneshot::channel::<()>();

            let running = Arc::clone(&service);
            let task = tokio::spawn(async move {
                running
                    .serve(listener, async move {
                        let _ = stopped.await;
                    })
                    .await
            });

            Self {
                service,
                addr,
                stop: Some(stop),
                task,
            }
        }

        fn url(&self) -> String {
            format!("ws://{}/ws", self.addr)
        }

        async fn connect(&self, token: &str) -> Socket {
            let url = format!("{}?token={}", self.url(), token);
            let (socket, _) = timeout(WAIT, connect_async(url)).await.unwrap().unwrap();
            socket
        }

        async fn get(&self, path: &str) -> String {
            let mut stream = TcpStream::connect(self.addr).await.unwrap();
            let request = format!(
                "GET {path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
                self.addr
            );
            stream.write_all(request.as_bytes()).await.unwrap();
            let mut response = String::new();
            timeout(WAIT, stream.read_to_string(&mut response))
                .await
                .unwrap()
                .unwrap();
            response
        }

        async fn shutdown(mut self) {
            if let Some(stop) = self.stop.take() {
                let _ = stop.send(());
            }
            let result = timeout(WAIT, self.task).await.unwrap().unwrap();
            assert!(result.is_ok());
        }
    }

    /// Next text frame, skipping control frames.
    async fn next_envelope(socket: &mut Socket) -> Envelope {
        loop {
            let message = timeout(WAIT, socket.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("socket closed")
                .unwrap();
            if let Message::Text(text) = message {
                return Envelope::parse(text.as_str()).unwrap();
            }
        }
    }

    async fn send(socket: &mut Socket, envelope: &Envelope) {
        let text = envelope.to_json().unwrap();
        socket.send(Message::Text(text.into())).await.unwrap();
    }

    /// Ping and wait for the pong; everything sent before it has been applied.
    async fn sync(socket: &mut Socket) {
        send(socket, &Envelope::new(events::PING, serde_json::json!({ "sync": true }))).await;
        loop {
            if next_envelope(socket).await.kind == events::PONG {
                return;
            }
        }
    }

    async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let deadline = tokio::time::Instant::now() + WAIT;
        while !check().await {
            assert!(tokio::time::Instant::now() < deadline, "condition not reached");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn alert() -> AlertRecord {
        AlertRecord {
            id: "e2e-1".into(),
            alert_type: "SYSTEM".into(),
            severity: Severity::Critical,
            title: "Certificate expiring".into(),
            message: "api.example expires in 2 days".into(),
            created_at: chrono::Utc::now(),
        }
    }

    // =========================================================================
    // HANDSHAKE
    // =========================================================================

    #[tokio::test]
    async fn test_authenticated_cold_start() {
        let hub = RunningHub::start(Arc::new(DemoDataProvider::seeded(11))).await;
        let mut socket = hub.connect(&token("u1")).await;

        let overview = next_envelope(&mut socket).await;
        assert_eq!(overview.kind, events::SECURITY_OVERVIEW);
        assert!(overview.data["securityScore"].as_f64().unwrap() >= 85.0);

        let recent = next_envelope(&mut socket).await;
        assert_eq!(recent.kind, events::ALERTS_RECENT);
        assert!(recent.data.is_array());

        send(&mut socket, &Envelope::new(events::PING, serde_json::json!({ "n": 7 }))).await;
        let pong = next_envelope(&mut socket).await;
        assert_eq!(pong.kind, events::PONG);
        assert_eq!(pong.data["n"], 7);

        let registry = hub.service.hub().registry().clone();
        assert_eq!(registry.member_count(&Topic::user("u1")), 1);

        let health = hub.get("/health").await;
        assert!(health.starts_with("HTTP/1.1 200"));
        assert!(health.contains("\"connections\":1"));

        let stats = hub.get("/stats").await;
        assert!(stats.contains("\"role:ANALYST\":1"));

        drop(socket);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_credentials_refused_before_upgrade() {
        let hub = RunningHub::start(Arc::new(CountingProvider::new())).await;

        for credential in [
            token_with("wrong-secret", "u1", Duration::from_secs(60)),
            token("retired"),
            token("nobody"),
            String::new(),
        ] {
            let url = format!("{}?token={}", hub.url(), credential);
            let result = timeout(WAIT, connect_async(url)).await.unwrap();
            match result {
                Err(WsError::Http(response)) => {
                    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
                    // The body only arrives if it shared a read with the headers
                    if let Some(body) = response.body().as_deref().filter(|b| !b.is_empty()) {
                        assert!(String::from_utf8_lossy(body).starts_with("authentication failed"));
                    }
                }
                Err(other) => panic!("expected 401, got {other}"),
                Ok(_) => panic!("bad credential was upgraded"),
            }
        }

        assert_eq!(hub.service.hub().connected_count(), 0);
        hub.shutdown().await;
    }

    // =========================================================================
    // TOPICS AND EVENTS
    // =========================================================================

    #[tokio::test]
    async fn test_subscribe_then_topic_publish() {
        let hub = RunningHub::start(Arc::new(CountingProvider::new())).await;
        let mut subscriber = hub.connect(&token("u1")).await;
        let mut bystander = hub.connect(&token("u2")).await;

        send(&mut subscriber, &Envelope::new("subscribe:threats", serde_json::json!({}))).await;
        sync(&mut subscriber).await;
        sync(&mut bystander).await;

        let delivered = hub.service.events().publish_to(
            &Topic::Threats,
            events::THREATS_UPDATE,
            serde_json::json!([{ "id": "t-42" }]),
        );
        assert_eq!(delivered, 1);

        let update = next_envelope(&mut subscriber).await;
        assert_eq!(update.kind, events::THREATS_UPDATE);
        assert_eq!(update.data[0]["id"], "t-42");

        // The bystander's next frame is the reply to its own ping.
        send(&mut bystander, &Envelope::new(events::PING, serde_json::json!(1))).await;
        assert_eq!(next_envelope(&mut bystander).await.kind, events::PONG);

        drop(subscriber);
        drop(bystander);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_implicit_topic_request_is_refused() {
        let hub = RunningHub::start(Arc::new(CountingProvider::new())).await;
        let mut socket = hub.connect(&token("u3")).await;
        next_envelope(&mut socket).await;
        next_envelope(&mut socket).await;

        send(
            &mut socket,
            &Envelope::new("join_room", serde_json::json!({ "room": "role:ADMIN" })),
        )
        .await;
        let reply = next_envelope(&mut socket).await;
        assert_eq!(reply.kind, events::ERROR);
        assert_eq!(
            hub.service
                .hub()
                .registry()
                .member_count(&Topic::role(shared_types::Role::Admin)),
            0
        );

        drop(socket);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_system_alert_reaches_everyone() {
        let hub = RunningHub::start(Arc::new(CountingProvider::new())).await;
        let mut sockets = Vec::new();
        for user in ["u1", "u2", "u3"] {
            let mut socket = hub.connect(&token(user)).await;
            sync(&mut socket).await;
            sockets.push(socket);
        }

        assert_eq!(hub.service.events().publish_system(&alert()), 3);
        for socket in &mut sockets {
            let frame = next_envelope(socket).await;
            assert_eq!(frame.kind, events::SYSTEM_ALERT);
            assert_eq!(frame.data["severity"], "CRITICAL");
        }

        drop(sockets);
        hub.shutdown().await;
    }

    // =========================================================================
    // RECONNECTING CLIENT
    // =========================================================================

    #[tokio::test]
    async fn test_realtime_client_against_live_hub() {
        let hub = RunningHub::start(Arc::new(CountingProvider::new())).await;
        let registry = hub.service.hub().registry().clone();

        let client = RealtimeClient::new(ClientConfig::new(hub.url(), token("u1")));
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let _alerts = client.on(events::SYSTEM_ALERT, move |envelope| {
            seen_tx.send(envelope.data["id"].clone())?;
            Ok(())
        });
        client.subscribe(Topic::Fraud);
        client.connect();

        eventually(|| {
            let registry = registry.clone();
            async move {
                registry.member_count(&Topic::Room("dashboard".into())) == 1
                    && registry.member_count(&Topic::Fraud) == 1
            }
        })
        .await;
        assert_eq!(client.state(), ConnectionState::Connected);

        hub.service.events().publish_system(&alert());
        let id = timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
        assert_eq!(id, "e2e-1");

        client.unsubscribe(&Topic::Fraud);
        eventually(|| {
            let registry = registry.clone();
            async move { registry.member_count(&Topic::Fraud) == 0 }
        })
        .await;

        client.disconnect();
        assert!(timeout(WAIT, client.wait()).await.unwrap().is_ok());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        eventually(|| {
            let registry = registry.clone();
            async move { registry.connection_count() == 0 }
        })
        .await;

        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_realtime_client_rejection_is_terminal() {
        let hub = RunningHub::start(Arc::new(CountingProvider::new())).await;

        let client = RealtimeClient::new(ClientConfig::new(hub.url(), token("retired")));
        client.connect();
        let result = timeout(WAIT, client.wait()).await.unwrap();

        assert!(matches!(result, Err(ClientError::Rejected(_))), "{result:?}");
        assert_eq!(client.state(), ConnectionState::Failed);

        hub.shutdown().await;
    }
}
