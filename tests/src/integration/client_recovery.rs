//! # Client Recovery
//!
//! Reconnection manager behavior against scripted transports, on a paused
//! clock so retry delays elapse instantly.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sn_02_ws_client::{
        ClientConfig, ClientError, Connection, ConnectionState, Connector, RealtimeClient,
    };
    use tokio::time::Instant;

    /// Refuses every attempt and records when each one happened.
    #[derive(Default)]
    struct RefusingConnector {
        attempts: AtomicU32,
        at: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl Connector for RefusingConnector {
        async fn connect(&self, _url: &str) -> Result<Connection, ClientError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.at.lock().push(Instant::now());
            Err(ClientError::Connect("connection refused".into()))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("ws://127.0.0.1:9/ws", "token")
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_failures_then_failed() {
        let connector = Arc::new(RefusingConnector::default());
        let client = RealtimeClient::with_connector(config(), connector.clone());
        let mut states = client.watch_state();

        client.connect();
        let result = client.wait().await;

        assert_eq!(result, Err(ClientError::ReconnectExhausted { attempts: 5 }));
        assert_eq!(client.state(), ConnectionState::Failed);
        assert_eq!(*states.borrow_and_update(), ConnectionState::Failed);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_spaced_by_fixed_delay() {
        let connector = Arc::new(RefusingConnector::default());
        let mut cfg = config();
        cfg.reconnect_delay = Duration::from_secs(2);
        cfg.max_attempts = 3;
        let client = RealtimeClient::with_connector(cfg, connector.clone());

        client.connect();
        let _ = client.wait().await;

        let at = connector.at.lock().clone();
        assert_eq!(at.len(), 3);
        for pair in at.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_during_backoff() {
        let connector = Arc::new(RefusingConnector::default());
        let client = RealtimeClient::with_connector(config(), connector.clone());
        let mut states = client.watch_state();

        client.connect();
        states
            .wait_for(|s| *s == ConnectionState::ReconnectWait)
            .await
            .unwrap();
        client.disconnect();

        assert!(client.wait().await.is_ok());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    }
}
