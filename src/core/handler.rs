//! The trigger handler: the only first-party logic in the bridge.
//!
//! Invoked once per change notification. A `true` flag fires one GET at the
//! device and then resets the flag, whatever the GET's fate; a `false` flag
//! just logs that the system went idle. Nothing in here can take the process
//! down: every failure is logged and swallowed.

use colored::*;
use reqwest::Client;
use std::time::Duration;

use crate::io::store::RtdbClient;

/// What became of one ping.
#[derive(Debug, Clone, PartialEq)]
pub enum PingOutcome {
    Sent(u16),
    TimedOut,
    Failed(String),
}

pub struct TriggerHandler {
    http: Client,
    store: RtdbClient,
    target_url: String,
    trigger_path: String,
    wait_bound: Duration,
}

impl TriggerHandler {
    pub fn new(
        store: RtdbClient,
        target_url: &str,
        trigger_path: &str,
        wait_bound: Duration,
    ) -> Self {
        Self {
            http: Client::new(),
            store,
            target_url: target_url.to_string(),
            trigger_path: trigger_path.to_string(),
            wait_bound,
        }
    }

    /// Reacts to one change notification. Fire-and-forget: the caller never
    /// consumes a result.
    pub async fn handle(&self, value: Option<bool>) {
        match value {
            Some(true) => {
                println!("\n{} Trigger detected (value became true).", "⚡".yellow());
                match self.ping().await {
                    PingOutcome::Sent(status) => {
                        println!("   -> Ping Sent! Status: {}", status);
                    }
                    PingOutcome::TimedOut => {
                        println!(
                            "   -> Ping Failed: request timed out after {} seconds.",
                            self.wait_bound.as_secs()
                        );
                    }
                    PingOutcome::Failed(reason) => {
                        println!("   -> Ping Failed: {}", reason);
                    }
                }
                // The reset must happen whether or not the ping landed.
                self.reset_flag().await;
            }
            Some(false) => {
                println!(
                    "   (System returned to idle state: {} is false)",
                    self.trigger_path
                );
            }
            None => {}
        }
    }

    /// One GET at the device, bounded by the wait bound.
    pub async fn ping(&self) -> PingOutcome {
        let req = self.http.get(&self.target_url).timeout(self.wait_bound);
        match req.send().await {
            Ok(res) => PingOutcome::Sent(res.status().as_u16()),
            Err(e) if e.is_timeout() => PingOutcome::TimedOut,
            Err(e) => PingOutcome::Failed(format!("{:#}", e)),
        }
    }

    async fn reset_flag(&self) {
        match self.store.set_bool(&self.trigger_path, false).await {
            Ok(()) => println!("   -> Database field reset to false."),
            Err(e) => println!("   -> Failed to reset trigger field: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Loopback HTTP stub. Counts requests and answers each with `response`;
    /// with `respond: false` it accepts connections and leaves them hanging.
    struct Stub {
        url: String,
        hits: Arc<AtomicUsize>,
    }

    async fn spawn_stub(response: &'static [u8], respond: bool) -> Stub {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                if respond {
                    let mut buf = vec![0u8; 4096];
                    let _ = sock.read(&mut buf).await;
                    let _ = sock.write_all(response).await;
                } else {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        });

        Stub {
            url: format!("http://{}", addr),
            hits,
        }
    }

    async fn spawn_ok_stub() -> Stub {
        spawn_stub(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n", true).await
    }

    /// A loopback URL nothing is listening on.
    async fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn store_for(database_url: &str) -> RtdbClient {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"database_secret\": \"shh\"}}").unwrap();
        RtdbClient::connect(file.path().to_str().unwrap(), database_url).unwrap()
    }

    fn handler(store_url: &str, target_url: &str, wait_bound: Duration) -> TriggerHandler {
        TriggerHandler::new(store_for(store_url), target_url, "device/trigger", wait_bound)
    }

    #[tokio::test]
    async fn test_true_pings_once_and_resets_once() {
        let device = spawn_ok_stub().await;
        let store = spawn_ok_stub().await;
        let handler = handler(&store.url, &device.url, Duration::from_secs(5));

        handler.handle(Some(true)).await;

        assert_eq!(device.hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_false_touches_nothing() {
        let device = spawn_ok_stub().await;
        let store = spawn_ok_stub().await;
        let handler = handler(&store.url, &device.url, Duration::from_secs(5));

        handler.handle(Some(false)).await;
        handler.handle(None).await;

        assert_eq!(device.hits.load(Ordering::SeqCst), 0);
        assert_eq!(store.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_still_resets() {
        let device = spawn_stub(b"", false).await;
        let store = spawn_ok_stub().await;
        let handler = handler(&store.url, &device.url, Duration::from_millis(200));

        handler.handle(Some(true)).await;

        assert_eq!(device.hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_still_resets() {
        let device_url = refused_url().await;
        let store = spawn_ok_stub().await;
        let handler = handler(&store.url, &device_url, Duration::from_secs(5));

        handler.handle(Some(true)).await;

        assert_eq!(store.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_reset_does_not_panic() {
        let device = spawn_ok_stub().await;
        let store_url = refused_url().await;
        let handler = handler(&store_url, &device.url, Duration::from_secs(5));

        // Terminates normally; the write failure is only logged.
        handler.handle(Some(true)).await;
        assert_eq!(device.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ping_outcomes() {
        let device = spawn_ok_stub().await;
        let store = spawn_ok_stub().await;

        let h = handler(&store.url, &device.url, Duration::from_secs(5));
        assert_eq!(h.ping().await, PingOutcome::Sent(200));

        let hanging = spawn_stub(b"", false).await;
        let h = handler(&store.url, &hanging.url, Duration::from_millis(200));
        assert_eq!(h.ping().await, PingOutcome::TimedOut);

        let refused = refused_url().await;
        let h = handler(&store.url, &refused, Duration::from_secs(5));
        match h.ping().await {
            PingOutcome::Failed(reason) => assert!(!reason.is_empty()),
            other => panic!("expected a connection failure, got {:?}", other),
        }
    }
}
