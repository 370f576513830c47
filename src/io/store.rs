//! Remote data store client.
//!
//! Talks to the realtime database over its REST surface: a streaming GET with
//! `Accept: text/event-stream` for change notifications, and a plain PUT for
//! writes. Authentication is the database secret from the credential file,
//! passed as the `auth` query parameter.

use anyhow::{anyhow, Context, Result};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::sleep;
use url::Url;

use crate::io::events::FlagEvent;
use crate::io::stream::{decode_frame, SseParser, StoreEvent};

use futures::StreamExt;

#[derive(Debug, Deserialize)]
struct Credential {
    database_secret: String,
}

/// Handle to one database. Constructed once at startup and passed around;
/// cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RtdbClient {
    http: Client,
    base: Url,
    secret: String,
}

impl RtdbClient {
    /// Loads the credential file and builds the client. Fails fast on an
    /// unreadable or malformed credential file or database URL.
    pub fn connect(credential_path: &str, database_url: &str) -> Result<Self> {
        let raw = fs::read_to_string(credential_path)
            .with_context(|| format!("Failed to read credential file '{}'", credential_path))?;
        let cred: Credential = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid credential file '{}'", credential_path))?;

        let mut base = database_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .with_context(|| format!("Invalid database URL '{}'", database_url))?;

        Ok(Self {
            http: Client::new(),
            base,
            secret: cred.database_secret,
        })
    }

    fn node_url(&self, path: &str) -> Result<Url> {
        let mut url = self
            .base
            .join(&format!("{}.json", path.trim_matches('/')))
            .with_context(|| format!("Invalid node path '{}'", path))?;
        url.query_pairs_mut().append_pair("auth", &self.secret);
        Ok(url)
    }

    /// Writes a boolean to the node at `path`. Last write wins; there is no
    /// versioning on the store side.
    pub async fn set_bool(&self, path: &str, value: bool) -> Result<()> {
        let url = self.node_url(path)?;
        let res = self
            .http
            .put(url)
            .json(&value)
            .send()
            .await
            .context("Store write failed")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("Store write rejected: {} - {}", status, body));
        }
        Ok(())
    }

    /// Opens the change subscription on `path` and returns the notification
    /// stream. The spawned task owns the connection: when the stream drops or
    /// the server cancels it, the error is reported as an event and the
    /// stream is reopened after `reconnect_delay`. The task stops once the
    /// receiver is dropped.
    pub fn subscribe(&self, path: &str, reconnect_delay: Duration) -> Receiver<FlagEvent> {
        let (tx, rx) = mpsc::channel(32);
        let client = self.clone();
        let path = path.to_string();

        tokio::spawn(async move {
            loop {
                if let Err(e) = client.stream_changes(&path, &tx).await {
                    if tx
                        .send(FlagEvent::SubscriptionError(format!("{:#}", e)))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                if tx.is_closed() {
                    return;
                }
                sleep(reconnect_delay).await;
            }
        });

        rx
    }

    /// Runs one streaming connection to completion, forwarding decoded
    /// notifications. Returns `Ok` only when the receiver went away.
    async fn stream_changes(&self, path: &str, tx: &Sender<FlagEvent>) -> Result<()> {
        let url = self.node_url(path)?;
        let res = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .context("Failed to open change stream")?;
        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("Change stream rejected: {}", status));
        }

        let mut body = res.bytes_stream();
        let mut parser = SseParser::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("Change stream transport error")?;
            for frame in parser.feed(&chunk) {
                match decode_frame(&frame) {
                    Some(StoreEvent::Flag(value)) => {
                        if tx.send(FlagEvent::FlagChanged(value)).await.is_err() {
                            return Ok(());
                        }
                    }
                    Some(StoreEvent::Closed(reason)) => {
                        return Err(anyhow!("Change stream closed by server: {}", reason));
                    }
                    Some(StoreEvent::KeepAlive) | None => {}
                }
            }
        }

        Err(anyhow!("Change stream ended"))
    }
}
