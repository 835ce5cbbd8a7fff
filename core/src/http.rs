/// REST + SSE client for the chat backend.
///
/// Endpoints:
///   GET    /rooms/:room_id/messages
///   POST   /rooms/:room_id/messages      body: OutgoingMessage
///   POST   /rooms/:room_id/read
///   GET    /rooms/:room_id/events        SSE stream of Message JSON
///   GET    /likes
///   POST   /likes/:target_id
///   DELETE /likes/:target_id
use crate::auth::CredentialProvider;
use crate::backend::{
    LikeOutcome, LikeSets, MessageBackend, OutgoingMessage, PushChannel, RelationshipBackend,
};
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::message::Message;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct HttpBackend {
    base: String,
    client: Client,
    /// Separate client without a total-request timeout; the SSE stream
    /// stays open far longer than any REST call
    stream_client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpBackend {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::Network(format!("http client: {}", e)))?;
        let stream_client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::Network(format!("http client: {}", e)))?;

        Ok(Self {
            base: config.api_base.trim_end_matches('/').to_string(),
            client,
            stream_client,
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Current token, or one refresh attempt if the provider has none
    async fn bearer(&self) -> Result<String> {
        if let Some(token) = self.credentials.token().await {
            return Ok(token);
        }
        self.credentials
            .refresh()
            .await
            .ok_or_else(|| ChatError::Auth("no credentials available".to_string()))
    }

    /// Issue the request built by `build`. A 401 triggers one credential
    /// refresh and one retry; a second 401 surfaces as Auth.
    async fn execute<F>(&self, client: &Client, build: F) -> Result<Response>
    where
        F: Fn(&Client, &str) -> reqwest::RequestBuilder,
    {
        let token = self.bearer().await?;
        let resp = build(client, &token)
            .send()
            .await
            .map_err(|e| ChatError::Network(format!("request failed: {}", e)))?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return check_status(resp);
        }

        debug!("token rejected, refreshing credentials and retrying once");
        let token = self
            .credentials
            .refresh()
            .await
            .ok_or_else(|| ChatError::Auth("credential refresh failed".to_string()))?;
        let resp = build(client, &token)
            .send()
            .await
            .map_err(|e| ChatError::Network(format!("request failed: {}", e)))?;
        check_status(resp)
    }
}

fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let path = resp.url().path().to_string();
    match status {
        StatusCode::UNAUTHORIZED => Err(ChatError::Auth(format!("{} rejected the token", path))),
        StatusCode::NOT_FOUND => Err(ChatError::NotFound(path)),
        s => Err(ChatError::Network(format!("{} returned {}", path, s))),
    }
}

#[async_trait]
impl MessageBackend for HttpBackend {
    async fn fetch(&self, room_id: &str) -> Result<Vec<Message>> {
        let url = self.url(&format!("/rooms/{}/messages", room_id));
        let resp = self
            .execute(&self.client, |client, token| client.get(&url).bearer_auth(token))
            .await?;
        resp.json::<Vec<Message>>()
            .await
            .map_err(|e| ChatError::Network(format!("decode messages: {}", e)))
    }

    async fn send(&self, room_id: &str, outgoing: &OutgoingMessage) -> Result<Message> {
        let url = self.url(&format!("/rooms/{}/messages", room_id));
        let resp = self
            .execute(&self.client, |client, token| {
                client.post(&url).bearer_auth(token).json(outgoing)
            })
            .await?;
        resp.json::<Message>()
            .await
            .map_err(|e| ChatError::Network(format!("decode send ack: {}", e)))
    }

    async fn mark_read(&self, room_id: &str) -> Result<()> {
        let url = self.url(&format!("/rooms/{}/read", room_id));
        self.execute(&self.client, |client, token| client.post(&url).bearer_auth(token))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RelationshipBackend for HttpBackend {
    async fn fetch_sets(&self) -> Result<LikeSets> {
        let url = self.url("/likes");
        let resp = self
            .execute(&self.client, |client, token| client.get(&url).bearer_auth(token))
            .await?;
        resp.json::<LikeSets>()
            .await
            .map_err(|e| ChatError::Network(format!("decode like sets: {}", e)))
    }

    async fn like(&self, target_id: &str) -> Result<LikeOutcome> {
        let url = self.url(&format!("/likes/{}", target_id));
        let resp = self
            .execute(&self.client, |client, token| client.post(&url).bearer_auth(token))
            .await?;
        resp.json::<LikeOutcome>()
            .await
            .map_err(|e| ChatError::Network(format!("decode like ack: {}", e)))
    }

    async fn dislike(&self, target_id: &str) -> Result<()> {
        let url = self.url(&format!("/likes/{}", target_id));
        self.execute(&self.client, |client, token| client.delete(&url).bearer_auth(token))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PushChannel for HttpBackend {
    /// SSE subscription: frames are `data: {json}` blocks separated by a
    /// blank line; comment lines (keepalives) are skipped.
    async fn subscribe(&self, room_id: &str) -> Result<mpsc::Receiver<Message>> {
        let url = self.url(&format!("/rooms/{}/events", room_id));
        let resp = self
            .execute(&self.stream_client, |client, token| {
                client.get(&url).bearer_auth(token)
            })
            .await?;

        let (tx, rx) = mpsc::channel(64);
        let room = room_id.to_string();
        tokio::spawn(async move {
            let mut stream = resp.bytes_stream();
            let mut buf = String::new();
            'outer: while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("push stream for room {} broke: {}", room, e);
                        break;
                    }
                };
                buf.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(end) = buf.find("\n\n") {
                    let frame: String = buf.drain(..end + 2).collect();
                    for line in frame.lines() {
                        let Some(data) = line.strip_prefix("data:") else {
                            continue;
                        };
                        match serde_json::from_str::<Message>(data.trim_start()) {
                            Ok(msg) => {
                                if tx.send(msg).await.is_err() {
                                    // Receiver gone, room no longer viewed
                                    break 'outer;
                                }
                            }
                            Err(e) => warn!("push payload ignored: {}", e),
                        }
                    }
                }
            }
            debug!("push stream for room {} closed", room);
        });

        Ok(rx)
    }
}
