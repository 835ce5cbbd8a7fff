/// Credential capability injected into the HTTP layer.
/// Token storage and the actual refresh flow live outside this crate;
/// the sync core only asks for a bearer token and, on rejection, for a
/// fresh one.
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token, if one is available
    async fn token(&self) -> Option<String>;

    /// Force a refresh; returns the new token if one could be obtained
    async fn refresh(&self) -> Option<String>;
}

/// Fixed-token provider for the debug client and tests
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Arc<Self> {
        Arc::new(Self { token })
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn refresh(&self) -> Option<String> {
        self.token.clone()
    }
}
