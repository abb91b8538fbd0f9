//! Connection identity.
//!
//! Identity is resolved before the relay ever sees a connection. The
//! relay treats the resulting session id as opaque.

use async_trait::async_trait;
use serde::Deserialize;

use crate::shared::error::AppError;

/// Credentials presented with a WebSocket upgrade request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectCredentials {
    /// Client-chosen device identifier (`?deviceId=`).
    pub device_id: Option<String>,

    /// Bearer token, from `?token=` or the `Authorization` header.
    pub token: Option<String>,
}

/// A verified identity; `session_id` keys the session registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub session_id: String,
}

impl Identity {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// Resolves upgrade credentials into an identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identify(&self, credentials: &ConnectCredentials) -> Result<Identity, AppError>;
}
