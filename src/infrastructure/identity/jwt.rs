//! Token identity.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::device::valid_device_id;
use crate::domain::{ConnectCredentials, Identity, IdentityProvider};
use crate::shared::error::AppError;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject; becomes the session id
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

/// Verifies an HS256 bearer token and uses its `sub` as the session id.
///
/// Connections without a token go to `fallback` when one is set and are
/// rejected otherwise.
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
    fallback: Option<Arc<dyn IdentityProvider>>,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn IdentityProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token expired".into())
                }
                _ => AppError::Unauthorized("Invalid token".into()),
            }
        })?;

        let subject = token_data.claims.sub;
        if !valid_device_id(&subject) {
            return Err(AppError::Unauthorized("Invalid token claims".into()));
        }
        Ok(Identity::new(subject))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn identify(&self, credentials: &ConnectCredentials) -> Result<Identity, AppError> {
        match (credentials.token.as_deref(), &self.fallback) {
            (Some(token), _) => self.verify(token),
            (None, Some(fallback)) => fallback.identify(credentials).await,
            (None, None) => Err(AppError::Unauthorized("Missing token".into())),
        }
    }
}
