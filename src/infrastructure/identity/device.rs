//! Device-id identity.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ConnectCredentials, Identity, IdentityProvider};
use crate::shared::error::AppError;

/// Longest accepted device id.
pub const DEVICE_ID_MAX_LEN: usize = 64;

/// Trusts the client-chosen `deviceId`, or issues a random id when none
/// is given and anonymous access is allowed.
#[derive(Debug, Clone)]
pub struct DeviceIdentityProvider {
    allow_anonymous: bool,
}

impl DeviceIdentityProvider {
    pub fn new(allow_anonymous: bool) -> Self {
        Self { allow_anonymous }
    }
}

/// 1-64 characters of ASCII letters, digits, `-`, `_`, `.` or `:`.
pub fn valid_device_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= DEVICE_ID_MAX_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

#[async_trait]
impl IdentityProvider for DeviceIdentityProvider {
    async fn identify(&self, credentials: &ConnectCredentials) -> Result<Identity, AppError> {
        match credentials.device_id.as_deref() {
            Some(id) if valid_device_id(id) => Ok(Identity::new(id)),
            Some(_) => Err(AppError::Unauthorized("Invalid device id".into())),
            None if self.allow_anonymous => Ok(Identity::new(Uuid::new_v4().to_string())),
            None => Err(AppError::Unauthorized("Missing device id".into())),
        }
    }
}
