//! Identity Providers
//!
//! Resolve upgrade credentials into the session id the relay keys on.

mod device;
mod jwt;

pub use device::{valid_device_id, DeviceIdentityProvider, DEVICE_ID_MAX_LEN};
pub use jwt::{Claims, JwtIdentityProvider};

use std::sync::Arc;

use crate::config::AuthSettings;
use crate::domain::IdentityProvider;

/// Provider for the configured auth mode.
///
/// With a JWT secret, tokens are verified and token-less clients fall back
/// to device ids only when anonymous access is allowed. Without one, device
/// ids are trusted as presented.
pub fn from_settings(settings: &AuthSettings) -> Arc<dyn IdentityProvider> {
    let device = DeviceIdentityProvider::new(settings.allow_anonymous);
    match settings.jwt_secret.as_deref() {
        Some(secret) => {
            tracing::info!(fallback = settings.allow_anonymous, "Token identity enabled");
            let provider = JwtIdentityProvider::new(secret);
            if settings.allow_anonymous {
                Arc::new(provider.with_fallback(Arc::new(device)))
            } else {
                Arc::new(provider)
            }
        }
        None => Arc::new(device),
    }
}
