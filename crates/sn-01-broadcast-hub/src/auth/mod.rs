//! Connection authenticator.
//!
//! A connection is admitted only when both checks pass:
//! 1. the bearer token has a valid HS256 signature and has not expired
//! 2. the referenced user exists and is active in the user store
//!
//! Failure is terminal for the attempt. Nothing is written on success; the
//! returned [`Principal`] is cached on the connection for its lifetime.

pub mod token;

pub use token::{Claims, TokenSigner, TokenVerifier};

use crate::domain::config::AuthConfig;
use crate::domain::error::AuthError;
use crate::ports::{TimeSource, UserStore};
use shared_types::Principal;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Authenticator {
    verifier: TokenVerifier,
    users: Arc<dyn UserStore>,
}

impl Authenticator {
    pub fn new(config: &AuthConfig, users: Arc<dyn UserStore>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            verifier: TokenVerifier::new(&config.jwt_secret, config.leeway, clock),
            users,
        }
    }

    /// Validate the credential presented at handshake time.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Principal, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.verifier.verify(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            e
        })?;

        let user = self
            .users
            .find_user(&claims.user_id)
            .await
            .map_err(|e| {
                warn!(user_id = %claims.user_id, error = %e, "User lookup failed");
                AuthError::Lookup(e.to_string())
            })?
            .ok_or(AuthError::UnknownPrincipal)?;

        if !user.is_active {
            return Err(AuthError::InactivePrincipal);
        }

        Ok(Principal::new(user.id, user.role))
    }
}
