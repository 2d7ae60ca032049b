//! Turns inbound session tokens into [`Principal`]s.
//!
//! Registered users are resolved through the external expiring token store
//! and the user directory. Guests are issued locally: a guest token is only
//! meaningful to this process and never becomes a token-store entry, so an
//! expired or unknown token resolves to `Unauthenticated` rather than
//! silently degrading to guest.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::auth::Principal;
use crate::stores::{StoreUnavailable, TokenStore, UserDirectory};

/// Length of opaque session and guest tokens.
const TOKEN_LENGTH: usize = 48;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No, expired, or unknown identity. Callers must re-authenticate or
    /// request guest issuance; this is never treated as guest status.
    #[error("unauthenticated")]
    Unauthenticated,
    /// The token store or user directory could not be reached.
    #[error(transparent)]
    Unavailable(#[from] StoreUnavailable),
}

/// Generate a fresh opaque token (alphanumeric, 48 chars).
#[must_use]
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// A locally issued guest identity with its expiry.
#[derive(Debug, Clone)]
struct GuestEntry {
    principal: Principal,
    expires_at: DateTime<Utc>,
}

/// Resolves session tokens to principals and issues guest identities.
pub struct IdentityResolver {
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn UserDirectory>,
    /// Guest token → principal, scoped to this process's room membership.
    /// Entries expire after `guest_ttl`; expired entries read as absent and
    /// are swept opportunistically on issuance so the table stays bounded.
    guests: DashMap<String, GuestEntry>,
    guest_ttl: Duration,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        users: Arc<dyn UserDirectory>,
        guest_ttl: Duration,
    ) -> Self {
        Self {
            tokens,
            users,
            guests: DashMap::new(),
            guest_ttl,
        }
    }

    /// Resolve a token to a principal. Read-only and idempotent.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for absent/expired/unknown tokens; `Unavailable`
    /// when the backing stores cannot be reached.
    pub async fn resolve(&self, token: &str) -> Result<Principal, AuthError> {
        // Guest tokens are locally issued and never hit the token store.
        // An expired entry is dropped and reads as Unauthenticated.
        if let Some(entry) = self.guests.get(token) {
            if entry.expires_at > Utc::now() {
                return Ok(entry.principal.clone());
            }
            drop(entry);
            self.guests.remove(token);
            return Err(AuthError::Unauthenticated);
        }

        let user_id = self
            .tokens
            .get(token)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let record = self
            .users
            .find(user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        Ok(Principal::registered(record))
    }

    /// Issue a fresh guest identity and the token that resolves to it.
    pub fn issue_guest(&self, display_name: &str) -> (String, Principal) {
        let name = display_name.trim();
        let name = if name.is_empty() { "Guest" } else { name };

        let now = Utc::now();
        self.guests.retain(|_, entry| entry.expires_at > now);

        let token = generate_token();
        let principal = Principal::guest(name.to_string());
        self.guests.insert(
            token.clone(),
            GuestEntry {
                principal: principal.clone(),
                expires_at: now + self.guest_ttl,
            },
        );
        (token, principal)
    }
}
