//! Interfaces to the external collaborators of the live coordinator.
//!
//! The coordinator never talks to the database directly; it goes through
//! these traits. Production wires in the SeaORM-backed implementations from
//! [`db`], tests substitute in-memory or failure-injecting stubs.

pub mod db;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::Role;
use crate::registry::session::{ActiveSession, LifecycleState, PlayerAnswer};
use crate::template::TemplateSnapshot;

/// The backing service could not complete the call. Mutations that hit this
/// fail closed: the in-memory state is never left ahead of the durable state.
#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
pub struct StoreUnavailable(#[source] pub anyhow::Error);

/// Read-only access to stored quiz templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetch one template by id, already flattened into a snapshot.
    async fn get_template_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<TemplateSnapshot>, StoreUnavailable>;

    /// List templates matching a filter (public listing / host's own).
    async fn find_templates(
        &self,
        filter: &TemplateFilter,
    ) -> Result<Vec<TemplateSnapshot>, StoreUnavailable>;
}

/// Filter for [`TemplateStore::find_templates`].
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    /// Substring match on the template name.
    pub search: Option<String>,
    /// Restrict to templates owned by this author.
    pub author: Option<Uuid>,
}

/// Durable, append/update-only record of live sessions. Never read back on
/// the live path; the registry is the source of truth while a session lives.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &ActiveSession) -> Result<(), StoreUnavailable>;

    async fn update_lifecycle(
        &self,
        id: Uuid,
        state: LifecycleState,
    ) -> Result<(), StoreUnavailable>;

    async fn append_answer(&self, id: Uuid, answer: &PlayerAnswer) -> Result<(), StoreUnavailable>;
}

/// Server-side expiring token store consulted by the identity resolver.
/// Guest tokens never appear here.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Resolve a token to the user id it identifies. Expired or unknown
    /// tokens are `None`; expiry is enforced by the store, not the caller.
    async fn get(&self, token: &str) -> Result<Option<Uuid>, StoreUnavailable>;

    /// Record a freshly minted token.
    async fn insert(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreUnavailable>;
}

/// Minimal user record the identity resolver needs to build a [`Principal`].
///
/// [`Principal`]: crate::auth::Principal
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
}

/// Lookup of registered users by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<UserRecord>, StoreUnavailable>;
}
