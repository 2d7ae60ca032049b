use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::IdentityResolver;
use crate::config::Config;
use crate::live::rooms::RoomManager;
use crate::registry::SessionRegistry;
use crate::stores::db::{DbSessionStore, DbTemplateStore, DbTokenStore, DbUserDirectory};
use crate::stores::{TemplateStore, TokenStore};

/// Shared application state available to all request handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub registry: Arc<SessionRegistry>,
    pub rooms: RoomManager,
    pub identity: Arc<IdentityResolver>,
    pub templates: Arc<dyn TemplateStore>,
    pub tokens: Arc<dyn TokenStore>,
}

impl AppState {
    /// Wire the live coordinator to its SeaORM-backed collaborators.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let tokens: Arc<dyn TokenStore> = Arc::new(DbTokenStore::new(db.clone()));
        let users = Arc::new(DbUserDirectory::new(db.clone()));
        let sessions = Arc::new(DbSessionStore::new(db.clone()));
        let templates: Arc<dyn TemplateStore> = Arc::new(DbTemplateStore::new(db.clone()));

        // Guest identities expire on the same clock as minted session tokens.
        let guest_ttl =
            chrono::Duration::seconds(i64::try_from(config.session_token_ttl_secs).unwrap_or(86_400));

        Self {
            registry: Arc::new(SessionRegistry::new(sessions)),
            rooms: RoomManager::new(),
            identity: Arc::new(IdentityResolver::new(Arc::clone(&tokens), users, guest_ttl)),
            templates,
            tokens,
            db,
            config,
        }
    }
}
