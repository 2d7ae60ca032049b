//! SeaORM-backed implementations of the external-collaborator traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::auth::Role;
use crate::entities::{auth_token, game_session, quiz_template, session_answer, user};
use crate::registry::session::{ActiveSession, LifecycleState, PlayerAnswer};
use crate::stores::{
    SessionStore, StoreUnavailable, TemplateFilter, TemplateStore, TokenStore, UserDirectory,
    UserRecord,
};
use crate::template::{Slide, TemplateSnapshot};

fn unavailable(err: impl Into<anyhow::Error>) -> StoreUnavailable {
    StoreUnavailable(err.into())
}

// ─────────────────────────────────────────────────────────────────────────────
// Templates
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only template access over the `quiz_template` table.
#[derive(Clone)]
pub struct DbTemplateStore {
    db: DatabaseConnection,
}

impl DbTemplateStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn snapshot(model: quiz_template::Model) -> Result<TemplateSnapshot, StoreUnavailable> {
        let slides: Vec<Slide> = serde_json::from_value(model.slides)
            .map_err(|e| unavailable(anyhow::anyhow!("corrupt template {}: {e}", model.id)))?;
        Ok(TemplateSnapshot {
            id: model.id,
            name: model.name,
            slides,
        })
    }
}

#[async_trait]
impl TemplateStore for DbTemplateStore {
    async fn get_template_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<TemplateSnapshot>, StoreUnavailable> {
        let model = quiz_template::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(unavailable)?;
        model.map(Self::snapshot).transpose()
    }

    async fn find_templates(
        &self,
        filter: &TemplateFilter,
    ) -> Result<Vec<TemplateSnapshot>, StoreUnavailable> {
        let mut query = quiz_template::Entity::find();

        // Anonymous listing only ever sees public templates; an author also
        // sees their own.
        query = match filter.author {
            Some(author) => query.filter(
                quiz_template::Column::IsPublic
                    .eq(true)
                    .or(quiz_template::Column::AuthorId.eq(author)),
            ),
            None => query.filter(quiz_template::Column::IsPublic.eq(true)),
        };

        if let Some(search) = &filter.search {
            query = query.filter(quiz_template::Column::Name.contains(search));
        }

        let models = query.all(&self.db).await.map_err(unavailable)?;
        models.into_iter().map(Self::snapshot).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Durable sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Append/update-only durable record over `game_session` / `session_answer`.
#[derive(Clone)]
pub struct DbSessionStore {
    db: DatabaseConnection,
}

impl DbSessionStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DbSessionStore {
    async fn insert(&self, session: &ActiveSession) -> Result<(), StoreUnavailable> {
        let now = Utc::now().fixed_offset();
        let template = serde_json::to_value(&session.template).map_err(unavailable)?;
        let join_code = i32::try_from(session.code).map_err(unavailable)?;

        let record = game_session::ActiveModel {
            id: Set(session.id),
            join_code: Set(join_code),
            host_id: Set(session.host),
            state: Set(session.state.as_str().to_string()),
            template: Set(template),
            created_at: Set(now),
            updated_at: Set(now),
            finished_at: Set(None),
        };

        record.insert(&self.db).await.map_err(unavailable)?;
        Ok(())
    }

    async fn update_lifecycle(
        &self,
        id: Uuid,
        state: LifecycleState,
    ) -> Result<(), StoreUnavailable> {
        let model = game_session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| unavailable(anyhow::anyhow!("missing durable session {id}")))?;

        let now = Utc::now().fixed_offset();
        let mut active: game_session::ActiveModel = model.into();
        active.state = Set(state.as_str().to_string());
        active.updated_at = Set(now);
        if state == LifecycleState::Finished {
            active.finished_at = Set(Some(now));
        }
        active.update(&self.db).await.map_err(unavailable)?;
        Ok(())
    }

    async fn append_answer(&self, id: Uuid, answer: &PlayerAnswer) -> Result<(), StoreUnavailable> {
        let selected = serde_json::to_value(&answer.selected).map_err(unavailable)?;
        let slide_index = i32::try_from(answer.slide_index).map_err(unavailable)?;

        let record = session_answer::ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(id),
            principal_id: Set(answer.principal_id),
            slide_index: Set(slide_index),
            selected: Set(selected),
            answered_at_offset_ms: Set(answer.answered_at_offset_ms),
            created_at: Set(Utc::now().fixed_offset()),
        };

        record.insert(&self.db).await.map_err(unavailable)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Expiring opaque-token store over the `auth_token` table.
#[derive(Clone)]
pub struct DbTokenStore {
    db: DatabaseConnection,
}

impl DbTokenStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for DbTokenStore {
    async fn get(&self, token: &str) -> Result<Option<Uuid>, StoreUnavailable> {
        let model = auth_token::Entity::find_by_id(token.to_string())
            .one(&self.db)
            .await
            .map_err(unavailable)?;

        // Expired entries read as absent; expiry is this store's concern.
        Ok(model
            .filter(|entry| entry.expires_at > Utc::now().fixed_offset())
            .map(|entry| entry.user_id))
    }

    async fn insert(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreUnavailable> {
        let record = auth_token::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id),
            created_at: Set(Utc::now().fixed_offset()),
            expires_at: Set(expires_at.fixed_offset()),
        };
        record.insert(&self.db).await.map_err(unavailable)?;
        Ok(())
    }
}

/// Registered-user lookup over the `user` table.
#[derive(Clone)]
pub struct DbUserDirectory {
    db: DatabaseConnection,
}

impl DbUserDirectory {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for DbUserDirectory {
    async fn find(&self, id: Uuid) -> Result<Option<UserRecord>, StoreUnavailable> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(unavailable)?;

        Ok(model.map(|u| UserRecord {
            id: u.id,
            display_name: u.display_name,
            role: match u.role.as_str() {
                "admin" => Role::Admin,
                _ => Role::User,
            },
        }))
    }
}
