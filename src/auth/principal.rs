use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stores::UserRecord;

/// Authorization tier of a [`Principal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// The identity attached to one request or connection.
///
/// Ephemeral: built per request from the token store / user directory (or
/// guest issuance) and never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
    pub is_guest: bool,
}

impl Principal {
    /// Build a registered-user principal from a directory record.
    #[must_use]
    pub fn registered(record: UserRecord) -> Self {
        Self {
            id: record.id,
            display_name: record.display_name,
            role: record.role,
            is_guest: false,
        }
    }

    /// Build a fresh anonymous guest principal.
    #[must_use]
    pub fn guest(display_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            role: Role::Guest,
            is_guest: true,
        }
    }
}
