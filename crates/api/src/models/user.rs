//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use loomi_core::{Email, UserId, UserRole};

/// A Loomi account. The password hash is never part of this type.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub role: UserRole,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may use admin endpoints.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
