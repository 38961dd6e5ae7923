//! User account and login session types.

use chrono::{DateTime, Utc};

use super::{SessionId, SiteRole, UserId};

/// User record
#[derive(Clone, Debug)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub site_role: SiteRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User record together with its password verification material.
/// Only the login path should ever load this.
#[derive(Clone, Debug)]
pub struct UserCredentials {
    pub user: User,
    pub password_digest: String,
    pub salt: String,
}

/// Parameters for creating a user
#[derive(Clone, Debug)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub salt: String,
    pub site_role: SiteRole,
}

/// Login session record. The raw token is never stored, only its digest.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub token_digest: String,
    pub created_at: DateTime<Utc>,
}
