//! Shared server state and request authentication.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use apidock_audit::{AuditEvent, AuditLog};
use apidock_storage::{GroupId, GroupRole, SiteRole, Store, StoreError, UserId};

use crate::envelope::ApiError;
use crate::policy::{self, Authority};

/// Authenticated caller, resolved from the bearer token.
#[derive(Clone, Debug)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
    pub site_role: SiteRole,
}

#[derive(Clone)]
pub struct ApiServer {
    pub store: Arc<dyn Store>,
    pub audit_log: Arc<dyn AuditLog>,
}

/// Hex-encoded SHA-256 of a session token; only digests touch the database.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Hex-encoded SHA-256 of salt + password.
pub fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl ApiServer {
    pub fn new(store: Arc<dyn Store>, audit_log: Arc<dyn AuditLog>) -> Self {
        Self { store, audit_log }
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<Actor, ApiError> {
        let user = self
            .store
            .get_session_user(&token_digest(token))
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ApiError::unauthorized("please log in"),
                _ => ApiError::internal(e),
            })?;
        Ok(Actor {
            user_id: user.id,
            username: user.username,
            site_role: user.site_role,
        })
    }

    /// Caller's role in a group, if any.
    pub async fn group_role_of(
        &self,
        actor: &Actor,
        group_id: &GroupId,
    ) -> Result<Option<GroupRole>, ApiError> {
        let member = self
            .store
            .get_group_member(group_id, &actor.user_id)
            .await
            .map_err(ApiError::internal)?;
        Ok(member.map(|m| m.role))
    }

    /// Load the caller's membership and evaluate the policy; 405 on denial.
    pub async fn require_group_authority(
        &self,
        actor: &Actor,
        group_id: &GroupId,
        required: Authority,
    ) -> Result<(), ApiError> {
        let membership = self.group_role_of(actor, group_id).await?;
        if policy::evaluate(actor, membership, required) {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// 401 unless the caller is a site admin.
    pub fn require_site_admin(&self, actor: &Actor) -> Result<(), ApiError> {
        if policy::evaluate(actor, None, Authority::SiteAdmin) {
            Ok(())
        } else {
            Err(ApiError::forbidden_admin())
        }
    }

    /// Record an audit event. A failed write is logged and swallowed so it
    /// never fails the operation being audited.
    pub async fn audit(&self, event: AuditEvent) {
        if let Err(e) = self.audit_log.record(event).await {
            tracing::warn!("failed to record audit event: {}", e);
        }
    }
}

pub fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("please log in"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("please log in"))?;
    Ok(token.to_string())
}

impl FromRequestParts<ApiServer> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiServer,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state.authenticate(&token).await
    }
}
