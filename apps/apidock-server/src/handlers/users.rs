//! Registration, login, and session handlers.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use apidock_audit::{AuditAction, AuditEvent};
use apidock_storage::{CreateUserParams, SiteRole, Store, StoreError};

use crate::envelope::{ApiError, Data};
use crate::server::{password_digest, token_digest, Actor, ApiServer};

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub uid: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

// ──────────────────────────────── reg ────────────────────────────────

#[derive(Deserialize)]
pub struct RegReq {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn reg(
    State(server): State<ApiServer>,
    Json(req): Json<RegReq>,
) -> Result<Data<UserInfo>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::invalid_params("username is required"));
    }
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::invalid_params("a valid email is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::invalid_params("password is required"));
    }

    // First account bootstraps the site admin.
    let site_role = if server.store.count_users().await.map_err(ApiError::internal)? == 0 {
        SiteRole::Admin
    } else {
        SiteRole::Member
    };

    let salt = Uuid::new_v4().simple().to_string();
    let user_id = server
        .store
        .create_user(&CreateUserParams {
            username: username.to_string(),
            email: req.email.trim().to_string(),
            password_digest: password_digest(&salt, &req.password),
            salt,
            site_role,
        })
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => ApiError::duplicate("username or email already taken"),
            _ => ApiError::internal(e),
        })?;

    Ok(Data(UserInfo {
        uid: user_id.0.to_string(),
        username: username.to_string(),
        email: req.email.trim().to_string(),
        role: site_role.as_str().to_string(),
    }))
}

// ──────────────────────────────── login ────────────────────────────────

#[derive(Deserialize)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResp {
    pub token: String,
    pub uid: String,
    pub username: String,
    pub role: String,
}

pub async fn login(
    State(server): State<ApiServer>,
    Json(req): Json<LoginReq>,
) -> Result<Data<LoginResp>, ApiError> {
    let creds = server
        .store
        .get_user_credentials(&req.username)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => wrong_credentials(),
            _ => ApiError::internal(e),
        })?;

    if password_digest(&creds.salt, &req.password) != creds.password_digest {
        return Err(wrong_credentials());
    }

    let token = Uuid::new_v4().simple().to_string();
    server
        .store
        .create_session(&creds.user.id, &token_digest(&token))
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&creds.user.id, &creds.user.username, AuditAction::UserLogin)
                .resource("user", creds.user.id.0.to_string())
                .message(format!("{} logged in", creds.user.username))
                .build(),
        )
        .await;

    Ok(Data(LoginResp {
        token,
        uid: creds.user.id.0.to_string(),
        username: creds.user.username,
        role: creds.user.site_role.as_str().to_string(),
    }))
}

fn wrong_credentials() -> ApiError {
    ApiError {
        code: 405,
        message: "incorrect username or password".to_string(),
    }
}

// ──────────────────────────────── status / logout ────────────────────────────────

pub async fn status(
    State(server): State<ApiServer>,
    actor: Actor,
) -> Result<Data<UserInfo>, ApiError> {
    let user = server
        .store
        .get_user(&actor.user_id)
        .await
        .map_err(ApiError::internal)?;
    Ok(Data(UserInfo {
        uid: user.id.0.to_string(),
        username: user.username,
        email: user.email,
        role: user.site_role.as_str().to_string(),
    }))
}

pub async fn logout(
    State(server): State<ApiServer>,
    headers: HeaderMap,
) -> Result<Data<()>, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("please log in"))?;

    server
        .store
        .delete_session(&token_digest(token))
        .await
        .map_err(ApiError::internal)?;
    Ok(Data(()))
}
