//! Shared helpers for handler tests.

use std::sync::Arc;

use apidock_audit::AuditLog;
use apidock_storage::{
    CreateGroupParams, CreateProjectParams, CreateUserParams, GroupId, GroupRole, GroupType,
    ProjectId, SiteRole, Store, Visibility,
};
use apidock_store_sqlite::SqliteStore;

use crate::server::{Actor, ApiServer};

pub async fn create_test_server() -> ApiServer {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    ApiServer::new(store.clone() as Arc<dyn Store>, store as Arc<dyn AuditLog>)
}

pub async fn create_test_user(server: &ApiServer, name: &str, site_role: SiteRole) -> Actor {
    let user_id = server
        .store
        .create_user(&CreateUserParams {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_digest: "digest".to_string(),
            salt: "salt".to_string(),
            site_role,
        })
        .await
        .unwrap();
    Actor {
        user_id,
        username: name.to_string(),
        site_role,
    }
}

/// Create a normal group with `owner` as its sole Owner member.
pub async fn create_test_group(server: &ApiServer, owner: &Actor, name: &str) -> GroupId {
    let group_id = server
        .store
        .create_group(&CreateGroupParams {
            name: name.to_string(),
            description: None,
            group_type: GroupType::Normal,
            owner_uid: owner.user_id.clone(),
        })
        .await
        .unwrap();
    server
        .store
        .add_group_member(&group_id, &owner.user_id, GroupRole::Owner)
        .await
        .unwrap();
    group_id
}

pub async fn create_test_project(
    server: &ApiServer,
    group_id: &GroupId,
    name: &str,
    visibility: Visibility,
) -> ProjectId {
    server
        .store
        .create_project(&CreateProjectParams {
            group_id: group_id.clone(),
            name: name.to_string(),
            basepath: "/api".to_string(),
            color: None,
            icon: None,
            visibility,
        })
        .await
        .unwrap()
}
