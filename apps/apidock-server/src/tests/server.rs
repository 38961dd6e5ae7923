//! Unit tests for authentication and policy plumbing against a mocked store.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use apidock_audit::{AuditLog, MemoryAuditLog};
use apidock_storage::{
    GroupId, GroupMember, GroupRole, MockStore, SiteRole, Store, StoreError, UserId,
};

use crate::policy::Authority;
use crate::server::{Actor, ApiServer};

fn server_with(mock: MockStore) -> ApiServer {
    ApiServer::new(
        Arc::new(mock) as Arc<dyn Store>,
        Arc::new(MemoryAuditLog::new()) as Arc<dyn AuditLog>,
    )
}

#[tokio::test]
async fn authenticate_maps_missing_session_to_login_required() {
    let mut mock = MockStore::new();
    mock.expect_get_session_user()
        .returning(|_| Err(StoreError::NotFound));

    let server = server_with(mock);
    let err = server.authenticate("bogus-token").await.unwrap_err();
    assert_eq!(err.code, 40011);
}

#[tokio::test]
async fn authenticate_maps_backend_failure_to_internal() {
    let mut mock = MockStore::new();
    mock.expect_get_session_user()
        .returning(|_| Err(StoreError::Backend("connection reset".to_string())));

    let server = server_with(mock);
    let err = server.authenticate("token").await.unwrap_err();
    assert_eq!(err.code, 500);
    assert_eq!(err.message, "internal server error");
}

#[tokio::test]
async fn require_group_authority_evaluates_membership() {
    let mut mock = MockStore::new();
    mock.expect_get_group_member().returning(|group_id, user_id| {
        Ok(Some(GroupMember {
            group_id: group_id.clone(),
            user_id: user_id.clone(),
            role: GroupRole::Dev,
            created_at: Utc::now(),
        }))
    });

    let server = server_with(mock);
    let actor = Actor {
        user_id: UserId(Uuid::new_v4()),
        username: "alice".to_string(),
        site_role: SiteRole::Member,
    };
    let group_id = GroupId(Uuid::new_v4());

    server
        .require_group_authority(&actor, &group_id, Authority::Edit)
        .await
        .unwrap();
    let err = server
        .require_group_authority(&actor, &group_id, Authority::Danger)
        .await
        .unwrap_err();
    assert_eq!(err.code, 405);
}

#[tokio::test]
async fn site_admin_bypasses_membership_lookup_result() {
    let mut mock = MockStore::new();
    mock.expect_get_group_member().returning(|_, _| Ok(None));

    let server = server_with(mock);
    let admin = Actor {
        user_id: UserId(Uuid::new_v4()),
        username: "root".to_string(),
        site_role: SiteRole::Admin,
    };

    server
        .require_group_authority(&admin, &GroupId(Uuid::new_v4()), Authority::Danger)
        .await
        .unwrap();
}
