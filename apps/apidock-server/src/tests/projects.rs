use axum::extract::{Query, State};
use axum::Json;

use apidock_storage::{GroupRole, SiteRole, Store, StoreError, Visibility};

use crate::handlers::projects::{self, *};
use crate::tests::common::*;

#[tokio::test]
async fn add_requires_edit_authority() {
    let server = create_test_server().await;
    let owner = create_test_user(&server, "alice", SiteRole::Member).await;
    let guest = create_test_user(&server, "eve", SiteRole::Member).await;
    let group_id = create_test_group(&server, &owner, "team").await;
    server
        .store
        .add_group_member(&group_id, &guest.user_id, GroupRole::Guest)
        .await
        .unwrap();

    let req = |name: &str| AddProjectReq {
        group_id: group_id.0.to_string(),
        name: name.to_string(),
        basepath: Some("api/v1/".to_string()),
        color: None,
        icon: None,
        project_type: None,
    };

    let err = projects::add(State(server.clone()), guest, Json(req("api")))
        .await
        .unwrap_err();
    assert_eq!(err.code, 405);

    let resp = projects::add(State(server.clone()), owner, Json(req("api")))
        .await
        .unwrap()
        .0;
    // Basepath is normalized to a single leading slash
    assert_eq!(resp.basepath, "/api/v1");
    assert_eq!(resp.project_type, "private");
}

#[tokio::test]
async fn duplicate_project_name_in_group_rejected() {
    let server = create_test_server().await;
    let owner = create_test_user(&server, "alice", SiteRole::Member).await;
    let group_id = create_test_group(&server, &owner, "team").await;

    let req = || AddProjectReq {
        group_id: group_id.0.to_string(),
        name: "api".to_string(),
        basepath: None,
        color: None,
        icon: None,
        project_type: None,
    };
    projects::add(State(server.clone()), owner.clone(), Json(req()))
        .await
        .unwrap();
    let err = projects::add(State(server.clone()), owner, Json(req()))
        .await
        .unwrap_err();
    assert_eq!(err.code, 401);
}

#[tokio::test]
async fn non_members_only_see_public_projects() {
    let server = create_test_server().await;
    let owner = create_test_user(&server, "alice", SiteRole::Member).await;
    let outsider = create_test_user(&server, "eve", SiteRole::Member).await;
    let group_id = create_test_group(&server, &owner, "team").await;
    create_test_project(&server, &group_id, "open", Visibility::Public).await;
    create_test_project(&server, &group_id, "closed", Visibility::Private).await;

    let query = || {
        Query(ListQuery {
            group_id: group_id.0.to_string(),
        })
    };

    let mine = projects::list(State(server.clone()), owner, query())
        .await
        .unwrap()
        .0;
    assert_eq!(mine.len(), 2);

    let theirs = projects::list(State(server.clone()), outsider.clone(), query())
        .await
        .unwrap()
        .0;
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].name, "open");

    // get() on the private project is denied for the outsider
    let closed = mine.iter().find(|p| p.name == "closed").unwrap();
    let err = projects::get(
        State(server.clone()),
        outsider,
        Query(GetQuery {
            id: closed.id.clone(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, 405);
}

#[tokio::test]
async fn up_merges_fields() {
    let server = create_test_server().await;
    let owner = create_test_user(&server, "alice", SiteRole::Member).await;
    let group_id = create_test_group(&server, &owner, "team").await;
    let project_id = create_test_project(&server, &group_id, "api", Visibility::Private).await;

    let resp = projects::up(
        State(server.clone()),
        owner,
        Json(UpProjectReq {
            id: project_id.0.to_string(),
            name: None,
            basepath: Some("v2".to_string()),
            color: Some("blue".to_string()),
            icon: None,
            project_type: Some("public".to_string()),
            switch_notice: Some(false),
        }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(resp.name, "api");
    assert_eq!(resp.basepath, "/v2");
    assert_eq!(resp.project_type, "public");
    assert!(!resp.switch_notice);
}

#[tokio::test]
async fn del_requires_danger_and_cascades() {
    let server = create_test_server().await;
    let owner = create_test_user(&server, "alice", SiteRole::Member).await;
    let dev = create_test_user(&server, "bob", SiteRole::Member).await;
    let group_id = create_test_group(&server, &owner, "team").await;
    server
        .store
        .add_group_member(&group_id, &dev.user_id, GroupRole::Dev)
        .await
        .unwrap();
    let project_id = create_test_project(&server, &group_id, "api", Visibility::Private).await;
    server
        .store
        .create_interface(&apidock_storage::CreateInterfaceParams {
            project_id: project_id.clone(),
            title: "list".to_string(),
            path: "/list".to_string(),
            method: "GET".to_string(),
        })
        .await
        .unwrap();

    let err = projects::del(
        State(server.clone()),
        dev,
        Json(DelProjectReq {
            id: project_id.0.to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, 405);

    projects::del(
        State(server.clone()),
        owner,
        Json(DelProjectReq {
            id: project_id.0.to_string(),
        }),
    )
    .await
    .unwrap();

    assert!(matches!(
        server.store.get_project(&project_id).await.unwrap_err(),
        StoreError::NotFound
    ));
    assert!(server
        .store
        .list_interfaces_by_project(&project_id)
        .await
        .unwrap()
        .is_empty());
}
