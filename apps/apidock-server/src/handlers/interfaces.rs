//! Interface, collection, and test-case handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use apidock_audit::{AuditAction, AuditEvent};
use apidock_storage::{
    CreateInterfaceCaseParams, CreateInterfaceColParams, CreateInterfaceParams, Interface,
    InterfaceCase, InterfaceCaseId, InterfaceCol, InterfaceColId, InterfaceId, Project, ProjectId,
    Store, StoreError,
};

use crate::envelope::{ApiError, Data};
use crate::policy::Authority;
use crate::server::{Actor, ApiServer};

#[derive(Debug, Serialize)]
pub struct InterfaceInfo {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub path: String,
    pub method: String,
    pub add_time: String,
    pub up_time: String,
}

fn interface_info(interface: &Interface) -> InterfaceInfo {
    InterfaceInfo {
        id: interface.id.0.to_string(),
        project_id: interface.project_id.0.to_string(),
        title: interface.title.clone(),
        path: interface.path.clone(),
        method: interface.method.clone(),
        add_time: interface.created_at.to_rfc3339(),
        up_time: interface.updated_at.to_rfc3339(),
    }
}

#[derive(Serialize)]
pub struct ColInfo {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub add_time: String,
}

fn col_info(col: &InterfaceCol) -> ColInfo {
    ColInfo {
        id: col.id.0.to_string(),
        project_id: col.project_id.0.to_string(),
        name: col.name.clone(),
        description: col.description.clone(),
        add_time: col.created_at.to_rfc3339(),
    }
}

#[derive(Debug, Serialize)]
pub struct CaseInfo {
    pub id: String,
    pub project_id: String,
    pub col_id: String,
    pub interface_id: Option<String>,
    pub name: String,
    pub add_time: String,
}

fn case_info(case: &InterfaceCase) -> CaseInfo {
    CaseInfo {
        id: case.id.0.to_string(),
        project_id: case.project_id.0.to_string(),
        col_id: case.col_id.0.to_string(),
        interface_id: case.interface_id.as_ref().map(|i| i.0.to_string()),
        name: case.name.clone(),
        add_time: case.created_at.to_rfc3339(),
    }
}

fn parse_id(s: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::try_parse(s).map_err(|_| ApiError::invalid_params(format!("invalid {}", field)))
}

async fn load_project(server: &ApiServer, id: &ProjectId) -> Result<Project, ApiError> {
    server.store.get_project(id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::invalid_params("project does not exist"),
        _ => ApiError::internal(e),
    })
}

/// Authority for interface mutations flows through the project's group.
async fn require_project_authority(
    server: &ApiServer,
    actor: &Actor,
    project_id: &ProjectId,
    required: Authority,
) -> Result<Project, ApiError> {
    let project = load_project(server, project_id).await?;
    server
        .require_group_authority(actor, &project.group_id, required)
        .await?;
    Ok(project)
}

// ──────────────────────────────── interfaces ────────────────────────────────

#[derive(Deserialize)]
pub struct AddInterfaceReq {
    pub project_id: String,
    pub title: String,
    pub path: String,
    pub method: String,
}

pub async fn add(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<AddInterfaceReq>,
) -> Result<Data<InterfaceInfo>, ApiError> {
    let project_id = ProjectId(parse_id(&req.project_id, "project_id")?);
    if req.title.trim().is_empty() {
        return Err(ApiError::invalid_params("interface title is required"));
    }
    if !req.path.starts_with('/') {
        return Err(ApiError::invalid_params("interface path must start with /"));
    }
    let project =
        require_project_authority(&server, &actor, &project_id, Authority::Edit).await?;

    let interface_id = server
        .store
        .create_interface(&CreateInterfaceParams {
            project_id: project_id.clone(),
            title: req.title.trim().to_string(),
            path: req.path.clone(),
            method: req.method.to_uppercase(),
        })
        .await
        .map_err(ApiError::internal)?;

    let interface = server
        .store
        .get_interface(&interface_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::InterfaceCreate)
                .resource("interface", interface_id.0.to_string())
                .group_id(Some(&project.group_id))
                .project_id(Some(&project_id))
                .message(format!(
                    "<a href=\"/user/profile/{}\">{}</a> added interface {} to project {}",
                    actor.user_id.0, actor.username, interface.title, project.name
                ))
                .build(),
        )
        .await;

    Ok(Data(interface_info(&interface)))
}

#[derive(Deserialize)]
pub struct GetQuery {
    pub id: String,
}

pub async fn get(
    State(server): State<ApiServer>,
    _actor: Actor,
    Query(query): Query<GetQuery>,
) -> Result<Data<InterfaceInfo>, ApiError> {
    let interface_id = InterfaceId(parse_id(&query.id, "id")?);
    let interface = server
        .store
        .get_interface(&interface_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("interface does not exist"),
            _ => ApiError::internal(e),
        })?;
    Ok(Data(interface_info(&interface)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub project_id: String,
}

pub async fn list(
    State(server): State<ApiServer>,
    _actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<Data<Vec<InterfaceInfo>>, ApiError> {
    let project_id = ProjectId(parse_id(&query.project_id, "project_id")?);
    load_project(&server, &project_id).await?;

    let interfaces = server
        .store
        .list_interfaces_by_project(&project_id)
        .await
        .map_err(ApiError::internal)?;
    Ok(Data(interfaces.iter().map(interface_info).collect()))
}

#[derive(Deserialize)]
pub struct DelReq {
    pub id: String,
}

pub async fn del(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<DelReq>,
) -> Result<Data<()>, ApiError> {
    let interface_id = InterfaceId(parse_id(&req.id, "id")?);
    let interface = server
        .store
        .get_interface(&interface_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::invalid_params("interface does not exist"),
            _ => ApiError::internal(e),
        })?;
    let project =
        require_project_authority(&server, &actor, &interface.project_id, Authority::Edit).await?;

    server
        .store
        .delete_interface(&interface_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::InterfaceDelete)
                .resource("interface", interface_id.0.to_string())
                .group_id(Some(&project.group_id))
                .project_id(Some(&project.id))
                .message(format!(
                    "<a href=\"/user/profile/{}\">{}</a> deleted interface {} from project {}",
                    actor.user_id.0, actor.username, interface.title, project.name
                ))
                .build(),
        )
        .await;

    Ok(Data(()))
}

// ──────────────────────────────── collections ────────────────────────────────

#[derive(Deserialize)]
pub struct AddColReq {
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
}

pub async fn col_add(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<AddColReq>,
) -> Result<Data<ColInfo>, ApiError> {
    let project_id = ProjectId(parse_id(&req.project_id, "project_id")?);
    if req.name.trim().is_empty() {
        return Err(ApiError::invalid_params("collection name is required"));
    }
    let project =
        require_project_authority(&server, &actor, &project_id, Authority::Edit).await?;

    let col_id = server
        .store
        .create_interface_col(&CreateInterfaceColParams {
            project_id: project_id.clone(),
            name: req.name.trim().to_string(),
            description: req.description,
        })
        .await
        .map_err(ApiError::internal)?;

    let col = server
        .store
        .get_interface_col(&col_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(
                &actor.user_id,
                &actor.username,
                AuditAction::InterfaceColCreate,
            )
            .resource("interface_col", col_id.0.to_string())
            .group_id(Some(&project.group_id))
            .project_id(Some(&project_id))
            .message(format!(
                "<a href=\"/user/profile/{}\">{}</a> added collection {} to project {}",
                actor.user_id.0, actor.username, col.name, project.name
            ))
            .build(),
        )
        .await;

    Ok(Data(col_info(&col)))
}

pub async fn col_list(
    State(server): State<ApiServer>,
    _actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<Data<Vec<ColInfo>>, ApiError> {
    let project_id = ProjectId(parse_id(&query.project_id, "project_id")?);
    load_project(&server, &project_id).await?;

    let cols = server
        .store
        .list_interface_cols_by_project(&project_id)
        .await
        .map_err(ApiError::internal)?;
    Ok(Data(cols.iter().map(col_info).collect()))
}

pub async fn col_del(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<DelReq>,
) -> Result<Data<()>, ApiError> {
    let col_id = InterfaceColId(parse_id(&req.id, "id")?);
    let col = server
        .store
        .get_interface_col(&col_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::invalid_params("collection does not exist"),
            _ => ApiError::internal(e),
        })?;
    let project =
        require_project_authority(&server, &actor, &col.project_id, Authority::Edit).await?;

    server
        .store
        .delete_interface_col(&col_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(
                &actor.user_id,
                &actor.username,
                AuditAction::InterfaceColDelete,
            )
            .resource("interface_col", col_id.0.to_string())
            .group_id(Some(&project.group_id))
            .project_id(Some(&project.id))
            .message(format!(
                "<a href=\"/user/profile/{}\">{}</a> deleted collection {} from project {}",
                actor.user_id.0, actor.username, col.name, project.name
            ))
            .build(),
        )
        .await;

    Ok(Data(()))
}

// ──────────────────────────────── test cases ────────────────────────────────

#[derive(Deserialize)]
pub struct AddCaseReq {
    pub project_id: String,
    pub col_id: String,
    pub interface_id: Option<String>,
    pub name: String,
}

pub async fn case_add(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<AddCaseReq>,
) -> Result<Data<CaseInfo>, ApiError> {
    let project_id = ProjectId(parse_id(&req.project_id, "project_id")?);
    let col_id = InterfaceColId(parse_id(&req.col_id, "col_id")?);
    if req.name.trim().is_empty() {
        return Err(ApiError::invalid_params("case name is required"));
    }
    let project =
        require_project_authority(&server, &actor, &project_id, Authority::Edit).await?;

    let col = server
        .store
        .get_interface_col(&col_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::invalid_params("collection does not exist"),
            _ => ApiError::internal(e),
        })?;
    if col.project_id != project_id {
        return Err(ApiError::invalid_params(
            "collection belongs to a different project",
        ));
    }

    let interface_id = match req.interface_id.as_deref() {
        Some(raw) => Some(InterfaceId(parse_id(raw, "interface_id")?)),
        None => None,
    };

    let case_id = server
        .store
        .create_interface_case(&CreateInterfaceCaseParams {
            project_id: project_id.clone(),
            col_id,
            interface_id,
            name: req.name.trim().to_string(),
        })
        .await
        .map_err(ApiError::internal)?;

    let case = server
        .store
        .get_interface_case(&case_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(
                &actor.user_id,
                &actor.username,
                AuditAction::InterfaceCaseCreate,
            )
            .resource("interface_case", case_id.0.to_string())
            .group_id(Some(&project.group_id))
            .project_id(Some(&project_id))
            .message(format!(
                "<a href=\"/user/profile/{}\">{}</a> added case {} to collection {}",
                actor.user_id.0, actor.username, case.name, col.name
            ))
            .build(),
        )
        .await;

    Ok(Data(case_info(&case)))
}

#[derive(Deserialize)]
pub struct CaseListQuery {
    pub col_id: String,
}

pub async fn case_list(
    State(server): State<ApiServer>,
    _actor: Actor,
    Query(query): Query<CaseListQuery>,
) -> Result<Data<Vec<CaseInfo>>, ApiError> {
    let col_id = InterfaceColId(parse_id(&query.col_id, "col_id")?);
    server
        .store
        .get_interface_col(&col_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::invalid_params("collection does not exist"),
            _ => ApiError::internal(e),
        })?;

    let cases = server
        .store
        .list_interface_cases_by_col(&col_id)
        .await
        .map_err(ApiError::internal)?;
    Ok(Data(cases.iter().map(case_info).collect()))
}

pub async fn case_del(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<DelReq>,
) -> Result<Data<()>, ApiError> {
    let case_id = InterfaceCaseId(parse_id(&req.id, "id")?);
    let case = server
        .store
        .get_interface_case(&case_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::invalid_params("case does not exist"),
            _ => ApiError::internal(e),
        })?;
    let project =
        require_project_authority(&server, &actor, &case.project_id, Authority::Edit).await?;

    server
        .store
        .delete_interface_case(&case_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(
                &actor.user_id,
                &actor.username,
                AuditAction::InterfaceCaseDelete,
            )
            .resource("interface_case", case_id.0.to_string())
            .group_id(Some(&project.group_id))
            .project_id(Some(&project.id))
            .message(format!(
                "<a href=\"/user/profile/{}\">{}</a> deleted case {} from project {}",
                actor.user_id.0, actor.username, case.name, project.name
            ))
            .build(),
        )
        .await;

    Ok(Data(()))
}
