//! Project handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use apidock_audit::{AuditAction, AuditEvent};
use apidock_storage::{
    CreateProjectParams, GroupId, Project, ProjectId, SiteRole, Store, StoreError,
    UpdateProjectParams, Visibility,
};

use crate::envelope::{ApiError, Data};
use crate::policy::Authority;
use crate::server::{Actor, ApiServer};

#[derive(Debug, Serialize)]
pub struct ProjectInfo {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub basepath: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub project_type: String,
    pub switch_notice: bool,
    pub add_time: String,
    pub up_time: String,
}

fn project_info(project: &Project) -> ProjectInfo {
    ProjectInfo {
        id: project.id.0.to_string(),
        group_id: project.group_id.0.to_string(),
        name: project.name.clone(),
        basepath: project.basepath.clone(),
        color: project.color.clone(),
        icon: project.icon.clone(),
        project_type: project.visibility.as_str().to_string(),
        switch_notice: project.switch_notice,
        add_time: project.created_at.to_rfc3339(),
        up_time: project.updated_at.to_rfc3339(),
    }
}

fn parse_id(s: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::try_parse(s).map_err(|_| ApiError::invalid_params(format!("invalid {}", field)))
}

/// Basepaths are stored with a single leading slash.
fn normalize_basepath(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

async fn load_project(server: &ApiServer, id: &ProjectId) -> Result<Project, ApiError> {
    server.store.get_project(id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::invalid_params("project does not exist"),
        _ => ApiError::internal(e),
    })
}

// ──────────────────────────────── add ────────────────────────────────

#[derive(Deserialize)]
pub struct AddProjectReq {
    pub group_id: String,
    pub name: String,
    pub basepath: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub project_type: Option<String>,
}

pub async fn add(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<AddProjectReq>,
) -> Result<Data<ProjectInfo>, ApiError> {
    let group_id = GroupId(parse_id(&req.group_id, "group_id")?);
    server.store.get_group(&group_id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::invalid_params("group does not exist"),
        _ => ApiError::internal(e),
    })?;
    server
        .require_group_authority(&actor, &group_id, Authority::Edit)
        .await?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_params("project name is required"));
    }

    let visibility = match req.project_type.as_deref() {
        Some("public") => Visibility::Public,
        _ => Visibility::Private,
    };

    let project_id = server
        .store
        .create_project(&CreateProjectParams {
            group_id: group_id.clone(),
            name: name.to_string(),
            basepath: normalize_basepath(req.basepath.as_deref().unwrap_or("/")),
            color: req.color,
            icon: req.icon,
            visibility,
        })
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => {
                ApiError::duplicate("project name already exists in this group")
            }
            _ => ApiError::internal(e),
        })?;

    let project = server
        .store
        .get_project(&project_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::ProjectCreate)
                .resource("project", project_id.0.to_string())
                .group_id(Some(&group_id))
                .project_id(Some(&project_id))
                .message(format!(
                    "<a href=\"/user/profile/{}\">{}</a> created project <a href=\"/project/{}\">{}</a>",
                    actor.user_id.0, actor.username, project_id.0, project.name
                ))
                .build(),
        )
        .await;

    Ok(Data(project_info(&project)))
}

// ──────────────────────────────── get ────────────────────────────────

#[derive(Deserialize)]
pub struct GetQuery {
    pub id: String,
}

pub async fn get(
    State(server): State<ApiServer>,
    actor: Actor,
    Query(query): Query<GetQuery>,
) -> Result<Data<ProjectInfo>, ApiError> {
    let project_id = ProjectId(parse_id(&query.id, "id")?);
    let project = server
        .store
        .get_project(&project_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("project does not exist"),
            _ => ApiError::internal(e),
        })?;

    if project.visibility == Visibility::Private {
        server
            .require_group_authority(&actor, &project.group_id, Authority::View)
            .await?;
    }
    Ok(Data(project_info(&project)))
}

// ──────────────────────────────── list ────────────────────────────────

#[derive(Deserialize)]
pub struct ListQuery {
    pub group_id: String,
}

pub async fn list(
    State(server): State<ApiServer>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<Data<Vec<ProjectInfo>>, ApiError> {
    let group_id = GroupId(parse_id(&query.group_id, "group_id")?);
    server.store.get_group(&group_id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::invalid_params("group does not exist"),
        _ => ApiError::internal(e),
    })?;

    let membership = server.group_role_of(&actor, &group_id).await?;
    let is_member = actor.site_role == SiteRole::Admin || membership.is_some();

    let projects = server
        .store
        .list_projects_by_group(&group_id)
        .await
        .map_err(ApiError::internal)?;

    let out = projects
        .iter()
        .filter(|p| is_member || p.visibility == Visibility::Public)
        .map(project_info)
        .collect();
    Ok(Data(out))
}

// ──────────────────────────────── up ────────────────────────────────

#[derive(Deserialize)]
pub struct UpProjectReq {
    pub id: String,
    pub name: Option<String>,
    pub basepath: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub project_type: Option<String>,
    pub switch_notice: Option<bool>,
}

pub async fn up(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<UpProjectReq>,
) -> Result<Data<ProjectInfo>, ApiError> {
    let project_id = ProjectId(parse_id(&req.id, "id")?);
    let project = load_project(&server, &project_id).await?;
    server
        .require_group_authority(&actor, &project.group_id, Authority::Edit)
        .await?;

    let visibility = req.project_type.as_deref().map(|t| match t {
        "public" => Visibility::Public,
        _ => Visibility::Private,
    });

    server
        .store
        .update_project(
            &project_id,
            &UpdateProjectParams {
                name: req.name,
                basepath: req.basepath.as_deref().map(normalize_basepath),
                color: req.color,
                icon: req.icon,
                visibility,
                switch_notice: req.switch_notice,
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => {
                ApiError::duplicate("project name already exists in this group")
            }
            _ => ApiError::internal(e),
        })?;

    let updated = server
        .store
        .get_project(&project_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::ProjectUpdate)
                .resource("project", project_id.0.to_string())
                .group_id(Some(&project.group_id))
                .project_id(Some(&project_id))
                .message(format!(
                    "<a href=\"/user/profile/{}\">{}</a> updated project <a href=\"/project/{}\">{}</a>",
                    actor.user_id.0, actor.username, project_id.0, updated.name
                ))
                .build(),
        )
        .await;

    Ok(Data(project_info(&updated)))
}

// ──────────────────────────────── del ────────────────────────────────

#[derive(Deserialize)]
pub struct DelProjectReq {
    pub id: String,
}

pub async fn del(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<DelProjectReq>,
) -> Result<Data<()>, ApiError> {
    let project_id = ProjectId(parse_id(&req.id, "id")?);
    let project = load_project(&server, &project_id).await?;
    server
        .require_group_authority(&actor, &project.group_id, Authority::Danger)
        .await?;

    // Children first, then the project row.
    server
        .store
        .delete_interfaces_by_project(&project_id)
        .await
        .map_err(ApiError::internal)?;
    server
        .store
        .delete_interface_cases_by_project(&project_id)
        .await
        .map_err(ApiError::internal)?;
    server
        .store
        .delete_interface_cols_by_project(&project_id)
        .await
        .map_err(ApiError::internal)?;
    server
        .store
        .delete_project(&project_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::ProjectDelete)
                .resource("project", project_id.0.to_string())
                .group_id(Some(&project.group_id))
                .project_id(Some(&project_id))
                .message(format!(
                    "<a href=\"/user/profile/{}\">{}</a> deleted project {}",
                    actor.user_id.0, actor.username, project.name
                ))
                .build(),
        )
        .await;

    Ok(Data(()))
}
