//! Group handlers: CRUD + membership management.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use apidock_audit::{AuditAction, AuditEvent, AuditResult};
use apidock_storage::{
    CreateGroupParams, Group, GroupId, GroupRole, GroupType, SiteRole, Store, StoreError, UserId,
};

use crate::envelope::{ApiError, Data};
use crate::policy::Authority;
use crate::server::{Actor, ApiServer};

/// Display name used for every private group.
const PRIVATE_GROUP_LABEL: &str = "Personal Space";

#[derive(Debug, Serialize)]
pub struct GroupInfo {
    pub id: String,
    pub group_name: String,
    pub group_desc: Option<String>,
    pub group_type: String,
    /// Caller's effective role in this group.
    pub role: String,
    pub add_time: String,
    pub up_time: String,
}

fn group_info(group: &Group, role: &str) -> GroupInfo {
    let name = if group.group_type == GroupType::Private {
        PRIVATE_GROUP_LABEL.to_string()
    } else {
        group.name.clone()
    };
    GroupInfo {
        id: group.id.0.to_string(),
        group_name: name,
        group_desc: group.description.clone(),
        group_type: group.group_type.as_str().to_string(),
        role: role.to_string(),
        add_time: group.created_at.to_rfc3339(),
        up_time: group.updated_at.to_rfc3339(),
    }
}

fn parse_id(s: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::try_parse(s).map_err(|_| ApiError::invalid_params(format!("invalid {}", field)))
}

fn effective_role(actor: &Actor, membership: Option<GroupRole>) -> &'static str {
    if actor.site_role == SiteRole::Admin {
        "admin"
    } else {
        match membership {
            Some(role) => role.as_str(),
            None => "guest",
        }
    }
}

fn user_link(uid: &UserId, name: &str) -> String {
    format!("<a href=\"/user/profile/{}\">{}</a>", uid.0, name)
}

fn group_link(group: &Group) -> String {
    format!("<a href=\"/group/{}\">{}</a>", group.id.0, group.name)
}

async fn load_group(server: &ApiServer, id: &GroupId) -> Result<Group, ApiError> {
    server.store.get_group(id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::invalid_params("group does not exist"),
        _ => ApiError::internal(e),
    })
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
) -> Result<Data<GroupInfo>, ApiError> {
    let group_id = GroupId(parse_id(&query.id, "id")?);
    let group = server.store.get_group(&group_id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::not_found("group does not exist"),
        _ => ApiError::internal(e),
    })?;

    let membership = server.group_role_of(&actor, &group_id).await?;
    Ok(Data(group_info(&group, effective_role(&actor, membership))))
}

// ──────────────────────────────── add ────────────────────────────────

#[derive(Deserialize)]
pub struct AddGroupReq {
    pub name: String,
    pub group_desc: Option<String>,
    #[serde(default)]
    pub owner_uids: Vec<String>,
}

pub async fn add(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<AddGroupReq>,
) -> Result<Data<GroupInfo>, ApiError> {
    if let Err(denied) = server.require_site_admin(&actor) {
        server
            .audit(
                AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::GroupCreate)
                    .resource("group", req.name.clone())
                    .result(AuditResult::Denied)
                    .message(format!(
                        "{} was denied creating group {}",
                        user_link(&actor.user_id, &actor.username),
                        req.name
                    ))
                    .build(),
            )
            .await;
        return Err(denied);
    }

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_params("group name is required"));
    }

    let group_id = server
        .store
        .create_group(&CreateGroupParams {
            name: name.to_string(),
            description: req.group_desc,
            group_type: GroupType::Normal,
            owner_uid: actor.user_id.clone(),
        })
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => ApiError::duplicate("group name already exists"),
            _ => ApiError::internal(e),
        })?;

    // Unknown owner uids are skipped silently.
    for uid in &req.owner_uids {
        let Ok(uid) = Uuid::try_parse(uid) else {
            continue;
        };
        let uid = UserId(uid);
        match server.store.get_user(&uid).await {
            Ok(_) => {
                match server
                    .store
                    .add_group_member(&group_id, &uid, GroupRole::Owner)
                    .await
                {
                    // A uid listed twice is added once.
                    Ok(()) | Err(StoreError::AlreadyExists) => {}
                    Err(e) => return Err(ApiError::internal(e)),
                }
            }
            Err(StoreError::NotFound) => continue,
            Err(e) => return Err(ApiError::internal(e)),
        }
    }

    let group = server
        .store
        .get_group(&group_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::GroupCreate)
                .resource("group", group_id.0.to_string())
                .group_id(Some(&group_id))
                .message(format!(
                    "{} created group {}",
                    user_link(&actor.user_id, &actor.username),
                    group_link(&group)
                ))
                .build(),
        )
        .await;

    Ok(Data(group_info(&group, "admin")))
}

// ──────────────────────────────── addMember ────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MemberInfo {
    pub uid: String,
    pub username: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct AddMemberReq {
    pub id: String,
    pub member_uids: Vec<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddMemberResp {
    pub add_members: Vec<MemberInfo>,
    pub exist_members: Vec<MemberInfo>,
    pub no_members: Vec<String>,
}

pub async fn add_member(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<AddMemberReq>,
) -> Result<Data<AddMemberResp>, ApiError> {
    let group_id = GroupId(parse_id(&req.id, "id")?);
    let group = load_group(&server, &group_id).await?;
    server
        .require_group_authority(&actor, &group_id, Authority::Danger)
        .await?;

    let role = GroupRole::from_param(req.role.as_deref().unwrap_or(""));

    let mut resp = AddMemberResp {
        add_members: Vec::new(),
        exist_members: Vec::new(),
        no_members: Vec::new(),
    };

    for raw in &req.member_uids {
        let Ok(uid) = Uuid::try_parse(raw) else {
            resp.no_members.push(raw.clone());
            continue;
        };
        let uid = UserId(uid);

        // Membership is checked before user existence.
        let member = server
            .store
            .get_group_member(&group_id, &uid)
            .await
            .map_err(ApiError::internal)?;
        if let Some(member) = member {
            let username = match server.store.get_user(&uid).await {
                Ok(user) => user.username,
                Err(_) => raw.clone(),
            };
            resp.exist_members.push(MemberInfo {
                uid: raw.clone(),
                username,
                role: member.role.as_str().to_string(),
            });
            continue;
        }

        let user = match server.store.get_user(&uid).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                resp.no_members.push(raw.clone());
                continue;
            }
            Err(e) => return Err(ApiError::internal(e)),
        };

        // Site admins already see every group; they are never added.
        if user.site_role == SiteRole::Admin {
            continue;
        }

        server
            .store
            .add_group_member(&group_id, &uid, role)
            .await
            .map_err(ApiError::internal)?;
        resp.add_members.push(MemberInfo {
            uid: raw.clone(),
            username: user.username,
            role: role.as_str().to_string(),
        });
    }

    if !resp.add_members.is_empty() {
        let names: Vec<String> = resp
            .add_members
            .iter()
            .map(|m| m.username.clone())
            .collect();
        server
            .audit(
                AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::GroupMemberAdd)
                    .resource("group", group_id.0.to_string())
                    .group_id(Some(&group_id))
                    .message(format!(
                        "{} added {} to group {} as {}",
                        user_link(&actor.user_id, &actor.username),
                        names.join(", "),
                        group_link(&group),
                        role.display_name()
                    ))
                    .build(),
            )
            .await;
    }

    Ok(Data(resp))
}

// ──────────────────────────────── changeMemberRole ────────────────────────────────

#[derive(Deserialize)]
pub struct ChangeMemberRoleReq {
    pub id: String,
    pub member_uid: String,
    pub role: Option<String>,
}

pub async fn change_member_role(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<ChangeMemberRoleReq>,
) -> Result<Data<MemberInfo>, ApiError> {
    let group_id = GroupId(parse_id(&req.id, "id")?);
    let member_uid = UserId(parse_id(&req.member_uid, "member_uid")?);
    let group = load_group(&server, &group_id).await?;

    // Existence is reported before authority is checked.
    let member = server
        .store
        .get_group_member(&group_id, &member_uid)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::invalid_params("group member does not exist"))?;

    server
        .require_group_authority(&actor, &group_id, Authority::Danger)
        .await?;

    let role = GroupRole::from_param(req.role.as_deref().unwrap_or(""));
    server
        .store
        .update_group_member_role(&group_id, &member_uid, role)
        .await
        .map_err(ApiError::internal)?;

    let target = server
        .store
        .get_user(&member_uid)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(
                &actor.user_id,
                &actor.username,
                AuditAction::GroupMemberRoleChange,
            )
            .resource("group", group_id.0.to_string())
            .group_id(Some(&group_id))
            .message(format!(
                "{} changed the role of {} in group {} to {}",
                user_link(&actor.user_id, &actor.username),
                user_link(&member_uid, &target.username),
                group_link(&group),
                role.display_name()
            ))
            .details(serde_json::json!({
                "old_role": member.role.as_str(),
                "new_role": role.as_str(),
            }))
            .build(),
        )
        .await;

    Ok(Data(MemberInfo {
        uid: member_uid.0.to_string(),
        username: target.username,
        role: role.as_str().to_string(),
    }))
}

// ──────────────────────────────── delMember ────────────────────────────────

#[derive(Deserialize)]
pub struct DelMemberReq {
    pub id: String,
    pub member_uid: String,
}

pub async fn del_member(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<DelMemberReq>,
) -> Result<Data<()>, ApiError> {
    let group_id = GroupId(parse_id(&req.id, "id")?);
    let member_uid = UserId(parse_id(&req.member_uid, "member_uid")?);
    let group = load_group(&server, &group_id).await?;

    // Existence is reported before authority is checked.
    server
        .store
        .get_group_member(&group_id, &member_uid)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::invalid_params("group member does not exist"))?;

    server
        .require_group_authority(&actor, &group_id, Authority::Danger)
        .await?;

    server
        .store
        .remove_group_member(&group_id, &member_uid)
        .await
        .map_err(ApiError::internal)?;

    let target_name = match server.store.get_user(&member_uid).await {
        Ok(user) => user.username,
        Err(_) => member_uid.0.to_string(),
    };

    server
        .audit(
            AuditEvent::builder(
                &actor.user_id,
                &actor.username,
                AuditAction::GroupMemberRemove,
            )
            .resource("group", group_id.0.to_string())
            .group_id(Some(&group_id))
            .message(format!(
                "{} removed {} from group {}",
                user_link(&actor.user_id, &actor.username),
                user_link(&member_uid, &target_name),
                group_link(&group)
            ))
            .build(),
        )
        .await;

    Ok(Data(()))
}

// ──────────────────────────────── getMemberList ────────────────────────────────

pub async fn get_member_list(
    State(server): State<ApiServer>,
    _actor: Actor,
    Query(query): Query<GetQuery>,
) -> Result<Data<Vec<MemberInfo>>, ApiError> {
    let group_id = GroupId(parse_id(&query.id, "id")?);
    load_group(&server, &group_id).await?;

    let members = server
        .store
        .list_group_members(&group_id)
        .await
        .map_err(ApiError::internal)?;

    let mut out = Vec::with_capacity(members.len());
    for member in members {
        let username = match server.store.get_user(&member.user_id).await {
            Ok(user) => user.username,
            Err(_) => member.user_id.0.to_string(),
        };
        out.push(MemberInfo {
            uid: member.user_id.0.to_string(),
            username,
            role: member.role.as_str().to_string(),
        });
    }
    Ok(Data(out))
}

// ──────────────────────────────── list ────────────────────────────────

/// Fetch the caller's private group, creating it on first use.
async fn ensure_private_group(server: &ApiServer, actor: &Actor) -> Result<Group, ApiError> {
    if let Some(group) = server
        .store
        .find_private_group(&actor.user_id)
        .await
        .map_err(ApiError::internal)?
    {
        return Ok(group);
    }

    let params = CreateGroupParams {
        name: format!("User-{}", actor.user_id.0),
        description: None,
        group_type: GroupType::Private,
        owner_uid: actor.user_id.clone(),
    };
    match server.store.create_group(&params).await {
        Ok(group_id) => {
            server
                .store
                .add_group_member(&group_id, &actor.user_id, GroupRole::Owner)
                .await
                .map_err(ApiError::internal)?;
            server.store.get_group(&group_id).await.map_err(ApiError::internal)
        }
        // Lost the race to a concurrent list() call; the group now exists.
        Err(StoreError::AlreadyExists) => server
            .store
            .find_private_group(&actor.user_id)
            .await
            .map_err(ApiError::internal)?
            .ok_or_else(|| ApiError::internal("private group vanished after conflict")),
        Err(e) => Err(ApiError::internal(e)),
    }
}

pub async fn list(
    State(server): State<ApiServer>,
    actor: Actor,
) -> Result<Data<Vec<GroupInfo>>, ApiError> {
    let private = ensure_private_group(&server, &actor).await?;

    let mut out = vec![group_info(&private, "owner")];

    let groups = server.store.list_groups().await.map_err(ApiError::internal)?;
    let mut guest_candidates = Vec::new();

    for group in groups {
        if group.group_type == GroupType::Private {
            continue;
        }
        if actor.site_role == SiteRole::Admin {
            out.push(group_info(&group, "admin"));
            continue;
        }
        match server.group_role_of(&actor, &group.id).await? {
            Some(role) => out.push(group_info(&group, role.as_str())),
            None => guest_candidates.push(group),
        }
    }

    // Non-member groups show up only when they expose a public project.
    for group in guest_candidates {
        let projects = server
            .store
            .list_projects_by_group(&group.id)
            .await
            .map_err(ApiError::internal)?;
        if projects
            .iter()
            .any(|p| p.visibility == apidock_storage::Visibility::Public)
        {
            out.push(group_info(&group, "guest"));
        }
    }

    Ok(Data(out))
}

// ──────────────────────────────── del ────────────────────────────────

#[derive(Deserialize)]
pub struct DelGroupReq {
    pub id: String,
}

pub async fn del(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<DelGroupReq>,
) -> Result<Data<()>, ApiError> {
    server.require_site_admin(&actor)?;

    let group_id = GroupId(parse_id(&req.id, "id")?);
    let group = load_group(&server, &group_id).await?;

    // Each project's children are removed before the project itself, and
    // everything is awaited before the group row goes away.
    let projects = server
        .store
        .list_projects_by_group(&group_id)
        .await
        .map_err(ApiError::internal)?;
    for project in &projects {
        server
            .store
            .delete_interfaces_by_project(&project.id)
            .await
            .map_err(ApiError::internal)?;
        server
            .store
            .delete_interface_cases_by_project(&project.id)
            .await
            .map_err(ApiError::internal)?;
        server
            .store
            .delete_interface_cols_by_project(&project.id)
            .await
            .map_err(ApiError::internal)?;
        server
            .store
            .delete_project(&project.id)
            .await
            .map_err(ApiError::internal)?;
    }

    server
        .store
        .delete_group(&group_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::GroupDelete)
                .resource("group", group_id.0.to_string())
                .group_id(Some(&group_id))
                .message(format!(
                    "{} deleted group {}",
                    user_link(&actor.user_id, &actor.username),
                    group.name
                ))
                .details(serde_json::json!({ "projects_removed": projects.len() }))
                .build(),
        )
        .await;

    Ok(Data(()))
}

// ──────────────────────────────── up ────────────────────────────────

#[derive(Deserialize)]
pub struct UpGroupReq {
    pub id: String,
    pub group_name: Option<String>,
    pub group_desc: Option<String>,
}

pub async fn up(
    State(server): State<ApiServer>,
    actor: Actor,
    Json(req): Json<UpGroupReq>,
) -> Result<Data<GroupInfo>, ApiError> {
    let group_id = GroupId(parse_id(&req.id, "id")?);
    let group = load_group(&server, &group_id).await?;

    server
        .require_group_authority(&actor, &group_id, Authority::Danger)
        .await?;

    if group.group_type == GroupType::Private && req.group_name.is_some() {
        return Err(ApiError::invalid_params("cannot rename a private group"));
    }

    let name = req.group_name.clone().unwrap_or_else(|| group.name.clone());
    let description = req.group_desc.clone().or_else(|| group.description.clone());

    server
        .store
        .update_group(&group_id, &name, description)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => ApiError::duplicate("group name already exists"),
            StoreError::NotFound => ApiError::invalid_params("group does not exist"),
            _ => ApiError::internal(e),
        })?;

    let updated = server
        .store
        .get_group(&group_id)
        .await
        .map_err(ApiError::internal)?;

    server
        .audit(
            AuditEvent::builder(&actor.user_id, &actor.username, AuditAction::GroupUpdate)
                .resource("group", group_id.0.to_string())
                .group_id(Some(&group_id))
                .message(format!(
                    "{} updated group {}",
                    user_link(&actor.user_id, &actor.username),
                    group_link(&updated)
                ))
                .details(serde_json::json!({
                    "old_name": group.name,
                    "new_name": updated.name,
                }))
                .build(),
        )
        .await;

    let membership = server.group_role_of(&actor, &group_id).await?;
    Ok(Data(group_info(&updated, effective_role(&actor, membership))))
}
