//! SQLite storage backend for apidock.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use apidock_audit::{AuditAction, AuditEvent, AuditLog, AuditLogError, AuditLogId, AuditResult};
use apidock_storage::*;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(e.to_string()))
}

fn unique_or_backend(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(s)
    }
}

type UserRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

fn user_from_row(row: UserRow) -> Result<User, StoreError> {
    let (id, username, email, _digest, _salt, site_role, created_at, updated_at) = row;
    Ok(User {
        id: UserId(parse_uuid(&id)?),
        username,
        email,
        site_role: site_role
            .parse()
            .map_err(|e: ParseSiteRoleError| StoreError::Backend(e.to_string()))?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

type GroupRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
);

fn group_from_row(row: GroupRow) -> Result<Group, StoreError> {
    let (id, name, description, group_type, owner_uid, created_at, updated_at) = row;
    Ok(Group {
        id: GroupId(parse_uuid(&id)?),
        name,
        description,
        group_type: group_type.parse().map_err(StoreError::Backend)?,
        owner_uid: UserId(parse_uuid(&owner_uid)?),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

type ProjectRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    i64,
    String,
    String,
);

fn project_from_row(row: ProjectRow) -> Result<Project, StoreError> {
    let (id, group_id, name, basepath, color, icon, visibility, switch_notice, created, updated) =
        row;
    Ok(Project {
        id: ProjectId(parse_uuid(&id)?),
        group_id: GroupId(parse_uuid(&group_id)?),
        name,
        basepath,
        color,
        icon,
        visibility: visibility.parse().map_err(StoreError::Backend)?,
        switch_notice: switch_notice != 0,
        created_at: parse_ts(&created)?,
        updated_at: parse_ts(&updated)?,
    })
}

const SELECT_USER: &str = "SELECT id,username,email,password_digest,salt,site_role,created_at,updated_at FROM users";
const SELECT_GROUP: &str =
    "SELECT id,name,description,group_type,owner_uid,created_at,updated_at FROM groups";
const SELECT_PROJECT: &str = "SELECT id,group_id,name,basepath,color,icon,visibility,switch_notice,created_at,updated_at FROM projects";

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Users ─────────────────────────────

    async fn create_user(&self, params: &CreateUserParams) -> Result<UserId, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users(id,username,email,password_digest,salt,site_role,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(&params.username)
        .bind(&params.email)
        .bind(&params.password_digest)
        .bind(&params.salt)
        .bind(params.site_role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;
        Ok(UserId(id))
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE id=?", SELECT_USER))
            .bind(user_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => user_from_row(row),
        }
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE username=?", SELECT_USER))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => user_from_row(row),
        }
    }

    async fn get_user_credentials(&self, username: &str) -> Result<UserCredentials, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE username=?", SELECT_USER))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => {
                let password_digest = row.3.clone();
                let salt = row.4.clone();
                Ok(UserCredentials {
                    user: user_from_row(row)?,
                    password_digest,
                    salt,
                })
            }
        }
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(count as u64)
    }

    // ───────────────────────────── Sessions ─────────────────────────────

    async fn create_session(
        &self,
        user_id: &UserId,
        token_digest: &str,
    ) -> Result<SessionId, StoreError> {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO sessions(id,user_id,token_digest,created_at) VALUES(?,?,?,?)")
            .bind(id.to_string())
            .bind(user_id.0.to_string())
            .bind(token_digest)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(unique_or_backend)?;
        Ok(SessionId(id))
    }

    async fn get_session_user(&self, token_digest: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT u.id,u.username,u.email,u.password_digest,u.salt,u.site_role,u.created_at,u.updated_at
               FROM users u
               JOIN sessions s ON s.user_id=u.id
              WHERE s.token_digest=?",
        )
        .bind(token_digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => user_from_row(row),
        }
    }

    async fn delete_session(&self, token_digest: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token_digest=?")
            .bind(token_digest)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    // ───────────────────────────── Groups ─────────────────────────────

    async fn create_group(&self, params: &CreateGroupParams) -> Result<GroupId, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO groups(id,name,description,group_type,owner_uid,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(&params.name)
        .bind(&params.description)
        .bind(params.group_type.as_str())
        .bind(params.owner_uid.0.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;
        Ok(GroupId(id))
    }

    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!("{} WHERE id=?", SELECT_GROUP))
            .bind(group_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => group_from_row(row),
        }
    }

    async fn get_group_by_name(&self, name: &str) -> Result<Group, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!("{} WHERE name=?", SELECT_GROUP))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => group_from_row(row),
        }
    }

    async fn find_private_group(&self, owner_uid: &UserId) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "{} WHERE owner_uid=? AND group_type='private'",
            SELECT_GROUP
        ))
        .bind(owner_uid.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.map(group_from_row).transpose()
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rows =
            sqlx::query_as::<_, GroupRow>(&format!("{} ORDER BY created_at", SELECT_GROUP))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(group_from_row).collect()
    }

    async fn update_group(
        &self,
        group_id: &GroupId,
        name: &str,
        description: Option<String>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE groups SET name=?, description=?, updated_at=? WHERE id=?",
        )
        .bind(name)
        .bind(&description)
        .bind(Utc::now().to_rfc3339())
        .bind(group_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_group(&self, group_id: &GroupId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM group_members WHERE group_id=?")
            .bind(group_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let result = sqlx::query("DELETE FROM groups WHERE id=?")
            .bind(group_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ───────────────────────────── Group membership ─────────────────────────────

    async fn add_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO group_members(group_id,user_id,role,created_at) VALUES(?,?,?,?)")
            .bind(group_id.0.to_string())
            .bind(user_id.0.to_string())
            .bind(role.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(unique_or_backend)?;
        Ok(())
    }

    async fn remove_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id=? AND user_id=?")
            .bind(group_id.0.to_string())
            .bind(user_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_group_member_role(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE group_members SET role=? WHERE group_id=? AND user_id=?")
            .bind(role.as_str())
            .bind(group_id.0.to_string())
            .bind(user_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<GroupMember>, StoreError> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT role,created_at FROM group_members WHERE group_id=? AND user_id=?",
        )
        .bind(group_id.0.to_string())
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Ok(None),
            Some((role, created_at)) => Ok(Some(GroupMember {
                group_id: group_id.clone(),
                user_id: user_id.clone(),
                role: role
                    .parse()
                    .map_err(|e: ParseGroupRoleError| StoreError::Backend(e.to_string()))?,
                created_at: parse_ts(&created_at)?,
            })),
        }
    }

    async fn list_group_members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT user_id,role,created_at FROM group_members WHERE group_id=? ORDER BY created_at",
        )
        .bind(group_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for (user_id, role, created_at) in rows {
            out.push(GroupMember {
                group_id: group_id.clone(),
                user_id: UserId(parse_uuid(&user_id)?),
                role: role
                    .parse()
                    .map_err(|e: ParseGroupRoleError| StoreError::Backend(e.to_string()))?,
                created_at: parse_ts(&created_at)?,
            });
        }
        Ok(out)
    }

    async fn list_user_groups(&self, user_id: &UserId) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT g.id,g.name,g.description,g.group_type,g.owner_uid,g.created_at,g.updated_at
               FROM groups g
               JOIN group_members m ON m.group_id=g.id
              WHERE m.user_id=?
              ORDER BY g.created_at",
        )
        .bind(user_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(group_from_row).collect()
    }

    // ───────────────────────────── Projects ─────────────────────────────

    async fn create_project(&self, params: &CreateProjectParams) -> Result<ProjectId, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO projects(id,group_id,name,basepath,color,icon,visibility,switch_notice,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.group_id.0.to_string())
        .bind(&params.name)
        .bind(&params.basepath)
        .bind(&params.color)
        .bind(&params.icon)
        .bind(params.visibility.as_str())
        .bind(1_i64)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;
        Ok(ProjectId(id))
    }

    async fn get_project(&self, project_id: &ProjectId) -> Result<Project, StoreError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!("{} WHERE id=?", SELECT_PROJECT))
            .bind(project_id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some(row) => project_from_row(row),
        }
    }

    async fn list_projects_by_group(&self, group_id: &GroupId) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "{} WHERE group_id=? ORDER BY created_at",
            SELECT_PROJECT
        ))
        .bind(group_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(project_from_row).collect()
    }

    async fn update_project(
        &self,
        project_id: &ProjectId,
        params: &UpdateProjectParams,
    ) -> Result<(), StoreError> {
        let current = self.get_project(project_id).await?;
        let result = sqlx::query(
            "UPDATE projects SET name=?, basepath=?, color=?, icon=?, visibility=?, switch_notice=?, updated_at=?
             WHERE id=?",
        )
        .bind(params.name.as_ref().unwrap_or(&current.name))
        .bind(params.basepath.as_ref().unwrap_or(&current.basepath))
        .bind(params.color.as_ref().or(current.color.as_ref()))
        .bind(params.icon.as_ref().or(current.icon.as_ref()))
        .bind(params.visibility.unwrap_or(current.visibility).as_str())
        .bind(params.switch_notice.unwrap_or(current.switch_notice) as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(project_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_project(&self, project_id: &ProjectId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id=?")
            .bind(project_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ───────────────────────────── Interfaces ─────────────────────────────

    async fn create_interface(
        &self,
        params: &CreateInterfaceParams,
    ) -> Result<InterfaceId, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO interfaces(id,project_id,title,path,method,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.project_id.0.to_string())
        .bind(&params.title)
        .bind(&params.path)
        .bind(&params.method)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(InterfaceId(id))
    }

    async fn get_interface(&self, interface_id: &InterfaceId) -> Result<Interface, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String, String, String, String, String)>(
            "SELECT id,project_id,title,path,method,created_at,updated_at FROM interfaces WHERE id=?",
        )
        .bind(interface_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some((id, project_id, title, path, method, created_at, updated_at)) => Ok(Interface {
                id: InterfaceId(parse_uuid(&id)?),
                project_id: ProjectId(parse_uuid(&project_id)?),
                title,
                path,
                method,
                created_at: parse_ts(&created_at)?,
                updated_at: parse_ts(&updated_at)?,
            }),
        }
    }

    async fn list_interfaces_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<Interface>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String, String, String, String, String)>(
            "SELECT id,project_id,title,path,method,created_at,updated_at
               FROM interfaces WHERE project_id=? ORDER BY created_at",
        )
        .bind(project_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, project_id, title, path, method, created_at, updated_at) in rows {
            out.push(Interface {
                id: InterfaceId(parse_uuid(&id)?),
                project_id: ProjectId(parse_uuid(&project_id)?),
                title,
                path,
                method,
                created_at: parse_ts(&created_at)?,
                updated_at: parse_ts(&updated_at)?,
            });
        }
        Ok(out)
    }

    async fn delete_interface(&self, interface_id: &InterfaceId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM interfaces WHERE id=?")
            .bind(interface_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_interfaces_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM interfaces WHERE project_id=?")
            .bind(project_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    // ───────────────────────────── Interface collections ─────────────────────────────

    async fn create_interface_col(
        &self,
        params: &CreateInterfaceColParams,
    ) -> Result<InterfaceColId, StoreError> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO interface_cols(id,project_id,name,description,created_at) VALUES(?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.project_id.0.to_string())
        .bind(&params.name)
        .bind(&params.description)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(InterfaceColId(id))
    }

    async fn get_interface_col(&self, col_id: &InterfaceColId) -> Result<InterfaceCol, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String, Option<String>, String)>(
            "SELECT id,project_id,name,description,created_at FROM interface_cols WHERE id=?",
        )
        .bind(col_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some((id, project_id, name, description, created_at)) => Ok(InterfaceCol {
                id: InterfaceColId(parse_uuid(&id)?),
                project_id: ProjectId(parse_uuid(&project_id)?),
                name,
                description,
                created_at: parse_ts(&created_at)?,
            }),
        }
    }

    async fn list_interface_cols_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<InterfaceCol>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String, Option<String>, String)>(
            "SELECT id,project_id,name,description,created_at
               FROM interface_cols WHERE project_id=? ORDER BY created_at",
        )
        .bind(project_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, project_id, name, description, created_at) in rows {
            out.push(InterfaceCol {
                id: InterfaceColId(parse_uuid(&id)?),
                project_id: ProjectId(parse_uuid(&project_id)?),
                name,
                description,
                created_at: parse_ts(&created_at)?,
            });
        }
        Ok(out)
    }

    async fn delete_interface_col(&self, col_id: &InterfaceColId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM interface_cols WHERE id=?")
            .bind(col_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_interface_cols_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM interface_cols WHERE project_id=?")
            .bind(project_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    // ───────────────────────────── Interface test cases ─────────────────────────────

    async fn create_interface_case(
        &self,
        params: &CreateInterfaceCaseParams,
    ) -> Result<InterfaceCaseId, StoreError> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO interface_cases(id,project_id,col_id,interface_id,name,created_at)
             VALUES(?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.project_id.0.to_string())
        .bind(params.col_id.0.to_string())
        .bind(params.interface_id.as_ref().map(|i| i.0.to_string()))
        .bind(&params.name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(InterfaceCaseId(id))
    }

    async fn get_interface_case(
        &self,
        case_id: &InterfaceCaseId,
    ) -> Result<InterfaceCase, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String, Option<String>, String, String)>(
            "SELECT id,project_id,col_id,interface_id,name,created_at FROM interface_cases WHERE id=?",
        )
        .bind(case_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            None => Err(StoreError::NotFound),
            Some((id, project_id, col_id, interface_id, name, created_at)) => Ok(InterfaceCase {
                id: InterfaceCaseId(parse_uuid(&id)?),
                project_id: ProjectId(parse_uuid(&project_id)?),
                col_id: InterfaceColId(parse_uuid(&col_id)?),
                interface_id: match interface_id {
                    Some(id) => Some(InterfaceId(parse_uuid(&id)?)),
                    None => None,
                },
                name,
                created_at: parse_ts(&created_at)?,
            }),
        }
    }

    async fn list_interface_cases_by_col(
        &self,
        col_id: &InterfaceColId,
    ) -> Result<Vec<InterfaceCase>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String, Option<String>, String, String)>(
            "SELECT id,project_id,col_id,interface_id,name,created_at
               FROM interface_cases WHERE col_id=? ORDER BY created_at",
        )
        .bind(col_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, project_id, col_id, interface_id, name, created_at) in rows {
            out.push(InterfaceCase {
                id: InterfaceCaseId(parse_uuid(&id)?),
                project_id: ProjectId(parse_uuid(&project_id)?),
                col_id: InterfaceColId(parse_uuid(&col_id)?),
                interface_id: match interface_id {
                    Some(id) => Some(InterfaceId(parse_uuid(&id)?)),
                    None => None,
                },
                name,
                created_at: parse_ts(&created_at)?,
            });
        }
        Ok(out)
    }

    async fn delete_interface_case(&self, case_id: &InterfaceCaseId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM interface_cases WHERE id=?")
            .bind(case_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_interface_cases_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM interface_cases WHERE project_id=?")
            .bind(project_id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

// ───────────────────────────── Audit log ─────────────────────────────

type AuditRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<String>,
);

fn audit_from_row(row: AuditRow) -> Result<AuditEvent, AuditLogError> {
    let (
        id,
        timestamp,
        actor_uid,
        actor_name,
        action,
        resource_type,
        resource_id,
        group_id,
        project_id,
        result,
        message,
        details,
    ) = row;
    let parse = |s: &str| Uuid::try_parse(s).map_err(|e| AuditLogError::Database(e.to_string()));
    Ok(AuditEvent {
        id: AuditLogId(parse(&id)?),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AuditLogError::Database(e.to_string()))?,
        actor_uid: parse(&actor_uid)?,
        actor_name,
        action: action
            .parse::<AuditAction>()
            .map_err(AuditLogError::Database)?,
        resource_type,
        resource_id,
        group_id: group_id.as_deref().map(parse).transpose()?,
        project_id: project_id.as_deref().map(parse).transpose()?,
        result: result
            .parse::<AuditResult>()
            .map_err(AuditLogError::Database)?,
        message,
        details: details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AuditLogError::Database(e.to_string()))?,
    })
}

const SELECT_AUDIT: &str = "SELECT id,timestamp,actor_uid,actor_name,action,resource_type,resource_id,group_id,project_id,result,message,details FROM audit_logs";

#[async_trait::async_trait]
impl AuditLog for SqliteStore {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError> {
        let details = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AuditLogError::Database(e.to_string()))?;
        sqlx::query(
            "INSERT INTO audit_logs(id,timestamp,actor_uid,actor_name,action,resource_type,resource_id,group_id,project_id,result,message,details)
             VALUES(?,?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(event.id.0.to_string())
        .bind(event.timestamp.to_rfc3339())
        .bind(event.actor_uid.to_string())
        .bind(&event.actor_name)
        .bind(event.action.to_string())
        .bind(&event.resource_type)
        .bind(&event.resource_id)
        .bind(event.group_id.map(|g| g.to_string()))
        .bind(event.project_id.map(|p| p.to_string()))
        .bind(event.result.to_string())
        .bind(&event.message)
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditLogError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditEvent>, AuditLogError> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "{} ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_AUDIT
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditLogError::Database(e.to_string()))?;
        rows.into_iter().map(audit_from_row).collect()
    }

    async fn list_by_group(
        &self,
        group_id: &GroupId,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, AuditLogError> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "{} WHERE group_id=? ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_AUDIT
        ))
        .bind(group_id.0.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditLogError::Database(e.to_string()))?;
        rows.into_iter().map(audit_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(s: &SqliteStore, name: &str, role: SiteRole) -> UserId {
        s.create_user(&CreateUserParams {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_digest: "digest".to_string(),
            salt: "salt".to_string(),
            site_role: role,
        })
        .await
        .unwrap()
    }

    async fn group(s: &SqliteStore, name: &str, owner: &UserId) -> GroupId {
        s.create_group(&CreateGroupParams {
            name: name.to_string(),
            description: None,
            group_type: GroupType::Normal,
            owner_uid: owner.clone(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn user_roundtrip() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let uid = user(&s, "alice", SiteRole::Admin).await;

        let got = s.get_user(&uid).await.unwrap();
        assert_eq!(got.username, "alice");
        assert_eq!(got.site_role, SiteRole::Admin);

        let by_name = s.get_user_by_username("alice").await.unwrap();
        assert_eq!(by_name.id, uid);

        let creds = s.get_user_credentials("alice").await.unwrap();
        assert_eq!(creds.password_digest, "digest");
        assert_eq!(creds.salt, "salt");
    }

    #[tokio::test]
    async fn duplicate_username_maps_to_alreadyexists() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        user(&s, "alice", SiteRole::Member).await;

        let err = s
            .create_user(&CreateUserParams {
                username: "alice".to_string(),
                email: "other@example.com".to_string(),
                password_digest: "d".to_string(),
                salt: "s".to_string(),
                site_role: SiteRole::Member,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn session_resolves_user_by_token_digest() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let uid = user(&s, "alice", SiteRole::Member).await;

        s.create_session(&uid, "digest-1").await.unwrap();
        let got = s.get_session_user("digest-1").await.unwrap();
        assert_eq!(got.id, uid);

        let err = s.get_session_user("other").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        s.delete_session("digest-1").await.unwrap();
        let err = s.get_session_user("digest-1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_group_name_maps_to_alreadyexists() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let uid = user(&s, "alice", SiteRole::Admin).await;

        group(&s, "team", &uid).await;
        let err = s
            .create_group(&CreateGroupParams {
                name: "team".to_string(),
                description: None,
                group_type: GroupType::Normal,
                owner_uid: uid,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn one_private_group_per_owner() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let uid = user(&s, "alice", SiteRole::Member).await;

        assert!(s.find_private_group(&uid).await.unwrap().is_none());

        s.create_group(&CreateGroupParams {
            name: "User-1".to_string(),
            description: None,
            group_type: GroupType::Private,
            owner_uid: uid.clone(),
        })
        .await
        .unwrap();

        let found = s.find_private_group(&uid).await.unwrap().unwrap();
        assert_eq!(found.group_type, GroupType::Private);

        // The partial unique index rejects a second private group
        let err = s
            .create_group(&CreateGroupParams {
                name: "User-1-again".to_string(),
                description: None,
                group_type: GroupType::Private,
                owner_uid: uid,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn membership_roundtrip_and_uniqueness() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let owner = user(&s, "alice", SiteRole::Member).await;
        let bob = user(&s, "bob", SiteRole::Member).await;
        let gid = group(&s, "team", &owner).await;

        s.add_group_member(&gid, &bob, GroupRole::Dev).await.unwrap();
        let err = s
            .add_group_member(&gid, &bob, GroupRole::Guest)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));

        let member = s.get_group_member(&gid, &bob).await.unwrap().unwrap();
        assert_eq!(member.role, GroupRole::Dev);

        s.update_group_member_role(&gid, &bob, GroupRole::Owner)
            .await
            .unwrap();
        let member = s.get_group_member(&gid, &bob).await.unwrap().unwrap();
        assert_eq!(member.role, GroupRole::Owner);

        let groups = s.list_user_groups(&bob).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, gid);

        s.remove_group_member(&gid, &bob).await.unwrap();
        assert!(s.get_group_member(&gid, &bob).await.unwrap().is_none());
        let err = s.remove_group_member(&gid, &bob).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn delete_group_removes_membership_rows() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let owner = user(&s, "alice", SiteRole::Member).await;
        let gid = group(&s, "team", &owner).await;
        s.add_group_member(&gid, &owner, GroupRole::Owner)
            .await
            .unwrap();

        s.delete_group(&gid).await.unwrap();
        assert!(matches!(
            s.get_group(&gid).await.unwrap_err(),
            StoreError::NotFound
        ));
        assert!(s.list_user_groups(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_project_name_scoped_to_group() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let owner = user(&s, "alice", SiteRole::Member).await;
        let g1 = group(&s, "team-a", &owner).await;
        let g2 = group(&s, "team-b", &owner).await;

        let params = |gid: &GroupId| CreateProjectParams {
            group_id: gid.clone(),
            name: "api".to_string(),
            basepath: "/api".to_string(),
            color: None,
            icon: None,
            visibility: Visibility::Private,
        };

        s.create_project(&params(&g1)).await.unwrap();
        // Same name in a different group is fine
        s.create_project(&params(&g2)).await.unwrap();
        // Same name in the same group conflicts
        let err = s.create_project(&params(&g1)).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn project_update_merges_fields() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let owner = user(&s, "alice", SiteRole::Member).await;
        let gid = group(&s, "team", &owner).await;
        let pid = s
            .create_project(&CreateProjectParams {
                group_id: gid,
                name: "api".to_string(),
                basepath: "/api".to_string(),
                color: Some("blue".to_string()),
                icon: None,
                visibility: Visibility::Private,
            })
            .await
            .unwrap();

        s.update_project(
            &pid,
            &UpdateProjectParams {
                name: Some("api-v2".to_string()),
                visibility: Some(Visibility::Public),
                switch_notice: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let got = s.get_project(&pid).await.unwrap();
        assert_eq!(got.name, "api-v2");
        assert_eq!(got.basepath, "/api");
        assert_eq!(got.color.as_deref(), Some("blue"));
        assert_eq!(got.visibility, Visibility::Public);
        assert!(!got.switch_notice);
    }

    #[tokio::test]
    async fn interface_children_delete_by_project() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let owner = user(&s, "alice", SiteRole::Member).await;
        let gid = group(&s, "team", &owner).await;
        let pid = s
            .create_project(&CreateProjectParams {
                group_id: gid,
                name: "api".to_string(),
                basepath: "/api".to_string(),
                color: None,
                icon: None,
                visibility: Visibility::Private,
            })
            .await
            .unwrap();

        let iid = s
            .create_interface(&CreateInterfaceParams {
                project_id: pid.clone(),
                title: "list users".to_string(),
                path: "/users".to_string(),
                method: "GET".to_string(),
            })
            .await
            .unwrap();
        let col_id = s
            .create_interface_col(&CreateInterfaceColParams {
                project_id: pid.clone(),
                name: "smoke".to_string(),
                description: None,
            })
            .await
            .unwrap();
        s.create_interface_case(&CreateInterfaceCaseParams {
            project_id: pid.clone(),
            col_id: col_id.clone(),
            interface_id: Some(iid),
            name: "happy path".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(s.list_interfaces_by_project(&pid).await.unwrap().len(), 1);
        assert_eq!(
            s.list_interface_cols_by_project(&pid).await.unwrap().len(),
            1
        );
        assert_eq!(s.list_interface_cases_by_col(&col_id).await.unwrap().len(), 1);

        s.delete_interfaces_by_project(&pid).await.unwrap();
        s.delete_interface_cases_by_project(&pid).await.unwrap();
        s.delete_interface_cols_by_project(&pid).await.unwrap();

        assert!(s.list_interfaces_by_project(&pid).await.unwrap().is_empty());
        assert!(s
            .list_interface_cols_by_project(&pid)
            .await
            .unwrap()
            .is_empty());
        assert!(s
            .list_interface_cases_by_col(&col_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn audit_log_roundtrip_and_group_scope() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let uid = user(&s, "alice", SiteRole::Member).await;
        let gid = group(&s, "team", &uid).await;

        let event = AuditEvent::builder(&uid, "alice", AuditAction::GroupUpdate)
            .resource("group", gid.0.to_string())
            .group_id(Some(&gid))
            .message("alice renamed group team")
            .details(serde_json::json!({"old": "team", "new": "core"}))
            .build();
        s.record(event.clone()).await.unwrap();

        let recent = s.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, event.id);
        assert_eq!(recent[0].action, AuditAction::GroupUpdate);
        assert_eq!(recent[0].message, "alice renamed group team");
        assert!(recent[0].details.is_some());

        let scoped = s.list_by_group(&gid, 10).await.unwrap();
        assert_eq!(scoped.len(), 1);

        let other = GroupId(Uuid::new_v4());
        assert!(s.list_by_group(&other, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unicode_names_roundtrip() {
        let s = SqliteStore::open_in_memory().await.unwrap();
        let uid = user(&s, "爱丽丝", SiteRole::Member).await;
        let gid = group(&s, "分组-🚀", &uid).await;

        let got = s.get_group(&gid).await.unwrap();
        assert_eq!(got.name, "分组-🚀");
        let by_name = s.get_group_by_name("分组-🚀").await.unwrap();
        assert_eq!(by_name.id, gid);
    }
}
