//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait the server depends on.
///
/// Child rows (projects, interfaces, cases, collections) are always scoped by
/// their parent id; nothing here implements cascading deletes — the caller
/// sequences those explicitly.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Users ──────────────────────────────────────────

    /// Create a new user (returns generated ID).
    async fn create_user(&self, params: &CreateUserParams) -> Result<UserId, StoreError>;

    /// Get user by ID.
    async fn get_user(&self, user_id: &UserId) -> Result<User, StoreError>;

    /// Get user by username.
    async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// Get user together with password verification material, by username.
    async fn get_user_credentials(&self, username: &str) -> Result<UserCredentials, StoreError>;

    /// Total number of registered users.
    async fn count_users(&self) -> Result<u64, StoreError>;

    // ──────────────────────────────────── Sessions ─────────────────────────────────────────

    /// Create a login session for a user keyed by the token digest.
    async fn create_session(
        &self,
        user_id: &UserId,
        token_digest: &str,
    ) -> Result<SessionId, StoreError>;

    /// Resolve a token digest to the user owning the session.
    async fn get_session_user(&self, token_digest: &str) -> Result<User, StoreError>;

    /// Delete a session by token digest (logout).
    async fn delete_session(&self, token_digest: &str) -> Result<(), StoreError>;

    // ───────────────────────────────────── Groups ──────────────────────────────────────────

    /// Create a new group (returns generated ID).
    async fn create_group(&self, params: &CreateGroupParams) -> Result<GroupId, StoreError>;

    /// Get group by ID.
    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError>;

    /// Get group by name.
    async fn get_group_by_name(&self, name: &str) -> Result<Group, StoreError>;

    /// Find the private group owned by a user, if one exists.
    async fn find_private_group(&self, owner_uid: &UserId) -> Result<Option<Group>, StoreError>;

    /// List all groups.
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Update group name and description.
    async fn update_group(
        &self,
        group_id: &GroupId,
        name: &str,
        description: Option<String>,
    ) -> Result<(), StoreError>;

    /// Delete a group and its membership rows.
    async fn delete_group(&self, group_id: &GroupId) -> Result<(), StoreError>;

    // ───────────────────────────────── Group membership ────────────────────────────────────

    /// Add a user to a group with the given role.
    async fn add_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), StoreError>;

    /// Remove a user from a group.
    async fn remove_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<(), StoreError>;

    /// Change the role of an existing group member.
    async fn update_group_member_role(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: GroupRole,
    ) -> Result<(), StoreError>;

    /// Get a single membership row, if present.
    async fn get_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<GroupMember>, StoreError>;

    /// List all members of a group.
    async fn list_group_members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>, StoreError>;

    /// List all groups a user is a member of.
    async fn list_user_groups(&self, user_id: &UserId) -> Result<Vec<Group>, StoreError>;

    // ──────────────────────────────────── Projects ─────────────────────────────────────────

    /// Create a new project (returns generated ID).
    async fn create_project(&self, params: &CreateProjectParams) -> Result<ProjectId, StoreError>;

    /// Get project by ID.
    async fn get_project(&self, project_id: &ProjectId) -> Result<Project, StoreError>;

    /// List all projects in a group.
    async fn list_projects_by_group(&self, group_id: &GroupId) -> Result<Vec<Project>, StoreError>;

    /// Apply field updates to a project.
    async fn update_project(
        &self,
        project_id: &ProjectId,
        params: &UpdateProjectParams,
    ) -> Result<(), StoreError>;

    /// Delete a project row. Child interfaces/cases/collections are the
    /// caller's responsibility.
    async fn delete_project(&self, project_id: &ProjectId) -> Result<(), StoreError>;

    // ─────────────────────────────────── Interfaces ────────────────────────────────────────

    /// Create a new interface (returns generated ID).
    async fn create_interface(
        &self,
        params: &CreateInterfaceParams,
    ) -> Result<InterfaceId, StoreError>;

    /// Get interface by ID.
    async fn get_interface(&self, interface_id: &InterfaceId) -> Result<Interface, StoreError>;

    /// List all interfaces in a project.
    async fn list_interfaces_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<Interface>, StoreError>;

    /// Delete a single interface.
    async fn delete_interface(&self, interface_id: &InterfaceId) -> Result<(), StoreError>;

    /// Delete every interface in a project.
    async fn delete_interfaces_by_project(&self, project_id: &ProjectId)
        -> Result<(), StoreError>;

    // ──────────────────────────────── Interface collections ────────────────────────────────

    /// Create a new interface collection (returns generated ID).
    async fn create_interface_col(
        &self,
        params: &CreateInterfaceColParams,
    ) -> Result<InterfaceColId, StoreError>;

    /// Fetch a collection by ID.
    async fn get_interface_col(&self, col_id: &InterfaceColId)
        -> Result<InterfaceCol, StoreError>;

    /// List all collections in a project.
    async fn list_interface_cols_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<InterfaceCol>, StoreError>;

    /// Delete a single collection.
    async fn delete_interface_col(&self, col_id: &InterfaceColId) -> Result<(), StoreError>;

    /// Delete every collection in a project.
    async fn delete_interface_cols_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<(), StoreError>;

    // ──────────────────────────────── Interface test cases ─────────────────────────────────

    /// Create a new interface test case (returns generated ID).
    async fn create_interface_case(
        &self,
        params: &CreateInterfaceCaseParams,
    ) -> Result<InterfaceCaseId, StoreError>;

    /// Fetch a case by ID.
    async fn get_interface_case(
        &self,
        case_id: &InterfaceCaseId,
    ) -> Result<InterfaceCase, StoreError>;

    /// List all cases in a collection.
    async fn list_interface_cases_by_col(
        &self,
        col_id: &InterfaceColId,
    ) -> Result<Vec<InterfaceCase>, StoreError>;

    /// Delete a single test case.
    async fn delete_interface_case(&self, case_id: &InterfaceCaseId) -> Result<(), StoreError>;

    /// Delete every test case in a project.
    async fn delete_interface_cases_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<(), StoreError>;
}
