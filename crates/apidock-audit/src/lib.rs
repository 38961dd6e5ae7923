//! Activity log abstraction for apidock.
//!
//! This crate defines the `AuditLog` trait for persisting audit events
//! and the types representing auditable actions in the system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use apidock_storage::{GroupId, ProjectId, UserId};

/// Unique identifier for an audit log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditLogId(pub Uuid);

impl AuditLogId {
    /// Generate a new audit log ID using UUID v7 (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AuditLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AuditLogId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Categories of auditable actions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Authentication
    UserLogin,

    // Group operations
    GroupCreate,
    GroupUpdate,
    GroupDelete,
    GroupMemberAdd,
    GroupMemberRemove,
    GroupMemberRoleChange,

    // Project operations
    ProjectCreate,
    ProjectUpdate,
    ProjectDelete,

    // Interface operations
    InterfaceCreate,
    InterfaceDelete,
    InterfaceColCreate,
    InterfaceColDelete,
    InterfaceCaseCreate,
    InterfaceCaseDelete,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::UserLogin => "user.login",
            AuditAction::GroupCreate => "group.create",
            AuditAction::GroupUpdate => "group.update",
            AuditAction::GroupDelete => "group.delete",
            AuditAction::GroupMemberAdd => "group.member_add",
            AuditAction::GroupMemberRemove => "group.member_remove",
            AuditAction::GroupMemberRoleChange => "group.member_role_change",
            AuditAction::ProjectCreate => "project.create",
            AuditAction::ProjectUpdate => "project.update",
            AuditAction::ProjectDelete => "project.delete",
            AuditAction::InterfaceCreate => "interface.create",
            AuditAction::InterfaceDelete => "interface.delete",
            AuditAction::InterfaceColCreate => "interface_col.create",
            AuditAction::InterfaceColDelete => "interface_col.delete",
            AuditAction::InterfaceCaseCreate => "interface_case.create",
            AuditAction::InterfaceCaseDelete => "interface_case.delete",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user.login" => Ok(AuditAction::UserLogin),
            "group.create" => Ok(AuditAction::GroupCreate),
            "group.update" => Ok(AuditAction::GroupUpdate),
            "group.delete" => Ok(AuditAction::GroupDelete),
            "group.member_add" => Ok(AuditAction::GroupMemberAdd),
            "group.member_remove" => Ok(AuditAction::GroupMemberRemove),
            "group.member_role_change" => Ok(AuditAction::GroupMemberRoleChange),
            "project.create" => Ok(AuditAction::ProjectCreate),
            "project.update" => Ok(AuditAction::ProjectUpdate),
            "project.delete" => Ok(AuditAction::ProjectDelete),
            "interface.create" => Ok(AuditAction::InterfaceCreate),
            "interface.delete" => Ok(AuditAction::InterfaceDelete),
            "interface_col.create" => Ok(AuditAction::InterfaceColCreate),
            "interface_col.delete" => Ok(AuditAction::InterfaceColDelete),
            "interface_case.create" => Ok(AuditAction::InterfaceCaseCreate),
            "interface_case.delete" => Ok(AuditAction::InterfaceCaseDelete),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

/// Result of an audited operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Denied,
    Failure,
}

impl std::fmt::Display for AuditResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditResult::Success => "success",
            AuditResult::Denied => "denied",
            AuditResult::Failure => "failure",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AuditResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AuditResult::Success),
            "denied" => Ok(AuditResult::Denied),
            "failure" => Ok(AuditResult::Failure),
            _ => Err(format!("Unknown audit result: {}", s)),
        }
    }
}

/// An audit log entry representing a single auditable action.
///
/// Uses raw UUIDs for serialization compatibility. Use the builder
/// to construct events from typed IDs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for this audit entry
    pub id: AuditLogId,
    /// When the action occurred
    pub timestamp: DateTime<Utc>,
    /// User that performed the action (UUID)
    pub actor_uid: Uuid,
    /// Username of the actor at the time of the action
    pub actor_name: String,
    /// The action that was performed
    pub action: AuditAction,
    /// Type of resource affected (e.g., "group", "project", "interface")
    pub resource_type: String,
    /// Identifier of the affected resource
    pub resource_id: String,
    /// Group context (if applicable)
    pub group_id: Option<Uuid>,
    /// Project context (if applicable)
    pub project_id: Option<Uuid>,
    /// Result of the operation
    pub result: AuditResult,
    /// Activity-feed sentence naming actor and target. May carry markup;
    /// stored verbatim.
    pub message: String,
    /// Additional details as JSON (e.g., old/new values, role changes)
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event builder
    pub fn builder(actor_uid: &UserId, actor_name: &str, action: AuditAction) -> AuditEventBuilder {
        AuditEventBuilder::new(actor_uid, actor_name, action)
    }

    /// Get the actor user ID as a typed ID
    pub fn get_actor_uid(&self) -> UserId {
        UserId(self.actor_uid)
    }

    /// Get the group ID as a typed ID (if present)
    pub fn get_group_id(&self) -> Option<GroupId> {
        self.group_id.map(GroupId)
    }

    /// Get the project ID as a typed ID (if present)
    pub fn get_project_id(&self) -> Option<ProjectId> {
        self.project_id.map(ProjectId)
    }
}

/// Builder for constructing audit events
pub struct AuditEventBuilder {
    actor_uid: Uuid,
    actor_name: String,
    action: AuditAction,
    resource_type: String,
    resource_id: String,
    group_id: Option<Uuid>,
    project_id: Option<Uuid>,
    result: AuditResult,
    message: String,
    details: Option<serde_json::Value>,
}

impl AuditEventBuilder {
    pub fn new(actor_uid: &UserId, actor_name: &str, action: AuditAction) -> Self {
        Self {
            actor_uid: actor_uid.0,
            actor_name: actor_name.to_string(),
            action,
            resource_type: String::new(),
            resource_id: String::new(),
            group_id: None,
            project_id: None,
            result: AuditResult::Success,
            message: String::new(),
            details: None,
        }
    }

    pub fn resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = resource_id.into();
        self
    }

    pub fn group_id(mut self, group_id: Option<&GroupId>) -> Self {
        self.group_id = group_id.map(|g| g.0);
        self
    }

    pub fn project_id(mut self, project_id: Option<&ProjectId>) -> Self {
        self.project_id = project_id.map(|p| p.0);
        self
    }

    pub fn result(mut self, result: AuditResult) -> Self {
        self.result = result;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn build(self) -> AuditEvent {
        AuditEvent {
            id: AuditLogId::new(),
            timestamp: Utc::now(),
            actor_uid: self.actor_uid,
            actor_name: self.actor_name,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            group_id: self.group_id,
            project_id: self.project_id,
            result: self.result,
            message: self.message,
            details: self.details,
        }
    }
}

/// Error type for audit log operations
#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("database error: {0}")]
    Database(String),

    #[error("audit log not found: {0}")]
    NotFound(AuditLogId),
}

/// Trait for audit log persistence.
///
/// Implementations store audit events and provide query capabilities for the
/// activity feed. Failures to record audit events should be logged but must
/// not fail the main operation.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an audit event.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError>;

    /// Most recent events, newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditEvent>, AuditLogError>;

    /// Events scoped to one group, newest first.
    async fn list_by_group(
        &self,
        group_id: &GroupId,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, AuditLogError>;
}

/// In-memory audit log for tests.
#[derive(Default)]
pub struct MemoryAuditLog {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| AuditLogError::Database(e.to_string()))?;
        events.push(event);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditEvent>, AuditLogError> {
        let events = self
            .events
            .lock()
            .map_err(|e| AuditLogError::Database(e.to_string()))?;
        Ok(events.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn list_by_group(
        &self,
        group_id: &GroupId,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, AuditLogError> {
        let events = self
            .events
            .lock()
            .map_err(|e| AuditLogError::Database(e.to_string()))?;
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.group_id == Some(group_id.0))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> (UserId, &'static str) {
        (UserId(Uuid::new_v4()), "alice")
    }

    #[test]
    fn test_audit_action_display_roundtrip() {
        let actions = [
            AuditAction::UserLogin,
            AuditAction::GroupCreate,
            AuditAction::GroupUpdate,
            AuditAction::GroupDelete,
            AuditAction::GroupMemberAdd,
            AuditAction::GroupMemberRemove,
            AuditAction::GroupMemberRoleChange,
            AuditAction::ProjectCreate,
            AuditAction::ProjectUpdate,
            AuditAction::ProjectDelete,
            AuditAction::InterfaceCreate,
            AuditAction::InterfaceDelete,
            AuditAction::InterfaceColCreate,
            AuditAction::InterfaceColDelete,
            AuditAction::InterfaceCaseCreate,
            AuditAction::InterfaceCaseDelete,
        ];
        for action in actions {
            let s = action.to_string();
            let parsed: AuditAction = s.parse().unwrap();
            assert_eq!(action, parsed);
        }
    }

    #[test]
    fn test_audit_action_display_is_dotted() {
        assert_eq!(AuditAction::GroupCreate.to_string(), "group.create");
        assert_eq!(
            AuditAction::GroupMemberRoleChange.to_string(),
            "group.member_role_change"
        );
    }

    #[test]
    fn test_audit_result_roundtrip() {
        for result in [AuditResult::Success, AuditResult::Denied, AuditResult::Failure] {
            let s = result.to_string();
            let parsed: AuditResult = s.parse().unwrap();
            assert_eq!(result, parsed);
        }
    }

    #[test]
    fn test_builder_defaults() {
        let (uid, name) = actor();
        let event = AuditEvent::builder(&uid, name, AuditAction::GroupCreate).build();
        assert_eq!(event.actor_uid, uid.0);
        assert_eq!(event.actor_name, "alice");
        assert_eq!(event.result, AuditResult::Success);
        assert!(event.group_id.is_none());
        assert!(event.details.is_none());
        assert!(event.message.is_empty());
    }

    #[test]
    fn test_builder_sets_all_fields() {
        let (uid, name) = actor();
        let group_id = GroupId(Uuid::new_v4());
        let project_id = ProjectId(Uuid::new_v4());

        let event = AuditEvent::builder(&uid, name, AuditAction::ProjectDelete)
            .resource("project", project_id.0.to_string())
            .group_id(Some(&group_id))
            .project_id(Some(&project_id))
            .result(AuditResult::Denied)
            .message("alice tried to delete project demo")
            .details(serde_json::json!({"reason": "insufficient role"}))
            .build();

        assert_eq!(event.resource_type, "project");
        assert_eq!(event.get_group_id(), Some(group_id));
        assert_eq!(event.get_project_id(), Some(project_id));
        assert_eq!(event.result, AuditResult::Denied);
        assert!(event.message.contains("alice"));
        assert!(event.details.is_some());
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let (uid, name) = actor();
        let event = AuditEvent::builder(&uid, name, AuditAction::GroupMemberAdd)
            .resource("group", "g-1")
            .message("alice added bob")
            .build();

        let json = serde_json::to_string(&event).unwrap();
        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, event.id);
        assert_eq!(parsed.action, AuditAction::GroupMemberAdd);
        assert_eq!(parsed.message, "alice added bob");
    }

    #[tokio::test]
    async fn test_memory_audit_log_records_and_lists() {
        let log = MemoryAuditLog::new();
        let (uid, name) = actor();
        let group_id = GroupId(Uuid::new_v4());

        for i in 0..3 {
            let event = AuditEvent::builder(&uid, name, AuditAction::GroupUpdate)
                .group_id(Some(&group_id))
                .message(format!("update {}", i))
                .build();
            log.record(event).await.unwrap();
        }

        let recent = log.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first
        assert_eq!(recent[0].message, "update 2");

        let scoped = log.list_by_group(&group_id, 10).await.unwrap();
        assert_eq!(scoped.len(), 3);

        let other = log
            .list_by_group(&GroupId(Uuid::new_v4()), 10)
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
