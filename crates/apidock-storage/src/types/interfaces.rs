//! Interface, interface collection and test-case types.

use chrono::{DateTime, Utc};

use super::{InterfaceCaseId, InterfaceColId, InterfaceId, ProjectId};

/// Documented HTTP interface belonging to a project.
#[derive(Clone, Debug)]
pub struct Interface {
    pub id: InterfaceId,
    pub project_id: ProjectId,
    pub title: String,
    /// Path relative to the project basepath, always starting with `/`.
    pub path: String,
    pub method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating an interface
#[derive(Clone, Debug)]
pub struct CreateInterfaceParams {
    pub project_id: ProjectId,
    pub title: String,
    pub path: String,
    pub method: String,
}

/// Collection grouping saved interface test cases.
#[derive(Clone, Debug)]
pub struct InterfaceCol {
    pub id: InterfaceColId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating an interface collection
#[derive(Clone, Debug)]
pub struct CreateInterfaceColParams {
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
}

/// Saved test case inside a collection.
#[derive(Clone, Debug)]
pub struct InterfaceCase {
    pub id: InterfaceCaseId,
    pub project_id: ProjectId,
    pub col_id: InterfaceColId,
    /// Interface the case exercises, if still present.
    pub interface_id: Option<InterfaceId>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating an interface test case
#[derive(Clone, Debug)]
pub struct CreateInterfaceCaseParams {
    pub project_id: ProjectId,
    pub col_id: InterfaceColId,
    pub interface_id: Option<InterfaceId>,
    pub name: String,
}
