//! Project types.

use chrono::{DateTime, Utc};

use super::{GroupId, ProjectId, Visibility};

/// Project record
#[derive(Clone, Debug)]
pub struct Project {
    pub id: ProjectId,
    pub group_id: GroupId,
    pub name: String,
    /// URL prefix every interface path is resolved against. Always starts
    /// with `/` and never ends with one.
    pub basepath: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub visibility: Visibility,
    /// Whether members are notified on interface changes.
    pub switch_notice: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a project
#[derive(Clone, Debug)]
pub struct CreateProjectParams {
    pub group_id: GroupId,
    pub name: String,
    pub basepath: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub visibility: Visibility,
}

/// Field updates for a project. `None` leaves the field unchanged.
#[derive(Clone, Debug, Default)]
pub struct UpdateProjectParams {
    pub name: Option<String>,
    pub basepath: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub visibility: Option<Visibility>,
    pub switch_notice: Option<bool>,
}
