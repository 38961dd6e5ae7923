//! Group and membership types.

use chrono::{DateTime, Utc};

use super::{GroupId, GroupRole, GroupType, UserId};

/// Group record
#[derive(Clone, Debug)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub group_type: GroupType,
    /// User that the group belongs to (creator for normal groups,
    /// the namespace owner for private ones).
    pub owner_uid: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Group membership record
#[derive(Clone, Debug)]
pub struct GroupMember {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: GroupRole,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a group
#[derive(Clone, Debug)]
pub struct CreateGroupParams {
    pub name: String,
    pub description: Option<String>,
    pub group_type: GroupType,
    pub owner_uid: UserId,
}
