//! Role types for the platform permission matrix.

use std::str::FromStr;

/// Platform-wide role attached to a user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SiteRole {
    Admin,
    Member,
}

/// Error type for parsing SiteRole from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSiteRoleError(pub String);

impl std::fmt::Display for ParseSiteRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid site role: {}", self.0)
    }
}

impl std::error::Error for ParseSiteRoleError {}

impl FromStr for SiteRole {
    type Err = ParseSiteRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(SiteRole::Admin),
            "member" => Ok(SiteRole::Member),
            _ => Err(ParseSiteRoleError(s.to_string())),
        }
    }
}

impl SiteRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteRole::Admin => "admin",
            SiteRole::Member => "member",
        }
    }
}

/// Role held by a user inside one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupRole {
    Owner,
    Dev,
    Guest,
}

/// Error type for parsing GroupRole from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGroupRoleError(pub String);

impl std::fmt::Display for ParseGroupRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid group role: {}", self.0)
    }
}

impl std::error::Error for ParseGroupRoleError {}

impl FromStr for GroupRole {
    type Err = ParseGroupRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(GroupRole::Owner),
            "dev" => Ok(GroupRole::Dev),
            "guest" => Ok(GroupRole::Guest),
            _ => Err(ParseGroupRoleError(s.to_string())),
        }
    }
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Owner => "owner",
            GroupRole::Dev => "dev",
            GroupRole::Guest => "guest",
        }
    }

    /// Human-readable name used in member listings and activity messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            GroupRole::Owner => "Group Owner",
            GroupRole::Dev => "Developer",
            GroupRole::Guest => "Guest",
        }
    }

    /// Parse a client-supplied role value. Anything that is not a known
    /// role falls back to `Dev`.
    pub fn from_param(s: &str) -> GroupRole {
        s.parse().unwrap_or(GroupRole::Dev)
    }

    /// Check if this role has at least the permissions of another role
    pub fn includes(&self, other: &GroupRole) -> bool {
        match self {
            GroupRole::Owner => true, // Owner includes all permissions
            GroupRole::Dev => matches!(other, GroupRole::Dev | GroupRole::Guest),
            GroupRole::Guest => matches!(other, GroupRole::Guest),
        }
    }
}

/// Group kind: ordinary shared group or the per-user personal namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupType {
    Normal,
    Private,
}

impl FromStr for GroupType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(GroupType::Normal),
            "private" => Ok(GroupType::Private),
            _ => Err(format!("invalid group type: {}", s)),
        }
    }
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Normal => "normal",
            GroupType::Private => "private",
        }
    }
}

/// Project visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(format!("invalid visibility: {}", s)),
        }
    }
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}
