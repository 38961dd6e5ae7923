//! Strongly-typed identifiers (avoid mixing strings/UUIDs arbitrarily).

use uuid::Uuid;

/// User identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

/// Login session identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

/// Group identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub Uuid);

/// Project identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectId(pub Uuid);

/// Interface identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub Uuid);

/// Interface test-case identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceCaseId(pub Uuid);

/// Interface collection identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceColId(pub Uuid);
