//! Centralized permission evaluation.
//!
//! Every handler routes its authorization decision through [`evaluate`]
//! instead of testing roles inline, so the whole permission matrix lives in
//! one place.

use apidock_storage::{GroupRole, SiteRole};

use crate::server::Actor;

/// Authority tier a handler requires for an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    /// Read access to group-scoped data.
    View,
    /// Create or modify resources inside a group.
    Edit,
    /// Destructive or membership-affecting operations.
    Danger,
    /// Site-wide administrative operations.
    SiteAdmin,
}

/// Decide whether `actor`, holding `membership` in the target group, may
/// perform an operation requiring `required` authority.
///
/// Site admins pass every check unconditionally.
pub fn evaluate(actor: &Actor, membership: Option<GroupRole>, required: Authority) -> bool {
    if actor.site_role == SiteRole::Admin {
        return true;
    }
    match required {
        Authority::SiteAdmin => false,
        Authority::Danger => membership == Some(GroupRole::Owner),
        Authority::Edit => matches!(membership, Some(GroupRole::Owner) | Some(GroupRole::Dev)),
        Authority::View => membership.is_some(),
    }
}
