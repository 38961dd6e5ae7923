//! Type definitions for apidock storage.

mod groups;
mod ids;
mod interfaces;
mod projects;
mod roles;
mod users;

// Re-export all types from submodules
pub use groups::*;
pub use ids::*;
pub use interfaces::*;
pub use projects::*;
pub use roles::*;
pub use users::*;
