//! HTTP handlers, one module per controller.

pub mod groups;
pub mod interfaces;
pub mod projects;
pub mod transforms;
pub mod users;
