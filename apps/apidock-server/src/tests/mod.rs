mod common;

mod projects;
mod server;
