//! Route table.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{groups, interfaces, projects, transforms, users};
use crate::server::ApiServer;

pub fn router(server: ApiServer) -> Router {
    Router::new()
        .route("/api/user/reg", post(users::reg))
        .route("/api/user/login", post(users::login))
        .route("/api/user/logout", post(users::logout))
        .route("/api/user/status", get(users::status))
        .route("/api/group/get", get(groups::get))
        .route("/api/group/add", post(groups::add))
        .route("/api/group/addMember", post(groups::add_member))
        .route("/api/group/changeMemberRole", post(groups::change_member_role))
        .route("/api/group/delMember", post(groups::del_member))
        .route("/api/group/getMemberList", get(groups::get_member_list))
        .route("/api/group/list", get(groups::list))
        .route("/api/group/del", post(groups::del))
        .route("/api/group/up", post(groups::up))
        .route("/api/project/add", post(projects::add))
        .route("/api/project/get", get(projects::get))
        .route("/api/project/list", get(projects::list))
        .route("/api/project/up", post(projects::up))
        .route("/api/project/del", post(projects::del))
        .route("/api/interface/add", post(interfaces::add))
        .route("/api/interface/get", get(interfaces::get))
        .route("/api/interface/list", get(interfaces::list))
        .route("/api/interface/del", post(interfaces::del))
        .route("/api/interface/col_add", post(interfaces::col_add))
        .route("/api/interface/col_list", get(interfaces::col_list))
        .route("/api/interface/col_del", post(interfaces::col_del))
        .route("/api/interface/case_add", post(interfaces::case_add))
        .route("/api/interface/case_list", get(interfaces::case_list))
        .route("/api/interface/case_del", post(interfaces::case_del))
        .route("/api/transform/methods", get(transforms::methods))
        .route("/api/transform/apply", post(transforms::run))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}
