//! Value-transform catalogue and server-side execution.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use apidock_transforms::{apply, Method, METHODS};

use crate::envelope::{ApiError, Data};
use crate::server::{Actor, ApiServer};

pub async fn methods(
    State(_server): State<ApiServer>,
    _actor: Actor,
) -> Result<Data<&'static [Method]>, ApiError> {
    Ok(Data(&METHODS[..]))
}

#[derive(Deserialize)]
pub struct ApplyReq {
    pub method: String,
    #[serde(default)]
    pub params: Vec<String>,
    pub input: String,
}

#[derive(Serialize)]
pub struct ApplyResp {
    pub output: String,
}

pub async fn run(
    State(_server): State<ApiServer>,
    _actor: Actor,
    Json(req): Json<ApplyReq>,
) -> Result<Data<ApplyResp>, ApiError> {
    let output = apply(&req.method, &req.params, &req.input)
        .map_err(|e| ApiError::invalid_params(e.to_string()))?;
    Ok(Data(ApplyResp { output }))
}
