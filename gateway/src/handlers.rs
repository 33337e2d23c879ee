use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api::{BlockMeshRequest, BlockMeshResponse, HealthStatus, ServiceInfo};
use crate::error::ApiError;
use crate::AppState;

pub async fn home() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "OpenFOAM blockMesh API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: BTreeMap::from([
            ("/health", "GET - Health check"),
            ("/blockmesh", "POST - Run blockMesh with provided blockMeshDict"),
        ]),
        status: "operational",
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        openfoam: "ready",
        version: state.mesher.settings().openfoam_version.clone(),
    })
}

// The Mesh Handler
pub async fn run_block_mesh(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BlockMeshResponse>, ApiError> {
    // STEP 1: VALIDATE (nothing touches disk before this passes)
    let Json(body) = payload.map_err(|rejection| {
        warn!("Rejected blockmesh request body: {}", rejection);
        ApiError::BadRequest("No JSON data provided".to_string())
    })?;

    // `null`, `{}` and non-objects carry no data at all.
    if !body.as_object().is_some_and(|fields| !fields.is_empty()) {
        return Err(ApiError::BadRequest("No JSON data provided".to_string()));
    }
    let request: BlockMeshRequest = serde_json::from_value(body)
        .map_err(|_| ApiError::BadRequest("blockMeshDict is required".to_string()))?;

    let block_mesh_dict = match request.block_mesh_dict {
        Some(dict) if !dict.is_empty() => dict,
        _ => return Err(ApiError::BadRequest("blockMeshDict is required".to_string())),
    };

    // STEP 2: RUN (case setup, blockMesh, checkMesh, cleanup)
    info!("blockMesh requested ({} bytes of dict)", block_mesh_dict.len());
    let run = state.mesher.run(&block_mesh_dict).await.map_err(|e| {
        error!("blockMesh request failed: {}", e);
        ApiError::from(e)
    })?;

    // STEP 3: REPORT
    Ok(Json(BlockMeshResponse::from(run)))
}
