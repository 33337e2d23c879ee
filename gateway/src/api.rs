use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use blockmesh_core::polymesh::ParsedMesh;
use blockmesh_core::MeshRun;

// Input: What the user sends us
#[derive(Debug, Deserialize)]
pub struct BlockMeshRequest {
    #[serde(rename = "blockMeshDict", default)]
    pub block_mesh_dict: Option<String>,
}

// Output: What we send back
#[derive(Debug, Serialize)]
pub struct BlockMeshResponse {
    pub output: String,
    pub success: bool,
    pub mesh_info: MeshInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polymesh: Option<PolyMesh>,
    #[serde(rename = "parsedMesh", skip_serializing_if = "Option::is_none")]
    pub parsed_mesh: Option<ParsedMesh>,
}

/// checkMesh outcome. Serializes to `{}` when blockMesh failed.
#[derive(Debug, Default, Serialize)]
pub struct MeshInfo {
    #[serde(rename = "checkMesh", skip_serializing_if = "Option::is_none")]
    pub check_mesh: Option<String>,
    #[serde(rename = "checkMesh_error", skip_serializing_if = "Option::is_none")]
    pub check_mesh_error: Option<String>,
}

/// Either the generated files by name, or one string saying why they could
/// not be read.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PolyMesh {
    Files(BTreeMap<String, String>),
    Error(String),
}

impl From<MeshRun> for BlockMeshResponse {
    fn from(run: MeshRun) -> Self {
        let parsed_mesh = run.parsed_mesh();

        let mesh_info = match run.check_mesh {
            Some(Ok(report)) => MeshInfo {
                check_mesh: Some(report),
                check_mesh_error: None,
            },
            Some(Err(error)) => MeshInfo {
                check_mesh: None,
                check_mesh_error: Some(error),
            },
            None => MeshInfo::default(),
        };

        let polymesh = run.polymesh.map(|files| match files {
            Ok(files) => PolyMesh::Files(files),
            Err(error) => PolyMesh::Error(error),
        });

        Self {
            output: run.output,
            success: run.success,
            mesh_info,
            polymesh,
            parsed_mesh,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub openfoam: &'static str,
    pub version: String,
}
