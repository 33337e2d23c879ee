use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::case::CaseDir;
use crate::config::Settings;
use crate::error::CoreResult;
use crate::polymesh::{self, ParsedMesh};
use crate::runtime::Runtime;

/// Everything one blockMesh run produced.
#[derive(Debug)]
pub struct MeshRun {
    /// blockMesh stdout followed by stderr.
    pub output: String,
    pub success: bool,
    /// checkMesh report, or why it could not be produced. `None` when
    /// blockMesh itself failed.
    pub check_mesh: Option<Result<String, String>>,
    /// Generated polyMesh files, or why they could not be read. `None` when
    /// blockMesh itself failed.
    pub polymesh: Option<Result<BTreeMap<String, String>, String>>,
}

impl MeshRun {
    pub fn parsed_mesh(&self) -> Option<ParsedMesh> {
        match &self.polymesh {
            Some(Ok(files)) => polymesh::parse(files),
            _ => None,
        }
    }
}

/// Drives one case through blockMesh and checkMesh.
#[derive(Debug, Clone)]
pub struct Mesher {
    settings: Settings,
    runtime: Runtime,
}

impl Mesher {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            runtime: Runtime::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs the full pipeline for one blockMeshDict.
    ///
    /// Only case preparation failures, a blockMesh launch failure or a
    /// blockMesh timeout are errors. checkMesh and polyMesh reading degrade to
    /// error strings inside the returned [`MeshRun`]. The case directory is
    /// gone by the time this returns, on every path: removed explicitly when
    /// the run completes, by the guard's `Drop` otherwise.
    pub async fn run(&self, block_mesh_dict: &str) -> CoreResult<MeshRun> {
        // 1. Materialize the case
        let case = CaseDir::create(&self.settings.cases_dir).await?;
        case.write_block_mesh_dict(block_mesh_dict).await?;
        case.write_control_dict().await?;

        // 2. Generate
        let generated = self
            .runtime
            .run_tool(
                &self.settings.block_mesh,
                case.path(),
                self.settings.block_mesh_timeout,
            )
            .await?;
        let output = generated.combined();
        let success = generated.success();

        if !success {
            warn!("blockMesh failed for case {} ({})", case.id(), generated.status);
            case.cleanup().await;
            return Ok(MeshRun {
                output,
                success,
                check_mesh: None,
                polymesh: None,
            });
        }

        // 3. Enrich: neither of these can fail the run
        let check_mesh = Some(self.check_mesh(&case).await);
        let polymesh = Some(case.read_polymesh().await.map_err(|e| {
            warn!("Reading polyMesh for case {} failed: {}", case.id(), e);
            e.to_string()
        }));

        info!("blockMesh succeeded for case {}", case.id());
        case.cleanup().await;
        Ok(MeshRun {
            output,
            success,
            check_mesh,
            polymesh,
        })
    }

    async fn check_mesh(&self, case: &CaseDir) -> Result<String, String> {
        self.runtime
            .run_tool(
                &self.settings.check_mesh,
                case.path(),
                self.settings.check_mesh_timeout,
            )
            .await
            .map(|report| report.stdout)
            .map_err(|e| {
                warn!("checkMesh failed for case {}: {}", case.id(), e);
                e.to_string()
            })
    }
}
