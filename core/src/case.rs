use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Files the toolkit writes under `constant/polyMesh`.
pub const POLYMESH_FILES: [&str; 5] = ["points", "faces", "owner", "neighbour", "boundary"];

/// The toolkit refuses to run without a controlDict, even for meshing.
/// Its content never depends on the request.
pub const CONTROL_DICT: &str = r#"/*--------------------------------*- C++ -*----------------------------------*\
FoamFile
{
    version     2.0;
    format      ascii;
    class       dictionary;
    object      controlDict;
}
// * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * * //

application     simpleFoam;
startFrom       startTime;
startTime       0;
stopAt          endTime;
endTime         1;
deltaT          1;
writeControl    timeStep;
writeInterval   1;
purgeWrite      0;
writeFormat     ascii;
writePrecision  6;
writeCompression off;
timeFormat      general;
timePrecision   6;
runTimeModifiable true;

// ************************************************************************* //
"#;

/// A per-request case directory, `<root>/<uuid>/{system,constant}`.
///
/// Call [`CaseDir::cleanup`] on the normal path. If the guard is dropped
/// instead (early error, cancelled request) the tree is removed in `Drop`.
#[derive(Debug)]
pub struct CaseDir {
    id: Uuid,
    root: PathBuf,
    removed: bool,
}

impl CaseDir {
    pub async fn create(cases_dir: &Path) -> CoreResult<Self> {
        let id = Uuid::new_v4();
        let root = cases_dir.join(id.to_string());
        // Guard first, so a half-built tree is still cleaned up.
        let case = Self {
            id,
            root,
            removed: false,
        };

        for dir in [case.system_dir(), case.constant_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| CoreError::io("create case directory", dir.clone(), e))?;
        }

        info!("Created case {}", case.id);
        Ok(case)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn system_dir(&self) -> PathBuf {
        self.root.join("system")
    }

    pub fn constant_dir(&self) -> PathBuf {
        self.root.join("constant")
    }

    pub fn polymesh_dir(&self) -> PathBuf {
        self.constant_dir().join("polyMesh")
    }

    pub async fn write_block_mesh_dict(&self, contents: &str) -> CoreResult<()> {
        self.write_system_file("blockMeshDict", contents).await
    }

    pub async fn write_control_dict(&self) -> CoreResult<()> {
        self.write_system_file("controlDict", CONTROL_DICT).await
    }

    async fn write_system_file(&self, name: &str, contents: &str) -> CoreResult<()> {
        let path = self.system_dir().join(name);
        fs::write(&path, contents)
            .await
            .map_err(|e| CoreError::io("write case file", path, e))
    }

    /// Reads whichever of [`POLYMESH_FILES`] exist. Absent files are skipped;
    /// any other read failure fails the whole group.
    pub async fn read_polymesh(&self) -> CoreResult<BTreeMap<String, String>> {
        let dir = self.polymesh_dir();
        let mut files = BTreeMap::new();

        for name in POLYMESH_FILES {
            let path = dir.join(name);
            match fs::read_to_string(&path).await {
                Ok(text) => {
                    files.insert(name.to_string(), text);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CoreError::io("read polyMesh file", path, e)),
            }
        }

        Ok(files)
    }

    /// Removes the case tree without blocking the runtime. Failures are
    /// logged only.
    pub async fn cleanup(mut self) {
        self.removed = true;
        log_removal(self.id, &self.root, fs::remove_dir_all(&self.root).await);
    }
}

fn log_removal(id: Uuid, root: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => info!("Removed case {}", id),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to cleanup case directory {}: {}", root.display(), e),
    }
}

impl Drop for CaseDir {
    fn drop(&mut self) {
        if !self.removed {
            log_removal(self.id, &self.root, std::fs::remove_dir_all(&self.root));
        }
    }
}
