pub mod case;
pub mod config;
pub mod error;
pub mod mesher;
pub mod polymesh;
pub mod runtime;

pub use config::Settings;
pub use error::{CoreError, CoreResult};
pub use mesher::{MeshRun, Mesher};
