use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::runtime::ToolCommand;

/// Runtime settings for the gateway, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    /// Root under which every request gets its own case directory.
    pub cases_dir: PathBuf,
    pub block_mesh: ToolCommand,
    pub check_mesh: ToolCommand,
    pub block_mesh_timeout: Duration,
    pub check_mesh_timeout: Duration,
    /// Toolkit version reported by the health endpoint.
    pub openfoam_version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 7860,
            cases_dir: PathBuf::from("/app/cases"),
            block_mesh: ToolCommand::new("blockMesh", "blockMesh"),
            check_mesh: ToolCommand::new("checkMesh", "checkMesh"),
            block_mesh_timeout: Duration::from_secs(30),
            check_mesh_timeout: Duration::from_secs(10),
            openfoam_version: "OpenFOAM-11".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_var(&lookup, "PORT")?.unwrap_or(defaults.port);
        let cases_dir = lookup("CASES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cases_dir);

        let block_mesh = match lookup("BLOCKMESH_CMD") {
            Some(line) => ToolCommand::parse("blockMesh", &line)
                .context("BLOCKMESH_CMD must name a program")?,
            None => defaults.block_mesh,
        };
        let check_mesh = match lookup("CHECKMESH_CMD") {
            Some(line) => ToolCommand::parse("checkMesh", &line)
                .context("CHECKMESH_CMD must name a program")?,
            None => defaults.check_mesh,
        };

        let block_mesh_timeout = parse_var::<u64, _>(&lookup, "BLOCKMESH_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.block_mesh_timeout);
        let check_mesh_timeout = parse_var::<u64, _>(&lookup, "CHECKMESH_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.check_mesh_timeout);

        if block_mesh_timeout.is_zero() || check_mesh_timeout.is_zero() {
            bail!("tool timeouts must be at least one second");
        }

        let openfoam_version = lookup("OPENFOAM_VERSION").unwrap_or(defaults.openfoam_version);

        let settings = Self {
            port,
            cases_dir,
            block_mesh,
            check_mesh,
            block_mesh_timeout,
            check_mesh_timeout,
            openfoam_version,
        };
        info!(
            "Settings loaded. Cases root: {}, blockMesh: {}, checkMesh: {}",
            settings.cases_dir.display(),
            settings.block_mesh.program,
            settings.check_mesh.program
        );
        Ok(settings)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: '{raw}'"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_toolkit_conventions() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.port, 7860);
        assert_eq!(settings.cases_dir, PathBuf::from("/app/cases"));
        assert_eq!(settings.block_mesh.program, "blockMesh");
        assert!(settings.block_mesh.args.is_empty());
        assert_eq!(settings.check_mesh.program, "checkMesh");
        assert_eq!(settings.block_mesh_timeout, Duration::from_secs(30));
        assert_eq!(settings.check_mesh_timeout, Duration::from_secs(10));
        assert_eq!(settings.openfoam_version, "OpenFOAM-11");
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("CASES_DIR", "/tmp/cases"),
            ("BLOCKMESH_CMD", "docker exec foam blockMesh"),
            ("BLOCKMESH_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.cases_dir, PathBuf::from("/tmp/cases"));
        assert_eq!(settings.block_mesh.name, "blockMesh");
        assert_eq!(settings.block_mesh.program, "docker");
        assert_eq!(settings.block_mesh.args, vec!["exec", "foam", "blockMesh"]);
        assert_eq!(settings.block_mesh_timeout, Duration::from_secs(5));
        assert_eq!(settings.check_mesh_timeout, Duration::from_secs(10));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = Settings::from_lookup(lookup_from(&[("PORT", "seventy")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(Settings::from_lookup(lookup_from(&[("CHECKMESH_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn blank_command_is_rejected() {
        assert!(Settings::from_lookup(lookup_from(&[("CHECKMESH_CMD", "   ")])).is_err());
    }
}
