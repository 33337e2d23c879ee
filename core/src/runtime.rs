use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{CoreError, CoreResult};

/// How to launch one external toolkit executable.
///
/// `name` is what shows up in logs and error messages; `program` plus `args`
/// is the actual command line, so a tool can be wrapped (e.g. through
/// `docker exec`) without the rest of the crate noticing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Splits a whitespace separated command line. `None` if it is blank.
    pub fn parse(name: &str, line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(name, program).with_args(parts))
    }
}

/// Captured result of a tool that ran to completion.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// stdout followed by stderr, the way the toolkit log is reported back.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len());
        text.push_str(&self.stdout);
        text.push_str(&self.stderr);
        text
    }
}

/// Launches toolkit executables against a case directory.
#[derive(Debug, Clone, Default)]
pub struct Runtime;

impl Runtime {
    pub fn new() -> Self {
        Self
    }

    /// Runs `<tool> -case <case_dir>` and waits at most `timeout`.
    ///
    /// The child runs in its own process group, and the whole group is killed
    /// if the deadline passes (or if this future is dropped), so wrapper
    /// commands such as `sh -c ...` do not leave the real tool behind. A
    /// non-zero exit is not an error here; callers inspect
    /// [`ToolOutput::status`].
    pub async fn run_tool(
        &self,
        tool: &ToolCommand,
        case_dir: &Path,
        timeout: Duration,
    ) -> CoreResult<ToolOutput> {
        // A. Build the command line
        let mut cmd = Command::new(&tool.program);
        cmd.args(&tool.args)
            .arg("-case")
            .arg(case_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        // B. Launch
        let child = cmd.spawn().map_err(|source| CoreError::Spawn {
            tool: tool.name.clone(),
            source,
        })?;
        let mut group = GroupKill::new(child.id());
        info!("Running {} on case {}", tool.name, case_dir.display());

        // C. Wait under the deadline; dropping the wait future kills the child
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| CoreError::Spawn {
                tool: tool.name.clone(),
                source,
            })?,
            Err(_) => {
                warn!("{} exceeded {}s, killed", tool.name, timeout.as_secs());
                return Err(CoreError::Timeout {
                    tool: tool.name.clone(),
                    timeout,
                });
            }
        };

        group.disarm();
        info!("{} finished with {}", tool.name, output.status);
        Ok(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Kills a child's process group on drop unless the child finished normally.
struct GroupKill {
    pgid: Option<u32>,
}

impl GroupKill {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupKill {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid.take() {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            // ESRCH just means the group is already gone.
            if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                if e != nix::errno::Errno::ESRCH {
                    warn!("Failed to kill process group {}: {}", pgid, e);
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("fake", "sh").with_args(["-c", script, "fake"])
    }

    #[test]
    fn parse_splits_program_and_args() {
        let cmd = ToolCommand::parse("checkMesh", "  docker exec foam checkMesh ").unwrap();
        assert_eq!(cmd.name, "checkMesh");
        assert_eq!(cmd.program, "docker");
        assert_eq!(cmd.args, vec!["exec", "foam", "checkMesh"]);
        assert!(ToolCommand::parse("checkMesh", " \t ").is_none());
    }

    #[tokio::test]
    async fn captures_streams_separately_and_passes_case_flag() {
        let dir = tempfile::tempdir().unwrap();
        let tool = sh(r#"echo "out $1 $2"; echo "err" >&2"#);

        let output = Runtime::new()
            .run_tool(&tool, dir.path(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, format!("out -case {}\n", dir.path().display()));
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.combined(), format!("{}err\n", output.stdout));
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let output = Runtime::new()
            .run_tool(&sh("echo boom >&2; exit 3"), dir.path(), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.combined(), "boom\n");
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let started = Instant::now();

        let err = Runtime::new()
            .run_tool(&sh("exec sleep 10"), dir.path(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Timeout { ref tool, .. } if tool == "fake"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(target_os = "linux")]
    fn is_running(pid: &str) -> bool {
        // Zombies waiting to be reaped count as gone.
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => !stat.contains(") Z "),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timeout_kills_grandchildren_of_wrapper_commands() {
        let dir = tempfile::tempdir().unwrap();
        // The wrapper shell does not exec, so the sleep is a grandchild.
        let tool = sh(r#"sleep 30 & echo $! > "$2/pid"; wait"#);

        let err = Runtime::new()
            .run_tool(&tool, dir.path(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Timeout { .. }));

        let pid = std::fs::read_to_string(dir.path().join("pid")).unwrap();
        let pid = pid.trim();
        let mut gone = false;
        for _ in 0..30 {
            if !is_running(pid) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(gone, "sleep {pid} survived the timeout");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ToolCommand::new("blockMesh", "definitely-not-a-real-blockmesh-binary");

        let err = Runtime::new()
            .run_tool(&tool, dir.path(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Spawn { ref tool, .. } if tool == "blockMesh"));
        assert!(err.to_string().starts_with("failed to launch blockMesh"));
    }
}
