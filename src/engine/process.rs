//! Subprocess plumbing shared by the command-line engines
//!
//! Arguments are passed directly to the child process (no shell is
//! involved), stdout is drained fully, and an optional per-engine timeout
//! bounds the wait. Without a timeout a hung child hangs the request.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::core::error::{Result, TtsError};

/// Locate the first of `candidates` on PATH
pub fn find_program(candidates: &[&str]) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;

    for candidate in candidates {
        for dir in std::env::split_paths(&path_var) {
            let full = dir.join(candidate);
            if is_executable(&full) {
                return Some((*candidate).to_string());
            }
        }
    }

    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Spawn a process, optionally feed stdin, and collect all of stdout
///
/// The exit code is ignored when stdout is non-empty; command-line
/// synthesizers routinely exit non-zero after producing usable audio.
pub async fn run_capture(
    engine: &str,
    program: &str,
    args: &[&str],
    stdin: Option<&[u8]>,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    debug!("{engine}: {program} {args:?}");

    let run = async {
        let mut command = Command::new(program);
        command.args(args).stdout(Stdio::piped()).stderr(Stdio::null());
        if stdin.is_some() {
            command.stdin(Stdio::piped());
        }

        let mut child = command
            .spawn()
            .map_err(|e| TtsError::synthesis(engine, format!("failed to spawn {program}: {e}")))?;

        if let Some(input) = stdin {
            let mut child_stdin = child.stdin.take().ok_or_else(|| {
                TtsError::synthesis(engine, format!("{program} has no stdin handle"))
            })?;
            child_stdin.write_all(input).await.map_err(|e| {
                TtsError::synthesis(engine, format!("failed writing to {program}: {e}"))
            })?;
            drop(child_stdin);
        }

        let output = child.wait_with_output().await.map_err(|e| {
            TtsError::synthesis(engine, format!("failed reading from {program}: {e}"))
        })?;

        Ok(output.stdout)
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
            TtsError::synthesis(engine, format!("{program} timed out after {limit:?}"))
        })?,
        None => run.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_program_misses_nonsense() {
        assert!(find_program(&["definitely-not-a-real-binary-6789"]).is_none());
    }

    #[tokio::test]
    async fn test_run_capture_collects_stdout() {
        let out = run_capture("test", "echo", &["hello"], None, None)
            .await
            .unwrap();
        assert_eq!(out, b"hello\n");
    }

    #[tokio::test]
    async fn test_run_capture_feeds_stdin() {
        let out = run_capture("test", "cat", &[], Some(b"piped"), None)
            .await
            .unwrap();
        assert_eq!(out, b"piped");
    }

    #[tokio::test]
    async fn test_run_capture_spawn_failure() {
        let result =
            run_capture("test", "definitely-not-a-real-binary-6789", &[], None, None).await;
        assert!(matches!(result, Err(TtsError::Synthesis { .. })));
    }
}
