//! Local transport: spawn the host's PowerShell as a child process.

use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{classify_failure, ExecError};
use crate::{CommandOutput, CommandRunner, LOCAL_INTERPRETER, SAFETY_FLAGS};

/// The host's command interpreter, resolved once at startup and injected
/// into whatever needs to run local hypervisor commands.
///
/// A missing interpreter is held as absent state rather than an error at
/// construction, so resolution happens exactly once: every later
/// [`CommandRunner::run`] call fails fast with
/// [`ExecError::InterpreterNotFound`] without attempting a spawn.
#[derive(Debug, Clone)]
pub struct HostShell {
    interpreter: Option<PathBuf>,
}

impl HostShell {
    /// Look up the interpreter on PATH.
    pub fn resolve() -> HostShell {
        match which::which(LOCAL_INTERPRETER) {
            Ok(path) => {
                debug!(interpreter = %path.display(), "resolved host shell");
                HostShell {
                    interpreter: Some(path),
                }
            }
            Err(err) => {
                warn!(%err, "host shell not found");
                HostShell { interpreter: None }
            }
        }
    }

    /// Use a specific interpreter binary instead of resolving PATH.
    pub fn with_interpreter(path: impl Into<PathBuf>) -> HostShell {
        HostShell {
            interpreter: Some(path.into()),
        }
    }

    /// A shell whose interpreter was not found.
    pub fn unavailable() -> HostShell {
        HostShell { interpreter: None }
    }
}

impl CommandRunner for HostShell {
    fn run(&self, args: &[&str]) -> Result<CommandOutput, ExecError> {
        let interpreter = self
            .interpreter
            .as_ref()
            .ok_or(ExecError::InterpreterNotFound)?;

        let full_args: Vec<&str> = SAFETY_FLAGS
            .iter()
            .copied()
            .chain(args.iter().copied())
            .collect();
        // Keep the command/stdout/stderr log order: scrapers rely on it.
        debug!("executing: {} {}", interpreter.display(), full_args.join(" "));

        let output = Command::new(interpreter)
            .args(&full_args)
            .output()
            .map_err(|source| ExecError::Spawn {
                interpreter: interpreter.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!("stdout: {stdout}");
        debug!("stderr: {stderr}");

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(classify_failure(
                output.status.code().unwrap_or(-1),
                stdout,
                stderr,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    #[cfg(unix)]
    use tempfile::TempDir;

    #[test]
    fn unavailable_interpreter_fails_without_spawning() {
        let shell = HostShell::unavailable();
        assert!(matches!(
            shell.run(&["Hyper-V\\Get-VM"]),
            Err(ExecError::InterpreterNotFound)
        ));
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let shell = HostShell::with_interpreter("/nonexistent/fake-shell");
        assert!(matches!(
            shell.run(&["Hyper-V\\Get-VM"]),
            Err(ExecError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    fn fake_interpreter(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fake-shell");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn prepends_safety_flags_and_captures_stdout() {
        let dir = TempDir::new().unwrap();
        let shell = HostShell::with_interpreter(fake_interpreter(&dir, r#"echo "$@""#));

        let out = shell.run(&["Hyper-V\\Get-VM", "-Name", "dev-m02"]).unwrap();
        assert_eq!(
            out.stdout.trim(),
            r#"-NoProfile -NonInteractive Hyper-V\Get-VM -Name dev-m02"#
        );
        assert!(out.stderr.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_keeps_both_buffers() {
        let dir = TempDir::new().unwrap();
        let shell = HostShell::with_interpreter(fake_interpreter(
            &dir,
            "echo partial output\necho went wrong >&2\nexit 3",
        ));

        match shell.run(&["Hyper-V\\Start-VM"]) {
            Err(ExecError::ExecutionFailed {
                code,
                stdout,
                stderr,
            }) => {
                assert_eq!(code, 3);
                assert_eq!(stdout.trim(), "partial output");
                assert_eq!(stderr.trim(), "went wrong");
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn elevation_failure_is_classified() {
        let dir = TempDir::new().unwrap();
        let shell = HostShell::with_interpreter(fake_interpreter(
            &dir,
            "echo 'New-VM : Access is denied.' >&2\nexit 1",
        ));

        assert!(matches!(
            shell.run(&["Hyper-V\\New-VM"]),
            Err(ExecError::PrivilegeRequired)
        ));
    }
}
