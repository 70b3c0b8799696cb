//! Execution-layer errors and failure classification.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::LOCAL_INTERPRETER;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{shell} was not found in the path", shell = LOCAL_INTERPRETER)]
    InterpreterNotFound,

    #[error("failed to spawn {p}: {source}", p = .interpreter.display())]
    Spawn {
        interpreter: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("hypervisor commands have to be run as an Administrator")]
    PrivilegeRequired,

    #[error("the Hyper-V PowerShell module is not available")]
    FeatureModuleMissing,

    #[error("could not open a command stream on the session: {0}")]
    SessionUnavailable(String),

    #[error("remote transport error: {0}")]
    Transport(String),

    #[error("command exited with status {code}")]
    ExecutionFailed {
        code: i32,
        stdout: String,
        stderr: String,
    },
}

const PRIVILEGE_MARKERS: &[&str] = &[
    "Access is denied",
    "as an Administrator",
    "requires elevation",
];

// A Hyper-V cmdlet that is "not recognized" means the optional module is
// not installed on the host.
const MODULE_MARKERS: &[&str] = &[
    "Hyper-V PowerShell Module is not available",
    "is not recognized as the name of a cmdlet",
];

/// Classify a non-zero exit into a sentinel the provisioning layer can turn
/// into actionable guidance, or a generic failure carrying both buffers.
pub(crate) fn classify_failure(code: i32, stdout: String, stderr: String) -> ExecError {
    let matches = |markers: &[&str]| {
        markers
            .iter()
            .any(|marker| stderr.contains(marker) || stdout.contains(marker))
    };

    if matches(PRIVILEGE_MARKERS) {
        return ExecError::PrivilegeRequired;
    }
    if matches(MODULE_MARKERS) {
        return ExecError::FeatureModuleMissing;
    }
    ExecError::ExecutionFailed {
        code,
        stdout,
        stderr,
    }
}
