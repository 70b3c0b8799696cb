//! Privileged command execution for kubeyard.
//!
//! Hypervisor commands run either on this machine through the host's
//! PowerShell, or on a remote hypervisor host over an established SSH
//! session. Both transports share one contract: [`CommandRunner`], which
//! captures stdout and stderr independently and classifies well-known
//! failure modes into [`ExecError`] sentinels. Callers depend only on the
//! trait, so tests substitute fakes freely.

pub mod error;
mod host;
mod remote;

pub use error::ExecError;
pub use host::HostShell;
pub use remote::RemoteShell;

/// Interpreter binary looked up on the local PATH.
pub const LOCAL_INTERPRETER: &str = "powershell.exe";

/// Interpreter name used inside a remote command line.
pub const REMOTE_INTERPRETER: &str = "powershell";

/// Flags prepended to every interpreter invocation: never load a profile,
/// never prompt.
pub const SAFETY_FLAGS: &[&str] = &["-NoProfile", "-NonInteractive"];

/// Captured output of one command, regardless of transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The single capability both transports implement.
pub trait CommandRunner {
    /// Run one command to completion, blocking, and capture both output
    /// buffers. A non-zero exit is an error that still carries the
    /// captured buffers.
    fn run(&self, args: &[&str]) -> Result<CommandOutput, ExecError>;
}
