//! Remote transport: run the interpreter over an established SSH session.

use std::io::Read;

use tracing::debug;

use crate::error::{classify_failure, ExecError};
use crate::{CommandOutput, CommandRunner, REMOTE_INTERPRETER, SAFETY_FLAGS};

/// Runs commands on a remote hypervisor host.
///
/// The session is owned by the caller: already authenticated, and closed
/// by its owner, never here. Each command acquires one fresh channel on the
/// session, scoped to just that command; the channel is released on every
/// exit path.
pub struct RemoteShell<'s> {
    session: &'s ssh2::Session,
}

impl<'s> RemoteShell<'s> {
    pub fn new(session: &'s ssh2::Session) -> RemoteShell<'s> {
        RemoteShell { session }
    }
}

/// Assemble the single remote command line: the same interpreter and safety
/// posture as the local transport, with the caller's arguments joined into
/// the script.
pub(crate) fn remote_command_line(args: &[&str]) -> String {
    format!(
        "{} {} -Command \"{}\"",
        REMOTE_INTERPRETER,
        SAFETY_FLAGS.join(" "),
        args.join(" ")
    )
}

fn exec_on_channel(
    channel: &mut ssh2::Channel,
    command: &str,
) -> Result<(String, String), ExecError> {
    channel
        .exec(command)
        .map_err(|err| ExecError::Transport(err.to_string()))?;

    let mut stdout = String::new();
    channel
        .read_to_string(&mut stdout)
        .map_err(|err| ExecError::Transport(err.to_string()))?;

    let mut stderr = String::new();
    channel
        .stderr()
        .read_to_string(&mut stderr)
        .map_err(|err| ExecError::Transport(err.to_string()))?;

    Ok((stdout, stderr))
}

impl CommandRunner for RemoteShell<'_> {
    fn run(&self, args: &[&str]) -> Result<CommandOutput, ExecError> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|err| ExecError::SessionUnavailable(err.to_string()))?;

        let command = remote_command_line(args);
        // Keep the command/stdout/stderr log order: scrapers rely on it.
        debug!("executing: {command}");

        let outcome = exec_on_channel(&mut channel, &command);
        let _ = channel.close();
        let _ = channel.wait_close();
        let (stdout, stderr) = outcome?;

        debug!("stdout: {stdout}");
        debug!("stderr: {stderr}");

        let code = channel
            .exit_status()
            .map_err(|err| ExecError::Transport(err.to_string()))?;
        if code == 0 {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(classify_failure(code, stdout, stderr))
        }
    }
}
