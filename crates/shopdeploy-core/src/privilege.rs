//! Root detection and sudo escalation.
//!
//! The installer writes under `/opt` and `/etc/systemd/system` and drives
//! `apt-get` and `systemctl`, so it re-executes itself through `sudo`
//! when started by an unprivileged user.

use std::ffi::OsString;
use std::path::Path;

use crate::error::{InstallError, Result};

/// Hidden flag appended to the re-executed command line.
pub const ESCALATED_FLAG: &str = "--escalated";

/// Interpret the output of `id -u`.
pub fn is_privileged(uid_output: &str) -> Result<bool> {
    let uid: u32 = uid_output.trim().parse().map_err(|_| {
        InstallError::Privilege(format!("unexpected `id -u` output: {:?}", uid_output.trim()))
    })?;
    Ok(uid == 0)
}

/// Command line used to re-run the installer under sudo.
pub fn escalation_command(exe: &Path, args: &[OsString]) -> Vec<OsString> {
    let mut command = Vec::with_capacity(args.len() + 3);
    command.push(OsString::from("sudo"));
    command.push(exe.as_os_str().to_os_string());
    command.extend(args.iter().cloned());
    if !args.iter().any(|a| a == ESCALATED_FLAG) {
        command.push(OsString::from(ESCALATED_FLAG));
    }
    command
}

/// Replace the current process with `sudo <exe> <args> --escalated`.
///
/// Only returns if the exec itself failed.
#[cfg(unix)]
pub fn reexec_with_sudo(exe: &Path, args: &[OsString]) -> InstallError {
    use std::os::unix::process::CommandExt;
    use std::process::Command;

    let command = escalation_command(exe, args);
    let err = Command::new(&command[0]).args(&command[1..]).exec();
    InstallError::Privilege(format!("failed to re-run under sudo: {err}"))
}

#[cfg(not(unix))]
pub fn reexec_with_sudo(_exe: &Path, _args: &[OsString]) -> InstallError {
    InstallError::Privilege("sudo escalation is only supported on Unix".to_string())
}

/// The user the checkout is handed to after install.
///
/// `SUDO_USER` names the operator who invoked sudo; a direct root login
/// keeps the files owned by root.
pub fn resolve_owner(sudo_user: Option<&str>, user: Option<&str>) -> String {
    let pick = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "root")
            .map(str::to_string)
    };
    pick(sudo_user)
        .or_else(|| pick(user))
        .unwrap_or_else(|| "root".to_string())
}
