//! How the command is walled off from the host
//!
//! This is the only privileged, Linux-specific part of a launch. Everything
//! before it, pulling and unpacking, works for any user.

use crate::errors::RuntimeError;
use std::{ffi::CString, fmt, io, os::unix::ffi::OsStrExt, path::Path};
use tokio::process::Command;

/// Strategy for confining a container's process
pub trait Confinement: fmt::Debug + Send + Sync {
    /// Arrange for `command` to run with `rootfs` as its root
    fn configure(&self, command: &mut Command, rootfs: &Path) -> Result<(), RuntimeError>;

    /// Called in the launcher immediately before the child is spawned
    fn before_spawn(&self) -> Result<(), RuntimeError>;
}

/// chroot into the sandbox and start the command in a new PID namespace
///
/// Needs `CAP_SYS_ADMIN` and `CAP_SYS_CHROOT`. The root change happens in the
/// forked child just before exec, so the launcher keeps its own view of the
/// host filesystem and can clean up afterwards. The PID namespace is unshared
/// in the launcher: the launcher stays where it is, and the next process it
/// spawns becomes PID 1 of the new namespace. The kernel allows this once per
/// process, so one launcher process runs one confined container.
#[derive(Debug, Default, Clone, Copy)]
pub struct Namespaces;

impl Confinement for Namespaces {
    fn configure(&self, command: &mut Command, rootfs: &Path) -> Result<(), RuntimeError> {
        let root = CString::new(rootfs.as_os_str().as_bytes())
            .map_err(|err| RuntimeError::Confinement(io::Error::new(io::ErrorKind::InvalidInput, err)))?;
        // Runs between fork and exec; only async-signal-safe calls here.
        unsafe {
            command.pre_exec(move || {
                if libc::chroot(root.as_ptr()) != 0 {
                    return Err(io::Error::last_os_error());
                }
                if libc::chdir(b"/\0".as_ptr() as *const libc::c_char) != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
        Ok(())
    }

    fn before_spawn(&self) -> Result<(), RuntimeError> {
        if unsafe { libc::unshare(libc::CLONE_NEWPID) } != 0 {
            return Err(RuntimeError::Confinement(io::Error::last_os_error()));
        }
        log::debug!("unshared pid namespace");
        Ok(())
    }
}

/// No isolation: the command runs on the host with the sandbox's root
/// filesystem as its working directory
///
/// Useful without privileges, and for exercising everything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfined;

impl Confinement for Unconfined {
    fn configure(&self, command: &mut Command, rootfs: &Path) -> Result<(), RuntimeError> {
        command.current_dir(rootfs);
        Ok(())
    }

    fn before_spawn(&self) -> Result<(), RuntimeError> {
        log::warn!("running without confinement");
        Ok(())
    }
}
