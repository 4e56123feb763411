//! Running one command inside a freshly pulled image
//!
//! A launch goes through these steps, each owned by one type:
//!
//! - [ContainerBuilder] collects the command, helpers, and confinement.
//! - [ContainerBuilder::spawn()] allocates a [SandboxRoot], fills it with
//!   the skeleton, helpers, and image layers, then starts the confined child.
//! - [Container] is the running child, holding on to its sandbox.
//! - [Container::wait()] collects the [ExitStatus] and removes the sandbox.
//!
//! The sandbox is removed on every path out of this sequence, including
//! errors and early drops.

mod builder;
mod confine;

pub use builder::ContainerBuilder;
pub use confine::{Confinement, Namespaces, Unconfined};

use crate::{errors::RuntimeError, filesystem::SandboxRoot};
use std::fmt;
use tokio::process::Child;

/// A running container
///
/// Roughly analogous to [std::process::Child], but it owns the sandbox
/// directory too.
pub struct Container {
    child: Child,
    program: String,
    root: Option<SandboxRoot>,
}

/// Status of an exited container
///
/// Much like [std::process::ExitStatus]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ExitStatus {
    pub(crate) code: Option<i32>,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The exit code, or None if the process was killed by a signal
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Status for the launcher to exit with
    ///
    /// The command's own code, or 1 when there is none.
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(1)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        ExitStatus {
            code: status.code(),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

impl Container {
    /// Prepare to run `program` inside an image
    pub fn builder<S: AsRef<std::ffi::OsStr>>(program: S) -> ContainerBuilder {
        ContainerBuilder::new(program)
    }

    /// Process ID of the child, as the host sees it
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Sandbox directory the container runs in
    pub fn root(&self) -> Option<&SandboxRoot> {
        self.root.as_ref()
    }

    /// Wait for the container to finish running and remove its sandbox
    ///
    /// The sandbox is removed whether or not waiting succeeded. A failure to
    /// remove it is logged, not returned, so the command's status is never
    /// lost.
    pub async fn wait(mut self) -> Result<ExitStatus, RuntimeError> {
        log::trace!("wait starting for {}", self.program);
        let result = self.child.wait().await;
        log::debug!("{} exited, {:?}", self.program, result);
        if let Some(root) = self.root.take() {
            if let Err(err) = root.remove() {
                log::warn!("{}", err);
            }
        }
        Ok(result.map_err(RuntimeError::Wait)?.into())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("program", &self.program)
            .field("pid", &self.child.id())
            .field("root", &self.root.as_ref().map(SandboxRoot::path))
            .finish()
    }
}
