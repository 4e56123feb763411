use crate::{
    container::{Confinement, Container, ExitStatus, Namespaces},
    errors::RuntimeError,
    filesystem::SandboxRoot,
    image::ImageReference,
    registry::Client,
};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::process::Command;

/// Setup for containers, starting at [Container::builder()] and ending with
/// [ContainerBuilder::spawn()]
#[derive(Debug)]
pub struct ContainerBuilder {
    program: OsString,
    args: Vec<OsString>,
    helpers: Vec<PathBuf>,
    temp_dir: Option<PathBuf>,
    confinement: Box<dyn Confinement>,
}

impl ContainerBuilder {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        ContainerBuilder {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            helpers: Vec::new(),
            temp_dir: None,
            confinement: Box::new(Namespaces),
        }
    }

    /// Append one argument to the container's command line
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Append arguments to the container's command line
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Copy a host executable into the container's `/usr/local/bin`
    ///
    /// Helpers are installed before any image layer, so a layer that ships
    /// a file at the same path replaces the helper.
    pub fn helper<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.helpers.push(path.as_ref().to_owned());
        self
    }

    /// Create the sandbox under this directory instead of the system default
    pub fn temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Choose how the command is isolated, [Namespaces] by default
    pub fn confinement<C: Confinement + 'static>(mut self, confinement: C) -> Self {
        self.confinement = Box::new(confinement);
        self
    }

    /// Pull `image` into a new sandbox and start the command inside it
    ///
    /// The client authenticates for the image's repository first. If anything
    /// fails before the command starts, the sandbox is removed before the
    /// error is returned.
    pub async fn spawn(
        self,
        client: &mut Client,
        image: &ImageReference,
    ) -> Result<Container, RuntimeError> {
        let root = match &self.temp_dir {
            Some(dir) => SandboxRoot::create_in(dir)?,
            None => SandboxRoot::create()?,
        };
        root.create_skeleton()?;
        for helper in &self.helpers {
            root.install_helper(helper)?;
        }

        client.authenticate(image.repository()).await?;
        client.pull_image(image, &root).await?;

        let program = self.program.to_string_lossy().into_owned();
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        self.confinement.configure(&mut command, root.rootfs())?;

        // Nothing may run between these two: the namespace applies to the
        // next child this process forks.
        self.confinement.before_spawn()?;
        let child = command.spawn().map_err(|source| RuntimeError::Spawn {
            program: program.clone(),
            source,
        })?;
        log::info!("{} started as pid {:?}", program, child.id());

        Ok(Container {
            child,
            program,
            root: Some(root),
        })
    }

    /// Spawn the container and wait for it to exit
    pub async fn run(
        self,
        client: &mut Client,
        image: &ImageReference,
    ) -> Result<ExitStatus, RuntimeError> {
        self.spawn(client, image).await?.wait().await
    }
}
