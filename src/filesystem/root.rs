use crate::errors::RuntimeError;
use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};

/// Directories every sandbox gets before the image is unpacked
const SKELETON: &[&str] = &["usr/local/bin"];

/// Private, disposable directory for one container launch
///
/// Contains `rootfs/`, which becomes `/` for the command, and `downloads/`,
/// where layer archives are staged outside the container's view. The whole
/// tree is removed by [SandboxRoot::remove()] or, failing that, on drop.
#[derive(Debug)]
pub struct SandboxRoot {
    path: PathBuf,
    rootfs: PathBuf,
    downloads: PathBuf,
    removed: bool,
}

impl SandboxRoot {
    /// Allocate a new sandbox in the system temp directory
    pub fn create() -> Result<Self, RuntimeError> {
        SandboxRoot::create_in(&env::temp_dir())
    }

    /// Allocate a new sandbox under `parent`, which must already exist
    ///
    /// The directory name is made from our process ID and a random number,
    /// and creation fails rather than reuse an existing directory.
    pub fn create_in(parent: &Path) -> Result<Self, RuntimeError> {
        let path = parent.join(format!(
            "burrow-{}-{:016x}",
            process::id(),
            rand::random::<u64>()
        ));
        fs::create_dir(&path).map_err(RuntimeError::setup(&path))?;
        let root = SandboxRoot {
            rootfs: path.join("rootfs"),
            downloads: path.join("downloads"),
            path,
            removed: false,
        };
        fs::create_dir(&root.rootfs).map_err(RuntimeError::setup(&root.rootfs))?;
        fs::create_dir(&root.downloads).map_err(RuntimeError::setup(&root.downloads))?;
        log::debug!("created sandbox at {:?}", root.path);
        Ok(root)
    }

    /// Top-level sandbox directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that becomes the command's `/`
    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    /// Staging area for layer archives
    pub fn downloads(&self) -> &Path {
        &self.downloads
    }

    /// Create the directories the command expects before any layer arrives
    pub fn create_skeleton(&self) -> Result<(), RuntimeError> {
        for dir in SKELETON {
            let path = self.rootfs.join(dir);
            fs::create_dir_all(&path).map_err(RuntimeError::setup(&path))?;
        }
        Ok(())
    }

    /// Copy a host executable into the sandbox's `/usr/local/bin`
    ///
    /// The copy keeps the file's permission bits. Returns the host path of the
    /// copy.
    pub fn install_helper(&self, helper: &Path) -> Result<PathBuf, RuntimeError> {
        let name = helper.file_name().ok_or_else(|| RuntimeError::SandboxSetup {
            path: helper.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "helper has no file name"),
        })?;
        let dest = self.rootfs.join("usr/local/bin").join(name);
        fs::copy(helper, &dest).map_err(RuntimeError::setup(helper))?;
        log::debug!("installed helper {:?} as {:?}", helper, dest);
        Ok(dest)
    }

    /// Delete the whole sandbox now, reporting any error
    ///
    /// Removal is attempted once; the drop handler will not retry.
    pub fn remove(mut self) -> Result<(), RuntimeError> {
        self.removed = true;
        log::debug!("removing sandbox at {:?}", self.path);
        fs::remove_dir_all(&self.path).map_err(RuntimeError::setup(&self.path))
    }
}

impl Drop for SandboxRoot {
    fn drop(&mut self) {
        if !self.removed {
            self.removed = true;
            log::debug!("removing sandbox at {:?} on drop", self.path);
            if let Err(err) = fs::remove_dir_all(&self.path) {
                log::warn!("failed to remove sandbox {:?}: {}", self.path, err);
            }
        }
    }
}
