//! Docker volume driver operations.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use lizard_common::{PluginConfig, VolumeError, VolumeResult};
use rustix::fs::Access;
use rustix::io::Errno;

use crate::gate::RootMountGate;
use crate::mounter::{Mounter, bounded};
use crate::registry::MountRegistry;

/// A volume as reported to Docker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Volume name.
    pub name: String,
    /// Host-visible mountpoint, present only while the volume is mounted.
    pub mountpoint: Option<PathBuf>,
}

/// Volume scope reported by the `Capabilities` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The volume is visible from every Docker host using the same cluster.
    Global,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
        }
    }
}

/// The volume lifecycle controller.
///
/// Owns the mount registry and the root mount gate. Every operation takes
/// `&mut self`; callers sharing a driver between tasks must serialize access
/// (see [`crate::SharedDriver`]) so that reference counting and the gate's
/// check-then-set never interleave.
pub struct VolumeDriver {
    pub(crate) config: PluginConfig,
    pub(crate) mounter: Arc<dyn Mounter>,
    pub(crate) registry: MountRegistry,
    pub(crate) gate: RootMountGate,
}

impl std::fmt::Debug for VolumeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeDriver")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl VolumeDriver {
    /// Create a driver with an empty registry and an unmounted root.
    pub fn new(config: PluginConfig, mounter: Arc<dyn Mounter>) -> Self {
        Self {
            config,
            mounter,
            registry: MountRegistry::new(),
            gate: RootMountGate::new(),
        }
    }

    /// The configuration this driver was built with.
    #[must_use]
    pub const fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// The mount reference registry.
    #[must_use]
    pub const fn registry(&self) -> &MountRegistry {
        &self.registry
    }

    /// Whether the LizardFS root has been mounted.
    #[must_use]
    pub const fn root_mounted(&self) -> bool {
        self.gate.is_mounted()
    }

    /// Mount the LizardFS root if it is not mounted yet.
    ///
    /// Every other operation calls this first.
    pub async fn ensure_root_mounted(&mut self) -> VolumeResult<()> {
        self.gate
            .ensure_mounted(self.mounter.as_ref(), &self.config)
            .await
    }

    fn reject_root(&self, name: &str, operation: &'static str) -> VolumeResult<()> {
        if self.config.is_root_volume(name) {
            return Err(VolumeError::ProtectedVolume {
                name: name.to_string(),
                operation,
            });
        }
        Ok(())
    }

    fn info(&self, name: &str) -> VolumeInfo {
        VolumeInfo {
            name: name.to_string(),
            mountpoint: self
                .registry
                .is_mounted(name)
                .then(|| self.config.host_mountpoint(name)),
        }
    }

    /// Create the directory backing `name`, optionally setting its
    /// replication goal.
    ///
    /// Creating an existing volume succeeds. A failed `setgoal` does not
    /// remove the directory.
    pub async fn create(
        &mut self,
        name: &str,
        replication_goal: Option<&str>,
    ) -> VolumeResult<()> {
        self.ensure_root_mounted().await?;

        tracing::info!(volume = name, "Create");

        if let Err(e) = self.reject_root(name, "created") {
            tracing::warn!(
                volume = name,
                "Tried to create a volume with the root volume's name"
            );
            return Err(e);
        }

        let path = self.config.backing_path(name);
        tokio::fs::create_dir_all(&path).await?;

        if let Some(goal) = replication_goal {
            self.mounter.set_replication_goal(&path, goal).await?;
        }

        Ok(())
    }

    /// Delete the directory backing `name` and everything in it.
    ///
    /// The registry is not consulted; removing a mounted volume is the
    /// caller's responsibility to avoid.
    pub async fn remove(&mut self, name: &str) -> VolumeResult<()> {
        self.ensure_root_mounted().await?;

        tracing::info!(volume = name, "Remove");
        self.reject_root(name, "removed")?;

        if self.registry.is_mounted(name) {
            tracing::warn!(
                volume = name,
                mount_ids = ?self.registry.mount_ids(name),
                "Removing a volume that is still mounted"
            );
        }

        match tokio::fs::remove_dir_all(self.config.backing_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Mount `name` on behalf of mount ID `id` and return the host
    /// mountpoint.
    ///
    /// Only the first reference runs `mfsmount`; later ones just attach.
    pub async fn mount(&mut self, name: &str, id: &str) -> VolumeResult<PathBuf> {
        self.ensure_root_mounted().await?;

        tracing::debug!(volume = name, mount_id = id, "Mount");

        let host_mountpoint = self.config.host_mountpoint(name);

        if self.registry.is_mounted(name) {
            let count = self.registry.attach(name, id);
            tracing::debug!(volume = name, references = count, "Volume already mounted");
            return Ok(host_mountpoint);
        }

        let target = self.config.container_mountpoint(name);
        tokio::fs::create_dir_all(&target).await?;

        let source = self.config.remote_source(name);
        self.mounter.mount(&source, &target).await?;

        self.registry.attach(name, id);
        tracing::info!(
            volume = name,
            source = %source.display(),
            mountpoint = %host_mountpoint.display(),
            "Volume mounted"
        );

        Ok(host_mountpoint)
    }

    /// Release mount ID `id`'s hold on `name`, unmounting it when no
    /// references remain.
    ///
    /// If the unmount fails the registry still treats the volume as
    /// unmounted; the mountpoint is remembered and retried at shutdown. A
    /// later mount of the same volume stacks on top of the stale one, so a
    /// later successful unmount does not clear the mark.
    pub async fn unmount(&mut self, name: &str, id: &str) -> VolumeResult<()> {
        self.ensure_root_mounted().await?;

        tracing::debug!(volume = name, mount_id = id, "Unmount");

        let remaining = self.registry.detach(name, id)?;
        if remaining > 0 {
            tracing::debug!(volume = name, references = remaining, "Volume still in use");
            return Ok(());
        }

        let target = self.config.container_mountpoint(name);
        match self.mounter.unmount(&target).await {
            Ok(()) => {
                tracing::info!(volume = name, "Volume unmounted");
                Ok(())
            }
            Err(e) => {
                self.registry.mark_unmount_failed(name);
                tracing::warn!(volume = name, error = %e, "Volume unmount failed");
                Err(e)
            }
        }
    }

    /// Host mountpoint of `name` if it is mounted.
    ///
    /// Unknown and unmounted volumes are not an error.
    pub async fn path(&mut self, name: &str) -> VolumeResult<Option<PathBuf>> {
        self.ensure_root_mounted().await?;

        tracing::debug!(volume = name, "Path");
        Ok(self.info(name).mountpoint)
    }

    /// Look up a single volume.
    ///
    /// The root volume always exists. Any other volume exists if its backing
    /// directory is readable and writable. The check runs on a blocking task
    /// under the connect timeout since it may hit an unresponsive FUSE mount.
    pub async fn get(&mut self, name: &str) -> VolumeResult<VolumeInfo> {
        self.ensure_root_mounted().await?;

        tracing::debug!(volume = name, "Get");

        if self.config.is_root_volume(name) {
            return Ok(self.info(name));
        }

        let path = self.config.backing_path(name);
        let check = tokio::task::spawn_blocking(move || {
            rustix::fs::access(path.as_path(), Access::READ_OK | Access::WRITE_OK)
        });

        let reason = match bounded(self.config.connect_timeout, check).await {
            Ok(Ok(Ok(()))) => {
                tracing::debug!(volume = name, "Found volume");
                return Ok(self.info(name));
            }
            Ok(Ok(Err(errno))) => {
                tracing::warn!(volume = name, error = %errno, "Cannot access volume");
                return Err(access_error(name, errno));
            }
            Ok(Err(join_err)) => join_err.to_string(),
            Err(elapsed) => elapsed,
        };

        tracing::warn!(volume = name, error = %reason, "Cannot access volume");
        Err(VolumeError::AccessDenied {
            name: name.to_string(),
            reason,
        })
    }

    /// List every volume: the root volume first, then each directory under
    /// the LizardFS volume root in name order.
    pub async fn list(&mut self) -> VolumeResult<Vec<VolumeInfo>> {
        self.ensure_root_mounted().await?;

        tracing::debug!("List");

        let mut volumes = Vec::new();
        if let Some(root) = &self.config.root_volume_name {
            volumes.push(self.info(root));
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.config.volume_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 volume name");
                continue;
            };
            if self.config.is_root_volume(&name) {
                tracing::warn!(
                    volume = %name,
                    "Found volume with the same name as the root volume, root volume takes precedence"
                );
                continue;
            }
            names.push(name);
        }
        names.sort();

        volumes.extend(names.iter().map(|name| self.info(name)));
        Ok(volumes)
    }

    /// Volume scope advertised to Docker.
    pub async fn capabilities(&mut self) -> VolumeResult<Scope> {
        self.ensure_root_mounted().await?;

        tracing::debug!("Capabilities");
        Ok(Scope::Global)
    }
}

fn access_error(name: &str, errno: Errno) -> VolumeError {
    if errno == Errno::NOENT || errno == Errno::NOTDIR {
        VolumeError::NotFound {
            name: name.to_string(),
        }
    } else {
        VolumeError::AccessDenied {
            name: name.to_string(),
            reason: std::io::Error::from(errno).to_string(),
        }
    }
}
