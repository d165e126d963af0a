//! Lazy mount of the LizardFS volume root.

use lizard_common::{PluginConfig, VolumeError, VolumeResult};

use crate::mounter::Mounter;

/// Tracks whether the LizardFS volume root is mounted at `volume_root`.
///
/// The root is mounted on the first request and stays mounted for the
/// lifetime of the process. A failed attempt leaves the gate closed so the
/// next request tries again.
#[derive(Debug, Default)]
pub struct RootMountGate {
    mounted: bool,
}

impl RootMountGate {
    /// Create a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the root has been mounted.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Mount the volume root unless that already happened.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::GateFailure`] wrapping the mount error.
    pub async fn ensure_mounted(
        &mut self,
        mounter: &dyn Mounter,
        config: &PluginConfig,
    ) -> VolumeResult<()> {
        if self.mounted {
            return Ok(());
        }

        tracing::info!(
            remote = %config.remote_path.display(),
            target = %config.volume_root.display(),
            "Mounting LizardFS remote path"
        );

        tokio::fs::create_dir_all(&config.volume_root)
            .await
            .map_err(|e| VolumeError::gate(e.into()))?;

        mounter
            .mount(&config.remote_path, &config.volume_root)
            .await
            .map_err(VolumeError::gate)?;

        self.mounted = true;
        tracing::info!(target = %config.volume_root.display(), "LizardFS root mounted");
        Ok(())
    }
}
