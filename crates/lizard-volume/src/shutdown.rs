//! Best-effort unmount of everything on termination.

use crate::driver::VolumeDriver;

/// Result of the shutdown unmount sequence.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Volumes unmounted successfully. A volume remounted over a stale
    /// mountpoint appears once per unmounted layer.
    pub unmounted: Vec<String>,
    /// Volumes whose unmount failed.
    pub failed: Vec<String>,
    /// Outcome of the root unmount; `None` if the root was never mounted.
    pub root_unmounted: Option<bool>,
}

impl ShutdownReport {
    /// Whether every attempted unmount succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.root_unmounted != Some(false)
    }
}

impl VolumeDriver {
    /// Unmount every mounted volume, then the LizardFS root.
    ///
    /// Mounted volumes go first, then every volume whose earlier unmount
    /// failed. A volume in both sets is unmounted twice, once per stacked
    /// mount. Failures are logged and never stop the sequence; each unmount
    /// is bounded by the mounter's own timeout.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        tracing::info!("Termination signal detected, shutting down");

        let mut report = ShutdownReport::default();

        for name in self.registry.list_mounted() {
            self.unmount_for_shutdown(name, &mut report).await;
        }

        let stale: Vec<String> = self.registry.unmount_failed().iter().cloned().collect();
        for name in stale {
            if self.unmount_for_shutdown(name.clone(), &mut report).await {
                self.registry.clear_unmount_failed(&name);
            }
        }

        if self.gate.is_mounted() {
            let root = &self.config.volume_root;
            tracing::debug!(target = %root.display(), "Unmounting volume root");

            let ok = match self.mounter.unmount(root).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        target = %root.display(),
                        error = %e,
                        "Couldn't unmount volume root"
                    );
                    false
                }
            };
            report.root_unmounted = Some(ok);
        }

        tracing::info!(
            unmounted = report.unmounted.len(),
            failed = report.failed.len(),
            "Shutdown unmount sequence finished"
        );
        report
    }

    async fn unmount_for_shutdown(&self, name: String, report: &mut ShutdownReport) -> bool {
        let target = self.config.container_mountpoint(&name);
        tracing::debug!(volume = %name, target = %target.display(), "Unmounting volume");

        match self.mounter.unmount(&target).await {
            Ok(()) => {
                report.unmounted.push(name);
                true
            }
            Err(e) => {
                tracing::warn!(volume = %name, error = %e, "Couldn't unmount volume");
                report.failed.push(name);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lizard_common::PluginConfig;
    use tempfile::TempDir;

    use crate::testing::{MounterCall, RecordingMounter};
    use crate::VolumeDriver;

    fn driver(temp: &TempDir) -> (VolumeDriver, RecordingMounter) {
        let mounter = RecordingMounter::new();
        let config = PluginConfig::default().with_local_base(temp.path());
        (VolumeDriver::new(config, Arc::new(mounter.clone())), mounter)
    }

    #[tokio::test]
    async fn nothing_to_do_before_first_request() {
        let temp = TempDir::new().unwrap();
        let (mut driver, mounter) = driver(&temp);

        let report = driver.shutdown().await;
        assert!(report.is_clean());
        assert_eq!(report.root_unmounted, None);
        assert!(mounter.calls().is_empty());
    }

    #[tokio::test]
    async fn unmounts_volumes_then_root() {
        let temp = TempDir::new().unwrap();
        let (mut driver, mounter) = driver(&temp);

        driver.mount("b", "c1").await.unwrap();
        driver.mount("a", "c2").await.unwrap();
        driver.mount("a", "c3").await.unwrap();
        driver.mount("idle", "c4").await.unwrap();
        driver.unmount("idle", "c4").await.unwrap();

        let report = driver.shutdown().await;
        assert_eq!(report.unmounted, ["a", "b"]);
        assert_eq!(report.root_unmounted, Some(true));

        let unmounts: Vec<_> = mounter
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MounterCall::Unmount { .. }))
            .skip(1)
            .collect();
        let config = driver.config();
        assert_eq!(
            unmounts,
            [
                MounterCall::Unmount {
                    target: config.container_mountpoint("a")
                },
                MounterCall::Unmount {
                    target: config.container_mountpoint("b")
                },
                MounterCall::Unmount {
                    target: config.volume_root.clone()
                },
            ]
        );
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_sequence() {
        let temp = TempDir::new().unwrap();
        let (mut driver, mounter) = driver(&temp);

        driver.mount("a", "c1").await.unwrap();
        driver.mount("b", "c2").await.unwrap();
        mounter.fail_unmount_at(driver.config().container_mountpoint("a"));
        mounter.fail_unmount_at(driver.config().volume_root.clone());

        let report = driver.shutdown().await;
        assert_eq!(report.failed, ["a"]);
        assert_eq!(report.unmounted, ["b"]);
        assert_eq!(report.root_unmounted, Some(false));
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn retries_volumes_whose_unmount_failed() {
        let temp = TempDir::new().unwrap();
        let (mut driver, mounter) = driver(&temp);
        let target = driver.config().container_mountpoint("a");

        driver.mount("a", "c1").await.unwrap();
        mounter.fail_unmount_at(target.clone());
        assert!(driver.unmount("a", "c1").await.is_err());
        mounter.heal();

        let report = driver.shutdown().await;
        assert_eq!(report.unmounted, ["a"]);
        assert_eq!(mounter.unmounts_at(&target), 2);
    }

    #[tokio::test]
    async fn remounted_volume_is_unmounted_once_per_layer() {
        let temp = TempDir::new().unwrap();
        let (mut driver, mounter) = driver(&temp);
        let target = driver.config().container_mountpoint("a");

        driver.mount("a", "c1").await.unwrap();
        mounter.fail_unmount_at(target.clone());
        assert!(driver.unmount("a", "c1").await.is_err());
        mounter.heal();

        driver.mount("a", "c2").await.unwrap();
        driver.unmount("a", "c2").await.unwrap();
        assert!(driver.registry().unmount_failed().contains("a"));

        driver.mount("a", "c3").await.unwrap();
        let report = driver.shutdown().await;
        assert_eq!(report.unmounted, ["a", "a"]);
        assert!(driver.registry().unmount_failed().is_empty());
        assert_eq!(mounter.unmounts_at(&target), 4);
    }
}
