//! Integration tests for the volume lifecycle.

use std::path::PathBuf;
use std::sync::Arc;

use lizard_common::{PluginConfig, VolumeError};
use lizard_volume::testing::{MounterCall, RecordingMounter};
use lizard_volume::VolumeDriver;
use tempfile::TempDir;

fn setup(root_volume: &str) -> (TempDir, VolumeDriver, RecordingMounter) {
    let temp = TempDir::new().unwrap();
    let config = PluginConfig::default()
        .with_local_base(temp.path())
        .with_host_volume_path("/var/lib/docker/plugins/abc/propagated-mount")
        .with_root_volume(root_volume);
    let mounter = RecordingMounter::new();
    let driver = VolumeDriver::new(config, Arc::new(mounter.clone()));
    (temp, driver, mounter)
}

#[test_log::test(tokio::test)]
async fn create_then_get_reports_unmounted_volume() {
    let (_temp, mut driver, _mounter) = setup("shared");

    driver.create("data1", None).await.unwrap();
    let info = driver.get("data1").await.unwrap();

    assert_eq!(info.name, "data1");
    assert_eq!(info.mountpoint, None);
}

#[test_log::test(tokio::test)]
async fn root_volume_cannot_be_created_or_removed() {
    let (_temp, mut driver, mounter) = setup("shared");

    let err = driver.create("shared", Some("2")).await.unwrap_err();
    assert!(matches!(err, VolumeError::ProtectedVolume { .. }));
    let err = driver.remove("shared").await.unwrap_err();
    assert!(matches!(err, VolumeError::ProtectedVolume { .. }));

    assert!(!driver.config().backing_path("shared").exists());
    // Only the root mount happened.
    assert_eq!(mounter.calls().len(), 1);
}

#[test_log::test(tokio::test)]
async fn shared_mount_is_reference_counted() {
    let (_temp, mut driver, mounter) = setup("shared");
    let target = driver.config().container_mountpoint("v");

    let first = driver.mount("v", "c1").await.unwrap();
    let second = driver.mount("v", "c2").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(mounter.mounts_at(&target), 1);

    driver.unmount("v", "c1").await.unwrap();
    assert_eq!(mounter.unmounts_at(&target), 0);
    assert_eq!(driver.path("v").await.unwrap(), Some(first));

    driver.unmount("v", "c2").await.unwrap();
    assert_eq!(mounter.unmounts_at(&target), 1);
    assert_eq!(driver.path("v").await.unwrap(), None);
}

#[test_log::test(tokio::test)]
async fn path_of_unmounted_volume_is_empty() {
    let (_temp, mut driver, _mounter) = setup("shared");

    assert_eq!(driver.path("v").await.unwrap(), None);
    assert_eq!(driver.path("never-created").await.unwrap(), None);
}

#[test_log::test(tokio::test)]
async fn unmount_with_unknown_id_fails() {
    let (_temp, mut driver, mounter) = setup("shared");

    driver.mount("v", "c1").await.unwrap();

    let err = driver.unmount("v", "c9").await.unwrap_err();
    assert!(matches!(err, VolumeError::UnknownMount { .. }));
    assert_eq!(driver.registry().mount_ids("v"), ["c1"]);

    let err = driver.unmount("other", "c1").await.unwrap_err();
    assert!(matches!(err, VolumeError::UnknownMount { .. }));

    let target = driver.config().container_mountpoint("v");
    assert_eq!(mounter.unmounts_at(&target), 0);
}

#[test_log::test(tokio::test)]
async fn list_prefers_root_volume_over_same_named_directory() {
    let (_temp, mut driver, _mounter) = setup("shared");

    driver.ensure_root_mounted().await.unwrap();
    std::fs::create_dir_all(driver.config().backing_path("shared")).unwrap();
    driver.create("data1", None).await.unwrap();

    let names: Vec<_> = driver
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(names, ["shared", "data1"]);
}

#[test_log::test(tokio::test)]
async fn list_reports_mountpoints_of_mounted_volumes() {
    let (_temp, mut driver, _mounter) = setup("");

    driver.create("a", None).await.unwrap();
    driver.create("b", None).await.unwrap();
    driver.mount("b", "c1").await.unwrap();

    let volumes = driver.list().await.unwrap();
    assert_eq!(volumes.len(), 2);
    assert_eq!(volumes[0].mountpoint, None);
    assert_eq!(
        volumes[1].mountpoint,
        Some(driver.config().host_mountpoint("b"))
    );
}

#[test_log::test(tokio::test)]
async fn root_is_mounted_at_most_once() {
    let (_temp, mut driver, mounter) = setup("shared");
    let root = driver.config().volume_root.clone();

    driver.create("a", None).await.unwrap();
    driver.get("a").await.unwrap();
    driver.list().await.unwrap();
    driver.mount("a", "c1").await.unwrap();
    driver.unmount("a", "c1").await.unwrap();
    driver.capabilities().await.unwrap();
    driver.remove("a").await.unwrap();

    assert_eq!(mounter.mounts_at(&root), 1);
}

#[test_log::test(tokio::test)]
async fn mount_and_unmount_end_to_end() {
    let (_temp, mut driver, mounter) = setup("shared");

    let mountpoint = driver.mount("data1", "c1").await.unwrap();
    assert_eq!(
        mountpoint,
        PathBuf::from("/var/lib/docker/plugins/abc/propagated-mount/data1")
    );

    let config = driver.config().clone();
    assert_eq!(
        mounter.calls(),
        [
            MounterCall::Mount {
                source: PathBuf::from("/docker/volumes"),
                target: config.volume_root.clone(),
            },
            MounterCall::Mount {
                source: PathBuf::from("/docker/volumes/data1"),
                target: config.container_mountpoint("data1"),
            },
        ]
    );

    driver.unmount("data1", "c1").await.unwrap();
    assert_eq!(
        mounter.calls().last(),
        Some(&MounterCall::Unmount {
            target: config.container_mountpoint("data1"),
        })
    );
    assert_eq!(mounter.calls().len(), 3);
}

#[test_log::test(tokio::test)]
async fn mounts_and_unmounts_alternate_per_volume() {
    let (_temp, mut driver, mounter) = setup("shared");
    let target = driver.config().container_mountpoint("v");

    for round in 0..3 {
        driver.mount("v", "c1").await.unwrap();
        driver.mount("v", "c2").await.unwrap();
        driver.unmount("v", "c2").await.unwrap();
        driver.unmount("v", "c1").await.unwrap();
        assert_eq!(mounter.mounts_at(&target), round + 1);
        assert_eq!(mounter.unmounts_at(&target), round + 1);
    }

    let sequence: Vec<_> = mounter
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            MounterCall::Mount { target: t, .. } if t == target => Some("mount"),
            MounterCall::Unmount { target: t } if t == target => Some("unmount"),
            _ => None,
        })
        .collect();
    assert_eq!(
        sequence,
        ["mount", "unmount", "mount", "unmount", "mount", "unmount"]
    );
}
