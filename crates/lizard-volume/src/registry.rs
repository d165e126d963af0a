//! Mount reference tracking.
//!
//! Docker calls `Mount` once per container using a volume and `Unmount` once
//! when that container stops. The registry records which mount IDs currently
//! hold each volume; a volume is mounted iff its list is non-empty.

use std::collections::{BTreeSet, HashMap};

use lizard_common::{VolumeError, VolumeResult};

/// In-memory map of volume name to the mount IDs holding it.
#[derive(Debug, Default)]
pub struct MountRegistry {
    /// Mount IDs per volume, in attach order. Entries are never removed,
    /// only emptied.
    mounts: HashMap<String, Vec<String>>,
    /// Volumes whose reference count reached zero but whose external
    /// unmount failed.
    unmount_failed: BTreeSet<String>,
}

impl MountRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one mount ID holds `name`.
    #[must_use]
    pub fn is_mounted(&self, name: &str) -> bool {
        self.mounts.get(name).is_some_and(|ids| !ids.is_empty())
    }

    /// Record that `id` holds `name`, returning the new reference count.
    ///
    /// Attaching an ID that already holds the volume does not add a second
    /// reference.
    pub fn attach(&mut self, name: &str, id: &str) -> usize {
        let ids = self.mounts.entry(name.to_string()).or_default();
        if ids.iter().any(|existing| existing == id) {
            tracing::warn!(volume = name, mount_id = id, "Mount ID already attached");
        } else {
            ids.push(id.to_string());
        }
        ids.len()
    }

    /// Remove `id` from `name`, returning the remaining reference count.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::UnknownMount`] if `id` does not hold `name`.
    /// The registry is left unchanged in that case.
    pub fn detach(&mut self, name: &str, id: &str) -> VolumeResult<usize> {
        let unknown = || VolumeError::UnknownMount {
            name: name.to_string(),
            id: id.to_string(),
        };

        let ids = self.mounts.get_mut(name).ok_or_else(unknown)?;
        let position = ids
            .iter()
            .position(|existing| existing == id)
            .ok_or_else(unknown)?;
        ids.remove(position);

        Ok(ids.len())
    }

    /// Mount IDs currently holding `name`.
    #[must_use]
    pub fn mount_ids(&self, name: &str) -> &[String] {
        self.mounts.get(name).map_or(&[], Vec::as_slice)
    }

    /// Names of all mounted volumes, sorted.
    #[must_use]
    pub fn list_mounted(&self) -> BTreeSet<String> {
        self.mounts
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Remember that the last unmount of `name` failed.
    pub fn mark_unmount_failed(&mut self, name: &str) {
        self.unmount_failed.insert(name.to_string());
    }

    /// Forget a previous unmount failure of `name`.
    pub fn clear_unmount_failed(&mut self, name: &str) {
        self.unmount_failed.remove(name);
    }

    /// Volumes whose last unmount failed.
    #[must_use]
    pub const fn unmount_failed(&self) -> &BTreeSet<String> {
        &self.unmount_failed
    }
}
