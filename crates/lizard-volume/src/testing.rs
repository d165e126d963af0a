//! Test doubles for the [`Mounter`] seam.
//!
//! [`RecordingMounter`] performs no system calls. It records every
//! invocation and can be told to fail specific operations, which is enough
//! to drive the whole lifecycle in unit and integration tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lizard_common::{VolumeError, VolumeResult};

use crate::mounter::Mounter;

/// A recorded external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MounterCall {
    /// `mfsmount` of `source` at `target`.
    Mount {
        /// Remote path.
        source: PathBuf,
        /// Local mountpoint.
        target: PathBuf,
    },
    /// Unmount of `target`.
    Unmount {
        /// Local mountpoint.
        target: PathBuf,
    },
    /// `lizardfs setgoal -r`.
    SetGoal {
        /// Volume directory.
        path: PathBuf,
        /// Replication goal.
        goal: String,
    },
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<MounterCall>,
    failing_mounts: HashSet<PathBuf>,
    failing_unmounts: HashSet<PathBuf>,
    fail_set_goal: bool,
    delay: Option<Duration>,
}

/// [`Mounter`] that records calls instead of running them.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingMounter {
    state: Arc<Mutex<State>>,
}

impl RecordingMounter {
    /// Create a mounter where every operation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Make mounts at `target` fail until [`Self::heal`] is called.
    pub fn fail_mount_at(&self, target: impl Into<PathBuf>) {
        let target = target.into();
        self.with_state(|s| s.failing_mounts.insert(target));
    }

    /// Make unmounts of `target` fail until [`Self::heal`] is called.
    pub fn fail_unmount_at(&self, target: impl Into<PathBuf>) {
        let target = target.into();
        self.with_state(|s| s.failing_unmounts.insert(target));
    }

    /// Make every mount and unmount take `delay` before it is recorded, so
    /// tests can overlap requests with an operation still in flight.
    pub fn set_delay(&self, delay: Duration) {
        self.with_state(|s| s.delay = Some(delay));
    }

    async fn pause(&self) {
        if let Some(delay) = self.with_state(|s| s.delay) {
            tokio::time::sleep(delay).await;
        }
    }

    /// Make every `setgoal` fail.
    pub fn fail_set_goal(&self) {
        self.with_state(|s| s.fail_set_goal = true);
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        self.with_state(|s| {
            s.failing_mounts.clear();
            s.failing_unmounts.clear();
            s.fail_set_goal = false;
        });
    }

    /// Every recorded call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MounterCall> {
        self.with_state(|s| s.calls.clone())
    }

    /// Number of mount calls targeting `target`.
    #[must_use]
    pub fn mounts_at(&self, target: &Path) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, MounterCall::Mount { target: t, .. } if t == target))
                .count()
        })
    }

    /// Number of unmount calls targeting `target`.
    #[must_use]
    pub fn unmounts_at(&self, target: &Path) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, MounterCall::Unmount { target: t } if t == target))
                .count()
        })
    }
}

#[async_trait]
impl Mounter for RecordingMounter {
    async fn mount(&self, source: &Path, target: &Path) -> VolumeResult<()> {
        self.pause().await;
        self.with_state(|s| {
            s.calls.push(MounterCall::Mount {
                source: source.to_path_buf(),
                target: target.to_path_buf(),
            });
            if s.failing_mounts.contains(target) {
                return Err(VolumeError::MountFailure {
                    source_path: source.display().to_string(),
                    target: target.display().to_string(),
                    reason: "timed out after 3000ms".to_string(),
                });
            }
            Ok(())
        })
    }

    async fn unmount(&self, target: &Path) -> VolumeResult<()> {
        self.pause().await;
        self.with_state(|s| {
            s.calls.push(MounterCall::Unmount {
                target: target.to_path_buf(),
            });
            if s.failing_unmounts.contains(target) {
                return Err(VolumeError::UnmountFailure {
                    target: target.display().to_string(),
                    reason: "Device or resource busy (os error 16)".to_string(),
                });
            }
            Ok(())
        })
    }

    async fn set_replication_goal(&self, path: &Path, goal: &str) -> VolumeResult<()> {
        self.with_state(|s| {
            s.calls.push(MounterCall::SetGoal {
                path: path.to_path_buf(),
                goal: goal.to_string(),
            });
            if s.fail_set_goal {
                return Err(VolumeError::CommandFailed {
                    command: format!("lizardfs setgoal -r {goal} {}", path.display()),
                    reason: "exited with exit status: 1".to_string(),
                });
            }
            Ok(())
        })
    }
}
