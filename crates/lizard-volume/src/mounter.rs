//! External mount operations.
//!
//! The driver never touches `mfsmount`, `lizardfs` or `umount(2)` directly;
//! it goes through the [`Mounter`] trait so the lifecycle can be exercised
//! against a recording fake.

use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use lizard_common::{PluginConfig, VolumeError, VolumeResult};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// LizardFS mount client.
const MFSMOUNT: &str = "mfsmount";

/// LizardFS admin tool, used for `setgoal`.
const LIZARDFS: &str = "lizardfs";

/// External mount/unmount operations used by the volume driver.
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Mount the remote LizardFS path `source` at the local `target`.
    async fn mount(&self, source: &Path, target: &Path) -> VolumeResult<()>;

    /// Unmount the local `target`.
    async fn unmount(&self, target: &Path) -> VolumeResult<()>;

    /// Apply a replication goal to `path` recursively.
    async fn set_replication_goal(&self, path: &Path, goal: &str) -> VolumeResult<()>;
}

/// [`Mounter`] backed by `mfsmount`, `lizardfs setgoal` and `umount(2)`.
///
/// Every operation is bounded by the configured connect timeout, if any, so
/// an unresponsive master stalls Docker for at most that long.
#[derive(Debug, Clone)]
pub struct LizardMounter {
    host: String,
    port: u16,
    options: Vec<String>,
    timeout: Option<Duration>,
}

impl LizardMounter {
    /// Create a mounter from the plugin configuration.
    #[must_use]
    pub fn from_config(config: &PluginConfig) -> Self {
        Self {
            host: config.master_host.clone(),
            port: config.master_port,
            options: config.mount_options.clone(),
            timeout: config.connect_timeout,
        }
    }

    /// Arguments passed to `mfsmount` for a mount of `source` at `target`.
    #[must_use]
    pub fn mount_args(&self, source: &Path, target: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            target.into(),
            "-H".into(),
            self.host.clone().into(),
            "-P".into(),
            self.port.to_string().into(),
            "-S".into(),
            source.into(),
        ];
        args.extend(self.options.iter().map(OsString::from));
        args
    }
}

#[async_trait]
impl Mounter for LizardMounter {
    async fn mount(&self, source: &Path, target: &Path) -> VolumeResult<()> {
        tracing::debug!(
            source = %source.display(),
            target = %target.display(),
            host = %self.host,
            port = self.port,
            "Running mfsmount"
        );

        let mut command = Command::new(MFSMOUNT);
        command.args(self.mount_args(source, target));

        run_command(command, self.timeout)
            .await
            .map_err(|reason| VolumeError::MountFailure {
                source_path: source.display().to_string(),
                target: target.display().to_string(),
                reason,
            })
    }

    async fn unmount(&self, target: &Path) -> VolumeResult<()> {
        use rustix::mount::{UnmountFlags, unmount};

        tracing::debug!(target = %target.display(), "Unmounting filesystem");

        let failure = |reason: String| VolumeError::UnmountFailure {
            target: target.display().to_string(),
            reason,
        };

        let owned = target.to_path_buf();
        let task =
            tokio::task::spawn_blocking(move || unmount(owned.as_path(), UnmountFlags::empty()));

        match bounded(self.timeout, task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(errno))) => Err(failure(std::io::Error::from(errno).to_string())),
            Ok(Err(join_err)) => Err(failure(join_err.to_string())),
            Err(elapsed) => Err(failure(elapsed)),
        }
    }

    async fn set_replication_goal(&self, path: &Path, goal: &str) -> VolumeResult<()> {
        tracing::debug!(path = %path.display(), goal, "Setting replication goal");

        let mut command = Command::new(LIZARDFS);
        command.arg("setgoal").arg("-r").arg(goal).arg(path);

        run_command(command, self.timeout)
            .await
            .map_err(|reason| VolumeError::CommandFailed {
                command: format!("{LIZARDFS} setgoal -r {goal} {}", path.display()),
                reason,
            })
    }
}

/// Await `future`, giving up after `timeout` when one is set.
///
/// The error is a human readable description of the elapsed timeout.
pub(crate) async fn bounded<F: Future>(
    timeout: Option<Duration>,
    future: F,
) -> Result<F::Output, String> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| format!("timed out after {}ms", limit.as_millis())),
        None => Ok(future.await),
    }
}

/// Run `command` to completion within `timeout`.
///
/// Only the exit status is awaited, not stdout: `mfsmount` daemonizes and its
/// background half may keep inherited pipes open. Stderr is collected only
/// after a failed exit.
async fn run_command(mut command: Command, timeout: Option<Duration>) -> Result<(), String> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| format!("failed to execute: {e}"))?;

    let status = match bounded(timeout, child.wait()).await {
        Ok(status) => status.map_err(|e| format!("failed to wait for process: {e}"))?,
        Err(elapsed) => {
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "Failed to kill timed out process");
            }
            return Err(elapsed);
        }
    };

    if status.success() {
        return Ok(());
    }

    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        if bounded(timeout, pipe.read_to_string(&mut stderr))
            .await
            .is_err()
        {
            tracing::debug!("Timed out reading stderr of failed process");
        }
    }

    let stderr = stderr.trim();
    if stderr.is_empty() {
        Err(format!("exited with {status}"))
    } else {
        Err(format!("exited with {status}: {stderr}"))
    }
}
