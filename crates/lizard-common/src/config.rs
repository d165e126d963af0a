//! Plugin configuration and the filesystem paths derived from it.

use std::path::PathBuf;
use std::time::Duration;

/// Default path on the LizardFS filesystem used for volume storage.
pub const DEFAULT_REMOTE_PATH: &str = "/docker/volumes";

/// Default plugin alias, used to name the plugin socket.
pub const DEFAULT_ALIAS: &str = "lizardfs";

/// Local mountpoint of the LizardFS volume root.
pub const DEFAULT_VOLUME_ROOT: &str = "/mnt/lizardfs";

/// Directory volumes are mounted under inside the plugin container.
pub const DEFAULT_CONTAINER_VOLUME_PATH: &str = "/mnt/docker-volumes";

/// Directory Docker looks for plugin sockets in.
pub const DEFAULT_PLUGIN_DIR: &str = "/run/docker/plugins";

/// Default LizardFS master host.
pub const DEFAULT_MASTER_HOST: &str = "mfsmaster";

/// Default LizardFS master port.
pub const DEFAULT_MASTER_PORT: u16 = 9421;

/// Default timeout for external commands.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration consumed by the volume driver and the plugin daemon.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Path on the LizardFS filesystem that holds the volumes.
    pub remote_path: PathBuf,
    /// Plugin alias; the socket is `<plugin_dir>/<alias>.sock`.
    pub alias: String,
    /// Directory holding the plugin socket.
    pub plugin_dir: PathBuf,
    /// Name of the volume that maps to `remote_path` itself.
    pub root_volume_name: Option<String>,
    /// Local mountpoint of `remote_path`.
    pub volume_root: PathBuf,
    /// Directory volumes are mounted under by the plugin.
    pub container_volume_path: PathBuf,
    /// The same directory as seen from the Docker host.
    pub host_volume_path: PathBuf,
    /// Extra arguments appended to every `mfsmount` invocation.
    pub mount_options: Vec<String>,
    /// LizardFS master host.
    pub master_host: String,
    /// LizardFS master port.
    pub master_port: u16,
    /// Upper bound on every external command and blocking filesystem call.
    /// `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            remote_path: PathBuf::from(DEFAULT_REMOTE_PATH),
            alias: DEFAULT_ALIAS.to_string(),
            plugin_dir: PathBuf::from(DEFAULT_PLUGIN_DIR),
            root_volume_name: None,
            volume_root: PathBuf::from(DEFAULT_VOLUME_ROOT),
            container_volume_path: PathBuf::from(DEFAULT_CONTAINER_VOLUME_PATH),
            host_volume_path: PathBuf::from(DEFAULT_CONTAINER_VOLUME_PATH),
            mount_options: Vec::new(),
            master_host: DEFAULT_MASTER_HOST.to_string(),
            master_port: DEFAULT_MASTER_PORT,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }
}

impl PluginConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place every local directory (volume root, mountpoints, socket) under
    /// `base`. Used by tests and non-plugin deployments.
    #[must_use]
    pub fn with_local_base(mut self, base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        self.volume_root = base.join("lizardfs");
        self.container_volume_path = base.join("docker-volumes");
        self.host_volume_path = base.join("docker-volumes");
        self.plugin_dir = base.join("plugins");
        self
    }

    /// Set the remote LizardFS path.
    #[must_use]
    pub fn with_remote_path(mut self, remote_path: impl Into<PathBuf>) -> Self {
        self.remote_path = remote_path.into();
        self
    }

    /// Set the root volume name. An empty name unsets it.
    #[must_use]
    pub fn with_root_volume(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.root_volume_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Set the host-visible volume directory.
    #[must_use]
    pub fn with_host_volume_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.host_volume_path = path.into();
        self
    }

    /// Set the extra `mfsmount` arguments from a space separated string.
    #[must_use]
    pub fn with_mount_options(mut self, options: &str) -> Self {
        self.mount_options = parse_mount_options(options);
        self
    }

    /// Set the LizardFS master address.
    #[must_use]
    pub fn with_master(mut self, host: impl Into<String>, port: u16) -> Self {
        self.master_host = host.into();
        self.master_port = port;
        self
    }

    /// Set the external command timeout. A zero duration disables it.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Whether `name` is the configured root volume.
    #[must_use]
    pub fn is_root_volume(&self, name: &str) -> bool {
        self.root_volume_name.as_deref() == Some(name)
    }

    /// Directory backing a volume inside the mounted LizardFS root.
    #[must_use]
    pub fn backing_path(&self, name: &str) -> PathBuf {
        self.volume_root.join(name)
    }

    /// Remote LizardFS path mounted for a volume.
    #[must_use]
    pub fn remote_source(&self, name: &str) -> PathBuf {
        if self.is_root_volume(name) {
            self.remote_path.clone()
        } else {
            self.remote_path.join(name)
        }
    }

    /// Where the plugin mounts a volume.
    #[must_use]
    pub fn container_mountpoint(&self, name: &str) -> PathBuf {
        self.container_volume_path.join(name)
    }

    /// The mountpoint reported to Docker.
    #[must_use]
    pub fn host_mountpoint(&self, name: &str) -> PathBuf {
        self.host_volume_path.join(name)
    }

    /// Path of the plugin's Unix socket.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.plugin_dir.join(format!("{}.sock", self.alias))
    }
}

/// Split a `MOUNT_OPTIONS` string into `mfsmount` arguments.
#[must_use]
pub fn parse_mount_options(options: &str) -> Vec<String> {
    options.split_whitespace().map(str::to_string).collect()
}
