//! Command line and environment configuration.
//!
//! Every option can be set through the environment variables Docker passes
//! to a managed plugin. Empty values fall back to the defaults, which is why
//! path options are taken as plain strings.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use lizard_common::PluginConfig;
use lizard_common::config::{
    DEFAULT_ALIAS, DEFAULT_CONTAINER_VOLUME_PATH, DEFAULT_MASTER_HOST, DEFAULT_MASTER_PORT,
    DEFAULT_PLUGIN_DIR, DEFAULT_REMOTE_PATH, DEFAULT_VOLUME_ROOT, parse_mount_options,
};

/// LizardFS Docker volume plugin daemon
#[derive(Parser, Debug, Clone)]
#[command(name = "lizardd")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path on the LizardFS filesystem used for volume storage
    #[arg(long, env = "REMOTE_PATH", default_value = DEFAULT_REMOTE_PATH)]
    pub remote_path: String,

    /// Plugin alias, used to name the plugin socket
    #[arg(long, env = "ALIAS", default_value = DEFAULT_ALIAS)]
    pub alias: String,

    /// Name of the volume mapped to the whole remote path
    #[arg(long, env = "ROOT_VOLUME_NAME")]
    pub root_volume_name: Option<String>,

    /// Volume directory as seen from the Docker host
    #[arg(long, env = "LOCAL_PATH")]
    pub local_path: Option<String>,

    /// Extra arguments passed to mfsmount, space separated
    #[arg(long, env = "MOUNT_OPTIONS", default_value = "", allow_hyphen_values = true)]
    pub mount_options: String,

    /// LizardFS master host
    #[arg(long, env = "HOST", default_value = DEFAULT_MASTER_HOST)]
    pub host: String,

    /// LizardFS master port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_MASTER_PORT)]
    pub port: u16,

    /// Timeout for mfsmount and other external commands, in milliseconds;
    /// 0 disables it
    #[arg(long, env = "CONNECT_TIMEOUT", default_value_t = 10_000)]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error, silent) or filter directive
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Local mountpoint of the LizardFS remote path
    #[arg(long, env = "VOLUME_ROOT", default_value = DEFAULT_VOLUME_ROOT)]
    pub volume_root: String,

    /// Directory volumes are mounted under
    #[arg(
        long,
        env = "CONTAINER_VOLUME_PATH",
        default_value = DEFAULT_CONTAINER_VOLUME_PATH
    )]
    pub container_volume_path: String,

    /// Directory holding the plugin socket
    #[arg(long, env = "PLUGIN_DIR", default_value = DEFAULT_PLUGIN_DIR)]
    pub plugin_dir: String,
}

fn or_default(value: &str, default: &str) -> PathBuf {
    if value.is_empty() {
        PathBuf::from(default)
    } else {
        PathBuf::from(value)
    }
}

impl Args {
    /// Build the plugin configuration.
    #[must_use]
    pub fn to_config(&self) -> PluginConfig {
        let alias = if self.alias.is_empty() {
            DEFAULT_ALIAS.to_string()
        } else {
            self.alias.clone()
        };
        let host = if self.host.is_empty() {
            DEFAULT_MASTER_HOST.to_string()
        } else {
            self.host.clone()
        };
        let container_volume_path =
            or_default(&self.container_volume_path, DEFAULT_CONTAINER_VOLUME_PATH);
        let host_volume_path = self
            .local_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map_or_else(|| container_volume_path.clone(), PathBuf::from);

        PluginConfig {
            remote_path: or_default(&self.remote_path, DEFAULT_REMOTE_PATH),
            alias,
            plugin_dir: or_default(&self.plugin_dir, DEFAULT_PLUGIN_DIR),
            root_volume_name: self.root_volume_name.clone().filter(|n| !n.is_empty()),
            volume_root: or_default(&self.volume_root, DEFAULT_VOLUME_ROOT),
            container_volume_path,
            host_volume_path,
            mount_options: parse_mount_options(&self.mount_options),
            master_host: host,
            master_port: self.port,
            connect_timeout: (self.connect_timeout > 0)
                .then_some(Duration::from_millis(self.connect_timeout)),
        }
    }

    /// Tracing filter directive for the configured log level.
    #[must_use]
    pub fn log_filter(&self) -> String {
        match self.log_level.trim() {
            "" => "info".to_string(),
            "silent" => "off".to_string(),
            level => level.to_string(),
        }
    }
}
