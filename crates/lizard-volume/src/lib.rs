//! # lizard-volume
//!
//! The volume lifecycle state machine behind the LizardFS Docker volume
//! plugin.
//!
//! ## Components
//!
//! - [`RootMountGate`]: mounts the LizardFS volume root once, on demand
//! - [`MountRegistry`]: reference counts of mount IDs per volume
//! - [`VolumeDriver`]: the Docker volume operations
//! - [`VolumeDriver::shutdown`]: best-effort unmount on termination
//! - [`Mounter`]: the seam to `mfsmount`, `lizardfs setgoal` and `umount(2)`
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lizard_common::PluginConfig;
//! use lizard_volume::{LizardMounter, VolumeDriver};
//!
//! # async fn example() -> lizard_common::VolumeResult<()> {
//! let config = PluginConfig::default();
//! let mounter = Arc::new(LizardMounter::from_config(&config));
//! let mut driver = VolumeDriver::new(config, mounter);
//!
//! let mountpoint = driver.mount("data1", "container-1").await?;
//! println!("mounted at {}", mountpoint.display());
//! driver.unmount("data1", "container-1").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod driver;
mod gate;
mod mounter;
mod registry;
mod shutdown;
pub mod testing;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use driver::{Scope, VolumeDriver, VolumeInfo};
pub use gate::RootMountGate;
pub use mounter::{LizardMounter, Mounter};
pub use registry::MountRegistry;
pub use shutdown::ShutdownReport;

/// A driver shared between request handlers.
///
/// The mutex serializes every operation, so at most one lifecycle operation
/// runs at a time.
pub type SharedDriver = Arc<Mutex<VolumeDriver>>;

/// Wrap a driver for sharing between request handlers.
#[must_use]
pub fn shared(driver: VolumeDriver) -> SharedDriver {
    Arc::new(Mutex::new(driver))
}
