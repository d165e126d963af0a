//! Common error types for the LizardFS volume plugin.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`VolumeError`].
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Errors produced by volume lifecycle operations.
///
/// Every variant is rendered into the `Err` field of a plugin response; none
/// of them is ever surfaced as a transport-level failure.
#[derive(Error, Diagnostic, Debug)]
pub enum VolumeError {
    /// The operation targets the root volume where that is not allowed.
    #[error("Volume '{name}' is the LizardFS root volume and cannot be {operation}")]
    #[diagnostic(
        code(lizard::volume::protected),
        help("The root volume maps to the whole LizardFS volume directory")
    )]
    ProtectedVolume {
        /// The root volume name.
        name: String,
        /// The rejected operation, in past participle ("created", "removed").
        operation: &'static str,
    },

    /// The external mount invocation failed or timed out.
    #[error("Failed to mount '{source_path}' at '{target}': {reason}")]
    #[diagnostic(code(lizard::mount::failed))]
    MountFailure {
        /// Remote LizardFS path that was being mounted.
        source_path: String,
        /// Local mountpoint.
        target: String,
        /// Why the mount failed.
        reason: String,
    },

    /// The external unmount failed.
    #[error("Failed to unmount '{target}': {reason}")]
    #[diagnostic(code(lizard::unmount::failed))]
    UnmountFailure {
        /// Local mountpoint.
        target: String,
        /// Why the unmount failed.
        reason: String,
    },

    /// An unmount referenced a mount ID that is not tracked for the volume.
    #[error("Mount ID '{id}' is not attached to volume '{name}'")]
    #[diagnostic(code(lizard::registry::unknown_mount))]
    UnknownMount {
        /// Volume name.
        name: String,
        /// The unknown mount ID.
        id: String,
    },

    /// The volume's backing directory does not exist.
    #[error("Volume not found: {name}")]
    #[diagnostic(code(lizard::volume::not_found))]
    NotFound {
        /// Volume name.
        name: String,
    },

    /// The volume's backing directory is not readable and writable.
    #[error("Cannot access volume '{name}': {reason}")]
    #[diagnostic(
        code(lizard::volume::access_denied),
        help("The plugin needs read and write access to the volume directory")
    )]
    AccessDenied {
        /// Volume name.
        name: String,
        /// Underlying OS error.
        reason: String,
    },

    /// The LizardFS root is not mounted and mounting it failed.
    #[error("LizardFS root is not mounted: {source}")]
    #[diagnostic(
        code(lizard::gate::failed),
        help("Check that the LizardFS master is reachable; the mount is retried on the next request")
    )]
    GateFailure {
        /// The failure that prevented the root mount.
        #[source]
        source: Box<VolumeError>,
    },

    /// The request body is malformed or misses a required field.
    #[error("Bad request: {message}")]
    #[diagnostic(code(lizard::request::bad))]
    BadRequest {
        /// What is wrong with the request.
        message: String,
    },

    /// An external command exited unsuccessfully.
    #[error("Command '{command}' failed: {reason}")]
    #[diagnostic(code(lizard::command::failed))]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit status, stderr or timeout description.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(lizard::io))]
    Io(#[from] std::io::Error),
}

impl VolumeError {
    /// Build a [`VolumeError::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Wrap a root-mount failure in [`VolumeError::GateFailure`].
    #[must_use]
    pub fn gate(source: Self) -> Self {
        Self::GateFailure {
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for VolumeError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest {
            message: err.to_string(),
        }
    }
}
