//! Volume name validation.

use crate::error::{VolumeError, VolumeResult};

/// Validate a volume name received from Docker.
///
/// A volume name becomes a single path component below the LizardFS volume
/// root, so it must be non-empty, must not be `.` or `..`, and must not
/// contain `/` or NUL.
///
/// # Errors
///
/// Returns [`VolumeError::BadRequest`] if the name is not usable.
pub fn validate_volume_name(name: &str) -> VolumeResult<()> {
    if name.is_empty() {
        return Err(VolumeError::bad_request("volume name must not be empty"));
    }

    if name == "." || name == ".." {
        return Err(VolumeError::bad_request(format!(
            "invalid volume name: '{name}'"
        )));
    }

    if name.contains(['/', '\0']) {
        return Err(VolumeError::bad_request(format!(
            "volume name must be a single path component: '{name}'"
        )));
    }

    Ok(())
}
