//! Request and response bodies of the Docker volume plugin protocol.
//!
//! Field names follow the protocol's PascalCase. Request fields are all
//! optional at the serde level so that a missing `Name` or `ID` becomes a
//! `BadRequest` reply instead of a rejected request.

use std::path::Path;

use lizard_common::{VolumeError, VolumeResult, validate_volume_name};
use lizard_volume::VolumeInfo;
use serde::{Deserialize, Serialize};

/// `/VolumeDriver.Create` request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRequest {
    /// Volume name.
    #[serde(default)]
    pub name: Option<String>,
    /// Driver options given with `docker volume create -o`.
    #[serde(default)]
    pub opts: Option<CreateOptions>,
}

/// Options accepted by `/VolumeDriver.Create`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateOptions {
    /// LizardFS replication goal applied to the volume directory.
    #[serde(default)]
    pub replication_goal: Option<String>,
}

/// Request carrying only a volume name (`Remove`, `Path`, `Get`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameRequest {
    /// Volume name.
    #[serde(default)]
    pub name: Option<String>,
}

/// `/VolumeDriver.Mount` and `/VolumeDriver.Unmount` request.
#[derive(Debug, Default, Deserialize)]
pub struct MountRequest {
    /// Volume name.
    #[serde(default, rename = "Name")]
    pub name: Option<String>,
    /// Mount ID identifying the consuming container.
    #[serde(default, rename = "ID")]
    pub id: Option<String>,
}

/// Extract and validate a volume name.
pub fn require_name(name: Option<String>) -> VolumeResult<String> {
    let name = name.ok_or_else(|| VolumeError::bad_request("missing field 'Name'"))?;
    validate_volume_name(&name)?;
    Ok(name)
}

/// Extract a non-empty mount ID.
pub fn require_id(id: Option<String>) -> VolumeResult<String> {
    match id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(VolumeError::bad_request("missing field 'ID'")),
    }
}

/// Failure reply. Docker treats any response with a non-empty `Err` as a
/// failed call.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    #[serde(rename = "Err")]
    pub err: String,
}

/// Success reply without a payload: `{}`.
#[derive(Debug, Serialize)]
pub struct EmptyResponse {}

/// `/Plugin.Activate` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    /// Implemented plugin subsystems.
    pub implements: Vec<&'static str>,
}

/// `/VolumeDriver.Mount` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountResponse {
    /// Host-visible mountpoint.
    pub mountpoint: String,
}

/// `/VolumeDriver.Path` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PathResponse {
    /// Host-visible mountpoint, omitted when the volume is not mounted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<String>,
}

/// A volume in `Get` and `List` replies.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeEntry {
    /// Volume name.
    pub name: String,
    /// Host-visible mountpoint, omitted when the volume is not mounted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<String>,
}

impl From<VolumeInfo> for VolumeEntry {
    fn from(info: VolumeInfo) -> Self {
        Self {
            name: info.name,
            mountpoint: info.mountpoint.as_deref().map(display),
        }
    }
}

/// `/VolumeDriver.Get` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    /// The volume.
    pub volume: VolumeEntry,
}

/// `/VolumeDriver.List` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse {
    /// Every known volume.
    pub volumes: Vec<VolumeEntry>,
}

/// `/VolumeDriver.Capabilities` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapabilitiesResponse {
    /// Driver capabilities.
    pub capabilities: Capabilities,
}

/// Capabilities advertised by the driver.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    /// `global` or `local`.
    pub scope: String,
}

/// Render a mountpoint for a reply.
pub fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_without_opts() {
        let req: CreateRequest = serde_json::from_value(json!({"Name": "data1"})).unwrap();
        assert_eq!(req.name.as_deref(), Some("data1"));
        assert!(req.opts.is_none());

        let req: CreateRequest =
            serde_json::from_value(json!({"Name": "data1", "Opts": null})).unwrap();
        assert!(req.opts.is_none());
    }

    #[test]
    fn create_request_with_goal() {
        let req: CreateRequest = serde_json::from_value(json!({
            "Name": "data1",
            "Opts": {"ReplicationGoal": "3", "Other": "ignored"}
        }))
        .unwrap();
        let goal = req.opts.and_then(|o| o.replication_goal);
        assert_eq!(goal.as_deref(), Some("3"));
    }

    #[test]
    fn mount_request_fields() {
        let req: MountRequest =
            serde_json::from_value(json!({"Name": "data1", "ID": "abc"})).unwrap();
        assert_eq!(require_name(req.name).unwrap(), "data1");
        assert_eq!(require_id(req.id).unwrap(), "abc");
    }

    #[test]
    fn missing_fields_are_bad_requests() {
        assert!(matches!(
            require_name(None),
            Err(VolumeError::BadRequest { .. })
        ));
        assert!(matches!(
            require_id(Some(String::new())),
            Err(VolumeError::BadRequest { .. })
        ));
        assert!(matches!(
            require_name(Some("../x".to_string())),
            Err(VolumeError::BadRequest { .. })
        ));
    }

    #[test]
    fn optional_mountpoint_is_omitted() {
        let entry = VolumeEntry {
            name: "data1".to_string(),
            mountpoint: None,
        };
        assert_eq!(serde_json::to_value(entry).unwrap(), json!({"Name": "data1"}));
        assert_eq!(
            serde_json::to_value(PathResponse { mountpoint: None }).unwrap(),
            json!({})
        );
        assert_eq!(serde_json::to_value(EmptyResponse {}).unwrap(), json!({}));
    }
}
