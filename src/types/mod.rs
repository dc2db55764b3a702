//! Data models for the Syncthing configuration API.

use serde::{Deserialize, Serialize};

/// Controls how a folder is handled by Syncthing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderType {
    /// Default mode, sending local and accepting remote changes.
    #[serde(rename = "sendreceive")]
    SendReceive,
    /// The folder will not be modified by Syncthing on this device.
    #[serde(rename = "sendonly")]
    SendOnly,
    /// The folder will not propagate changes to other devices.
    #[serde(rename = "receiveonly")]
    ReceiveOnly,
}

impl Default for FolderType {
    fn default() -> Self {
        Self::SendReceive
    }
}

/// Protocol compression applied to messages sent to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    /// Compress metadata packets, such as index information. Metadata is
    /// usually very compression friendly so this is a good default.
    #[serde(rename = "metadata")]
    Metadata,
    /// Compress all packets, including file data.
    #[serde(rename = "always")]
    Always,
    /// Disable all compression.
    #[serde(rename = "never")]
    Never,
}

impl Default for CompressionType {
    fn default() -> Self {
        Self::Metadata
    }
}

/// The minimum required free space on the disk a folder resides on. The
/// folder is stopped when the value drops below the threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinDiskFree {
    /// Set to zero to disable.
    pub value: i64,
    /// Accepted units are %, kB, MB, GB and TB.
    pub unit: String,
}

/// A device a folder is shared with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FolderDevice {
    /// The id of the device.
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// Which device introduced us to this one.
    pub introduced_by: String,
    /// Password used for untrusted-device encryption, when set.
    pub encryption_password: String,
}

/// A synchronized folder as reported by the configuration endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Folder {
    /// The folder ID, must be unique.
    pub id: String,
    /// Human readable local name. May be different on each device, empty,
    /// or identical to other folder labels.
    pub label: String,
    /// The directory the folder is stored in on this device; not sent to
    /// other devices.
    pub path: String,
    /// How the folder is handled by Syncthing.
    #[serde(rename = "type")]
    pub folder_type: FolderType,
    /// The rescan interval, in seconds. Zero disables periodic rescans.
    pub rescan_interval_s: i64,
    /// Detect changes to files in the folder and scan them.
    pub fs_watcher_enabled: bool,
    /// How long detected changes are accumulated before a scan is scheduled.
    pub fs_watcher_delay_s: i64,
    /// True if the folder should ignore permissions.
    pub ignore_perms: bool,
    /// Automatically correct UTF-8 normalization errors found in file names.
    pub auto_normalize: bool,
    /// The devices sharing this folder.
    pub devices: Vec<FolderDevice>,
    /// Free-space threshold below which the folder is stopped.
    pub min_disk_free: MinDiskFree,
}

/// A known device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Device {
    /// The device ID.
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// A friendly name for the device.
    pub name: String,
    /// Whether to use protocol compression when sending messages to this
    /// device.
    pub compression: CompressionType,
    /// The device certificate common name, if it is not the default
    /// "syncthing".
    pub cert_name: String,
    /// Trust this device as an introducer, copying its device list per
    /// folder when connecting.
    pub introducer: bool,
    /// Follow only introductions and not de-introductions.
    pub skip_introduction_removals: bool,
    /// Which device introduced us to this device. Used only for following
    /// de-introductions.
    pub introduced_by: String,
    /// True if synchronization with this device is (temporarily) suspended.
    pub paused: bool,
    /// Automatically accept folders this device offers to share.
    pub auto_accept_folders: bool,
    /// Maximum send rate for this device, in kibibytes/second.
    pub max_send_kbps: i64,
    /// Maximum receive rate for this device, in kibibytes/second.
    pub max_recv_kbps: i64,
    /// Maximum amount of outstanding request data towards this device, in
    /// kibibytes.
    #[serde(rename = "maxRequestKiB")]
    pub max_request_kib: i64,
    /// Treat this device as untrusted, requiring folder encryption.
    pub untrusted: bool,
    /// When positive, the GUI displays an HTTP link to the address currently
    /// used for synchronization on this port.
    #[serde(rename = "remoteGUIPort")]
    pub remote_gui_port: i64,
}

/// The top-level Syncthing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The config version. Increments whenever a change is made that
    /// requires migration from previous formats. Some server builds send
    /// this as a JSON string; both encodings are accepted.
    #[serde(deserialize_with = "version_from_number_or_string")]
    pub version: i64,
    /// The configured folders.
    pub folders: Vec<Folder>,
}

fn version_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Number(i64),
        Text(String),
    }

    match Version::deserialize(deserializer)? {
        Version::Number(n) => Ok(n),
        Version::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Describes a folder to create or edit via the folders service. Optional
/// fields left as `None` are omitted from the request body so the instance
/// keeps its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    /// The folder ID, must be unique.
    pub id: String,
    /// Human readable local name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The directory the folder is stored in on this device.
    pub path: String,
    /// How the folder is handled by Syncthing.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub folder_type: Option<FolderType>,
    /// The rescan interval, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescan_interval_s: Option<i64>,
    /// Detect changes to files in the folder and scan them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_watcher_enabled: Option<bool>,
    /// How long detected changes are accumulated before a scan is scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_watcher_delay_s: Option<i64>,
    /// True if the folder should ignore permissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_perms: Option<bool>,
    /// Automatically correct UTF-8 normalization errors found in file names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_normalize: Option<bool>,
    /// The devices sharing this folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<FolderDevice>>,
    /// Free-space threshold below which the folder is stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_disk_free: Option<MinDiskFree>,
}

impl NewFolder {
    /// Creates a new folder description with the mandatory fields.
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            path: path.into(),
            folder_type: None,
            rescan_interval_s: None,
            fs_watcher_enabled: None,
            fs_watcher_delay_s: None,
            ignore_perms: None,
            auto_normalize: None,
            devices: None,
            min_disk_free: None,
        }
    }
}
