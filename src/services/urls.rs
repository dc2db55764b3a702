//! Endpoint paths for the configuration API, relative to the base address.

pub(crate) const CONFIG: &str = "rest/config";
pub(crate) const FOLDERS: &str = "rest/config/folders";
pub(crate) const DEVICES: &str = "rest/config/devices";

/// Path for one folder with the given ID.
pub(crate) fn folder(id: &str) -> String {
    format!("{}/{}", FOLDERS, id)
}

/// Path for one device with the given ID.
pub(crate) fn device(id: &str) -> String {
    format!("{}/{}", DEVICES, id)
}
