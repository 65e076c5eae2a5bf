//! Bundle manifest schema
//!
//! Every bundle carries a `manifest.json` at the archive root naming
//! the binaries it contains. Keys are camelCase as written by the SDK
//! tooling.

use serde::Deserialize;

/// The parsed `manifest.json`
#[derive(Debug, Clone, Deserialize)]
pub struct BundleManifest {
    /// Manifest schema version
    #[serde(rename = "manifestVersion")]
    pub manifest_version: u32,

    /// When the bundle was built (unix seconds)
    #[serde(rename = "generatedAt")]
    pub generated_at: u64,

    /// Tool/host that built the bundle
    #[serde(rename = "generatedBy", default)]
    pub generated_by: String,

    /// Bundle type: "application" or "firmware"
    #[serde(rename = "type")]
    pub bundle_type: String,

    /// Application binary descriptor (application bundles)
    #[serde(default)]
    pub application: Option<ApplicationDescriptor>,

    /// Firmware image descriptor (firmware bundles)
    #[serde(default)]
    pub firmware: Option<FirmwareDescriptor>,

    /// Resource pack descriptor (either bundle type)
    #[serde(default)]
    pub resources: Option<ResourcesDescriptor>,
}

/// Descriptor for the application binary
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationDescriptor {
    /// Archive entry name of the binary
    #[serde(rename = "name", default)]
    pub filename: String,

    /// Binary build timestamp (unix seconds)
    #[serde(default)]
    pub timestamp: u64,

    /// Declared checksum of the binary (watch CRC variant)
    pub crc: u32,

    /// Binary size in bytes
    pub size: u64,

    /// Minimum firmware version the app needs
    #[serde(rename = "reqFwVer", default)]
    pub required_firmware_version: u32,
}

/// Descriptor for the firmware image
#[derive(Debug, Clone, Deserialize)]
pub struct FirmwareDescriptor {
    /// Archive entry name of the image
    #[serde(rename = "name", default)]
    pub filename: String,

    /// Image build timestamp (unix seconds)
    #[serde(default)]
    pub timestamp: u64,

    /// Declared checksum of the image (watch CRC variant)
    pub crc: u32,

    /// Image size in bytes
    pub size: u64,

    /// Hardware revision the image targets, e.g. "ev2_4"
    #[serde(default)]
    pub hwrev: String,

    /// "normal" or "recovery"
    #[serde(rename = "type", default)]
    pub firmware_type: String,
}

/// Descriptor for the resource pack
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesDescriptor {
    /// Archive entry name of the pack
    #[serde(rename = "name", default)]
    pub filename: String,

    /// Pack build timestamp (unix seconds)
    #[serde(default)]
    pub timestamp: u64,

    /// Declared checksum of the pack (watch CRC variant)
    pub crc: u32,

    /// Pack size in bytes; zero means "no resources"
    pub size: u64,

    /// Human-readable resource version
    #[serde(rename = "friendlyVersion", default)]
    pub friendly_version: String,
}
