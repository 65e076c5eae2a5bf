//! Bundle Reader
//!
//! An installable bundle is a zip archive: `manifest.json` at the
//! root plus the binaries it names (app or firmware image, optional
//! resource pack). Loading is all-or-nothing — any missing entry or
//! malformed record fails the whole load and no partial [`Bundle`]
//! ever exists.

mod manifest;
mod metadata;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{LinkError, Result};
use crate::record::decode_record;

pub use manifest::{
    ApplicationDescriptor, BundleManifest, FirmwareDescriptor, ResourcesDescriptor,
};
pub use metadata::ApplicationMetadata;

/// Archive entry every bundle must contain
const MANIFEST_NAME: &str = "manifest.json";

/// What a bundle installs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Application,
    Firmware,
}

/// A fully loaded, validated bundle
///
/// Immutable after construction.
#[derive(Debug)]
pub struct Bundle {
    /// The parsed manifest
    pub manifest: BundleManifest,

    /// Whether this installs an app or firmware
    pub kind: BundleKind,

    /// The app binary or firmware image
    pub binary: Vec<u8>,

    /// Resource pack, when the manifest declares a non-empty one
    pub resources: Option<Vec<u8>>,

    /// Metadata record from the head of the app binary
    /// (application bundles only; firmware images carry none)
    pub app_metadata: Option<ApplicationMetadata>,
}

impl Bundle {
    /// Load a bundle from a seekable byte stream
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Bundle> {
        let mut archive = ZipArchive::new(reader)?;

        // Step 1: the manifest is mandatory
        let manifest: BundleManifest = {
            let entry = match archive.by_name(MANIFEST_NAME) {
                Ok(entry) => entry,
                Err(ZipError::FileNotFound) => {
                    return Err(LinkError::Bundle(format!(
                        "archive has no {MANIFEST_NAME}"
                    )))
                }
                Err(e) => return Err(e.into()),
            };
            serde_json::from_reader(entry)?
        };

        // Step 2: resources, when declared with a non-zero size
        let resources = match manifest.resources.as_ref().filter(|r| r.size != 0) {
            Some(descriptor) => Some(read_entry(&mut archive, &descriptor.filename)?),
            None => None,
        };

        // Step 3: the main binary, by manifest type
        match manifest.bundle_type.as_str() {
            "application" => {
                let descriptor = manifest.application.as_ref().ok_or_else(|| {
                    LinkError::Bundle("manifest declares no application".to_string())
                })?;
                if descriptor.filename.is_empty() {
                    return Err(LinkError::Bundle(
                        "manifest names no application binary".to_string(),
                    ));
                }

                let binary = read_entry(&mut archive, &descriptor.filename)?;
                let app_metadata = decode_record::<ApplicationMetadata>(&binary)?;

                Ok(Bundle {
                    manifest,
                    kind: BundleKind::Application,
                    binary,
                    resources,
                    app_metadata: Some(app_metadata),
                })
            }

            "firmware" => {
                let descriptor = manifest.firmware.as_ref().ok_or_else(|| {
                    LinkError::Bundle("manifest declares no firmware".to_string())
                })?;
                if descriptor.filename.is_empty() {
                    return Err(LinkError::Bundle(
                        "manifest names no firmware image".to_string(),
                    ));
                }

                let binary = read_entry(&mut archive, &descriptor.filename)?;

                Ok(Bundle {
                    manifest,
                    kind: BundleKind::Firmware,
                    binary,
                    resources,
                    app_metadata: None,
                })
            }

            other => Err(LinkError::Bundle(format!("unknown bundle type \"{other}\""))),
        }
    }

    /// Load a bundle from a file on disk
    pub fn open(path: impl AsRef<Path>) -> Result<Bundle> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Whether a firmware bundle carries a recovery image
    pub fn is_recovery_firmware(&self) -> bool {
        self.manifest
            .firmware
            .as_ref()
            .map(|f| f.firmware_type == "recovery")
            .unwrap_or(false)
    }

    /// Verify the loaded binaries against the manifest-declared CRCs
    ///
    /// Uses the watch's checksum variant; a mismatch means the archive
    /// was corrupted in transit.
    pub fn check_integrity(&self) -> Result<()> {
        let declared = match self.kind {
            BundleKind::Application => self.manifest.application.as_ref().map(|a| a.crc),
            BundleKind::Firmware => self.manifest.firmware.as_ref().map(|f| f.crc),
        };
        if let Some(declared) = declared {
            let actual = crate::crc::checksum(&self.binary);
            if actual != declared {
                return Err(LinkError::Bundle(format!(
                    "binary checksum mismatch: manifest 0x{declared:08X}, archive 0x{actual:08X}"
                )));
            }
        }

        if let (Some(resources), Some(descriptor)) =
            (&self.resources, self.manifest.resources.as_ref())
        {
            let actual = crate::crc::checksum(resources);
            if actual != descriptor.crc {
                return Err(LinkError::Bundle(format!(
                    "resource checksum mismatch: manifest 0x{:08X}, archive 0x{actual:08X}",
                    descriptor.crc
                )));
            }
        }

        Ok(())
    }
}

/// Read one named archive entry fully into memory
fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(LinkError::Bundle(format!(
                "archive entry \"{name}\" named by the manifest is missing"
            )))
        }
        Err(e) => return Err(e.into()),
    };

    let mut data = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut data)?;
    Ok(data)
}
