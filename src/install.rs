//! Install workflows
//!
//! Composite sequences built from the simple commands and the chunked
//! upload engine: put an app into a free bank slot, or stage a
//! firmware image.
//!
//! Progress callbacks receive percentage milestones at phase
//! boundaries. The exact numbers are not contractual — only that they
//! increase monotonically and end at 100 on success. The fixed
//! schedule used here is 10 / 30 / 70 / 90 / 100 for apps and
//! 10 / 40 / 80 / 100 for firmware.

use std::collections::HashSet;

use crate::bundle::{Bundle, BundleKind};
use crate::error::{LinkError, Result};
use crate::protocol::SystemCommand;
use crate::putbytes::TransferKind;
use crate::session::Watch;

/// Progress observer: called with an increasing percentage
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

fn report(progress: Option<ProgressFn<'_>>, percent: u8) {
    if let Some(f) = progress {
        f(percent);
    }
}

impl Watch {
    /// Install an application bundle
    ///
    /// Removes any previous install with the same UUID, picks the
    /// lowest free bank slot, uploads the binary (and resources, if
    /// the bundle has them), then announces the new app. Fails the
    /// whole workflow on the first step that goes wrong.
    pub fn install_app(&self, bundle: &Bundle, progress: Option<ProgressFn<'_>>) -> Result<()> {
        if bundle.kind != BundleKind::Application {
            return Err(LinkError::Install(
                "bundle does not contain an application".to_string(),
            ));
        }
        let metadata = bundle.app_metadata.as_ref().ok_or_else(|| {
            LinkError::Install("application bundle has no metadata record".to_string())
        })?;

        // Step 1: remove any existing install with this UUID
        let removal = self.remove_app_by_uuid(metadata.uuid)?;
        if !removal.success {
            return Err(LinkError::Install(format!(
                "could not remove previous install: {}",
                removal.error.as_deref().unwrap_or("unknown error")
            )));
        }
        report(progress, 10);

        // Step 2: fetch the bank and pick the lowest free slot
        let listing = self.get_app_bank()?;
        if !listing.success {
            return Err(LinkError::Install(format!(
                "could not list app bank: {}",
                listing.error.as_deref().unwrap_or("unknown error")
            )));
        }
        let bank = listing.bank;
        let slot = find_free_slot(bank.slot_count, bank.apps.iter().map(|a| a.index))
            .ok_or_else(|| LinkError::Install("all app slots are full".to_string()))?;
        tracing::debug!(
            "installing \"{}\" into slot {} of {}",
            metadata.name,
            slot,
            bank.slot_count
        );
        report(progress, 30);

        // Step 3: upload the app binary
        if !self.upload(TransferKind::Binary, slot as u8, &bundle.binary)? {
            return Err(LinkError::Install(
                "app binary transfer failed".to_string(),
            ));
        }
        report(progress, 70);

        // Step 4: upload resources when the bundle carries them
        if let Some(resources) = &bundle.resources {
            if !self.upload(TransferKind::Resources, slot as u8, resources)? {
                return Err(LinkError::Install(
                    "resource pack transfer failed".to_string(),
                ));
            }
        }
        report(progress, 90);

        // Step 5: announce the app; the watch answers nothing here
        self.add_app(slot)?;
        report(progress, 100);
        Ok(())
    }

    /// Stage a firmware bundle
    ///
    /// Brackets the transfers with firmware-start/-complete system
    /// messages; succeeds exactly when the final message is
    /// acknowledged successfully.
    pub fn install_firmware(&self, bundle: &Bundle, progress: Option<ProgressFn<'_>>) -> Result<()> {
        if bundle.kind != BundleKind::Firmware {
            return Err(LinkError::Install(
                "bundle does not contain firmware".to_string(),
            ));
        }

        // Step 1: announce the update
        let start = self.system_message(SystemCommand::FirmwareStart)?;
        if !start.success {
            return Err(LinkError::Install(format!(
                "watch refused firmware update: {}",
                start.error.as_deref().unwrap_or("unknown error")
            )));
        }
        report(progress, 10);

        // Step 2: system resources ride along with some images
        if let Some(resources) = &bundle.resources {
            if !self.upload(TransferKind::SystemResources, 0, resources)? {
                return Err(LinkError::Install(
                    "system resource transfer failed".to_string(),
                ));
            }
        }
        report(progress, 40);

        // Step 3: the image itself; recovery images are filed apart
        let kind = if bundle.is_recovery_firmware() {
            TransferKind::Recovery
        } else {
            TransferKind::Firmware
        };
        if !self.upload(kind, 0, &bundle.binary)? {
            return Err(LinkError::Install("firmware transfer failed".to_string()));
        }
        report(progress, 80);

        // Step 4: the final acknowledgement decides the workflow
        let complete = self.system_message(SystemCommand::FirmwareComplete)?;
        if !complete.success {
            return Err(LinkError::Install(format!(
                "watch rejected firmware completion: {}",
                complete.error.as_deref().unwrap_or("unknown error")
            )));
        }
        report(progress, 100);
        Ok(())
    }
}

/// Lowest unused slot index, scanning from 1 up to the bank capacity
fn find_free_slot(slot_count: u32, used: impl Iterator<Item = u32>) -> Option<u32> {
    let used: HashSet<u32> = used.collect();
    (1..=slot_count).find(|index| !used.contains(index))
}
