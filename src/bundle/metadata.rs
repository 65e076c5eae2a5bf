//! Application metadata record
//!
//! App binaries begin with a packed descriptor written by the SDK:
//! versions, sizes, display strings, relocation info, and the app's
//! UUID. The watch reads the same record after upload, so the layout
//! is fixed.

use uuid::Uuid;

use crate::error::Result;
use crate::record::{DecodeRecord, RecordReader};

/// The packed header at offset 0 of every app binary
#[derive(Debug, Clone, Default)]
pub struct ApplicationMetadata {
    /// Header tag identifying the record ("PBLAPP")
    pub header: String,

    /// Layout version of this record
    pub struct_version_major: u8,
    pub struct_version_minor: u8,

    /// SDK version the app was built against
    pub sdk_version_major: u8,
    pub sdk_version_minor: u8,

    /// App's own version
    pub app_version_major: u8,
    pub app_version_minor: u8,

    /// Size of the app image in bytes
    pub size: u16,

    /// Offset of the entry point
    pub offset: u32,

    /// Checksum of the app image (watch CRC variant)
    pub crc: u32,

    /// Display name
    pub name: String,

    /// Vendor name
    pub company: String,

    /// Resource id of the menu icon
    pub icon_resource_id: u32,

    /// Address of the symbol table
    pub symbol_table_address: u32,

    /// App flags
    pub flags: u32,

    /// Start of the relocation list
    pub relocation_list_start: u32,

    /// Number of relocation entries
    pub relocation_entries: u32,

    /// The app's identity; installs with the same UUID replace each
    /// other
    pub uuid: Uuid,
}

impl DecodeRecord for ApplicationMetadata {
    // header(8) + 6 version bytes + size(2) + offset(4) + crc(4)
    // + name(32) + company(32) + icon(4) + symtab(4) + flags(4)
    // + reloc start(4) + reloc count(4) + uuid(16)
    const SIZE: usize = 124;

    fn decode(reader: &mut RecordReader<'_>) -> Result<Self> {
        Ok(Self {
            header: reader.read_fixed_str(8)?,
            struct_version_major: reader.read_u8()?,
            struct_version_minor: reader.read_u8()?,
            sdk_version_major: reader.read_u8()?,
            sdk_version_minor: reader.read_u8()?,
            app_version_major: reader.read_u8()?,
            app_version_minor: reader.read_u8()?,
            size: reader.read_u16()?,
            offset: reader.read_u32()?,
            crc: reader.read_u32()?,
            name: reader.read_fixed_str(32)?,
            company: reader.read_fixed_str(32)?,
            icon_resource_id: reader.read_u32()?,
            symbol_table_address: reader.read_u32()?,
            flags: reader.read_u32()?,
            relocation_list_start: reader.read_u32()?,
            relocation_entries: reader.read_u32()?,
            uuid: reader.read_uuid()?,
        })
    }
}
