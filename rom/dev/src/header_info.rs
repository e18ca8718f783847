/*++

Licensed under the Apache-2.0 license.

File Name:

    header_info.rs

Abstract:

    File contains the boot information the ROM reads from a loaded image
    header before any verification.

--*/

use sboot_drivers::cprintln;
use sboot_image_types::*;
use zerocopy::FromBytes;

/// Bytes handed on for an image without a recognized header
pub const NS_UNKNOWN_IMAGE_SIZE: u32 = 128 << 10;

/// Unverified header fields used to place and hand off the image.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct HeaderInfo {
    /// SPI flash configuration for the next stage
    pub spi_attr: u32,

    /// Offset of the security module firmware stored with the image
    pub scrtu_fw_offset: u32,

    /// Offset of the DRAM training firmware stored with the image
    pub ddr_fw_offset: u32,

    pub total_size: u32,

    /// Payload offset from the start of the image
    pub bl_offset: u32,

    pub bl_image_size: u32,
}

impl HeaderInfo {
    /// Parse the header at the start of `image`.
    ///
    /// Attributes are only read when the list is well formed. An image whose
    /// type is not a known SBIF tag is treated as a raw non-secure payload.
    pub fn parse(image: &[u8]) -> Self {
        let Some(header) = ImageHeader::read_from_prefix(image) else {
            return Self::raw();
        };

        let mut info = HeaderInfo::default();
        let attributes = header.attributes();
        if attributes.is_valid() {
            let fetch = |ty| attributes.fetch(ty).unwrap_or(0);
            info.spi_attr = fetch(SBIF_ATTRIBUTE_SPI);
            info.scrtu_fw_offset = fetch(SBIF_ATTRIBUTE_SCRTU_FW);
            info.ddr_fw_offset = fetch(SBIF_ATTRIBUTE_DDR_FW);
            info.total_size = fetch(SBIF_ATTRIBUTE_TOTAL_SIZE);
        }

        match (header.image_tag(), header.total_size()) {
            (SBIF_IMAGE_BLP | SBIF_IMAGE_BLW | SBIF_IMAGE_BLE, Some(offset)) => {
                info.bl_offset = offset as u32;
                info.bl_image_size = header.image_len();
            }
            _ => return Self::raw(),
        }

        cprintln!(
            "[header] offset {} size {} spi {}",
            info.bl_offset,
            info.bl_image_size,
            info.spi_attr
        );
        info
    }

    fn raw() -> Self {
        cprintln!("[header] unknown header, raw image");
        Self {
            bl_image_size: NS_UNKNOWN_IMAGE_SIZE,
            ..Default::default()
        }
    }
}
