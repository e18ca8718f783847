/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_arena.rs

Abstract:

    File contains the boot arena: one block of memory shared by the boot
    media drivers and the secure boot stage, holding the buffers of exactly
    one of them at a time.

--*/

use zeroize::Zeroize;

use crate::{SbootError, SbootResult};

/// USB endpoint zero bounce buffer size.
pub const USB_EP0_BUFFER_SIZE: usize = 512;

/// USB bulk endpoint buffer size.
pub const USB_EP_BUFFER_SIZE: usize = 4096;

/// SD/eMMC block size.
pub const SD_BLOCK_SIZE: usize = 512;

/// SPI DMA descriptors per direction.
pub const SPI_DESC_COUNT: usize = 10;

/// Largest image header the secure boot stage copies into the arena.
pub const SECURE_BOOT_HEADER_CAPACITY: usize = 1024;

/// Boot stage that owns the arena
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootMode {
    Usb,
    Sd,
    Spi,
    SecureBoot,
}

#[repr(C, align(64))]
#[derive(Debug, Clone, Zeroize)]
pub struct UsbBuffers {
    pub setup: [u8; USB_EP0_BUFFER_SIZE],
    pub ep0_bounce: [u8; USB_EP0_BUFFER_SIZE],
    pub req_in: [u8; USB_EP_BUFFER_SIZE],
    pub req_out: [u8; USB_EP_BUFFER_SIZE],
    pub bytes_received: u32,
    pub bytes_expected: u32,
}

#[repr(C, align(64))]
#[derive(Debug, Clone, Zeroize)]
pub struct SdBuffers {
    pub fat_block: [u8; SD_BLOCK_SIZE],
    pub data_block: [u8; SD_BLOCK_SIZE],
}

#[repr(C, align(64))]
#[derive(Debug, Clone, Zeroize)]
pub struct SpiBuffers {
    pub rx_desc: [u64; SPI_DESC_COUNT],
    pub tx_desc: [u64; SPI_DESC_COUNT],
}

#[repr(C, align(64))]
#[derive(Debug, Clone, Zeroize)]
pub struct SecureBootBuffers {
    /// Private copy of the image header under verification
    pub header: [u8; SECURE_BOOT_HEADER_CAPACITY],
    pub header_len: usize,
}

impl SecureBootBuffers {
    pub fn header(&self) -> &[u8] {
        &self.header[..self.header_len.min(SECURE_BOOT_HEADER_CAPACITY)]
    }
}

/// Boot memory arena.
///
/// The arena starts unselected. `select` hands it to one boot stage; doing
/// so twice is an error until `reset` scrubs it.
#[derive(Debug, Default)]
pub enum BootArena {
    #[default]
    Unselected,
    Usb(UsbBuffers),
    Sd(SdBuffers),
    Spi(SpiBuffers),
    SecureBoot(SecureBootBuffers),
}

impl BootArena {
    pub fn new() -> Self {
        Self::Unselected
    }

    /// Stage currently owning the arena.
    pub fn mode(&self) -> Option<BootMode> {
        match self {
            BootArena::Unselected => None,
            BootArena::Usb(_) => Some(BootMode::Usb),
            BootArena::Sd(_) => Some(BootMode::Sd),
            BootArena::Spi(_) => Some(BootMode::Spi),
            BootArena::SecureBoot(_) => Some(BootMode::SecureBoot),
        }
    }

    /// Hand the arena to the `mode` stage with zeroed buffers.
    pub fn select(&mut self, mode: BootMode) -> SbootResult<()> {
        if self.mode().is_some() {
            return Err(SbootError::DRIVER_ARENA_ALREADY_SELECTED);
        }
        *self = match mode {
            BootMode::Usb => BootArena::Usb(UsbBuffers {
                setup: [0; USB_EP0_BUFFER_SIZE],
                ep0_bounce: [0; USB_EP0_BUFFER_SIZE],
                req_in: [0; USB_EP_BUFFER_SIZE],
                req_out: [0; USB_EP_BUFFER_SIZE],
                bytes_received: 0,
                bytes_expected: 0,
            }),
            BootMode::Sd => BootArena::Sd(SdBuffers {
                fat_block: [0; SD_BLOCK_SIZE],
                data_block: [0; SD_BLOCK_SIZE],
            }),
            BootMode::Spi => BootArena::Spi(SpiBuffers {
                rx_desc: [0; SPI_DESC_COUNT],
                tx_desc: [0; SPI_DESC_COUNT],
            }),
            BootMode::SecureBoot => BootArena::SecureBoot(SecureBootBuffers {
                header: [0; SECURE_BOOT_HEADER_CAPACITY],
                header_len: 0,
            }),
        };
        Ok(())
    }

    /// Scrub the current stage's buffers and return to unselected.
    pub fn reset(&mut self) {
        match self {
            BootArena::Unselected => {}
            BootArena::Usb(buf) => buf.zeroize(),
            BootArena::Sd(buf) => buf.zeroize(),
            BootArena::Spi(buf) => buf.zeroize(),
            BootArena::SecureBoot(buf) => buf.zeroize(),
        }
        *self = BootArena::Unselected;
    }

    pub fn usb_mut(&mut self) -> SbootResult<&mut UsbBuffers> {
        match self {
            BootArena::Usb(buf) => Ok(buf),
            other => Err(other.wrong_mode()),
        }
    }

    pub fn sd_mut(&mut self) -> SbootResult<&mut SdBuffers> {
        match self {
            BootArena::Sd(buf) => Ok(buf),
            other => Err(other.wrong_mode()),
        }
    }

    pub fn spi_mut(&mut self) -> SbootResult<&mut SpiBuffers> {
        match self {
            BootArena::Spi(buf) => Ok(buf),
            other => Err(other.wrong_mode()),
        }
    }

    pub fn secure_boot_mut(&mut self) -> SbootResult<&mut SecureBootBuffers> {
        match self {
            BootArena::SecureBoot(buf) => Ok(buf),
            other => Err(other.wrong_mode()),
        }
    }

    fn wrong_mode(&self) -> SbootError {
        match self {
            BootArena::Unselected => SbootError::DRIVER_ARENA_NOT_SELECTED,
            _ => SbootError::DRIVER_ARENA_WRONG_MODE,
        }
    }
}
