/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the secure boot driver library.

--*/

#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod array;
mod asset;
mod boot_arena;
mod dma;
mod hash;
mod hsm;
mod mailbox;
mod pka;
mod status_reporter;
mod wait;

pub mod printer;
pub mod token;

pub use array::{Array4x16, Array4x4, Array4x8};
pub use asset::ASSET_DATA_MAX_SIZE;
pub use boot_arena::{
    BootArena, BootMode, SdBuffers, SecureBootBuffers, SpiBuffers, UsbBuffers,
    SECURE_BOOT_HEADER_CAPACITY, SD_BLOCK_SIZE, USB_EP_BUFFER_SIZE,
};
pub use dma::{
    DmaArena, DmaDomain, DmaFlags, DmaHandle, DmaOrigin, DmaPool, DmaProperties,
    DMA_BUFFER_ALIGN, DMA_BUFFER_SIZE, DMA_MAX_ADDRESS_PAIRS, DMA_POOL_CAPACITY,
};
pub use hash::{HashDigest, HashSession};
pub use hsm::{Hsm, HsmConfig, DEFAULT_HOST_IDENTITY};
pub use mailbox::{Mailbox, MailboxTransport};
pub use pka::{
    EccAttempt, EccCurve, Ecc256Digest, Ecc256PrivKey, Ecc256PubKey, Ecc256Scalar,
    Ecc256Signature,
};
pub use sboot_error::{SbootError, SbootResult};
pub use status_reporter::{
    report_boot_error, report_boot_step, BootErrorCode, BootStatusLog, BootStatusRecorder,
    BootStep,
};
pub use wait::{BoundedWait, DEFAULT_POLL_LIMIT};

cfg_if::cfg_if! {
    if #[cfg(feature = "point-check")] {
        pub use pka::ecc256_point_on_curve;
    }
}
