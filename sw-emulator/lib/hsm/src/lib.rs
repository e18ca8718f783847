/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated security module.

--*/

mod asset_store;
mod hash_engine;
mod host_memory;
mod hsm;
mod pka;

pub use asset_store::{AssetStore, StaticAsset, DYNAMIC_ASSET_CAPACITY, STATIC_ASSET_ID_BASE};
pub use host_memory::{BusError, HostMemory};
pub use sboot_emu_crypto::Ecc256PubKey;
pub use hsm::{nonce_digest, EmulatedHsm, EMULATED_FW_VERSION, EMULATED_HW_VERSION};
