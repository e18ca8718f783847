/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the secure boot ROM: board hooks, trust
    anchors, header parsing and the image load and verify flow.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod anchors;
mod board;
mod flow;
mod header_info;
mod kat;
mod rom_env;
mod verifier;

pub use anchors::{
    TrustAnchors, BUILTIN_PUB_KEY, BUILTIN_PUB_KEY_DIGEST, SECURE_BOOT_PUBHASH_NUM,
    SECURE_BOOT_PUBKEY_NUM,
};
pub use board::{BoardServices, BootSelect};
pub use flow::{flow_run, BootHandoff};
pub use header_info::{HeaderInfo, NS_UNKNOWN_IMAGE_SIZE};
pub use kat::execute_kat;
pub use rom_env::RomEnv;
pub use verifier::{monotonic_counter_num, RomImageVerificationEnv};
