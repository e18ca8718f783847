/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated security module crypto library.

--*/

mod ecc256;
mod sha256;
mod sha512;

pub use ecc256::{
    Ecc256, Ecc256PrivKey, Ecc256PubKey, Ecc256Scalar, Ecc256Signature, ECC_256_COORD_SIZE,
};

pub use sha256::Sha256;
pub use sha256::Sha256Mode;

pub use sha512::Sha512;
pub use sha512::Sha512Mode;
