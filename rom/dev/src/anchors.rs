/*++

Licensed under the Apache-2.0 license.

File Name:

    anchors.rs

Abstract:

    File contains the secure boot trust anchors: the public key images are
    signed with and the hash authenticating keys carried in image headers.

--*/

use sboot_drivers::{
    cprintln, report_boot_step, BootStatusRecorder, BootStep, Hsm, MailboxTransport, SbootError,
    SbootResult,
};
use sboot_image_types::{ImageDigest, ImageEccPubKey, ECC256_SCALAR_BYTE_SIZE};
use zerocopy::AsBytes;

/// OTP asset number of the secure boot public key
pub const SECURE_BOOT_PUBKEY_NUM: u32 = 1;

/// OTP asset number of the secure boot public key hash
pub const SECURE_BOOT_PUBHASH_NUM: u32 = 2;

const PUB_KEY_SIZE: usize = 2 * ECC256_SCALAR_BYTE_SIZE;

pub const BUILTIN_PUB_KEY: ImageEccPubKey = ImageEccPubKey {
    x: [
        0xdf, 0xb7, 0x10, 0x20, 0x35, 0x9b, 0x14, 0xc6, 0xe0, 0xa9, 0x43, 0x66, 0xf5, 0xfc, 0x29,
        0x21, 0xa9, 0xd9, 0x41, 0x58, 0x1d, 0xc6, 0x7c, 0xac, 0x05, 0xba, 0x1d, 0x23, 0xcc, 0x39,
        0x01, 0xbc,
    ],
    y: [
        0xbd, 0x46, 0xe7, 0xdd, 0x3d, 0xaf, 0x61, 0x3c, 0x2b, 0x61, 0x50, 0xc4, 0x15, 0xec, 0x84,
        0x1b, 0xf1, 0x3a, 0x86, 0x59, 0xc0, 0xe0, 0x96, 0xd6, 0x0e, 0x28, 0xb4, 0x64, 0x7e, 0xd2,
        0xd2, 0x80,
    ],
};

/// SHA-256 over `BUILTIN_PUB_KEY`
pub const BUILTIN_PUB_KEY_DIGEST: ImageDigest = [
    0x8c, 0xd8, 0xca, 0x29, 0x58, 0x9b, 0x67, 0x89, 0x4c, 0x8a, 0xfa, 0xe5, 0xaa, 0x7f, 0xb4, 0x08,
    0xd4, 0xaf, 0xdd, 0xaf, 0x71, 0xac, 0x03, 0xda, 0x31, 0x7e, 0x1d, 0x64, 0xf8, 0x73, 0xaa, 0xe8,
];

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct TrustAnchors {
    /// Key for ROM and OTP signed images
    pub pub_key: Option<ImageEccPubKey>,

    /// Hash of the key embedded in image signed headers
    pub pub_key_digest: Option<ImageDigest>,
}

impl TrustAnchors {
    pub const fn builtin() -> Self {
        Self {
            pub_key: Some(BUILTIN_PUB_KEY),
            pub_key_digest: Some(BUILTIN_PUB_KEY_DIGEST),
        }
    }

    /// Replace `fallback` with the anchors provisioned in OTP.
    ///
    /// OTP anchors are taken as a pair: when either asset is missing or has
    /// the wrong size, the step is recorded and `fallback` stays in use.
    /// Module errors other than a missing asset are returned.
    pub fn load<T: MailboxTransport, R: BootStatusRecorder + ?Sized>(
        hsm: &mut Hsm<T>,
        recorder: &mut R,
        fallback: TrustAnchors,
    ) -> SbootResult<TrustAnchors> {
        let key = match hsm.asset_search(SECURE_BOOT_PUBKEY_NUM)? {
            Some(found) if found.len as usize == PUB_KEY_SIZE => found.asset,
            _ => {
                cprintln!("[anchors] no OTP key, using built-in");
                report_boot_step(recorder, BootStep::HsmNoPubKey);
                return Ok(fallback);
            }
        };
        let hash = match hsm.asset_search(SECURE_BOOT_PUBHASH_NUM)? {
            Some(found) if found.len as usize == core::mem::size_of::<ImageDigest>() => {
                found.asset
            }
            _ => {
                cprintln!("[anchors] no OTP key hash, using built-in");
                report_boot_step(recorder, BootStep::HsmNoPubHash);
                return Ok(fallback);
            }
        };

        let mut pub_key = ImageEccPubKey::default();
        let key_len = hsm.public_data_read(key, pub_key.as_bytes_mut())?;
        let mut digest = ImageDigest::default();
        let hash_len = hsm.public_data_read(hash, &mut digest)?;
        if key_len != PUB_KEY_SIZE || hash_len != digest.len() {
            return Err(SbootError::ROM_TRUST_ANCHOR_READ_FAILURE);
        }

        Ok(TrustAnchors {
            pub_key: Some(pub_key),
            pub_key_digest: Some(digest),
        })
    }
}
