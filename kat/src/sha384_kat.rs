/*++

Licensed under the Apache-2.0 license.

File Name:

    sha384_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for SHA2-384 cryptography operations.

--*/

use sboot_drivers::token::HashAlgorithm;
use sboot_drivers::{Hsm, MailboxTransport, SbootError, SbootResult};

const ABC_DIGEST: [u8; 48] = [
    0xcb, 0x00, 0x75, 0x3f, 0x45, 0xa3, 0x5e, 0x8b, 0xb5, 0xa0, 0x3d, 0x69, 0x9a, 0xc6, 0x50, 0x07,
    0x27, 0x2c, 0x32, 0xab, 0x0e, 0xde, 0xd1, 0x63, 0x1a, 0x8b, 0x60, 0x5a, 0x43, 0xff, 0x5b, 0xed,
    0x80, 0x86, 0x07, 0x2b, 0xa1, 0xe7, 0xcc, 0x23, 0x58, 0xba, 0xec, 0xa1, 0x34, 0xc8, 0x25, 0xa7,
];

#[derive(Default, Debug)]
pub struct Sha384Kat {}

impl Sha384Kat {
    /// This function executes the Known Answer Tests (aka KAT) for SHA2-384.
    ///
    /// Test vector source:
    /// FIPS 180-2 Appendix D.1
    pub fn execute<T: MailboxTransport>(&self, hsm: &mut Hsm<T>) -> SbootResult<()> {
        let digest = hsm
            .hash_digest(HashAlgorithm::Sha384, b"abc")
            .map_err(|_| SbootError::KAT_SHA384_DIGEST_FAILURE)?;
        if digest.as_bytes() != ABC_DIGEST {
            Err(SbootError::KAT_SHA384_DIGEST_MISMATCH)?;
        }
        Ok(())
    }
}
