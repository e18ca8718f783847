/*++

Licensed under the Apache-2.0 license.

File Name:

    ecc256_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for ECC-256 cryptography operations.

--*/

use rand_core::RngCore;
use sboot_drivers::{
    Array4x8, Ecc256Digest, Ecc256PrivKey, Ecc256PubKey, Ecc256Signature, Hsm, MailboxTransport,
    SbootError, SbootResult,
};

const PRIV_KEY: Ecc256PrivKey = Array4x8([
    0xc9afa9d8, 0x45ba7516, 0x6b5c2157, 0x67b1d693, 0x4e50c3db, 0x36e89b12, 0x7b8a622b, 0x120f6721,
]);

const PUB_KEY: Ecc256PubKey = Ecc256PubKey {
    x: Array4x8([
        0x60fed4ba, 0x255a9d31, 0xc961eb74, 0xc6356d68, 0xc049b892, 0x3b61fa6c, 0xe669622e,
        0x60f29fb6,
    ]),
    y: Array4x8([
        0x7903fe10, 0x08b8bc99, 0xa41ae9e9, 0x5628bc64, 0xf2f1b20c, 0x2d7e9f51, 0x77a3c294,
        0xd4462299,
    ]),
};

/// SHA-256("sample")
const DIGEST: Ecc256Digest = Array4x8([
    0xaf2bdbe1, 0xaa9b6ec1, 0xe2ade1d6, 0x94f41fc7, 0x1a831d02, 0x68e98915, 0x62113d8a, 0x62add1bf,
]);

const SIGNATURE: Ecc256Signature = Ecc256Signature {
    r: Array4x8([
        0xefd48b2a, 0xacb6a8fd, 0x1140dd9c, 0xd45e81d6, 0x9d2c877b, 0x56aaf991, 0xc34d0ea8,
        0x4eaf3716,
    ]),
    s: Array4x8([
        0xf7cb1c94, 0x2d657c41, 0xd436c7a1, 0xb6e29f65, 0xf3e900db, 0xb9aff406, 0x4dc4ab2f,
        0x843acda8,
    ]),
};

/// Seeds drawn before signing gives up
const SIGN_MAX_ATTEMPTS: u32 = 4;

#[derive(Default, Debug)]
pub struct Ecc256Kat {}

impl Ecc256Kat {
    /// This function executes the Known Answer Tests (aka KAT) for ECC256.
    ///
    /// Test vector source:
    /// RFC 6979 A.2.5
    ///
    /// # Arguments
    ///
    /// * `hsm` - Security module
    /// * `rng` - Seed source for the signing test
    ///
    /// # Returns
    ///
    /// * `SbootResult` - Result denoting the KAT outcome.
    pub fn execute<T: MailboxTransport, R: RngCore>(
        &self,
        hsm: &mut Hsm<T>,
        rng: &mut R,
    ) -> SbootResult<()> {
        self.kat_signature_verify(hsm)?;
        self.kat_tamper_rejected(hsm)?;
        self.kat_sign_pairwise(hsm, rng)
    }

    fn kat_signature_verify<T: MailboxTransport>(&self, hsm: &mut Hsm<T>) -> SbootResult<()> {
        if !hsm
            .ecc256_verify(&PUB_KEY, &DIGEST, &SIGNATURE)
            .map_err(|_| SbootError::KAT_ECC256_VERIFY_FAILURE)?
        {
            Err(SbootError::KAT_ECC256_SIGNATURE_MISMATCH)?;
        }
        Ok(())
    }

    fn kat_tamper_rejected<T: MailboxTransport>(&self, hsm: &mut Hsm<T>) -> SbootResult<()> {
        let mut digest = DIGEST;
        digest.0[7] ^= 1;
        if hsm
            .ecc256_verify(&PUB_KEY, &digest, &SIGNATURE)
            .map_err(|_| SbootError::KAT_ECC256_VERIFY_FAILURE)?
        {
            Err(SbootError::KAT_ECC256_TAMPER_ACCEPTED)?;
        }
        Ok(())
    }

    /// The engine's nonce is random, so the signature itself cannot be
    /// compared; it must verify under the matching public key instead.
    fn kat_sign_pairwise<T: MailboxTransport, R: RngCore>(
        &self,
        hsm: &mut Hsm<T>,
        rng: &mut R,
    ) -> SbootResult<()> {
        let signature = hsm
            .ecc256_sign_bounded(&PRIV_KEY, &DIGEST, rng, SIGN_MAX_ATTEMPTS)
            .map_err(|_| SbootError::KAT_ECC256_SIGN_FAILURE)?;
        if !hsm
            .ecc256_verify(&PUB_KEY, &DIGEST, &signature)
            .map_err(|_| SbootError::KAT_ECC256_VERIFY_FAILURE)?
        {
            Err(SbootError::KAT_ECC256_PAIRWISE_FAILURE)?;
        }
        Ok(())
    }
}
