/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    Image Verification support routines.

--*/

use sboot_drivers::token::{HashAlgorithm, HASH_BLOCK_SIZE};
use sboot_drivers::*;
use sboot_image_types::*;
use sboot_image_verify::ImageVerificationEnv;

use crate::anchors::TrustAnchors;

/// Largest monotonic counter object read for the rollback floor
const MONOTONIC_COUNTER_MAX_SIZE: usize = 64;

/// OTP monotonic counter holding the rollback floor of `image_id`
pub fn monotonic_counter_num(image_id: ImageId) -> u32 {
    match image_id {
        ImageId::Bl2 => 10,
        ImageId::Bl31 => 11,
        ImageId::Bl32 => 12,
        ImageId::Bl33 => 13,
        ImageId::NsBl1u => 14,
    }
}

/// ROM Verification Environment
pub struct RomImageVerificationEnv<'a, 'm, T: MailboxTransport> {
    hsm: &'a mut Hsm<'m, T>,
    anchors: TrustAnchors,
}

impl<'a, 'm, T: MailboxTransport> RomImageVerificationEnv<'a, 'm, T> {
    /// Create an instance `RomImageVerificationEnv`
    pub fn new(hsm: &'a mut Hsm<'m, T>, anchors: TrustAnchors) -> Self {
        Self { hsm, anchors }
    }
}

impl<'a, 'm, T: MailboxTransport> ImageVerificationEnv for RomImageVerificationEnv<'a, 'm, T> {
    /// Calculate Digest using the module's hash engine.
    ///
    /// The parts are streamed as one message. Bytes that do not fill a hash
    /// block wait in `carry` until the next part completes it.
    fn sha256_digest(&mut self, parts: &[&[u8]]) -> SbootResult<ImageDigest> {
        let mut session = self.hsm.hash_init(HashAlgorithm::Sha256)?;
        let mut carry = [0u8; HASH_BLOCK_SIZE];
        let mut carry_len = 0;

        for part in parts {
            let mut data = *part;
            while !data.is_empty() {
                if carry_len == HASH_BLOCK_SIZE {
                    session.update(&carry)?;
                    carry_len = 0;
                }
                if carry_len == 0 && data.len() > HASH_BLOCK_SIZE {
                    // Keep the last block back so finish always has data
                    let aligned = (data.len() - 1) / HASH_BLOCK_SIZE * HASH_BLOCK_SIZE;
                    let (head, rest) = data.split_at(aligned);
                    session.update(head)?;
                    data = rest;
                    continue;
                }
                let take = (HASH_BLOCK_SIZE - carry_len).min(data.len());
                let (head, rest) = data.split_at(take);
                carry[carry_len..carry_len + take].copy_from_slice(head);
                carry_len += take;
                data = rest;
            }
        }

        let digest = session.finish(&carry[..carry_len])?;
        digest
            .to_array4x8()
            .map(|d| d.to_be_bytes())
            .ok_or(SbootError::DRIVER_HASH_UNSUPPORTED_ALGORITHM)
    }

    /// ECC-256 Verification routine
    fn ecc256_verify(
        &mut self,
        digest: &ImageDigest,
        pub_key: &ImageEccPubKey,
        sig: &ImageEccSignature,
    ) -> SbootResult<bool> {
        let pub_key = Ecc256PubKey {
            x: pub_key.x.into(),
            y: pub_key.y.into(),
        };
        let digest: Ecc256Digest = digest.into();
        let sig = Ecc256Signature {
            r: sig.r.into(),
            s: sig.s.into(),
        };
        self.hsm.ecc256_verify(&pub_key, &digest, &sig)
    }

    /// ROM and OTP signed images share the provisioned key
    fn trusted_pub_key(&mut self, key_type: PubKeyType) -> SbootResult<Option<ImageEccPubKey>> {
        Ok(match key_type {
            PubKeyType::Rom | PubKeyType::Otp => self.anchors.pub_key,
            PubKeyType::Image => None,
        })
    }

    fn trusted_pub_key_digest(&mut self) -> SbootResult<Option<ImageDigest>> {
        Ok(self.anchors.pub_key_digest)
    }

    /// Population count of the image's monotonic counter, 0 without one
    fn rollback_floor(&mut self, image_id: ImageId) -> SbootResult<u32> {
        let counter = match self.hsm.asset_search(monotonic_counter_num(image_id))? {
            Some(found) => found,
            None => {
                cprintln!("[rom-verify] no rollback counter");
                return Ok(0);
            }
        };

        let mut value = [0u8; MONOTONIC_COUNTER_MAX_SIZE];
        let len = self.hsm.monotonic_counter_read(counter.asset, &mut value)?;
        let floor = value
            .get(..len)
            .ok_or(SbootError::DRIVER_ASSET_BUFFER_TOO_SMALL)?
            .iter()
            .map(|b| b.count_ones())
            .sum::<u32>();
        cprintln!("[rom-verify] rollback floor {}", floor);
        Ok(floor)
    }
}
