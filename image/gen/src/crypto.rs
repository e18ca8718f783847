/*++

Licensed under the Apache-2.0 license.

File Name:

   crypto.rs

Abstract:

    File contains the RustCrypto implementation of the image generator
    crypto operations.

--*/

use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use sha2::{Digest, Sha256};

use crate::{ImageEccPrivKey, ImageGeneratorCrypto};
use sboot_image_types::*;

#[derive(Default)]
pub struct RustCrypto {}

impl ImageGeneratorCrypto for RustCrypto {
    fn sha256_digest(&self, parts: &[&[u8]]) -> anyhow::Result<ImageDigest> {
        let mut engine = Sha256::new();
        for part in parts {
            engine.update(part);
        }
        Ok(engine.finalize().into())
    }

    fn ecdsa256_sign(
        &self,
        digest: &ImageDigest,
        priv_key: &ImageEccPrivKey,
    ) -> anyhow::Result<ImageEccSignature> {
        let sig: Signature = SigningKey::from_slice(priv_key)?.sign_prehash(digest)?;
        let (r, s) = sig.split_bytes();

        let mut image_sig = ImageEccSignature::default();
        image_sig.r.copy_from_slice(&r);
        image_sig.s.copy_from_slice(&s);
        Ok(image_sig)
    }

    fn ecc256_pub_key(&self, priv_key: &ImageEccPrivKey) -> anyhow::Result<ImageEccPubKey> {
        let point = SigningKey::from_slice(priv_key)?
            .verifying_key()
            .to_encoded_point(false);

        let x = point
            .x()
            .ok_or_else(|| anyhow::anyhow!("Error parsing x coordinate"))?;
        let y = point
            .y()
            .ok_or_else(|| anyhow::anyhow!("Error parsing y coordinate"))?;

        let mut image_key = ImageEccPubKey::default();
        image_key.x.copy_from_slice(x);
        image_key.y.copy_from_slice(y);
        Ok(image_key)
    }
}
