/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the signed boot image generator.

--*/

mod crypto;
mod generator;

pub mod fake_keys;

pub use crypto::RustCrypto;
pub use generator::ImageGenerator;

use sboot_image_types::*;
use zerocopy::AsBytes;

pub type ImageEccPrivKey = ImageScalar;

/// Image Generator Crypto Trait
pub trait ImageGeneratorCrypto {
    /// Calculate the SHA-256 digest over the concatenation of `parts`
    fn sha256_digest(&self, parts: &[&[u8]]) -> anyhow::Result<ImageDigest>;

    /// Calculate ECDSA P-256 Signature over a digest
    fn ecdsa256_sign(
        &self,
        digest: &ImageDigest,
        priv_key: &ImageEccPrivKey,
    ) -> anyhow::Result<ImageEccSignature>;

    /// Derive the public key of `priv_key`
    fn ecc256_pub_key(&self, priv_key: &ImageEccPrivKey) -> anyhow::Result<ImageEccPubKey>;
}

/// Image Generator Configuration
#[derive(Debug, Clone)]
pub struct ImageGeneratorConfig {
    /// Image tag, one of the `SBIF_IMAGE_*` values
    pub image_tag: u32,

    /// Where the boot ROM finds the verification key
    pub pub_key_type: PubKeyType,

    /// Signing key
    pub priv_key: ImageEccPrivKey,

    /// Rollback identifier; omitted from the attributes when `None`
    pub rollback_id: Option<u32>,

    /// Vendor extension attributes
    pub extensions: Vec<(u32, u32)>,

    /// Image payload
    pub payload: Vec<u8>,
}

impl Default for ImageGeneratorConfig {
    fn default() -> Self {
        Self {
            image_tag: SBIF_IMAGE_BLP,
            pub_key_type: PubKeyType::Otp,
            priv_key: fake_keys::SIGNING_KEY_PRIVATE,
            rollback_id: None,
            extensions: Vec::new(),
            payload: Vec::new(),
        }
    }
}

/// Signed image: header followed by the payload
#[derive(Debug, Default, Clone)]
pub struct ImageBundle {
    pub header: ImageHeader,
    pub payload: Vec<u8>,
}

impl ImageBundle {
    /// Serialized image as it is stored on boot media.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(IMAGE_HEADER_BYTE_SIZE + self.payload.len());
        bytes.extend_from_slice(self.header.as_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}
