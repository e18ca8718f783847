/*++

Licensed under the Apache-2.0 license.

File Name:

   generator.rs

Abstract:

    Signed boot image generator

--*/
use anyhow::bail;
use sboot_image_types::*;
use zerocopy::AsBytes;

use crate::*;

/// Image generator
pub struct ImageGenerator<Crypto: ImageGeneratorCrypto> {
    crypto: Crypto,
}

impl<Crypto: ImageGeneratorCrypto> ImageGenerator<Crypto> {
    /// Create an instance `ImageGenerator`
    pub fn new(crypto: Crypto) -> Self {
        Self { crypto }
    }

    /// Generate image
    ///
    /// # Arguments
    ///
    /// * `config` - Image generator configuration
    ///
    /// # Returns
    ///
    /// * `ImageBundle` - Signed image
    pub fn generate(&self, config: &ImageGeneratorConfig) -> anyhow::Result<ImageBundle> {
        if config.payload.len() > u32::MAX as usize {
            bail!("Payload larger than {} bytes", u32::MAX);
        }

        let mut header = ImageHeader::default();
        header
            .set_image_type(config.image_tag, SBIF_VERSION)
            .set_pub_key_type(config.pub_key_type)
            .set_image_len(config.payload.len() as u32)
            .set_certificate_count(0);
        *header.attributes_mut() = self.gen_attributes(config)?;

        if config.pub_key_type == PubKeyType::Image {
            header.set_pub_key(self.crypto.ecc256_pub_key(&config.priv_key)?);
        }

        let mut bundle = ImageBundle {
            header,
            payload: config.payload.clone(),
        };
        self.sign(&mut bundle, &config.priv_key)?;
        Ok(bundle)
    }

    /// Sign `bundle` in place with `priv_key`.
    ///
    /// Useful after a test has edited the header and wants a signature that
    /// still matches.
    pub fn sign(&self, bundle: &mut ImageBundle, priv_key: &ImageEccPrivKey) -> anyhow::Result<()> {
        let digest = self.signed_digest(&bundle.header, &bundle.payload)?;
        let sig = self.crypto.ecdsa256_sign(&digest, priv_key)?;
        bundle.header.set_signature(sig);
        Ok(())
    }

    /// Digest covered by the image signature.
    pub fn signed_digest(
        &self,
        header: &ImageHeader,
        payload: &[u8],
    ) -> anyhow::Result<ImageDigest> {
        let bytes = header.as_bytes();
        self.crypto.sha256_digest(&[
            &bytes[ImageHeader::signed_prefix_range()],
            &bytes[ImageHeader::signed_tail_range()],
            payload,
        ])
    }

    /// Hash of a public key, as provisioned in OTP for `PubKeyType::Image`.
    pub fn pub_key_digest(&self, pub_key: &ImageEccPubKey) -> anyhow::Result<ImageDigest> {
        self.crypto.sha256_digest(&[pub_key.as_bytes()])
    }

    fn gen_attributes(&self, config: &ImageGeneratorConfig) -> anyhow::Result<ImageAttributes> {
        let mut list = vec![(SBIF_ATTRIBUTE_VERSION, SBIF_ATTRIBUTE_VERSION_CURRENT)];
        if let Some(rollback_id) = config.rollback_id {
            list.push((SBIF_ATTRIBUTE_ROLLBACK_ID, rollback_id));
        }

        let mut extensions = config.extensions.clone();
        extensions.sort_by_key(|(ty, _)| *ty);
        for (ty, value) in extensions {
            if ty & SBIF_ATTRIBUTE_EXTENSION == 0 {
                bail!("Attribute {ty:#x} is not a vendor extension");
            }
            if list.iter().any(|(existing, _)| *existing == ty) {
                bail!("Duplicate attribute {ty:#x}");
            }
            list.push((ty, value));
        }

        if list.len() > SBIF_NUM_ATTRIBUTES {
            bail!("More than {SBIF_NUM_ATTRIBUTES} attributes");
        }

        let mut attrs = ImageAttributes::default();
        for (slot, (ty, value)) in attrs.elements_mut().iter_mut().zip(list) {
            *slot = ImageAttribute::new(ty, value);
        }
        Ok(attrs)
    }
}
