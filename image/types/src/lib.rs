/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the signed boot image format (SBIF).

--*/

#![cfg_attr(not(feature = "std"), no_std)]

use core::ops::Range;

use getset::{Getters, MutGetters, Setters};
use memoffset::{offset_of, span_of};
use zerocopy::byteorder::{BigEndian, U32};
use zerocopy::{AsBytes, FromBytes};

/// Plaintext bootloader image
pub const SBIF_IMAGE_BLP: u32 = 0x424C70;
/// Wrapped-key bootloader image
pub const SBIF_IMAGE_BLW: u32 = 0x424C77;
/// Encrypted bootloader image
pub const SBIF_IMAGE_BLE: u32 = 0x424C65;
/// Image with an external key derivation
pub const SBIF_IMAGE_BLX: u32 = 0x424C78;

pub const SBIF_VERSION: u8 = 2;

pub const SBIF_NUM_ATTRIBUTES: usize = 8;
pub const SBIF_MAX_CERTIFICATES: u32 = 8;

pub const SBIF_ATTRIBUTE_UNUSED: u32 = 0;
pub const SBIF_ATTRIBUTE_VERSION: u32 = 1;
pub const SBIF_ATTRIBUTE_ROLLBACK_ID: u32 = 2;
pub const SBIF_ATTRIBUTE_SPI: u32 = 0x8000_0001;
pub const SBIF_ATTRIBUTE_SCRTU_FW: u32 = 0x8000_0002;
pub const SBIF_ATTRIBUTE_DDR_FW: u32 = 0x8000_0003;
pub const SBIF_ATTRIBUTE_TOTAL_SIZE: u32 = 0x8000_0004;
pub const SBIF_ATTRIBUTE_SPI_BL33_ADDR: u32 = 0x8000_0005;
pub const SBIF_ATTRIBUTE_SPI_BL33_SIZE: u32 = 0x8000_0006;
pub const SBIF_ATTRIBUTE_VERSION_CURRENT: u32 = 0;

/// Attribute types with this bit set are vendor extensions.
pub const SBIF_ATTRIBUTE_EXTENSION: u32 = 0x8000_0000;

pub const ECC256_SCALAR_BYTE_SIZE: usize = 32;
pub const SHA256_DIGEST_BYTE_SIZE: usize = 32;
pub const SBIF_ENCRYPTION_KEY_BYTE_SIZE: usize = 40;
pub const SBIF_ENCRYPTION_IV_BYTE_SIZE: usize = 16;

pub const IMAGE_HEADER_BYTE_SIZE: usize = core::mem::size_of::<ImageHeader>();
pub const IMAGE_CERTIFICATE_BYTE_SIZE: usize = core::mem::size_of::<ImageCertificate>();

pub type ImageScalar = [u8; ECC256_SCALAR_BYTE_SIZE];
pub type ImageDigest = [u8; SHA256_DIGEST_BYTE_SIZE];

/// Where the verifier finds the key that signed the image
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum PubKeyType {
    /// Key built into the boot ROM
    Rom = 1,

    /// Key provisioned in OTP
    Otp = 2,

    /// Key embedded in the header, authenticated by its OTP hash
    Image = 3,
}

impl TryFrom<u32> for PubKeyType {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PubKeyType::Rom),
            2 => Ok(PubKeyType::Otp),
            3 => Ok(PubKeyType::Image),
            _ => Err(value),
        }
    }
}

impl From<PubKeyType> for u32 {
    fn from(value: PubKeyType) -> Self {
        value as u32
    }
}

/// Image identifier of the boot stage being verified
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageId {
    Bl2,
    Bl31,
    Bl32,
    Bl33,
    NsBl1u,
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Getters, Setters, Copy, Clone, Eq, PartialEq)]
pub struct ImageEccPubKey {
    /// X Coordinate
    #[getset(get = "pub", set = "pub")]
    pub x: ImageScalar,

    /// Y Coordinate
    #[getset(get = "pub", set = "pub")]
    pub y: ImageScalar,
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Getters, Setters, Copy, Clone, Eq, PartialEq)]
pub struct ImageEccSignature {
    /// Random point
    #[getset(get = "pub", set = "pub")]
    pub r: ImageScalar,

    /// Proof
    #[getset(get = "pub", set = "pub")]
    pub s: ImageScalar,
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageAttribute {
    element_type: U32<BigEndian>,
    value: U32<BigEndian>,
}

impl ImageAttribute {
    pub fn new(element_type: u32, value: u32) -> Self {
        Self {
            element_type: U32::new(element_type),
            value: U32::new(value),
        }
    }

    pub fn element_type(&self) -> u32 {
        self.element_type.get()
    }

    pub fn value(&self) -> u32 {
        self.value.get()
    }
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageAttributes {
    elements: [ImageAttribute; SBIF_NUM_ATTRIBUTES],
}

impl ImageAttributes {
    pub fn elements(&self) -> &[ImageAttribute] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [ImageAttribute] {
        &mut self.elements
    }

    /// Check the attribute list is well formed.
    ///
    /// The first element must be VERSION with the current version. The
    /// remaining used elements must have strictly increasing types, and
    /// types above ROLLBACK_ID must be extensions.
    pub fn is_valid(&self) -> bool {
        let first = &self.elements[0];
        if first.element_type() != SBIF_ATTRIBUTE_VERSION
            || first.value() != SBIF_ATTRIBUTE_VERSION_CURRENT
        {
            return false;
        }

        let mut last = first.element_type();
        for element in &self.elements[1..] {
            let ty = element.element_type();
            if ty == SBIF_ATTRIBUTE_UNUSED {
                continue;
            }
            if ty <= last {
                return false;
            }
            if ty > SBIF_ATTRIBUTE_ROLLBACK_ID && ty & SBIF_ATTRIBUTE_EXTENSION == 0 {
                return false;
            }
            last = ty;
        }
        true
    }

    /// Value of the first element with type `element_type`.
    pub fn fetch(&self, element_type: u32) -> Option<u32> {
        self.elements
            .iter()
            .find(|e| e.element_type() == element_type)
            .map(|e| e.value())
    }

    pub fn rollback_id(&self) -> Option<u32> {
        self.fetch(SBIF_ATTRIBUTE_ROLLBACK_ID)
    }
}

/// Certificate chained after the header
#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Getters, Setters, Copy, Clone)]
pub struct ImageCertificate {
    #[getset(get = "pub", set = "pub")]
    pub_key: ImageEccPubKey,

    #[getset(get = "pub", set = "pub")]
    signature: ImageEccSignature,
}

/// Signed image header.
///
/// All integer fields are stored big-endian.
#[repr(C)]
#[derive(AsBytes, FromBytes, Debug, Getters, Setters, MutGetters, Copy, Clone)]
pub struct ImageHeader {
    image_type: U32<BigEndian>,

    pub_key_type: U32<BigEndian>,

    /// Signature over the signed ranges of the header and the payload
    #[getset(get = "pub", set = "pub")]
    signature: ImageEccSignature,

    /// Signing key, when the header carries it
    #[getset(get = "pub", set = "pub")]
    pub_key: ImageEccPubKey,

    /// Wrapped payload key for encrypted images
    #[getset(get = "pub", get_mut = "pub")]
    encryption_key: [u8; SBIF_ENCRYPTION_KEY_BYTE_SIZE],

    #[getset(get = "pub", get_mut = "pub")]
    encryption_iv: [u8; SBIF_ENCRYPTION_IV_BYTE_SIZE],

    image_len: U32<BigEndian>,

    #[getset(get = "pub", get_mut = "pub")]
    attributes: ImageAttributes,

    certificate_count: U32<BigEndian>,
}

impl Default for ImageHeader {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

impl ImageHeader {
    /// Image tag, the upper 24 bits of the type word.
    pub fn image_tag(&self) -> u32 {
        self.image_type.get() >> 8
    }

    /// Format version, the low byte of the type word.
    pub fn version(&self) -> u8 {
        self.image_type.get() as u8
    }

    pub fn set_image_type(&mut self, tag: u32, version: u8) -> &mut Self {
        self.image_type.set((tag << 8) | u32::from(version));
        self
    }

    /// Raw key type; the upper byte is reserved.
    pub fn pub_key_type_raw(&self) -> u32 {
        self.pub_key_type.get() & 0x00FF_FFFF
    }

    pub fn pub_key_type(&self) -> Option<PubKeyType> {
        PubKeyType::try_from(self.pub_key_type_raw()).ok()
    }

    pub fn set_pub_key_type(&mut self, ty: PubKeyType) -> &mut Self {
        self.pub_key_type.set(ty.into());
        self
    }

    /// Payload length in bytes.
    pub fn image_len(&self) -> u32 {
        self.image_len.get()
    }

    pub fn set_image_len(&mut self, len: u32) -> &mut Self {
        self.image_len.set(len);
        self
    }

    pub fn certificate_count(&self) -> u32 {
        self.certificate_count.get()
    }

    pub fn set_certificate_count(&mut self, count: u32) -> &mut Self {
        self.certificate_count.set(count);
        self
    }

    /// Whether the payload is encrypted and must be decrypted after
    /// verification.
    pub fn is_encrypted(&self) -> bool {
        matches!(
            self.image_tag(),
            SBIF_IMAGE_BLW | SBIF_IMAGE_BLE | SBIF_IMAGE_BLX
        )
    }

    /// Header size including the certificates, or None when the
    /// certificate count is out of range.
    pub fn total_size(&self) -> Option<usize> {
        let count = self.certificate_count();
        if count > SBIF_MAX_CERTIFICATES {
            return None;
        }
        Some(IMAGE_HEADER_BYTE_SIZE + count as usize * IMAGE_CERTIFICATE_BYTE_SIZE)
    }

    /// Returns the `Range<usize>` of the signed words before the signature
    pub fn signed_prefix_range() -> Range<usize> {
        let span = span_of!(ImageHeader, image_type..=pub_key_type);
        span.start..span.end
    }

    /// Returns the `Range<usize>` of the signed header bytes after the
    /// signature, certificates excluded
    pub fn signed_tail_range() -> Range<usize> {
        offset_of!(ImageHeader, pub_key)..IMAGE_HEADER_BYTE_SIZE
    }

    /// Returns the `Range<usize>` containing the signature
    pub fn signature_range() -> Range<usize> {
        let span = span_of!(ImageHeader, signature);
        span.start..span.end
    }
}
