// Licensed under the Apache-2.0 license

//! Well-known signing keys for tests and development images. Never
//! provision these on a production part.

use crate::ImageEccPrivKey;

/// Key image signatures are made with by default.
pub const SIGNING_KEY_PRIVATE: ImageEccPrivKey = [
    0xc9, 0xaf, 0xa9, 0xd8, 0x45, 0xba, 0x75, 0x16, 0x6b, 0x5c, 0x21, 0x57, 0x67, 0xb1, 0xd6,
    0x93, 0x4e, 0x50, 0xc3, 0xdb, 0x36, 0xe8, 0x9b, 0x12, 0x7b, 0x8a, 0x62, 0x2b, 0x12, 0x0f,
    0x67, 0x21,
];

/// A second key, used to produce images the trust anchor does not accept.
pub const ROGUE_KEY_PRIVATE: ImageEccPrivKey = [
    0x51, 0x9b, 0x42, 0x3d, 0x71, 0x5f, 0x8b, 0x58, 0x1f, 0x4f, 0xa8, 0xee, 0x59, 0xf4, 0x77,
    0x1a, 0x5b, 0x44, 0xc8, 0x13, 0x0b, 0x4e, 0x3e, 0xac, 0xca, 0x54, 0xa5, 0x6d, 0xda, 0x72,
    0xb4, 0x64,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageGeneratorCrypto, RustCrypto};

    #[test]
    fn test_signing_key_public() {
        let key = RustCrypto::default()
            .ecc256_pub_key(&SIGNING_KEY_PRIVATE)
            .unwrap();
        assert_eq!(
            hex::encode(key.x),
            "60fed4ba255a9d31c961eb74c6356d68c049b8923b61fa6ce669622e60f29fb6"
        );
        assert_eq!(
            hex::encode(key.y),
            "7903fe1008b8bc99a41ae9e95628bc64f2f1b20c2d7e9f5177a3c294d4462299"
        );
    }

    #[test]
    fn test_keys_differ() {
        let crypto = RustCrypto::default();
        assert_ne!(
            crypto.ecc256_pub_key(&SIGNING_KEY_PRIVATE).unwrap(),
            crypto.ecc256_pub_key(&ROGUE_KEY_PRIVATE).unwrap()
        );
    }
}
