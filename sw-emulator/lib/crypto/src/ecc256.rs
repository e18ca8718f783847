/*++

Licensed under the Apache-2.0 license.

File Name:

    ecc256.rs

Abstract:

    File contains implementation of Elliptic Curve Cryptography P-256 (ECC-256) Algorithm.

--*/

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::{EncodedPoint, FieldBytes};

/// ECC-256 coordinate size in bytes
pub const ECC_256_COORD_SIZE: usize = 32;

/// ECC-256 Coordinate
pub type Ecc256Scalar = [u8; ECC_256_COORD_SIZE];

/// ECC-256 Private Key
pub type Ecc256PrivKey = Ecc256Scalar;

/// ECC-256 Public Key
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Ecc256PubKey {
    /// X coordinate
    pub x: Ecc256Scalar,

    /// Y coordinate
    pub y: Ecc256Scalar,
}

impl Ecc256PubKey {
    fn from_point(point: &EncodedPoint) -> Option<Self> {
        let mut pub_key = Self::default();
        pub_key.x.copy_from_slice(point.x()?);
        pub_key.y.copy_from_slice(point.y()?);
        Some(pub_key)
    }
}

impl From<&Ecc256PubKey> for EncodedPoint {
    fn from(key: &Ecc256PubKey) -> Self {
        EncodedPoint::from_affine_coordinates(
            &FieldBytes::from(key.x),
            &FieldBytes::from(key.y),
            false,
        )
    }
}

/// ECC-256 Signature
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Ecc256Signature {
    /// Random point
    pub r: Ecc256Scalar,

    /// Proof
    pub s: Ecc256Scalar,
}

impl From<Signature> for Ecc256Signature {
    fn from(ecc_sig: Signature) -> Self {
        let mut sig = Self::default();
        sig.r.copy_from_slice(ecc_sig.r().to_bytes().as_slice());
        sig.s.copy_from_slice(ecc_sig.s().to_bytes().as_slice());
        sig
    }
}

impl TryFrom<&Ecc256Signature> for Signature {
    type Error = p256::ecdsa::Error;

    fn try_from(signature: &Ecc256Signature) -> Result<Self, Self::Error> {
        Signature::from_scalars(FieldBytes::from(signature.r), FieldBytes::from(signature.s))
    }
}

pub enum Ecc256 {}

impl Ecc256 {
    /// Compute the public key of `priv_key`.
    ///
    /// # Result
    ///
    /// * `Option<Ecc256PubKey>` - None if `priv_key` is zero or not below
    ///   the group order
    pub fn public_key(priv_key: &Ecc256PrivKey) -> Option<Ecc256PubKey> {
        let signing_key = SigningKey::from_slice(priv_key).ok()?;
        Ecc256PubKey::from_point(&signing_key.verifying_key().to_encoded_point(false))
    }

    /// Sign the hash with specified private key
    ///
    /// # Arguments
    ///
    /// * `priv_key` - Private key
    /// * `hash`     - Hash to sign
    /// * `seed`     - Random seed; must itself be a valid scalar
    ///
    /// # Result
    ///
    /// * `Option<Ecc256Signature>` - None if the key or seed is unusable
    pub fn sign(
        priv_key: &Ecc256PrivKey,
        hash: &Ecc256Scalar,
        seed: &Ecc256Scalar,
    ) -> Option<Ecc256Signature> {
        // The engine nonce is derived per RFC 6979; the seed only gates it.
        SigningKey::from_slice(seed).ok()?;
        let signing_key = SigningKey::from_slice(priv_key).ok()?;
        let ecc_sig: Signature = signing_key.sign_prehash(hash).ok()?;
        Some(ecc_sig.into())
    }

    /// Verify the signature
    ///
    /// A public key off the curve or a signature with out of range scalars
    /// fails verification.
    pub fn verify(
        pub_key: &Ecc256PubKey,
        hash: &Ecc256Scalar,
        signature: &Ecc256Signature,
    ) -> bool {
        let point = EncodedPoint::from(pub_key);
        let Ok(verifying_key) = VerifyingKey::from_encoded_point(&point) else {
            return false;
        };
        let Ok(signature) = Signature::try_from(signature) else {
            return false;
        };
        verifying_key.verify_prehash(hash, &signature).is_ok()
    }
}
