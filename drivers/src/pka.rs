/*++

Licensed under the Apache-2.0 license.

File Name:

    pka.rs

Abstract:

    File contains API for ECC-256 operations on the security module's
    public key engine.

--*/

use rand_core::RngCore;
use zerocopy::{AsBytes, FromBytes};
use zeroize::Zeroize;

use crate::dma::{DmaHandle, DmaPool};
use crate::hsm::Hsm;
use crate::mailbox::MailboxTransport;
use crate::token::{
    result_code, AssetId, PkAssetRequest, PkClaim, PkNumLoad, PkOperation, PkOperationCommand,
    ResultToken, TokenRequest,
};
use crate::{Array4x8, SbootError, SbootResult};

/// ECC-256 Coordinate
pub type Ecc256Scalar = Array4x8;

/// ECC-256 Private Key
pub type Ecc256PrivKey = Ecc256Scalar;

/// ECC-256 Message Digest
pub type Ecc256Digest = Ecc256Scalar;

const ECC256_WORDS: u8 = 8;
const ECC256_SCALAR_SIZE: usize = 32;
const ECC256_PAIR_SIZE: usize = 2 * ECC256_SCALAR_SIZE;

// Staging buffer layout: three input vectors followed by the output.
const PK_VECTOR_OFFSET: [usize; 3] = [0, 64, 128];
const PK_OUTPUT_OFFSET: usize = 192;
const PK_STAGING_SIZE: usize = 256;

/// Curve selector carried in the operation token
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum EccCurve {
    P256 = 1,
}

/// ECC-256 Public Key
#[repr(C)]
#[derive(AsBytes, FromBytes, Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Ecc256PubKey {
    /// X coordinate
    pub x: Ecc256Scalar,

    /// Y coordinate
    pub y: Ecc256Scalar,
}

impl Ecc256PubKey {
    /// Qx followed by Qy, big-endian.
    pub fn to_be_bytes(&self) -> [u8; ECC256_PAIR_SIZE] {
        concat_pair(&self.x, &self.y)
    }

    pub fn from_be_bytes(bytes: &[u8; ECC256_PAIR_SIZE]) -> Self {
        let (x, y) = split_pair(bytes);
        Self { x, y }
    }
}

/// ECC-256 Signature
#[repr(C)]
#[derive(AsBytes, FromBytes, Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Ecc256Signature {
    /// Random point
    pub r: Ecc256Scalar,

    /// Proof
    pub s: Ecc256Scalar,
}

impl Ecc256Signature {
    /// r followed by s, big-endian.
    pub fn to_be_bytes(&self) -> [u8; ECC256_PAIR_SIZE] {
        concat_pair(&self.r, &self.s)
    }

    pub fn from_be_bytes(bytes: &[u8; ECC256_PAIR_SIZE]) -> Self {
        let (r, s) = split_pair(bytes);
        Self { r, s }
    }
}

/// Outcome of a randomized engine operation.
///
/// `Retry` means the engine rejected the random seed; the caller must try
/// again with a fresh one.
#[must_use]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EccAttempt<T> {
    Done(T),
    Retry,
}

fn concat_pair(a: &Ecc256Scalar, b: &Ecc256Scalar) -> [u8; ECC256_PAIR_SIZE] {
    let mut out = [0u8; ECC256_PAIR_SIZE];
    let (lo, hi) = out.split_at_mut(ECC256_SCALAR_SIZE);
    lo.copy_from_slice(&a.to_be_bytes());
    hi.copy_from_slice(&b.to_be_bytes());
    out
}

fn split_pair(bytes: &[u8; ECC256_PAIR_SIZE]) -> (Ecc256Scalar, Ecc256Scalar) {
    let (lo, hi) = bytes.split_at(ECC256_SCALAR_SIZE);
    (
        Ecc256Scalar::from_be_slice(lo).unwrap_or_default(),
        Ecc256Scalar::from_be_slice(hi).unwrap_or_default(),
    )
}

fn stage_vectors(dma: &mut DmaPool, buf: DmaHandle, vectors: &[&[u8]]) -> SbootResult<()> {
    for (offset, vector) in PK_VECTOR_OFFSET.iter().zip(vectors) {
        dma.write(buf, *offset, vector)?;
    }
    Ok(())
}

fn random_scalar<R: RngCore>(rng: &mut R) -> Ecc256Scalar {
    let mut bytes = [0u8; ECC256_SCALAR_SIZE];
    rng.fill_bytes(&mut bytes);
    let scalar = Ecc256Scalar::from(&bytes);
    bytes.zeroize();
    scalar
}

/// Whether `pub_key` is a valid point on P-256.
#[cfg(feature = "point-check")]
pub fn ecc256_point_on_curve(pub_key: &Ecc256PubKey) -> bool {
    use p256::elliptic_curve::sec1::FromEncodedPoint;

    let point = p256::EncodedPoint::from_affine_coordinates(
        &pub_key.x.to_be_bytes().into(),
        &pub_key.y.to_be_bytes().into(),
        false,
    );
    bool::from(p256::AffinePoint::from_encoded_point(&point).is_some())
}

impl<'m, T: MailboxTransport> Hsm<'m, T> {
    /// Verify an ECDSA P-256 signature.
    ///
    /// # Arguments
    ///
    /// * `pub_key`   - Public key
    /// * `digest`    - Digest to verify
    /// * `signature` - Signature to verify
    ///
    /// # Returns
    ///
    /// * `bool` - False on a bad signature or a public key off the curve
    pub fn ecc256_verify(
        &mut self,
        pub_key: &Ecc256PubKey,
        digest: &Ecc256Digest,
        signature: &Ecc256Signature,
    ) -> SbootResult<bool> {
        self.with_dma(PK_STAGING_SIZE, |hsm, buf| {
            let base = hsm.dma_addr(buf)?;
            stage_vectors(
                hsm.dma_mut(),
                buf,
                &[
                    &pub_key.to_be_bytes()[..],
                    &signature.to_be_bytes()[..],
                    &digest.to_be_bytes()[..],
                ],
            )?;

            hsm.pk_session(|hsm| {
                hsm.pk_load(base, 0, ECC256_PAIR_SIZE)?;
                hsm.pk_load(base, 1, ECC256_PAIR_SIZE)?;
                hsm.pk_load(base, 2, ECC256_SCALAR_SIZE)?;
                let result = hsm.pk_operation(PkOperationCommand::EcdsaVerify, base, 0)?;
                verify_outcome(&result)
            })
        })
    }

    /// Sign `digest` with `priv_key` using the caller's random seed.
    pub fn ecc256_sign(
        &mut self,
        priv_key: &Ecc256PrivKey,
        digest: &Ecc256Digest,
        seed: &Ecc256Scalar,
    ) -> SbootResult<EccAttempt<Ecc256Signature>> {
        self.with_dma(PK_STAGING_SIZE, |hsm, buf| {
            let base = hsm.dma_addr(buf)?;
            let mut key = priv_key.to_be_bytes();
            let mut nonce = seed.to_be_bytes();
            let staged = stage_vectors(
                hsm.dma_mut(),
                buf,
                &[&key[..], &digest.to_be_bytes()[..], &nonce[..]],
            );
            key.zeroize();
            nonce.zeroize();
            staged?;

            let result = hsm.pk_session(|hsm| {
                hsm.pk_load(base, 0, ECC256_SCALAR_SIZE)?;
                hsm.pk_load(base, 1, ECC256_SCALAR_SIZE)?;
                hsm.pk_load(base, 2, ECC256_SCALAR_SIZE)?;
                hsm.pk_operation(PkOperationCommand::EcdsaSign, base, ECC256_PAIR_SIZE)
            })?;
            if result.pk_retry() {
                return Ok(EccAttempt::Retry);
            }
            let mut out = [0u8; ECC256_PAIR_SIZE];
            hsm.dma_mut().read(buf, PK_OUTPUT_OFFSET, &mut out)?;
            Ok(EccAttempt::Done(Ecc256Signature::from_be_bytes(&out)))
        })
    }

    /// Derive the public key for the private key `seed`.
    pub fn ecc256_key_pair(
        &mut self,
        seed: &Ecc256Scalar,
    ) -> SbootResult<EccAttempt<Ecc256PubKey>> {
        self.with_dma(PK_STAGING_SIZE, |hsm, buf| {
            let base = hsm.dma_addr(buf)?;
            let mut secret = seed.to_be_bytes();
            let staged = stage_vectors(hsm.dma_mut(), buf, &[&secret[..]]);
            secret.zeroize();
            staged?;

            let result = hsm.pk_session(|hsm| {
                hsm.pk_load(base, 0, ECC256_SCALAR_SIZE)?;
                hsm.pk_operation(PkOperationCommand::EccMultiply, base, ECC256_PAIR_SIZE)
            })?;
            if result.pk_retry() {
                return Ok(EccAttempt::Retry);
            }
            let mut out = [0u8; ECC256_PAIR_SIZE];
            hsm.dma_mut().read(buf, PK_OUTPUT_OFFSET, &mut out)?;
            Ok(EccAttempt::Done(Ecc256PubKey::from_be_bytes(&out)))
        })
    }

    /// Sign, drawing a fresh seed from `rng` for each attempt.
    pub fn ecc256_sign_bounded<R: RngCore>(
        &mut self,
        priv_key: &Ecc256PrivKey,
        digest: &Ecc256Digest,
        rng: &mut R,
        max_attempts: u32,
    ) -> SbootResult<Ecc256Signature> {
        if max_attempts == 0 {
            return Err(SbootError::DRIVER_PKA_ZERO_ATTEMPTS);
        }
        for _ in 0..max_attempts {
            let mut seed = random_scalar(rng);
            let attempt = self.ecc256_sign(priv_key, digest, &seed);
            seed.zeroize();
            if let EccAttempt::Done(signature) = attempt? {
                return Ok(signature);
            }
        }
        Err(SbootError::DRIVER_PKA_RETRY_EXHAUSTED)
    }

    /// Generate a key pair, drawing a fresh private key from `rng` for each
    /// attempt.
    pub fn ecc256_key_pair_bounded<R: RngCore>(
        &mut self,
        rng: &mut R,
        max_attempts: u32,
    ) -> SbootResult<(Ecc256PrivKey, Ecc256PubKey)> {
        if max_attempts == 0 {
            return Err(SbootError::DRIVER_PKA_ZERO_ATTEMPTS);
        }
        for _ in 0..max_attempts {
            let mut priv_key = random_scalar(rng);
            match self.ecc256_key_pair(&priv_key) {
                Ok(EccAttempt::Done(pub_key)) => return Ok((priv_key, pub_key)),
                Ok(EccAttempt::Retry) => priv_key.zeroize(),
                Err(err) => {
                    priv_key.zeroize();
                    return Err(err);
                }
            }
        }
        Err(SbootError::DRIVER_PKA_RETRY_EXHAUSTED)
    }

    /// Verify with a public key held by the module as an asset.
    pub fn ecc256_verify_with_key_asset(
        &mut self,
        key_asset: AssetId,
        param_asset: AssetId,
        digest: &Ecc256Digest,
        signature: &Ecc256Signature,
    ) -> SbootResult<bool> {
        self.with_dma(ECC256_PAIR_SIZE, |hsm, buf| {
            hsm.dma_mut().write(buf, 0, &signature.to_be_bytes())?;
            let req = PkAssetRequest::ecdsa_verify(
                ECC256_WORDS,
                key_asset,
                param_asset,
                hsm.dma_addr(buf)?,
                ECC256_PAIR_SIZE as u16,
                &digest.to_be_bytes(),
            )?;
            let result = hsm.submit_raw(&TokenRequest::PkAsset(req))?;
            verify_outcome(&result)
        })
    }

    /// Claim the engine, run `f`, and release the engine whatever `f`
    /// returned.
    fn pk_session<R, F>(&mut self, f: F) -> SbootResult<R>
    where
        F: FnOnce(&mut Self) -> SbootResult<R>,
    {
        self.submit(&TokenRequest::PkClaim(PkClaim {
            nwords: ECC256_WORDS,
            mwords: 0,
            mmask: 0,
        }))?;
        let result = f(self);
        let released = self.submit(&TokenRequest::PkRelease);
        let value = result?;
        released?;
        Ok(value)
    }

    fn pk_load(&mut self, base: u64, index: u8, len: usize) -> SbootResult<()> {
        let offset = PK_VECTOR_OFFSET
            .get(usize::from(index))
            .ok_or(SbootError::DRIVER_TOKEN_INVALID_FIELD)?;
        self.submit(&TokenRequest::PkNumLoad(PkNumLoad {
            index,
            addr: base + *offset as u64,
            len: len as u32,
        }))?;
        Ok(())
    }

    fn pk_operation(
        &mut self,
        command: PkOperationCommand,
        base: u64,
        output_len: usize,
    ) -> SbootResult<ResultToken> {
        let op = PkOperation {
            command,
            curve: EccCurve::P256 as u32,
            input: base,
            input_len: 0,
            output: if output_len == 0 {
                0
            } else {
                base + PK_OUTPUT_OFFSET as u64
            },
            output_len: output_len as u32,
        };
        self.submit_raw(&TokenRequest::PkOperation(op))
    }
}

fn verify_outcome(result: &ResultToken) -> SbootResult<bool> {
    if result.code() == result_code::VERIFY_ERROR {
        return Ok(false);
    }
    result.check()?;
    Ok(true)
}
