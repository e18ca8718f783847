/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    This file is the main implementation of the secure boot image verifier.

--*/

use crate::*;
use sboot_drivers::cprintln;
use sboot_drivers::printer::HexBytes;
use zerocopy::{AsBytes, FromBytes};

/// Reason an image was turned down
struct Rejection {
    diagnostic: VerifyDiagnostic,
    error: SbootError,
}

impl Rejection {
    fn new(diagnostic: VerifyDiagnostic, error: SbootError) -> Self {
        Self { diagnostic, error }
    }

    fn malformed(error: SbootError) -> Self {
        Self::new(VerifyDiagnostic::MalformedImage, error)
    }

    /// Environment failure; resource and hardware errors keep their own
    /// diagnostic.
    fn env(error: SbootError, default: VerifyDiagnostic) -> Self {
        Self::new(VerifyDiagnostic::classify(error, default), error)
    }
}

type VerifyResult<T> = Result<T, Rejection>;

/// Image Verifier
pub struct ImageVerifier<Env: ImageVerificationEnv> {
    /// Verification Environment
    env: Env,
}

impl<Env: ImageVerificationEnv> ImageVerifier<Env> {
    /// Create a new instance `ImageVerifier`
    ///
    /// # Arguments
    ///
    /// * `env` - Environment
    pub fn new(env: Env) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    pub fn into_env(self) -> Env {
        self.env
    }

    /// Verify a signed image
    ///
    /// The image is hashed, its signature is checked against the trust
    /// anchor, and its rollback identifier against the floor for
    /// `image_id`. The first failing step rejects the image and no later
    /// step runs.
    ///
    /// # Arguments
    ///
    /// * `image_id` - Boot stage the image belongs to
    /// * `header`   - Image header, certificates included
    /// * `payload`  - Image payload; bytes past the header's length are ignored
    ///
    /// # Returns
    ///
    /// * `BootTrustDecision` - Accepted, or Rejected with a diagnostic
    pub fn verify(
        &mut self,
        image_id: ImageId,
        header: &[u8],
        payload: &[u8],
    ) -> BootTrustDecision {
        let mut decision = BootTrustDecision::new(image_id);
        match self.verify_steps(&mut decision, header, payload) {
            Ok(info) => {
                decision.outcome = TrustOutcome::Accepted;
                decision.info = Some(info);
                cprintln!("[verify] accepted, rollback id {}", info.rollback_id);
            }
            Err(rejection) => {
                decision.outcome = TrustOutcome::Rejected;
                decision.diagnostic = Some(rejection.diagnostic);
                decision.error = Some(rejection.error);
                let code = u32::from(rejection.error).to_be_bytes();
                cprintln!("[verify] rejected, error 0x{}", HexBytes(&code));
            }
        }
        decision
    }

    fn verify_steps(
        &mut self,
        decision: &mut BootTrustDecision,
        header: &[u8],
        payload: &[u8],
    ) -> VerifyResult<ImageVerificationInfo> {
        let header = Self::parse_header(header)?;
        let image_len = header.image_len();
        let payload = payload.get(..image_len as usize).ok_or_else(|| {
            Rejection::malformed(SbootError::IMAGE_VERIFIER_ERR_IMAGE_LEN_MISMATCH)
        })?;

        // Hashing
        let digest = self.image_digest(&header, payload)?;
        decision.digest = Some(digest);

        // Signature check
        let pub_key = self.trust_anchor(&header)?;
        let valid = self
            .env
            .ecc256_verify(&digest, &pub_key, header.signature())
            .map_err(|err| Rejection::env(err, VerifyDiagnostic::SignatureInvalid))?;
        decision.signature_valid = Some(valid);
        if !valid {
            return Err(Rejection::new(
                VerifyDiagnostic::SignatureInvalid,
                SbootError::IMAGE_VERIFIER_ERR_SIGNATURE_INVALID,
            ));
        }

        // Policy check
        let rollback_id = header.attributes().rollback_id().unwrap_or(0);
        let floor = self
            .env
            .rollback_floor(decision.image_id)
            .map_err(|err| Rejection::env(err, VerifyDiagnostic::RollbackTooLow))?;
        let rollback_ok = rollback_id >= floor;
        decision.rollback_ok = Some(rollback_ok);
        if !rollback_ok {
            cprintln!("[verify] rollback id {} below floor {}", rollback_id, floor);
            return Err(Rejection::new(
                VerifyDiagnostic::RollbackTooLow,
                SbootError::IMAGE_VERIFIER_ERR_ROLLBACK_TOO_LOW,
            ));
        }

        Ok(ImageVerificationInfo {
            header_size: IMAGE_HEADER_BYTE_SIZE as u32,
            image_len,
            rollback_id,
        })
    }

    /// Parse and validate the image header
    fn parse_header(bytes: &[u8]) -> VerifyResult<ImageHeader> {
        let header = ImageHeader::read_from_prefix(bytes).ok_or_else(|| {
            Rejection::malformed(SbootError::IMAGE_VERIFIER_ERR_HEADER_TOO_SMALL)
        })?;

        if header.version() != SBIF_VERSION {
            return Err(Rejection::malformed(
                SbootError::IMAGE_VERIFIER_ERR_VERSION_UNSUPPORTED,
            ));
        }

        match header.image_tag() {
            SBIF_IMAGE_BLP => {}
            // Decryption is left to a later stage; only plaintext images boot
            SBIF_IMAGE_BLW | SBIF_IMAGE_BLE | SBIF_IMAGE_BLX => {
                return Err(Rejection::malformed(
                    SbootError::IMAGE_VERIFIER_ERR_ENCRYPTED_UNSUPPORTED,
                ));
            }
            _ => {
                return Err(Rejection::malformed(
                    SbootError::IMAGE_VERIFIER_ERR_TYPE_INVALID,
                ));
            }
        }

        if header.pub_key_type().is_none() {
            return Err(Rejection::malformed(
                SbootError::IMAGE_VERIFIER_ERR_PUBKEY_TYPE_INVALID,
            ));
        }

        if !header.attributes().is_valid() {
            return Err(Rejection::malformed(
                SbootError::IMAGE_VERIFIER_ERR_ATTRIBUTES_INVALID,
            ));
        }

        // The ECDSA P-256 profile carries no certificate chain
        if header.certificate_count() != 0 {
            return Err(Rejection::malformed(
                SbootError::IMAGE_VERIFIER_ERR_CERT_COUNT_INVALID,
            ));
        }

        Ok(header)
    }

    /// Digest over the signed header ranges followed by the payload
    fn image_digest(
        &mut self,
        header: &ImageHeader,
        payload: &[u8],
    ) -> VerifyResult<ImageDigest> {
        let bytes = header.as_bytes();
        self.env
            .sha256_digest(&[
                &bytes[ImageHeader::signed_prefix_range()],
                &bytes[ImageHeader::signed_tail_range()],
                payload,
            ])
            .map_err(|err| Rejection::env(err, VerifyDiagnostic::HashEngineInitFailed))
    }

    /// Resolve the key the image signature must verify against
    fn trust_anchor(&mut self, header: &ImageHeader) -> VerifyResult<ImageEccPubKey> {
        let missing = || {
            Rejection::new(
                VerifyDiagnostic::TrustAnchorMissing,
                SbootError::IMAGE_VERIFIER_ERR_TRUST_ANCHOR_MISSING,
            )
        };
        let lookup_failed =
            |err: SbootError| Rejection::env(err, VerifyDiagnostic::TrustAnchorMissing);

        match header.pub_key_type() {
            Some(PubKeyType::Image) => {
                let expected = self
                    .env
                    .trusted_pub_key_digest()
                    .map_err(lookup_failed)?
                    .ok_or_else(missing)?;
                let actual = self
                    .env
                    .sha256_digest(&[header.pub_key().as_bytes()])
                    .map_err(|err| Rejection::env(err, VerifyDiagnostic::HashEngineInitFailed))?;
                if actual != expected {
                    return Err(Rejection::new(
                        VerifyDiagnostic::SignatureInvalid,
                        SbootError::IMAGE_VERIFIER_ERR_PUBKEY_HASH_MISMATCH,
                    ));
                }
                Ok(*header.pub_key())
            }
            Some(key_type) => self
                .env
                .trusted_pub_key(key_type)
                .map_err(lookup_failed)?
                .ok_or_else(missing),
            None => Err(Rejection::malformed(
                SbootError::IMAGE_VERIFIER_ERR_PUBKEY_TYPE_INVALID,
            )),
        }
    }
}
