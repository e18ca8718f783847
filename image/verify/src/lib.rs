/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Secure boot image verification library.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

mod verifier;

use sboot_drivers::*;
use sboot_image_types::*;

pub use verifier::ImageVerifier;

/// Final verdict on an image
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TrustOutcome {
    Accepted,
    Rejected,
}

/// Why an image was rejected
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VerifyDiagnostic {
    HashEngineInitFailed,
    SignatureInvalid,
    RollbackTooLow,
    DmaResourceExhausted,
    HardwareTimeout,
    MalformedImage,
    TrustAnchorMissing,
}

impl VerifyDiagnostic {
    /// Diagnostic for an environment error, `default` unless the error is a
    /// resource or hardware failure.
    pub fn classify(err: SbootError, default: VerifyDiagnostic) -> Self {
        if err == SbootError::DRIVER_DMA_OUT_OF_RESOURCES {
            VerifyDiagnostic::DmaResourceExhausted
        } else if err == SbootError::DRIVER_MAILBOX_TIMEOUT
            || err == SbootError::DRIVER_MAILBOX_BUSY
        {
            VerifyDiagnostic::HardwareTimeout
        } else {
            default
        }
    }
}

/// Verified image information
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageVerificationInfo {
    /// Header size including certificates; the payload starts here
    pub header_size: u32,

    /// Payload length
    pub image_len: u32,

    /// Rollback identifier carried by the image, 0 when absent
    pub rollback_id: u32,
}

/// Outcome of verifying one image
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootTrustDecision {
    pub image_id: ImageId,

    /// Digest over the signed ranges, once hashing completed
    pub digest: Option<ImageDigest>,

    /// Signature verification result, once the check ran
    pub signature_valid: Option<bool>,

    /// Rollback policy result, once the check ran
    pub rollback_ok: Option<bool>,

    pub outcome: TrustOutcome,

    /// Set when rejected
    pub diagnostic: Option<VerifyDiagnostic>,

    /// Underlying error when rejected
    pub error: Option<SbootError>,

    /// Set when accepted
    pub info: Option<ImageVerificationInfo>,
}

impl BootTrustDecision {
    pub fn new(image_id: ImageId) -> Self {
        Self {
            image_id,
            digest: None,
            signature_valid: None,
            rollback_ok: None,
            outcome: TrustOutcome::Rejected,
            diagnostic: None,
            error: None,
            info: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == TrustOutcome::Accepted
    }
}

/// Image Verification Environment
pub trait ImageVerificationEnv {
    /// Calculate the SHA-256 digest over the concatenation of `parts`
    fn sha256_digest(&mut self, parts: &[&[u8]]) -> SbootResult<ImageDigest>;

    /// Perform ECDSA P-256 verification
    fn ecc256_verify(
        &mut self,
        digest: &ImageDigest,
        pub_key: &ImageEccPubKey,
        sig: &ImageEccSignature,
    ) -> SbootResult<bool>;

    /// Trusted key for images signed with a ROM or OTP key.
    /// `None` when no such key is available.
    fn trusted_pub_key(&mut self, key_type: PubKeyType) -> SbootResult<Option<ImageEccPubKey>>;

    /// Trusted hash of the key embedded in `PubKeyType::Image` headers
    fn trusted_pub_key_digest(&mut self) -> SbootResult<Option<ImageDigest>>;

    /// Lowest acceptable rollback identifier for `image_id`
    fn rollback_floor(&mut self, image_id: ImageId) -> SbootResult<u32>;
}
