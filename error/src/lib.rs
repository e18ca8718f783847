/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the secure boot crates for error
    handling.

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Secure boot error type
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SbootError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: SbootError = SbootError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl SbootError {
    /// Create an error; intended to only be used from const contexts, as we
    /// don't want runtime panics if val is zero. Use `SbootError::try_from()`
    /// to build an error from a runtime value.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("SbootError cannot be 0"),
        }
    }

    /// Map a negative security module result code onto its error constant.
    ///
    /// Returns `None` for success and warning codes.
    pub const fn from_hsm_result_code(code: i8) -> Option<Self> {
        match code {
            0..=i8::MAX => None,
            -1 => Some(Self::HSM_INVALID_TOKEN),
            -2 => Some(Self::HSM_INVALID_PARAMETER),
            -3 => Some(Self::HSM_INVALID_KEYSIZE),
            -4 => Some(Self::HSM_INVALID_LENGTH),
            -5 => Some(Self::HSM_INVALID_LOCATION),
            -6 => Some(Self::HSM_CLOCK_ERROR),
            -7 => Some(Self::HSM_ACCESS_ERROR),
            -10 => Some(Self::HSM_UNWRAP_ERROR),
            -11 => Some(Self::HSM_DATA_OVERRUN),
            -12 => Some(Self::HSM_ASSET_CHECKSUM),
            -13 => Some(Self::HSM_INVALID_ASSET),
            -14 => Some(Self::HSM_FULL),
            -15 => Some(Self::HSM_INVALID_ADDRESS),
            -17 => Some(Self::HSM_INVALID_MODULUS),
            -18 => Some(Self::HSM_VERIFY_ERROR),
            -19 => Some(Self::HSM_INVALID_STATE),
            -20 => Some(Self::HSM_OTP_WRITE),
            -21 => Some(Self::HSM_ASSET_EXPIRED),
            -22 => Some(Self::HSM_COPROCESSOR_IF),
            -31 => Some(Self::HSM_PANIC),
            -65 => Some(Self::HSM_TRNG_SHUTDOWN),
            -66 => Some(Self::HSM_DRBG_STUCK),
            _ => Some(Self::HSM_UNKNOWN_RESULT),
        }
    }

    define_error_constants![
        (SBOOT_INTERNAL, 0x0001_0001, "Internal error"),
        (DRIVER_INVALID_SLICE, 0x0001_0002, "Slice out of range"),
        (
            DRIVER_TOKEN_FIELD_OVERFLOW,
            0x0002_0001,
            "Byte array does not fit in the token"
        ),
        (
            DRIVER_TOKEN_HASH_UNALIGNED,
            0x0002_0002,
            "Non-final hash token length is not a multiple of the block size"
        ),
        (
            DRIVER_TOKEN_LENGTH_TOO_LARGE,
            0x0002_0003,
            "Length does not fit in its token field"
        ),
        (DRIVER_TOKEN_UNKNOWN_OPCODE, 0x0002_0004, "Unknown token opcode"),
        (
            DRIVER_TOKEN_UNKNOWN_SUBCODE,
            0x0002_0005,
            "Unknown token subcode"
        ),
        (
            DRIVER_TOKEN_INVALID_ALGORITHM,
            0x0002_0006,
            "Invalid hash algorithm selector"
        ),
        (DRIVER_TOKEN_INVALID_FIELD, 0x0002_0007, "Invalid token field"),
        (
            DRIVER_DMA_OUT_OF_RESOURCES,
            0x0003_0001,
            "DMA resource pool exhausted"
        ),
        (
            DRIVER_DMA_INVALID_HANDLE,
            0x0003_0002,
            "DMA handle is stale or released"
        ),
        (
            DRIVER_DMA_DOMAIN_NOT_FOUND,
            0x0003_0003,
            "No address recorded for the requested domain"
        ),
        (
            DRIVER_DMA_DOMAIN_EXISTS,
            0x0003_0004,
            "An address is already recorded for the domain"
        ),
        (
            DRIVER_DMA_PAIR_TABLE_FULL,
            0x0003_0005,
            "DMA record address pair table is full"
        ),
        (DRIVER_DMA_INVALID_SIZE, 0x0003_0006, "Invalid DMA buffer size"),
        (
            DRIVER_DMA_INVALID_ALIGNMENT,
            0x0003_0007,
            "Invalid DMA buffer alignment"
        ),
        (
            DRIVER_DMA_OUT_OF_BOUNDS,
            0x0003_0008,
            "Access beyond the end of a DMA buffer"
        ),
        (
            DRIVER_DMA_NOT_HOST_ACCESSIBLE,
            0x0003_0009,
            "DMA buffer has no host memory"
        ),
        (
            DRIVER_MAILBOX_TIMEOUT,
            0x0004_0001,
            "Timed out waiting for the result token"
        ),
        (
            DRIVER_MAILBOX_BUSY,
            0x0004_0002,
            "A token is already in flight"
        ),
        (
            DRIVER_MAILBOX_TOKEN_ID_MISMATCH,
            0x0004_0003,
            "Result token id does not match the command"
        ),
        (
            DRIVER_MAILBOX_TRANSPORT_FAILURE,
            0x0004_0004,
            "Mailbox transport failure"
        ),
        (DRIVER_HASH_INVALID_STATE, 0x0005_0001, "Hash session invalid state"),
        (
            DRIVER_HASH_UNALIGNED_UPDATE,
            0x0005_0002,
            "Hash update length is not a multiple of the block size"
        ),
        (
            DRIVER_HASH_UNSUPPORTED_ALGORITHM,
            0x0005_0003,
            "Hash algorithm not supported"
        ),
        (
            DRIVER_HASH_MAX_DATA,
            0x0005_0004,
            "Hash total length overflow"
        ),
        (
            DRIVER_PKA_RETRY_EXHAUSTED,
            0x0006_0001,
            "ECDSA retry bound reached"
        ),
        (
            DRIVER_PKA_ZERO_ATTEMPTS,
            0x0006_0002,
            "ECDSA retry bound must be non-zero"
        ),
        (DRIVER_PKA_INVALID_RESULT, 0x0006_0003, "Invalid PKA result"),
        (DRIVER_ASSET_NOT_FOUND, 0x0007_0001, "Asset not found"),
        (
            DRIVER_ASSET_BUFFER_TOO_SMALL,
            0x0007_0002,
            "Output buffer too small for asset data"
        ),
        (
            DRIVER_ASSET_INVALID_LENGTH,
            0x0007_0003,
            "Invalid asset data length"
        ),
        (
            DRIVER_ARENA_ALREADY_SELECTED,
            0x0008_0001,
            "Boot arena already selected"
        ),
        (
            DRIVER_ARENA_WRONG_MODE,
            0x0008_0002,
            "Boot arena selected for a different boot mode"
        ),
        (
            DRIVER_ARENA_NOT_SELECTED,
            0x0008_0003,
            "Boot arena not selected"
        ),
        (
            KAT_SHA256_DIGEST_FAILURE,
            0x0009_0001,
            "SHA-256 KAT digest failure"
        ),
        (
            KAT_SHA256_DIGEST_MISMATCH,
            0x0009_0002,
            "SHA-256 KAT digest mismatch"
        ),
        (
            KAT_SHA384_DIGEST_FAILURE,
            0x0009_0003,
            "SHA-384 KAT digest failure"
        ),
        (
            KAT_SHA384_DIGEST_MISMATCH,
            0x0009_0004,
            "SHA-384 KAT digest mismatch"
        ),
        (
            KAT_ECC256_VERIFY_FAILURE,
            0x0009_0005,
            "ECC-256 KAT verify failure"
        ),
        (
            KAT_ECC256_SIGNATURE_MISMATCH,
            0x0009_0006,
            "ECC-256 KAT known signature rejected"
        ),
        (
            KAT_ECC256_TAMPER_ACCEPTED,
            0x0009_0007,
            "ECC-256 KAT accepted a tampered digest"
        ),
        (
            KAT_ECC256_SIGN_FAILURE,
            0x0009_0008,
            "ECC-256 KAT sign failure"
        ),
        (
            KAT_ECC256_PAIRWISE_FAILURE,
            0x0009_0009,
            "ECC-256 KAT pairwise consistency failure"
        ),
        (ROM_UNKNOWN_BOOT_MODE, 0x000A_0001, "Unknown boot mode"),
        (ROM_IMAGE_REJECTED, 0x000A_0002, "Image rejected"),
        (ROM_IMAGE_LOAD_FAILURE, 0x000A_0003, "Image load failure"),
        (
            ROM_HSM_INIT_FAILURE,
            0x000A_0004,
            "Security module initialization failure"
        ),
        (
            ROM_TRUST_ANCHOR_READ_FAILURE,
            0x000A_0005,
            "Trust anchor read returned a short object"
        ),
        (
            IMAGE_VERIFIER_ERR_HEADER_TOO_SMALL,
            0x000B_0001,
            "Image smaller than its header"
        ),
        (
            IMAGE_VERIFIER_ERR_TYPE_INVALID,
            0x000B_0002,
            "Image type tag invalid"
        ),
        (
            IMAGE_VERIFIER_ERR_VERSION_UNSUPPORTED,
            0x000B_0003,
            "Image header version unsupported"
        ),
        (
            IMAGE_VERIFIER_ERR_PUBKEY_TYPE_INVALID,
            0x000B_0004,
            "Image public key type invalid"
        ),
        (
            IMAGE_VERIFIER_ERR_ATTRIBUTES_INVALID,
            0x000B_0005,
            "Image attributes invalid"
        ),
        (
            IMAGE_VERIFIER_ERR_CERT_COUNT_INVALID,
            0x000B_0006,
            "Image certificate count invalid"
        ),
        (
            IMAGE_VERIFIER_ERR_IMAGE_LEN_MISMATCH,
            0x000B_0007,
            "Image length does not match the header"
        ),
        (
            IMAGE_VERIFIER_ERR_PUBKEY_HASH_MISMATCH,
            0x000B_0008,
            "Image public key does not match the trusted hash"
        ),
        (
            IMAGE_VERIFIER_ERR_SIGNATURE_INVALID,
            0x000B_0009,
            "Image signature invalid"
        ),
        (
            IMAGE_VERIFIER_ERR_ROLLBACK_TOO_LOW,
            0x000B_000A,
            "Image rollback id below the floor"
        ),
        (
            IMAGE_VERIFIER_ERR_TRUST_ANCHOR_MISSING,
            0x000B_000B,
            "Trusted public key or key hash missing"
        ),
        (
            IMAGE_VERIFIER_ERR_ENCRYPTED_UNSUPPORTED,
            0x000B_000C,
            "Encrypted images are not supported"
        ),
        (HSM_INVALID_TOKEN, 0x000C_0001, "Module: invalid token"),
        (HSM_INVALID_PARAMETER, 0x000C_0002, "Module: invalid parameter"),
        (HSM_INVALID_KEYSIZE, 0x000C_0003, "Module: invalid key size"),
        (HSM_INVALID_LENGTH, 0x000C_0004, "Module: invalid length"),
        (HSM_INVALID_LOCATION, 0x000C_0005, "Module: invalid location"),
        (HSM_CLOCK_ERROR, 0x000C_0006, "Module: clock error"),
        (HSM_ACCESS_ERROR, 0x000C_0007, "Module: access error"),
        (HSM_UNWRAP_ERROR, 0x000C_000A, "Module: unwrap error"),
        (HSM_DATA_OVERRUN, 0x000C_000B, "Module: data overrun"),
        (HSM_ASSET_CHECKSUM, 0x000C_000C, "Module: asset checksum error"),
        (HSM_INVALID_ASSET, 0x000C_000D, "Module: invalid asset"),
        (HSM_FULL, 0x000C_000E, "Module: asset store full"),
        (HSM_INVALID_ADDRESS, 0x000C_000F, "Module: invalid address"),
        (HSM_INVALID_MODULUS, 0x000C_0011, "Module: invalid modulus"),
        (HSM_VERIFY_ERROR, 0x000C_0012, "Module: verify error"),
        (HSM_INVALID_STATE, 0x000C_0013, "Module: invalid state"),
        (HSM_OTP_WRITE, 0x000C_0014, "Module: OTP write error"),
        (HSM_ASSET_EXPIRED, 0x000C_0015, "Module: asset expired"),
        (
            HSM_COPROCESSOR_IF,
            0x000C_0016,
            "Module: coprocessor interface error"
        ),
        (HSM_PANIC, 0x000C_001F, "Module: panic"),
        (HSM_TRNG_SHUTDOWN, 0x000C_0041, "Module: TRNG shutdown"),
        (HSM_DRBG_STUCK, 0x000C_0042, "Module: DRBG stuck"),
        (HSM_UNKNOWN_RESULT, 0x000C_00FF, "Module: unknown result code"),
    ];
}

impl From<core::num::NonZeroU32> for crate::SbootError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::SbootError(val)
    }
}

impl From<SbootError> for core::num::NonZeroU32 {
    fn from(val: SbootError) -> Self {
        val.0
    }
}

impl From<SbootError> for u32 {
    fn from(val: SbootError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for SbootError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        NonZeroU32::try_from(val).map(SbootError)
    }
}

pub type SbootResult<T> = Result<T, SbootError>;
