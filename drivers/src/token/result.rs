/*++

Licensed under the Apache-2.0 license.

File Name:

    result.rs

Abstract:

    File contains the typed views of result token payloads.

--*/

use super::{AssetId, ResultToken, HASH_STATE_MAX_SIZE};
use crate::{SbootError, SbootResult};

/// Size of the authenticated unlock nonce.
pub const AUTH_UNLOCK_NONCE_SIZE: usize = 16;

const RESULT_PAYLOAD_WORD: usize = 2;
const MASK_10_BITS: u32 = 0x3FF;
const PK_RETRY: u32 = 1 << 0;

/// Copy `len` bytes of intermediate state or digest out of a hash result.
pub fn decode_hash_state(
    result: &ResultToken,
    len: usize,
) -> SbootResult<[u8; HASH_STATE_MAX_SIZE]> {
    let mut state = [0u8; HASH_STATE_MAX_SIZE];
    let dst = state
        .get_mut(..len)
        .ok_or(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW)?;
    result.read_byte_array(RESULT_PAYLOAD_WORD, dst)?;
    Ok(state)
}

impl ResultToken {
    /// PKA asked for the operation to be repeated with a fresh random seed.
    pub fn pk_retry(&self) -> bool {
        self.word(1) & PK_RETRY != 0
    }

    pub fn set_pk_retry(&mut self) {
        self.0[1] |= PK_RETRY;
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct AssetSearchResult {
    pub asset: AssetId,
    pub len: u32,
}

impl AssetSearchResult {
    pub fn decode(result: &ResultToken) -> Self {
        Self {
            asset: AssetId(result.word(1)),
            len: result.word(2) & MASK_10_BITS,
        }
    }

    pub fn write_to(&self, result: &mut ResultToken) {
        result.0[1] = self.asset.0;
        result.0[2] = self.len & MASK_10_BITS;
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct DataReadResult {
    pub len: u32,
}

impl DataReadResult {
    pub fn decode(result: &ResultToken) -> Self {
        Self {
            len: result.word(1) & MASK_10_BITS,
        }
    }

    pub fn write_to(&self, result: &mut ResultToken) {
        result.0[1] = self.len & MASK_10_BITS;
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct SecureTimerResult {
    pub asset: AssetId,
    pub elapsed: u32,
}

impl SecureTimerResult {
    pub fn decode(result: &ResultToken) -> Self {
        Self {
            asset: AssetId(result.word(1)),
            elapsed: result.word(2),
        }
    }

    pub fn write_to(&self, result: &mut ResultToken) {
        result.0[1] = self.asset.0;
        result.0[2] = self.elapsed;
    }
}

/// Nonce returned by an authenticated unlock start
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct AuthUnlockNonce(pub [u8; AUTH_UNLOCK_NONCE_SIZE]);

impl AuthUnlockNonce {
    pub fn decode(result: &ResultToken) -> SbootResult<Self> {
        let mut nonce = [0u8; AUTH_UNLOCK_NONCE_SIZE];
        result.read_byte_array(RESULT_PAYLOAD_WORD, &mut nonce)?;
        Ok(Self(nonce))
    }

    pub fn write_to(&self, result: &mut ResultToken) -> SbootResult<()> {
        result.write_byte_array(RESULT_PAYLOAD_WORD, &self.0)
    }
}

/// Firmware, hardware and OTP status reported by the module
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct SystemInfo {
    pub fw_major: u8,
    pub fw_minor: u8,
    pub fw_patch: u8,
    pub test_firmware: bool,
    pub hw_version: u32,
    pub memory_size: u16,
    pub host_id: u8,
    pub identity: u32,
    pub otp_error: u8,
    pub otp_error_location: u16,
}

impl SystemInfo {
    pub fn decode(result: &ResultToken) -> Self {
        let w1 = result.word(1);
        let w3 = result.word(3);
        let w5 = result.word(5);
        Self {
            fw_major: (w1 >> 16) as u8,
            fw_minor: (w1 >> 8) as u8,
            fw_patch: w1 as u8,
            test_firmware: w1 & (1 << 31) != 0,
            hw_version: result.word(2),
            memory_size: w3 as u16,
            host_id: ((w3 >> 16) & 0xF) as u8,
            identity: result.word(4),
            otp_error: ((w5 >> 12) & 0xF) as u8,
            otp_error_location: (w5 & 0xFFF) as u16,
        }
    }

    pub fn write_to(&self, result: &mut ResultToken) {
        result.0[1] = (u32::from(self.fw_major) << 16)
            | (u32::from(self.fw_minor) << 8)
            | u32::from(self.fw_patch)
            | if self.test_firmware { 1 << 31 } else { 0 };
        result.0[2] = self.hw_version;
        result.0[3] = u32::from(self.memory_size) | (u32::from(self.host_id & 0xF) << 16);
        result.0[4] = self.identity;
        result.0[5] =
            (u32::from(self.otp_error & 0xF) << 12) | u32::from(self.otp_error_location & 0xFFF);
    }

    /// Non-zero OTP error code means the trust anchors cannot be relied on.
    pub fn otp_healthy(&self) -> bool {
        self.otp_error == 0
    }
}
