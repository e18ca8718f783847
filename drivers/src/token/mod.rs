/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains the fixed-size command and result token types exchanged
    with the security module, and the word-level helpers shared by every
    command family.

--*/

mod request;
mod result;

pub use request::{
    encode_hash, encode_hash_set_state, encode_hash_set_total_length, AuthUnlockVerifyRequest,
    DataReadRequest, HashAlgorithm, HashLayout, HashRequest, NopRequest, PkAssetCommand,
    PkAssetRequest, PkClaim, PkExplicitDigest, PkNumLoad, PkOperation, PkOperationCommand,
    SecureTimerOp, SecureTimerRequest, TokenRequest, HASH_BLOCK_SIZE, HASH_STATE_MAX_SIZE,
};
pub use result::{
    decode_hash_state, AssetSearchResult, AuthUnlockNonce, DataReadResult, SecureTimerResult,
    SystemInfo, AUTH_UNLOCK_NONCE_SIZE,
};

use crate::{SbootError, SbootResult};

/// Number of words in a command or result token.
pub const TOKEN_WORD_COUNT: usize = 64;

/// Number of bytes in a command or result token.
pub const TOKEN_BYTE_SIZE: usize = TOKEN_WORD_COUNT * core::mem::size_of::<u32>();

const OPCODE_SHIFT: u32 = 24;
const SUBCODE_SHIFT: u32 = 28;
const NIBBLE_MASK: u32 = 0xF;
const TOKEN_ID_MASK: u32 = 0xFFFF;
const RESULT_CODE_SHIFT: u32 = 24;
const RESULT_ERROR_BIT: u32 = 1 << 31;

/// Opaque handle referencing key material or state held inside the module.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AssetId(pub u32);

impl AssetId {
    /// No asset.
    pub const NONE: AssetId = AssetId(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for AssetId {
    fn from(value: u32) -> Self {
        AssetId(value)
    }
}

impl From<AssetId> for u32 {
    fn from(value: AssetId) -> Self {
        value.0
    }
}

/// Token operation codes
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    Encryption = 1,
    Hash = 2,
    Mac = 3,
    Trng = 4,
    SpecialFunctions = 5,
    AesWrap = 6,
    AssetManagement = 7,
    AuthUnlock = 8,
    PublicKey = 9,
    Emmc = 10,
    ExtService = 11,
    Service = 14,
    System = 15,
}

impl TryFrom<u32> for Opcode {
    type Error = SbootError;

    fn try_from(value: u32) -> SbootResult<Self> {
        match value {
            0 => Ok(Opcode::Nop),
            1 => Ok(Opcode::Encryption),
            2 => Ok(Opcode::Hash),
            3 => Ok(Opcode::Mac),
            4 => Ok(Opcode::Trng),
            5 => Ok(Opcode::SpecialFunctions),
            6 => Ok(Opcode::AesWrap),
            7 => Ok(Opcode::AssetManagement),
            8 => Ok(Opcode::AuthUnlock),
            9 => Ok(Opcode::PublicKey),
            10 => Ok(Opcode::Emmc),
            11 => Ok(Opcode::ExtService),
            14 => Ok(Opcode::Service),
            15 => Ok(Opcode::System),
            _ => Err(SbootError::DRIVER_TOKEN_UNKNOWN_OPCODE),
        }
    }
}

/// Token sub-codes, scoped by opcode
pub mod subcode {
    pub const HASH_LAYOUT_V1: u32 = 0;
    pub const HASH_LAYOUT_V2: u32 = 1;

    pub const ASSET_SEARCH: u32 = 0;
    pub const ASSET_CREATE: u32 = 1;
    pub const ASSET_LOAD: u32 = 2;
    pub const ASSET_DELETE: u32 = 3;
    pub const PUBLIC_DATA: u32 = 4;
    pub const MONOTONIC_READ: u32 = 5;
    pub const MONOTONIC_INCR: u32 = 6;
    pub const OTP_DATA_WRITE: u32 = 7;
    pub const SECURE_TIMER: u32 = 8;

    pub const AUNLOCK_START: u32 = 0;
    pub const AUNLOCK_VERIFY: u32 = 1;
    pub const SET_SECURE_DEBUG: u32 = 2;

    pub const PK_NO_ASSETS: u32 = 0;
    pub const PK_WITH_ASSETS: u32 = 1;

    pub const SYSTEM_INFO: u32 = 0;
    pub const SELF_TEST: u32 = 1;
    pub const RESET: u32 = 2;
    pub const SET_TIME: u32 = 8;
}

macro_rules! token_words {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Copy, Clone, Eq, PartialEq)]
        pub struct $name(pub [u32; TOKEN_WORD_COUNT]);

        impl Default for $name {
            fn default() -> Self {
                Self([0u32; TOKEN_WORD_COUNT])
            }
        }

        impl $name {
            /// Read a word; words past the end of the token read as zero.
            pub fn word(&self, idx: usize) -> u32 {
                self.0.get(idx).copied().unwrap_or(0)
            }

            /// Write a word; writes past the end of the token are rejected.
            pub fn set_word(&mut self, idx: usize, value: u32) -> SbootResult<()> {
                let word = self
                    .0
                    .get_mut(idx)
                    .ok_or(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW)?;
                *word = value;
                Ok(())
            }

            /// Read a 64-bit address stored as low/high words.
            pub fn address(&self, lo_idx: usize) -> u64 {
                u64::from(self.word(lo_idx)) | (u64::from(self.word(lo_idx + 1)) << 32)
            }

            /// Store a 64-bit address as low/high words.
            pub fn set_address(&mut self, lo_idx: usize, addr: u64) -> SbootResult<()> {
                self.set_word(lo_idx, addr as u32)?;
                self.set_word(lo_idx + 1, (addr >> 32) as u32)
            }

            /// Pack `data` into the token starting at word `start_word`.
            ///
            /// Bytes are packed least significant byte first. The trailing
            /// word is zero padded. Fails without touching the token if the
            /// data does not fit.
            pub fn write_byte_array(&mut self, start_word: usize, data: &[u8]) -> SbootResult<()> {
                let words = self
                    .0
                    .get_mut(start_word..)
                    .ok_or(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW)?;
                if data.len() > words.len() * 4 {
                    return Err(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW);
                }
                for (word, chunk) in words.iter_mut().zip(data.chunks(4)) {
                    let mut bytes = [0u8; 4];
                    bytes[..chunk.len()].copy_from_slice(chunk);
                    *word = u32::from_le_bytes(bytes);
                }
                Ok(())
            }

            /// Unpack `out.len()` bytes from the token starting at word
            /// `start_word`.
            pub fn read_byte_array(&self, start_word: usize, out: &mut [u8]) -> SbootResult<()> {
                let words = self
                    .0
                    .get(start_word..)
                    .ok_or(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW)?;
                if out.len() > words.len() * 4 {
                    return Err(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW);
                }
                for (chunk, word) in out.chunks_mut(4).zip(words.iter()) {
                    let bytes = word.to_le_bytes();
                    chunk.copy_from_slice(&bytes[..chunk.len()]);
                }
                Ok(())
            }

            /// Token id carried in bits 15:0 of word 0.
            pub fn token_id(&self) -> u16 {
                (self.0[0] & TOKEN_ID_MASK) as u16
            }

            pub fn set_token_id(&mut self, id: u16) {
                self.0[0] = (self.0[0] & !TOKEN_ID_MASK) | u32::from(id);
            }
        }
    };
}

token_words!(CommandToken, "Command token sent to the security module");
token_words!(ResultToken, "Result token returned by the security module");

impl CommandToken {
    /// Start a token for `opcode`/`subcode` with every other word zero.
    pub fn new(opcode: Opcode, subcode: u32) -> Self {
        let mut token = Self::default();
        token.0[0] = ((subcode & NIBBLE_MASK) << SUBCODE_SHIFT)
            | ((opcode as u32 & NIBBLE_MASK) << OPCODE_SHIFT);
        token
    }

    pub fn opcode(&self) -> SbootResult<Opcode> {
        Opcode::try_from((self.0[0] >> OPCODE_SHIFT) & NIBBLE_MASK)
    }

    pub fn subcode(&self) -> u32 {
        (self.0[0] >> SUBCODE_SHIFT) & NIBBLE_MASK
    }

    /// Identity of the submitting host, word 1.
    pub fn identity(&self) -> u32 {
        self.0[1]
    }

    pub fn set_identity(&mut self, identity: u32) {
        self.0[1] = identity;
    }
}

impl ResultToken {
    /// Build a result for `token_id` carrying status `code`.
    pub fn new(token_id: u16, code: i8) -> Self {
        let mut token = Self::default();
        token.0[0] = (u32::from(code as u8) << RESULT_CODE_SHIFT) | u32::from(token_id);
        token
    }

    /// Raw status code; negative values are errors, positive values warnings.
    pub fn code(&self) -> i8 {
        (self.0[0] >> RESULT_CODE_SHIFT) as u8 as i8
    }

    pub fn is_error(&self) -> bool {
        self.0[0] & RESULT_ERROR_BIT != 0
    }

    /// Convert an error status into its error constant.
    pub fn check(&self) -> SbootResult<()> {
        match SbootError::from_hsm_result_code(self.code()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Status codes reported by the security module
pub mod result_code {
    pub const SUCCESS: i8 = 0;
    pub const WARNING_Z1USED: i8 = 16;
    pub const INVALID_TOKEN: i8 = -1;
    pub const INVALID_PARAMETER: i8 = -2;
    pub const INVALID_KEYSIZE: i8 = -3;
    pub const INVALID_LENGTH: i8 = -4;
    pub const INVALID_LOCATION: i8 = -5;
    pub const CLOCK_ERROR: i8 = -6;
    pub const ACCESS_ERROR: i8 = -7;
    pub const UNWRAP_ERROR: i8 = -10;
    pub const DATA_OVERRUN: i8 = -11;
    pub const ASSET_CHECKSUM: i8 = -12;
    pub const INVALID_ASSET: i8 = -13;
    pub const FULL: i8 = -14;
    pub const INVALID_ADDRESS: i8 = -15;
    pub const INVALID_MODULUS: i8 = -17;
    pub const VERIFY_ERROR: i8 = -18;
    pub const INVALID_STATE: i8 = -19;
    pub const OTP_WRITE: i8 = -20;
    pub const ASSET_EXPIRED: i8 = -21;
    pub const COPROCESSOR_IF: i8 = -22;
    pub const PANIC: i8 = -31;
    pub const TRNG_SHUTDOWN: i8 = -65;
    pub const DRBG_STUCK: i8 = -66;
}
