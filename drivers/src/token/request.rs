/*++

Licensed under the Apache-2.0 license.

File Name:

    request.rs

Abstract:

    File contains the typed command requests and the shared codec that
    serializes them to the fixed token word layout.

--*/

use super::{subcode, AssetId, CommandToken, Opcode};
use crate::{SbootError, SbootResult};

/// Hash engine block size; non-final chunks must be a multiple of it.
pub const HASH_BLOCK_SIZE: usize = 64;

/// Largest intermediate hash state carried in a token.
pub const HASH_STATE_MAX_SIZE: usize = 64;

const MASK_4_BITS: u32 = 0xF;
const MASK_6_BITS: u32 = 0x3F;
const MASK_10_BITS: u32 = 0x3FF;
const MASK_12_BITS: u32 = 0xFFF;

const HASH_FLAG_CONTINUE: u32 = 1 << 4;
const HASH_FLAG_NOT_FINAL: u32 = 1 << 5;
const TIMER_SECONDS: u32 = 1 << 15;
const SECURE_DEBUG_SET: u32 = 1 << 31;
const PK_EXPLICIT_DIGEST: u32 = 1 << 30;
const PK_CMD_NUMLOAD: u32 = 0x01;
const PK_CMD_NUMSETN: u32 = 0x03;
const PK_EXPLICIT_DIGEST_WORD: usize = 12;
const AUNLOCK_NONCE_WORD: usize = 6;

/// Placement of the intermediate hash state and total length words.
///
/// Two hardware token layouts exist. Which revision needs which is not
/// documented, so both stay selectable.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum HashLayout {
    /// State at word 8, total length at words 24/25.
    #[default]
    V1,
    /// State at word 14, total length at words 10/11, subcode 1.
    V2,
}

impl HashLayout {
    /// Layout selected by the `hash-layout-v2` feature.
    pub const fn from_config() -> Self {
        if cfg!(feature = "hash-layout-v2") {
            HashLayout::V2
        } else {
            HashLayout::V1
        }
    }

    fn subcode(self) -> u32 {
        match self {
            HashLayout::V1 => subcode::HASH_LAYOUT_V1,
            HashLayout::V2 => subcode::HASH_LAYOUT_V2,
        }
    }

    /// Word offset of the intermediate state. SHA-3 always uses the wide
    /// placement.
    pub fn state_word(self, algorithm: HashAlgorithm) -> usize {
        if self == HashLayout::V2 || algorithm.is_sha3() {
            14
        } else {
            8
        }
    }

    /// Word offset of the 64-bit total message length.
    pub fn total_len_word(self, algorithm: HashAlgorithm) -> usize {
        if self == HashLayout::V2 || algorithm.is_sha3() {
            10
        } else {
            24
        }
    }
}

/// Hash algorithm selector
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum HashAlgorithm {
    Sha1 = 1,
    Sha224 = 2,
    Sha256 = 3,
    Sha384 = 4,
    Sha512 = 5,
    Sm3 = 6,
    Sha3_224 = 7,
    Sha3_256 = 8,
    Sha3_384 = 9,
    Sha3_512 = 10,
}

impl HashAlgorithm {
    pub fn is_sha3(self) -> bool {
        matches!(
            self,
            HashAlgorithm::Sha3_224
                | HashAlgorithm::Sha3_256
                | HashAlgorithm::Sha3_384
                | HashAlgorithm::Sha3_512
        )
    }

    /// Digest length in bytes.
    pub fn digest_size(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha224 | HashAlgorithm::Sha3_224 => 28,
            HashAlgorithm::Sha256 | HashAlgorithm::Sm3 | HashAlgorithm::Sha3_256 => 32,
            HashAlgorithm::Sha384 | HashAlgorithm::Sha3_384 => 48,
            HashAlgorithm::Sha512 | HashAlgorithm::Sha3_512 => 64,
        }
    }

    /// Compression block size in bytes.
    pub fn block_size(self) -> usize {
        match self {
            HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => 128,
            HashAlgorithm::Sha3_224 => 144,
            HashAlgorithm::Sha3_256 => 136,
            HashAlgorithm::Sha3_384 => 104,
            HashAlgorithm::Sha3_512 => 72,
            _ => HASH_BLOCK_SIZE,
        }
    }

    /// Size of the intermediate state carried in tokens. SHA-3 state is too
    /// wide for a token and must live in a state asset.
    pub fn state_size(self) -> Option<usize> {
        match self {
            HashAlgorithm::Sha1 => Some(20),
            HashAlgorithm::Sha224 | HashAlgorithm::Sha256 | HashAlgorithm::Sm3 => Some(32),
            HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => Some(64),
            _ => None,
        }
    }
}

impl TryFrom<u32> for HashAlgorithm {
    type Error = SbootError;

    fn try_from(value: u32) -> SbootResult<Self> {
        match value {
            1 => Ok(HashAlgorithm::Sha1),
            2 => Ok(HashAlgorithm::Sha224),
            3 => Ok(HashAlgorithm::Sha256),
            4 => Ok(HashAlgorithm::Sha384),
            5 => Ok(HashAlgorithm::Sha512),
            6 => Ok(HashAlgorithm::Sm3),
            7 => Ok(HashAlgorithm::Sha3_224),
            8 => Ok(HashAlgorithm::Sha3_256),
            9 => Ok(HashAlgorithm::Sha3_384),
            10 => Ok(HashAlgorithm::Sha3_512),
            _ => Err(SbootError::DRIVER_TOKEN_INVALID_ALGORITHM),
        }
    }
}

/// DMA copy through the module, used as a liveness probe.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct NopRequest {
    pub input: u64,
    pub input_len: u32,
    pub output: u64,
    pub output_len: u32,
}

/// One hash engine invocation
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HashRequest {
    pub algorithm: HashAlgorithm,

    /// Start from the algorithm's initial value instead of `state`.
    pub init_with_default: bool,

    /// Apply padding and produce the digest.
    pub finalize: bool,

    pub data_addr: u64,
    pub data_len: u32,

    /// Module-held state; when set, `state` is not carried in the token.
    pub state_asset: AssetId,

    /// Intermediate state for a continued operation. Only the algorithm's
    /// state size is carried; the remainder must be zero.
    pub state: [u8; HASH_STATE_MAX_SIZE],

    /// Total message length, carried on the final token of a continued
    /// operation.
    pub total_len: u64,
}

impl HashRequest {
    pub fn new(algorithm: HashAlgorithm, data_addr: u64, data_len: u32) -> Self {
        Self {
            algorithm,
            init_with_default: true,
            finalize: true,
            data_addr,
            data_len,
            state_asset: AssetId::NONE,
            state: [0u8; HASH_STATE_MAX_SIZE],
            total_len: 0,
        }
    }

    fn carries_state(&self) -> bool {
        !self.init_with_default && self.state_asset.is_none()
    }

    fn carries_total_len(&self) -> bool {
        !self.init_with_default && self.finalize
    }
}

/// Secure timer operations
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum SecureTimerOp {
    Start = 0,
    Restart = 1,
    Stop = 2,
    Read = 3,
}

impl From<u32> for SecureTimerOp {
    fn from(value: u32) -> Self {
        match value & 0x3 {
            0 => SecureTimerOp::Start,
            1 => SecureTimerOp::Restart,
            2 => SecureTimerOp::Stop,
            _ => SecureTimerOp::Read,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SecureTimerRequest {
    /// Timer asset; none when starting a new timer.
    pub asset: AssetId,
    pub operation: SecureTimerOp,
    /// Count seconds instead of 100us ticks.
    pub seconds: bool,
}

/// Read of a public data or monotonic counter asset into a DMA buffer
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct DataReadRequest {
    pub asset: AssetId,
    pub output: u64,
    pub len: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AuthUnlockVerifyRequest {
    pub state_asset: AssetId,
    pub signature: u64,
    pub signature_len: u32,
    pub nonce: [u8; super::AUTH_UNLOCK_NONCE_SIZE],
}

/// Claim of the PKA engine for operations without assets
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct PkClaim {
    pub nwords: u8,
    pub mwords: u8,
    pub mmask: u8,
}

/// Load of one big-number vector into the claimed engine
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct PkNumLoad {
    pub index: u8,
    pub addr: u64,
    pub len: u32,
}

/// Operations of the claimed PKA engine
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum PkOperationCommand {
    EccMultiply = 0x0B,
    EcdsaSign = 0x0F,
    EcdsaVerify = 0x10,
}

impl TryFrom<u32> for PkOperationCommand {
    type Error = SbootError;

    fn try_from(value: u32) -> SbootResult<Self> {
        match value {
            0x0B => Ok(PkOperationCommand::EccMultiply),
            0x0F => Ok(PkOperationCommand::EcdsaSign),
            0x10 => Ok(PkOperationCommand::EcdsaVerify),
            _ => Err(SbootError::DRIVER_TOKEN_INVALID_FIELD),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PkOperation {
    pub command: PkOperationCommand,
    /// Curve selector, carried in the public exponent word.
    pub curve: u32,
    pub input: u64,
    pub input_len: u32,
    pub output: u64,
    pub output_len: u32,
}

/// Public key operations on module-held assets
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum PkAssetCommand {
    EcdsaSign = 0x06,
    EcdsaVerify = 0x07,
    GenPublicKey = 0x14,
    GenKeyPair = 0x15,
}

impl TryFrom<u32> for PkAssetCommand {
    type Error = SbootError;

    fn try_from(value: u32) -> SbootResult<Self> {
        match value {
            0x06 => Ok(PkAssetCommand::EcdsaSign),
            0x07 => Ok(PkAssetCommand::EcdsaVerify),
            0x14 => Ok(PkAssetCommand::GenPublicKey),
            0x15 => Ok(PkAssetCommand::GenKeyPair),
            _ => Err(SbootError::DRIVER_TOKEN_INVALID_FIELD),
        }
    }
}

/// Digest passed inline instead of through a hash state asset.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PkExplicitDigest {
    pub len: u8,
    pub bytes: [u8; 64],
}

impl PkExplicitDigest {
    pub fn new(digest: &[u8]) -> SbootResult<Self> {
        let mut bytes = [0u8; 64];
        bytes
            .get_mut(..digest.len())
            .ok_or(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW)?
            .copy_from_slice(digest);
        Ok(Self {
            len: digest.len() as u8,
            bytes,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len).min(self.bytes.len())]
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PkAssetRequest {
    pub command: PkAssetCommand,
    pub nwords: u8,
    pub mwords: u8,
    pub other_len: u8,
    pub key_asset: AssetId,
    pub param_asset: AssetId,
    pub io_asset: AssetId,
    pub input: u64,
    pub input_len: u16,
    pub output: u64,
    pub output_len: u16,
    pub explicit_digest: Option<PkExplicitDigest>,
}

impl PkAssetRequest {
    /// ECDSA verify of the signature at `signature` with the public key
    /// asset `key_asset`.
    pub fn ecdsa_verify(
        nwords: u8,
        key_asset: AssetId,
        param_asset: AssetId,
        signature: u64,
        signature_len: u16,
        digest: &[u8],
    ) -> SbootResult<Self> {
        Ok(Self {
            command: PkAssetCommand::EcdsaVerify,
            nwords,
            mwords: 0,
            other_len: 0,
            key_asset,
            param_asset,
            io_asset: AssetId::NONE,
            input: signature,
            input_len: signature_len,
            output: 0,
            output_len: 0,
            explicit_digest: Some(PkExplicitDigest::new(digest)?),
        })
    }

    /// ECDSA sign with the private key asset `key_asset`, writing the
    /// signature to `signature`.
    pub fn ecdsa_sign(
        nwords: u8,
        key_asset: AssetId,
        param_asset: AssetId,
        signature: u64,
        signature_len: u16,
        digest: &[u8],
    ) -> SbootResult<Self> {
        Ok(Self {
            command: PkAssetCommand::EcdsaSign,
            nwords,
            mwords: 0,
            other_len: 0,
            key_asset,
            param_asset,
            io_asset: AssetId::NONE,
            input: 0,
            input_len: 0,
            output: signature,
            output_len: signature_len,
            explicit_digest: Some(PkExplicitDigest::new(digest)?),
        })
    }

    /// Generate a key pair into the private key asset `key_asset`, writing
    /// the public key to `public_key`.
    pub fn ecdsa_keypair(
        nwords: u8,
        key_asset: AssetId,
        param_asset: AssetId,
        public_key: u64,
        public_key_len: u16,
    ) -> Self {
        Self {
            command: PkAssetCommand::GenKeyPair,
            nwords,
            mwords: 0,
            other_len: 0,
            key_asset,
            param_asset,
            io_asset: AssetId::NONE,
            input: 0,
            input_len: 0,
            output: public_key,
            output_len: public_key_len,
            explicit_digest: None,
        }
    }
}

/// Typed request; one variant per command family
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TokenRequest {
    Nop(NopRequest),
    Hash(HashRequest),
    SecureTimer(SecureTimerRequest),
    AssetSearch { number: u32 },
    PublicDataRead(DataReadRequest),
    MonotonicRead(DataReadRequest),
    AuthUnlockStart { state_asset: AssetId, key_asset: AssetId },
    AuthUnlockVerify(AuthUnlockVerifyRequest),
    SetSecureDebug { state_asset: AssetId, enable: bool },
    SystemInfo,
    PkClaim(PkClaim),
    PkNumLoad(PkNumLoad),
    PkOperation(PkOperation),
    PkRelease,
    PkAsset(PkAssetRequest),
}

fn checked_field(value: u32, mask: u32) -> SbootResult<u32> {
    if value & !mask != 0 {
        return Err(SbootError::DRIVER_TOKEN_LENGTH_TOO_LARGE);
    }
    Ok(value)
}

/// Build a hash token without state.
///
/// # Arguments
///
/// * `algorithm`         - Hash algorithm
/// * `init_with_default` - Start from the algorithm's initial value
/// * `finalize`          - Final chunk of the message
/// * `data_addr`         - DMA address of the data
/// * `data_len`          - Data length in bytes
/// * `layout`            - Token layout variant
pub fn encode_hash(
    algorithm: HashAlgorithm,
    init_with_default: bool,
    finalize: bool,
    data_addr: u64,
    data_len: u32,
    layout: HashLayout,
) -> SbootResult<CommandToken> {
    if !finalize && data_len as usize % HASH_BLOCK_SIZE != 0 {
        return Err(SbootError::DRIVER_TOKEN_HASH_UNALIGNED);
    }

    let mut flags = algorithm as u32 & MASK_4_BITS;
    if !init_with_default {
        flags |= HASH_FLAG_CONTINUE;
    }
    if !finalize {
        flags |= HASH_FLAG_NOT_FINAL;
    }

    let mut token = CommandToken::new(Opcode::Hash, layout.subcode());
    token.set_word(2, data_len)?;
    token.set_address(3, data_addr)?;
    token.set_word(5, data_len)?;
    token.set_word(6, flags)?;
    Ok(token)
}

/// Copy intermediate state into a hash token.
pub fn encode_hash_set_state(
    token: &mut CommandToken,
    layout: HashLayout,
    state: &[u8],
) -> SbootResult<()> {
    let algorithm = HashAlgorithm::try_from(token.word(6) & MASK_4_BITS)?;
    token.write_byte_array(layout.state_word(algorithm), state)
}

/// Store the total message length in a final hash token.
pub fn encode_hash_set_total_length(
    token: &mut CommandToken,
    layout: HashLayout,
    total_len: u64,
) -> SbootResult<()> {
    let algorithm = HashAlgorithm::try_from(token.word(6) & MASK_4_BITS)?;
    token.set_address(layout.total_len_word(algorithm), total_len)
}

impl TokenRequest {
    /// Serialize to the fixed word layout.
    ///
    /// The token id and identity words are left zero; the mailbox fills them
    /// when the token is submitted.
    pub fn encode(&self, layout: HashLayout) -> SbootResult<CommandToken> {
        match self {
            TokenRequest::Nop(req) => {
                let mut token = CommandToken::new(Opcode::Nop, 0);
                token.set_word(2, req.input_len)?;
                token.set_address(3, req.input)?;
                token.set_word(5, req.input_len)?;
                token.set_address(6, req.output)?;
                token.set_word(8, req.output_len)?;
                Ok(token)
            }

            TokenRequest::Hash(req) => {
                let mut token = encode_hash(
                    req.algorithm,
                    req.init_with_default,
                    req.finalize,
                    req.data_addr,
                    req.data_len,
                    layout,
                )?;
                token.set_word(7, req.state_asset.0)?;
                if req.carries_state() {
                    let size = req
                        .algorithm
                        .state_size()
                        .ok_or(SbootError::DRIVER_TOKEN_INVALID_FIELD)?;
                    let state = req
                        .state
                        .get(..size)
                        .ok_or(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW)?;
                    encode_hash_set_state(&mut token, layout, state)?;
                }
                if req.carries_total_len() {
                    encode_hash_set_total_length(&mut token, layout, req.total_len)?;
                }
                Ok(token)
            }

            TokenRequest::SecureTimer(req) => {
                let mut token = CommandToken::new(Opcode::AssetManagement, subcode::SECURE_TIMER);
                let mut op = req.operation as u32;
                if req.seconds {
                    op |= TIMER_SECONDS;
                }
                token.set_word(2, req.asset.0)?;
                token.set_word(3, op)?;
                Ok(token)
            }

            TokenRequest::AssetSearch { number } => {
                let number = checked_field(*number, MASK_6_BITS)
                    .map_err(|_| SbootError::DRIVER_TOKEN_INVALID_FIELD)?;
                let mut token = CommandToken::new(Opcode::AssetManagement, subcode::ASSET_SEARCH);
                token.set_word(4, number << 16)?;
                Ok(token)
            }

            TokenRequest::PublicDataRead(req) => {
                encode_data_read(subcode::PUBLIC_DATA, req)
            }

            TokenRequest::MonotonicRead(req) => {
                encode_data_read(subcode::MONOTONIC_READ, req)
            }

            TokenRequest::AuthUnlockStart {
                state_asset,
                key_asset,
            } => {
                let mut token = CommandToken::new(Opcode::AuthUnlock, subcode::AUNLOCK_START);
                token.set_word(2, state_asset.0)?;
                token.set_word(3, key_asset.0)?;
                Ok(token)
            }

            TokenRequest::AuthUnlockVerify(req) => {
                let mut token = CommandToken::new(Opcode::AuthUnlock, subcode::AUNLOCK_VERIFY);
                token.set_word(2, req.state_asset.0)?;
                token.set_word(3, checked_field(req.signature_len, MASK_10_BITS)?)?;
                token.set_address(4, req.signature)?;
                token.write_byte_array(AUNLOCK_NONCE_WORD, &req.nonce)?;
                Ok(token)
            }

            TokenRequest::SetSecureDebug {
                state_asset,
                enable,
            } => {
                let mut token = CommandToken::new(Opcode::AuthUnlock, subcode::SET_SECURE_DEBUG);
                token.set_word(2, state_asset.0)?;
                token.set_word(3, if *enable { SECURE_DEBUG_SET } else { 0 })?;
                Ok(token)
            }

            TokenRequest::SystemInfo => Ok(CommandToken::new(Opcode::System, subcode::SYSTEM_INFO)),

            TokenRequest::PkClaim(claim) => {
                let mut token = CommandToken::new(Opcode::PublicKey, subcode::PK_NO_ASSETS);
                token.set_word(
                    2,
                    PK_CMD_NUMSETN
                        | (u32::from(claim.mmask) << 8)
                        | (u32::from(claim.nwords) << 16)
                        | (u32::from(claim.mwords) << 24),
                )?;
                Ok(token)
            }

            TokenRequest::PkNumLoad(load) => {
                let index = checked_field(u32::from(load.index), MASK_4_BITS)
                    .map_err(|_| SbootError::DRIVER_TOKEN_INVALID_FIELD)?;
                let mut token = CommandToken::new(Opcode::PublicKey, subcode::PK_NO_ASSETS);
                token.set_word(2, PK_CMD_NUMLOAD | (index << 24))?;
                token.set_word(5, checked_field(load.len, MASK_12_BITS)?)?;
                token.set_address(6, load.addr)?;
                Ok(token)
            }

            TokenRequest::PkOperation(op) => {
                let mut token = CommandToken::new(Opcode::PublicKey, subcode::PK_NO_ASSETS);
                token.set_word(2, op.command as u32)?;
                token.set_word(3, op.curve)?;
                token.set_word(
                    5,
                    (checked_field(op.output_len, MASK_12_BITS)? << 16)
                        | checked_field(op.input_len, MASK_12_BITS)?,
                )?;
                token.set_address(6, op.input)?;
                token.set_address(8, op.output)?;
                Ok(token)
            }

            TokenRequest::PkRelease => {
                let mut token = CommandToken::new(Opcode::PublicKey, subcode::PK_NO_ASSETS);
                token.set_word(2, PK_CMD_NUMSETN)?;
                Ok(token)
            }

            TokenRequest::PkAsset(req) => {
                let mut token = CommandToken::new(Opcode::PublicKey, subcode::PK_WITH_ASSETS);
                token.set_word(
                    2,
                    req.command as u32
                        | (u32::from(req.nwords) << 16)
                        | (u32::from(req.mwords) << 24),
                )?;
                let mut w3 = u32::from(req.other_len) << 8;
                if let Some(digest) = &req.explicit_digest {
                    if !req.io_asset.is_none() {
                        return Err(SbootError::DRIVER_TOKEN_INVALID_FIELD);
                    }
                    w3 |= PK_EXPLICIT_DIGEST | u32::from(digest.len);
                    token.write_byte_array(PK_EXPLICIT_DIGEST_WORD, digest.as_bytes())?;
                }
                token.set_word(3, w3)?;
                token.set_word(4, req.key_asset.0)?;
                token.set_word(5, req.param_asset.0)?;
                token.set_word(6, req.io_asset.0)?;
                token.set_word(
                    7,
                    (checked_field(u32::from(req.output_len), MASK_12_BITS)? << 16)
                        | checked_field(u32::from(req.input_len), MASK_12_BITS)?,
                )?;
                token.set_address(8, req.input)?;
                token.set_address(10, req.output)?;
                Ok(token)
            }
        }
    }

    /// Parse a command token back into its typed request.
    pub fn decode(token: &CommandToken) -> SbootResult<Self> {
        let opcode = token.opcode()?;
        let sub = token.subcode();
        match opcode {
            Opcode::Nop => Ok(TokenRequest::Nop(NopRequest {
                input: token.address(3),
                input_len: token.word(2),
                output: token.address(6),
                output_len: token.word(8),
            })),

            Opcode::Hash => decode_hash(token, sub).map(TokenRequest::Hash),

            Opcode::AssetManagement => match sub {
                subcode::SECURE_TIMER => {
                    let w3 = token.word(3);
                    Ok(TokenRequest::SecureTimer(SecureTimerRequest {
                        asset: AssetId(token.word(2)),
                        operation: SecureTimerOp::from(w3),
                        seconds: w3 & TIMER_SECONDS != 0,
                    }))
                }
                subcode::ASSET_SEARCH => Ok(TokenRequest::AssetSearch {
                    number: (token.word(4) >> 16) & MASK_6_BITS,
                }),
                subcode::PUBLIC_DATA => Ok(TokenRequest::PublicDataRead(decode_data_read(token))),
                subcode::MONOTONIC_READ => {
                    Ok(TokenRequest::MonotonicRead(decode_data_read(token)))
                }
                _ => Err(SbootError::DRIVER_TOKEN_UNKNOWN_SUBCODE),
            },

            Opcode::AuthUnlock => match sub {
                subcode::AUNLOCK_START => Ok(TokenRequest::AuthUnlockStart {
                    state_asset: AssetId(token.word(2)),
                    key_asset: AssetId(token.word(3)),
                }),
                subcode::AUNLOCK_VERIFY => {
                    let mut nonce = [0u8; super::AUTH_UNLOCK_NONCE_SIZE];
                    token.read_byte_array(AUNLOCK_NONCE_WORD, &mut nonce)?;
                    Ok(TokenRequest::AuthUnlockVerify(AuthUnlockVerifyRequest {
                        state_asset: AssetId(token.word(2)),
                        signature: token.address(4),
                        signature_len: token.word(3) & MASK_10_BITS,
                        nonce,
                    }))
                }
                subcode::SET_SECURE_DEBUG => Ok(TokenRequest::SetSecureDebug {
                    state_asset: AssetId(token.word(2)),
                    enable: token.word(3) & SECURE_DEBUG_SET != 0,
                }),
                _ => Err(SbootError::DRIVER_TOKEN_UNKNOWN_SUBCODE),
            },

            Opcode::System => match sub {
                subcode::SYSTEM_INFO => Ok(TokenRequest::SystemInfo),
                _ => Err(SbootError::DRIVER_TOKEN_UNKNOWN_SUBCODE),
            },

            Opcode::PublicKey => match sub {
                subcode::PK_NO_ASSETS => decode_pk_no_assets(token),
                subcode::PK_WITH_ASSETS => decode_pk_asset(token).map(TokenRequest::PkAsset),
                _ => Err(SbootError::DRIVER_TOKEN_UNKNOWN_SUBCODE),
            },

            _ => Err(SbootError::DRIVER_TOKEN_UNKNOWN_OPCODE),
        }
    }
}

fn encode_data_read(sub: u32, req: &DataReadRequest) -> SbootResult<CommandToken> {
    let mut token = CommandToken::new(Opcode::AssetManagement, sub);
    token.set_word(2, req.asset.0)?;
    token.set_word(3, req.len)?;
    token.set_address(4, req.output)?;
    Ok(token)
}

fn decode_data_read(token: &CommandToken) -> DataReadRequest {
    DataReadRequest {
        asset: AssetId(token.word(2)),
        output: token.address(4),
        len: token.word(3),
    }
}

fn decode_hash(token: &CommandToken, sub: u32) -> SbootResult<HashRequest> {
    let layout = match sub {
        subcode::HASH_LAYOUT_V1 => HashLayout::V1,
        subcode::HASH_LAYOUT_V2 => HashLayout::V2,
        _ => return Err(SbootError::DRIVER_TOKEN_UNKNOWN_SUBCODE),
    };

    let flags = token.word(6);
    let data_len = token.word(2);
    if token.word(5) != data_len {
        return Err(SbootError::DRIVER_TOKEN_INVALID_FIELD);
    }

    let mut req = HashRequest::new(
        HashAlgorithm::try_from(flags & MASK_4_BITS)?,
        token.address(3),
        data_len,
    );
    req.init_with_default = flags & HASH_FLAG_CONTINUE == 0;
    req.finalize = flags & HASH_FLAG_NOT_FINAL == 0;
    req.state_asset = AssetId(token.word(7));

    if !req.finalize && data_len as usize % HASH_BLOCK_SIZE != 0 {
        return Err(SbootError::DRIVER_TOKEN_HASH_UNALIGNED);
    }

    if req.carries_state() {
        let size = req
            .algorithm
            .state_size()
            .ok_or(SbootError::DRIVER_TOKEN_INVALID_FIELD)?;
        let state = req
            .state
            .get_mut(..size)
            .ok_or(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW)?;
        token.read_byte_array(layout.state_word(req.algorithm), state)?;
    }
    if req.carries_total_len() {
        req.total_len = token.address(layout.total_len_word(req.algorithm));
    }
    Ok(req)
}

fn decode_pk_no_assets(token: &CommandToken) -> SbootResult<TokenRequest> {
    let w2 = token.word(2);
    match w2 & 0x1F {
        PK_CMD_NUMSETN => {
            let claim = PkClaim {
                mmask: (w2 >> 8) as u8,
                nwords: (w2 >> 16) as u8,
                mwords: (w2 >> 24) as u8,
            };
            if claim == PkClaim::default() {
                Ok(TokenRequest::PkRelease)
            } else {
                Ok(TokenRequest::PkClaim(claim))
            }
        }
        PK_CMD_NUMLOAD => Ok(TokenRequest::PkNumLoad(PkNumLoad {
            index: ((w2 >> 24) & MASK_4_BITS) as u8,
            addr: token.address(6),
            len: token.word(5) & MASK_12_BITS,
        })),
        cmd => {
            let w5 = token.word(5);
            Ok(TokenRequest::PkOperation(PkOperation {
                command: PkOperationCommand::try_from(cmd)?,
                curve: token.word(3),
                input: token.address(6),
                input_len: w5 & MASK_12_BITS,
                output: token.address(8),
                output_len: (w5 >> 16) & MASK_12_BITS,
            }))
        }
    }
}

fn decode_pk_asset(token: &CommandToken) -> SbootResult<PkAssetRequest> {
    let w2 = token.word(2);
    let w3 = token.word(3);
    let w7 = token.word(7);

    let explicit_digest = if w3 & PK_EXPLICIT_DIGEST != 0 {
        let len = (w3 & 0xFF) as usize;
        let mut bytes = [0u8; 64];
        let dst = bytes
            .get_mut(..len)
            .ok_or(SbootError::DRIVER_TOKEN_FIELD_OVERFLOW)?;
        token.read_byte_array(PK_EXPLICIT_DIGEST_WORD, dst)?;
        Some(PkExplicitDigest {
            len: len as u8,
            bytes,
        })
    } else {
        None
    };

    Ok(PkAssetRequest {
        command: PkAssetCommand::try_from(w2 & 0xFF)?,
        nwords: (w2 >> 16) as u8,
        mwords: (w2 >> 24) as u8,
        other_len: (w3 >> 8) as u8,
        key_asset: AssetId(token.word(4)),
        param_asset: AssetId(token.word(5)),
        io_asset: AssetId(token.word(6)),
        input: token.address(8),
        input_len: (w7 & MASK_12_BITS) as u16,
        output: token.address(10),
        output_len: ((w7 >> 16) & MASK_12_BITS) as u16,
        explicit_digest,
    })
}
