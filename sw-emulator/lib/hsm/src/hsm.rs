/*++

Licensed under the Apache-2.0 license.

File Name:

    hsm.rs

Abstract:

    File contains the emulated security module: it accepts command tokens
    through the mailbox transport interface, executes them against the
    emulated engines and posts result tokens.

--*/

use log::{debug, warn};
use sboot_drivers::token::{
    result_code, AuthUnlockNonce, AuthUnlockVerifyRequest, CommandToken, DataReadRequest,
    DataReadResult, NopRequest, ResultToken, SystemInfo, TokenRequest, AUTH_UNLOCK_NONCE_SIZE,
};
use sboot_drivers::{DmaArena, MailboxTransport, SbootError, SbootResult};
use sboot_emu_crypto::{Ecc256, Ecc256Signature, Sha256, Sha256Mode};

use crate::asset_store::{data_read_limit, AssetStore, StaticAsset};
use crate::hash_engine;
use crate::host_memory::HostMemory;
use crate::pka::{self, PkaEngine};

/// Emulated time consumed by one token.
const TOKEN_TIME_US: u64 = 50;

/// Firmware reported by the system info token.
pub const EMULATED_FW_VERSION: (u8, u8, u8) = (2, 5, 1);

/// Hardware version reported by the system info token.
pub const EMULATED_HW_VERSION: u32 = 0x0003_0200;

const EMULATED_MEMORY_KB: u16 = 64;

struct PendingToken {
    token: CommandToken,
    polls_left: u32,
}

/// Emulated security module
pub struct EmulatedHsm<'a> {
    memory: HostMemory<'a>,
    assets: AssetStore,
    pka: PkaEngine,

    /// Polls answered "not ready" before a token completes.
    busy_polls: u32,

    /// While set, accepted tokens never complete.
    hang: bool,

    pending: Option<PendingToken>,
    completed: Option<ResultToken>,

    clock_us: u64,
    nonce_counter: u64,
    secure_debug: bool,
    otp_error: (u8, u16),
    history: Vec<CommandToken>,
}

impl<'a> EmulatedHsm<'a> {
    /// Create a module whose DMA engine reaches `arena`.
    ///
    /// # Arguments
    ///
    /// * `arena`      - Host DMA arena
    /// * `dma_offset` - Offset the host adds to form module addresses
    pub fn new(arena: &'a DmaArena, dma_offset: u64) -> Self {
        Self {
            memory: HostMemory::new(arena, dma_offset),
            assets: AssetStore::default(),
            pka: PkaEngine::default(),
            busy_polls: 0,
            hang: false,
            pending: None,
            completed: None,
            clock_us: 0,
            nonce_counter: 0,
            secure_debug: false,
            otp_error: (0, 0),
            history: Vec::new(),
        }
    }

    /// Provision OTP asset `number`.
    pub fn with_asset(mut self, number: u32, asset: StaticAsset) -> Self {
        self.assets.provision(number, asset);
        self
    }

    pub fn assets_mut(&mut self) -> &mut AssetStore {
        &mut self.assets
    }

    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    pub fn set_hang(&mut self, hang: bool) {
        self.hang = hang;
    }

    /// Bounce the next `count` randomized PKA operations with a retry.
    pub fn force_pk_retries(&mut self, count: u32) {
        self.pka.force_retries(count);
    }

    pub fn set_otp_error(&mut self, code: u8, location: u16) {
        self.otp_error = (code, location);
    }

    pub fn advance_clock_us(&mut self, us: u64) {
        self.clock_us = self.clock_us.saturating_add(us);
    }

    pub fn pka_claimed(&self) -> bool {
        self.pka.is_claimed()
    }

    pub fn secure_debug_enabled(&self) -> bool {
        self.secure_debug
    }

    /// Every token accepted so far, in order.
    pub fn history(&self) -> &[CommandToken] {
        &self.history
    }

    fn execute(&mut self, token: &CommandToken) -> ResultToken {
        let id = token.token_id();
        let mut result = ResultToken::new(id, result_code::SUCCESS);
        let outcome = match TokenRequest::decode(token) {
            Ok(req) => {
                debug!("[hsm] token {id:#06x}: {req:?}");
                self.dispatch(token, &req, &mut result)
            }
            Err(err) => {
                warn!("[hsm] token {id:#06x} rejected: {err:?}");
                Err(result_code::INVALID_TOKEN)
            }
        };
        self.clock_us = self.clock_us.saturating_add(TOKEN_TIME_US);

        match outcome {
            Ok(()) => result,
            Err(code) => {
                debug!("[hsm] token {id:#06x} failed with {code}");
                ResultToken::new(id, code)
            }
        }
    }

    fn dispatch(
        &mut self,
        token: &CommandToken,
        req: &TokenRequest,
        result: &mut ResultToken,
    ) -> Result<(), i8> {
        match req {
            TokenRequest::Nop(nop) => self.nop(nop),

            TokenRequest::Hash(hash) => hash_engine::run(&self.memory, hash, result),

            TokenRequest::SecureTimer(timer) => {
                self.assets
                    .secure_timer(timer.asset, timer.operation, timer.seconds, self.clock_us)?
                    .write_to(result);
                Ok(())
            }

            TokenRequest::AssetSearch { number } => {
                self.assets
                    .search(*number)
                    .ok_or(result_code::INVALID_ASSET)?
                    .write_to(result);
                Ok(())
            }

            TokenRequest::PublicDataRead(read) => {
                let data = self.assets.public_data(read.asset)?.to_vec();
                self.data_read(read, &data, result)
            }

            TokenRequest::MonotonicRead(read) => {
                let data = self.assets.monotonic_counter(read.asset)?.to_vec();
                self.data_read(read, &data, result)
            }

            TokenRequest::AuthUnlockStart {
                state_asset,
                key_asset,
            } => {
                let nonce = self.next_nonce();
                self.assets.unlock_start(*state_asset, *key_asset, nonce)?;
                AuthUnlockNonce(nonce)
                    .write_to(result)
                    .map_err(|_| result_code::INVALID_LENGTH)
            }

            TokenRequest::AuthUnlockVerify(verify) => self.unlock_verify(verify),

            TokenRequest::SetSecureDebug {
                state_asset,
                enable,
            } => {
                if !self.assets.is_unlocked(*state_asset) {
                    return Err(result_code::ACCESS_ERROR);
                }
                self.secure_debug = *enable;
                Ok(())
            }

            TokenRequest::SystemInfo => {
                let (major, minor, patch) = EMULATED_FW_VERSION;
                SystemInfo {
                    fw_major: major,
                    fw_minor: minor,
                    fw_patch: patch,
                    test_firmware: false,
                    hw_version: EMULATED_HW_VERSION,
                    memory_size: EMULATED_MEMORY_KB,
                    host_id: 0,
                    identity: token.identity(),
                    otp_error: self.otp_error.0,
                    otp_error_location: self.otp_error.1,
                }
                .write_to(result);
                Ok(())
            }

            TokenRequest::PkClaim(claim) => self.pka.claim(*claim),
            TokenRequest::PkNumLoad(load) => self.pka.num_load(&self.memory, load),
            TokenRequest::PkOperation(op) => self.pka.operation(&mut self.memory, op, result),
            TokenRequest::PkRelease => {
                self.pka.release();
                Ok(())
            }
            TokenRequest::PkAsset(asset_req) => {
                pka::asset_verify(&self.memory, &self.assets, asset_req)
            }
        }
    }

    fn nop(&mut self, nop: &NopRequest) -> Result<(), i8> {
        if nop.input_len != nop.output_len {
            return Err(result_code::INVALID_LENGTH);
        }
        let data = self
            .memory
            .read(nop.input, nop.input_len as usize)
            .map_err(|_| result_code::INVALID_ADDRESS)?;
        self.memory
            .write(nop.output, &data)
            .map_err(|_| result_code::INVALID_ADDRESS)
    }

    fn data_read(
        &mut self,
        read: &DataReadRequest,
        data: &[u8],
        result: &mut ResultToken,
    ) -> Result<(), i8> {
        if data.len() > data_read_limit(read.len) {
            return Err(result_code::INVALID_LENGTH);
        }
        self.memory
            .write(read.output, data)
            .map_err(|_| result_code::INVALID_ADDRESS)?;
        DataReadResult {
            len: data.len() as u32,
        }
        .write_to(result);
        Ok(())
    }

    fn unlock_verify(&mut self, verify: &AuthUnlockVerifyRequest) -> Result<(), i8> {
        let (key, nonce) = self.assets.unlock_challenge(verify.state_asset)?;
        if verify.nonce != nonce {
            return Err(result_code::ACCESS_ERROR);
        }
        if verify.signature_len != 64 {
            return Err(result_code::INVALID_LENGTH);
        }
        let bytes = self
            .memory
            .read(verify.signature, 64)
            .map_err(|_| result_code::INVALID_ADDRESS)?;
        let mut signature = Ecc256Signature::default();
        signature.r.copy_from_slice(&bytes[..32]);
        signature.s.copy_from_slice(&bytes[32..]);

        if !Ecc256::verify(&key, &nonce_digest(&nonce), &signature) {
            return Err(result_code::VERIFY_ERROR);
        }
        self.assets.unlock_complete(verify.state_asset)
    }

    fn next_nonce(&mut self) -> [u8; AUTH_UNLOCK_NONCE_SIZE] {
        self.nonce_counter += 1;
        let mut seed = [0u8; 16];
        seed[..8].copy_from_slice(&self.nonce_counter.to_be_bytes());
        seed[8..].copy_from_slice(&self.clock_us.to_be_bytes());
        let digest = nonce_digest(&seed);
        let mut nonce = [0u8; AUTH_UNLOCK_NONCE_SIZE];
        nonce.copy_from_slice(&digest[..AUTH_UNLOCK_NONCE_SIZE]);
        nonce
    }
}

/// SHA-256 of an unlock nonce; the digest the unlock signature covers.
pub fn nonce_digest(nonce: &[u8]) -> [u8; 32] {
    let mut sha = Sha256::new(Sha256Mode::Sha256);
    sha.finalize(nonce, nonce.len() as u64);
    let mut digest = [0u8; 32];
    sha.hash(&mut digest);
    digest
}

impl MailboxTransport for EmulatedHsm<'_> {
    fn write_command(&mut self, token: &CommandToken) -> SbootResult<()> {
        if self.pending.is_some() || self.completed.is_some() {
            return Err(SbootError::DRIVER_MAILBOX_BUSY);
        }
        self.history.push(*token);
        self.pending = Some(PendingToken {
            token: *token,
            polls_left: self.busy_polls,
        });
        Ok(())
    }

    fn result_ready(&mut self) -> bool {
        if self.completed.is_some() {
            return true;
        }
        if self.hang {
            return false;
        }
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return false;
        }
        if let Some(pending) = self.pending.take() {
            self.completed = Some(self.execute(&pending.token));
        }
        self.completed.is_some()
    }

    fn read_result(&mut self) -> SbootResult<ResultToken> {
        self.completed
            .take()
            .ok_or(SbootError::DRIVER_MAILBOX_TRANSPORT_FAILURE)
    }
}
