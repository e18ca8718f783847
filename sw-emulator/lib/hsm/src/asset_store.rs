/*++

Licensed under the Apache-2.0 license.

File Name:

    asset_store.rs

Abstract:

    File contains the emulated asset store: OTP provisioned static assets,
    secure timers and authenticated unlock sessions.

--*/

use std::collections::BTreeMap;

use sboot_drivers::token::{
    result_code, AssetId, AssetSearchResult, SecureTimerOp, SecureTimerResult,
    AUTH_UNLOCK_NONCE_SIZE,
};
use sboot_drivers::ASSET_DATA_MAX_SIZE;
use sboot_emu_crypto::Ecc256PubKey;

/// Asset ids of OTP objects are this base ORed with the asset number.
pub const STATIC_ASSET_ID_BASE: u32 = 0x5000_0000;

const DYNAMIC_ASSET_ID_BASE: u32 = 0x6000_0000;

/// Dynamic assets the store can hold at once.
pub const DYNAMIC_ASSET_CAPACITY: usize = 8;

const TIMER_TICK_US: u64 = 100;
const TIMER_SECOND_US: u64 = 1_000_000;

/// OTP provisioned object
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StaticAsset {
    /// Readable with a public data read.
    PublicData(Vec<u8>),

    /// Readable with a monotonic counter read.
    MonotonicCounter(Vec<u8>),

    /// Public key usable by module-side verification.
    PublicKey(Ecc256PubKey),

    /// Domain parameters of P-256.
    CurveParams,

    /// State object of an authenticated unlock.
    AuthState,
}

impl StaticAsset {
    fn len(&self) -> usize {
        match self {
            StaticAsset::PublicData(data) | StaticAsset::MonotonicCounter(data) => data.len(),
            StaticAsset::PublicKey(_) => 64,
            StaticAsset::CurveParams | StaticAsset::AuthState => 0,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct SecureTimer {
    started_us: u64,
    seconds: bool,
}

impl SecureTimer {
    fn elapsed(&self, now_us: u64) -> u32 {
        let unit = if self.seconds {
            TIMER_SECOND_US
        } else {
            TIMER_TICK_US
        };
        let elapsed = now_us.saturating_sub(self.started_us) / unit;
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Copy, Clone)]
struct UnlockSession {
    key: Ecc256PubKey,
    nonce: [u8; AUTH_UNLOCK_NONCE_SIZE],
    unlocked: bool,
}

#[derive(Default)]
pub struct AssetStore {
    statics: BTreeMap<u32, StaticAsset>,
    timers: BTreeMap<u32, SecureTimer>,
    sessions: BTreeMap<u32, UnlockSession>,
    next_dynamic: u32,
}

impl AssetStore {
    /// Provision static asset `number`, replacing any previous object.
    pub fn provision(&mut self, number: u32, asset: StaticAsset) {
        self.statics.insert(number, asset);
    }

    /// Remove static asset `number`.
    pub fn revoke(&mut self, number: u32) {
        self.statics.remove(&number);
    }

    pub fn search(&self, number: u32) -> Option<AssetSearchResult> {
        let asset = self.statics.get(&number)?;
        Some(AssetSearchResult {
            asset: AssetId(STATIC_ASSET_ID_BASE | number),
            len: asset.len() as u32,
        })
    }

    fn lookup(&self, id: AssetId) -> Result<&StaticAsset, i8> {
        if id.0 & !0x3F != STATIC_ASSET_ID_BASE {
            return Err(result_code::INVALID_ASSET);
        }
        self.statics
            .get(&(id.0 & 0x3F))
            .ok_or(result_code::INVALID_ASSET)
    }

    pub fn public_data(&self, id: AssetId) -> Result<&[u8], i8> {
        match self.lookup(id)? {
            StaticAsset::PublicData(data) => Ok(data),
            _ => Err(result_code::ACCESS_ERROR),
        }
    }

    pub fn monotonic_counter(&self, id: AssetId) -> Result<&[u8], i8> {
        match self.lookup(id)? {
            StaticAsset::MonotonicCounter(data) => Ok(data),
            _ => Err(result_code::ACCESS_ERROR),
        }
    }

    pub fn public_key(&self, id: AssetId) -> Result<Ecc256PubKey, i8> {
        match self.lookup(id)? {
            StaticAsset::PublicKey(key) => Ok(*key),
            _ => Err(result_code::ACCESS_ERROR),
        }
    }

    pub fn check_curve_params(&self, id: AssetId) -> Result<(), i8> {
        match self.lookup(id)? {
            StaticAsset::CurveParams => Ok(()),
            _ => Err(result_code::ACCESS_ERROR),
        }
    }

    fn dynamic_count(&self) -> usize {
        self.timers.len()
    }

    fn allocate_dynamic(&mut self) -> Result<u32, i8> {
        if self.dynamic_count() >= DYNAMIC_ASSET_CAPACITY {
            return Err(result_code::FULL);
        }
        self.next_dynamic = self.next_dynamic.wrapping_add(1);
        Ok(DYNAMIC_ASSET_ID_BASE | (self.next_dynamic & 0x00FF_FFFF))
    }

    /// Run a secure timer operation at time `now_us`.
    pub fn secure_timer(
        &mut self,
        asset: AssetId,
        op: SecureTimerOp,
        seconds: bool,
        now_us: u64,
    ) -> Result<SecureTimerResult, i8> {
        if op == SecureTimerOp::Start {
            if !asset.is_none() {
                return Err(result_code::INVALID_PARAMETER);
            }
            let id = self.allocate_dynamic()?;
            self.timers.insert(
                id,
                SecureTimer {
                    started_us: now_us,
                    seconds,
                },
            );
            return Ok(SecureTimerResult {
                asset: AssetId(id),
                elapsed: 0,
            });
        }

        let timer = self
            .timers
            .get_mut(&asset.0)
            .ok_or(result_code::INVALID_ASSET)?;
        let elapsed = timer.elapsed(now_us);
        match op {
            SecureTimerOp::Restart => timer.started_us = now_us,
            SecureTimerOp::Stop => {
                self.timers.remove(&asset.0);
            }
            _ => {}
        }
        Ok(SecureTimerResult { asset, elapsed })
    }

    /// Open an unlock session on `state_asset` with the public key asset
    /// `key_asset`, issuing `nonce`.
    pub fn unlock_start(
        &mut self,
        state_asset: AssetId,
        key_asset: AssetId,
        nonce: [u8; AUTH_UNLOCK_NONCE_SIZE],
    ) -> Result<(), i8> {
        if self.lookup(state_asset)? != &StaticAsset::AuthState {
            return Err(result_code::ACCESS_ERROR);
        }
        let key = self.public_key(key_asset)?;
        self.sessions.insert(
            state_asset.0,
            UnlockSession {
                key,
                nonce,
                unlocked: false,
            },
        );
        Ok(())
    }

    /// Key and nonce of the open session on `state_asset`.
    pub fn unlock_challenge(
        &self,
        state_asset: AssetId,
    ) -> Result<(Ecc256PubKey, [u8; AUTH_UNLOCK_NONCE_SIZE]), i8> {
        let session = self
            .sessions
            .get(&state_asset.0)
            .ok_or(result_code::INVALID_STATE)?;
        Ok((session.key, session.nonce))
    }

    pub fn unlock_complete(&mut self, state_asset: AssetId) -> Result<(), i8> {
        let session = self
            .sessions
            .get_mut(&state_asset.0)
            .ok_or(result_code::INVALID_STATE)?;
        session.unlocked = true;
        Ok(())
    }

    pub fn is_unlocked(&self, state_asset: AssetId) -> bool {
        self.sessions
            .get(&state_asset.0)
            .map_or(false, |s| s.unlocked)
    }
}

/// Largest object a single data read may return.
pub fn data_read_limit(requested: u32) -> usize {
    (requested as usize).min(ASSET_DATA_MAX_SIZE)
}
