// Licensed under the Apache-2.0 license

use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use sboot_drivers::token::{AssetId, SecureTimerOp};
use sboot_drivers::{DmaArena, SbootError, ASSET_DATA_MAX_SIZE, DEFAULT_HOST_IDENTITY};
use sboot_emu_hsm::{
    nonce_digest, EmulatedHsm, StaticAsset, EMULATED_FW_VERSION, EMULATED_HW_VERSION,
};

use crate::{hsm_with, new_hsm, pattern, TestHsm, DMA_OFFSET};

const PUBKEY_NUMBER: u32 = 1;
const PUBHASH_NUMBER: u32 = 2;
const COUNTER_NUMBER: u32 = 10;
const UNLOCK_STATE_NUMBER: u32 = 20;
const UNLOCK_KEY_NUMBER: u32 = 21;

fn unlock_key() -> SigningKey {
    SigningKey::from_slice(&[0x33; 32]).unwrap()
}

fn provisioned(arena: &DmaArena) -> TestHsm<'_> {
    let point = unlock_key().verifying_key().to_encoded_point(false);
    let mut key = sboot_emu_hsm::Ecc256PubKey::default();
    key.x.copy_from_slice(point.x().unwrap());
    key.y.copy_from_slice(point.y().unwrap());

    let emu = EmulatedHsm::new(arena, DMA_OFFSET)
        .with_asset(PUBKEY_NUMBER, StaticAsset::PublicData(pattern(64)))
        .with_asset(PUBHASH_NUMBER, StaticAsset::PublicData(vec![0xA5; 32]))
        .with_asset(COUNTER_NUMBER, StaticAsset::MonotonicCounter(vec![0x07, 0, 0, 0]))
        .with_asset(UNLOCK_STATE_NUMBER, StaticAsset::AuthState)
        .with_asset(UNLOCK_KEY_NUMBER, StaticAsset::PublicKey(key));
    hsm_with(arena, emu, Default::default())
}

fn asset(hsm: &mut TestHsm, number: u32) -> AssetId {
    hsm.asset_search(number).unwrap().unwrap().asset
}

#[test]
fn test_search_and_read_public_data() {
    let arena = DmaArena::new();
    let mut hsm = provisioned(&arena);

    let found = hsm.asset_search(PUBKEY_NUMBER).unwrap().unwrap();
    assert_eq!(found.len, 64);
    assert_eq!(hsm.asset_search(3), Ok(None));

    let mut out = [0u8; 64];
    assert_eq!(hsm.public_data_read(found.asset, &mut out), Ok(64));
    assert_eq!(out.to_vec(), pattern(64));

    // Larger buffers are fine; the length tells how much was written.
    let pubhash = asset(&mut hsm, PUBHASH_NUMBER);
    let mut wide = [0u8; 100];
    assert_eq!(hsm.public_data_read(pubhash, &mut wide), Ok(32));
    assert_eq!(&wide[..32], &[0xA5; 32]);
    assert_eq!(&wide[32..], &[0u8; 68][..]);

    let mut narrow = [0u8; 16];
    assert_eq!(
        hsm.public_data_read(pubhash, &mut narrow),
        Err(SbootError::DRIVER_ASSET_BUFFER_TOO_SMALL)
    );
    assert_eq!(
        hsm.public_data_read(pubhash, &mut []),
        Err(SbootError::DRIVER_ASSET_BUFFER_TOO_SMALL)
    );
    assert_eq!(hsm.dma().live_count(), 0);
}

#[test]
fn test_monotonic_counter() {
    let arena = DmaArena::new();
    let mut hsm = provisioned(&arena);
    let counter = asset(&mut hsm, COUNTER_NUMBER);

    let mut out = [0u8; 8];
    assert_eq!(hsm.monotonic_counter_read(counter, &mut out), Ok(4));
    assert_eq!(out[..4], [0x07, 0, 0, 0]);

    // A counter is not public data and vice versa.
    assert_eq!(
        hsm.public_data_read(counter, &mut out),
        Err(SbootError::HSM_ACCESS_ERROR)
    );
    let pubhash = asset(&mut hsm, PUBHASH_NUMBER);
    assert_eq!(
        hsm.monotonic_counter_read(pubhash, &mut [0u8; 32]),
        Err(SbootError::HSM_ACCESS_ERROR)
    );

    let mut huge = vec![0u8; ASSET_DATA_MAX_SIZE + 100];
    assert_eq!(hsm.monotonic_counter_read(counter, &mut huge), Ok(4));
}

#[test]
fn test_secure_timer() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);

    let started = hsm
        .secure_timer(AssetId::NONE, SecureTimerOp::Start, false)
        .unwrap();
    assert!(!started.asset.is_none());
    assert_eq!(started.elapsed, 0);

    hsm.transport_mut().advance_clock_us(10_000);
    let read = hsm
        .secure_timer(started.asset, SecureTimerOp::Read, false)
        .unwrap();
    assert!(read.elapsed >= 100);

    hsm.secure_timer(started.asset, SecureTimerOp::Stop, false)
        .unwrap();
    assert_eq!(
        hsm.secure_timer(started.asset, SecureTimerOp::Read, false),
        Err(SbootError::HSM_INVALID_ASSET)
    );
}

#[test]
fn test_system_info() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);

    let info = hsm.system_info().unwrap();
    assert_eq!(
        (info.fw_major, info.fw_minor, info.fw_patch),
        EMULATED_FW_VERSION
    );
    assert_eq!(info.hw_version, EMULATED_HW_VERSION);
    assert_eq!(info.identity, DEFAULT_HOST_IDENTITY);
    assert!(info.otp_healthy());

    hsm.transport_mut().set_otp_error(3, 0x12);
    let info = hsm.system_info().unwrap();
    assert!(!info.otp_healthy());
    assert_eq!(info.otp_error_location, 0x12);
}

#[test]
fn test_auth_unlock_and_secure_debug() {
    let arena = DmaArena::new();
    let mut hsm = provisioned(&arena);
    let state = asset(&mut hsm, UNLOCK_STATE_NUMBER);
    let key = asset(&mut hsm, UNLOCK_KEY_NUMBER);

    assert_eq!(
        hsm.set_secure_debug(state, true),
        Err(SbootError::HSM_ACCESS_ERROR)
    );

    let nonce = hsm.auth_unlock_start(state, key).unwrap();
    let sig: Signature = unlock_key().sign_prehash(&nonce_digest(&nonce.0)).unwrap();
    let mut bad = sig.to_bytes().to_vec();
    bad[10] ^= 1;
    assert_eq!(
        hsm.auth_unlock_verify(state, &nonce, &bad),
        Err(SbootError::HSM_VERIFY_ERROR)
    );
    assert_eq!(
        hsm.auth_unlock_verify(state, &nonce, &[]),
        Err(SbootError::DRIVER_ASSET_INVALID_LENGTH)
    );

    hsm.auth_unlock_verify(state, &nonce, &sig.to_bytes()).unwrap();
    hsm.set_secure_debug(state, true).unwrap();
    assert!(hsm.transport_mut().secure_debug_enabled());
    hsm.set_secure_debug(state, false).unwrap();
    assert!(!hsm.transport_mut().secure_debug_enabled());
}

#[test]
fn test_auth_unlock_rejects_stale_nonce() {
    let arena = DmaArena::new();
    let mut hsm = provisioned(&arena);
    let state = asset(&mut hsm, UNLOCK_STATE_NUMBER);
    let key = asset(&mut hsm, UNLOCK_KEY_NUMBER);

    let first = hsm.auth_unlock_start(state, key).unwrap();
    let second = hsm.auth_unlock_start(state, key).unwrap();
    assert_ne!(first, second);

    let sig: Signature = unlock_key().sign_prehash(&nonce_digest(&first.0)).unwrap();
    assert_eq!(
        hsm.auth_unlock_verify(state, &first, &sig.to_bytes()),
        Err(SbootError::HSM_ACCESS_ERROR)
    );
}

#[test]
fn test_nop_copy() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);

    let input = pattern(300);
    let mut out = vec![0u8; 300];
    hsm.nop_copy(&input, &mut out).unwrap();
    assert_eq!(out, input);

    assert_eq!(
        hsm.nop_copy(&input, &mut [0u8; 10]),
        Err(SbootError::DRIVER_ASSET_INVALID_LENGTH)
    );
    assert_eq!(hsm.dma().live_count(), 0);
}
