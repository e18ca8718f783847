// Licensed under the Apache-2.0 license

use sboot_drivers::{BootErrorCode, BootMode, BootStep, DmaArena, SbootError};
use sboot_emu_hsm::{EmulatedHsm, StaticAsset};
use sboot_image_gen::fake_keys::ROGUE_KEY_PRIVATE;
use sboot_image_gen::ImageGeneratorConfig;
use sboot_image_types::{ImageId, PubKeyType, IMAGE_HEADER_BYTE_SIZE};
use sboot_rom::{
    flow_run, BootSelect, TrustAnchors, NS_UNKNOWN_IMAGE_SIZE, SECURE_BOOT_PUBKEY_NUM,
};
use zerocopy::AsBytes;

use crate::helpers::*;

#[test]
fn test_secure_boot_verify_ok() {
    let arena = DmaArena::default();
    let bundle = signed_image(Some(3), PubKeyType::Otp);
    let board = TestBoard::new(BootMode::Sd, bundle.to_bytes());
    let mut env = rom_env(&arena, provisioned_hsm(&arena, Some(vec![0x07])), board);
    let mut load = vec![0xCC; LOAD_REGION_SIZE];

    let handoff = flow_run(&mut env, ImageId::Bl2, &mut load).unwrap();
    assert!(handoff.verified);
    assert_eq!(handoff.boot_mode, BootMode::Sd);
    assert_eq!(handoff.rollback_id, Some(3));
    assert_eq!(handoff.header.bl_offset as usize, IMAGE_HEADER_BYTE_SIZE);
    assert_eq!(handoff.payload(&load), Some(&bundle.payload[..]));
    // Load region cleared past the image
    assert!(load[handoff.loaded_len..].iter().all(|b| *b == 0));

    assert_eq!(
        env.board.steps(),
        [
            BootStep::GetDesc,
            BootStep::CleanBl2,
            BootStep::BootMode1,
            BootStep::HeaderInfo,
            BootStep::HsmInit,
            BootStep::HsmVerify,
            BootStep::VerifyOk,
            BootStep::PostLoad,
            BootStep::NextEp,
        ]
    );
    assert!(env.board.errors.is_empty());
    assert_eq!(env.board.pings, 1);
    assert_eq!(env.arena.mode(), None);
}

#[test]
fn test_fallback_boot_mode() {
    let arena = DmaArena::default();
    let bundle = signed_image(None, PubKeyType::Otp);
    let mut board = TestBoard::new(BootMode::Spi, bundle.to_bytes());
    board.select = BootSelect {
        first: Some(BootMode::Usb),
        second: Some(BootMode::Spi),
    };
    let mut env = rom_env(&arena, provisioned_hsm(&arena, None), board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    let handoff = flow_run(&mut env, ImageId::Bl2, &mut load).unwrap();
    assert_eq!(handoff.boot_mode, BootMode::Spi);
    assert_eq!(env.board.loads, [BootMode::Usb, BootMode::Spi]);
    assert!(env.board.log.reached(BootStep::BootMode2));
    assert!(env.board.log.reached(BootStep::VerifyOk));
}

#[test]
fn test_load_failure() {
    let arena = DmaArena::default();
    let mut board = TestBoard::new(BootMode::Sd, vec![]);
    board.select.second = Some(BootMode::SecureBoot);
    let mut env = rom_env(&arena, provisioned_hsm(&arena, None), board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    assert_eq!(
        flow_run(&mut env, ImageId::Bl2, &mut load),
        Err(SbootError::ROM_IMAGE_LOAD_FAILURE)
    );
    assert_eq!(env.board.errors, [BootErrorCode::LoadBl2]);
    assert_eq!(env.board.loads, [BootMode::Sd]);
    assert!(!env.board.log.reached(BootStep::HeaderInfo));
}

#[test]
fn test_non_secure_boot() {
    let arena = DmaArena::default();
    let raw = payload(1000);
    let mut board = TestBoard::new(BootMode::Usb, raw.clone());
    board.secure_boot = false;
    let mut emu = EmulatedHsm::new(&arena, DMA_OFFSET);
    // Never consulted
    emu.set_hang(true);
    let mut env = rom_env(&arena, emu, board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    let handoff = flow_run(&mut env, ImageId::Bl2, &mut load).unwrap();
    assert!(!handoff.verified);
    assert_eq!(handoff.rollback_id, None);
    assert_eq!(handoff.header.bl_offset, 0);
    assert_eq!(handoff.header.bl_image_size, NS_UNKNOWN_IMAGE_SIZE);
    assert_eq!(handoff.payload(&load), Some(&raw[..]));
    assert!(env.board.log.reached(BootStep::NsBoot));
    assert!(!env.board.log.reached(BootStep::HsmInit));
    assert!(env.board.log.reached(BootStep::NextEp));
    // USB buffers stay with the next stage
    assert_eq!(env.arena.mode(), Some(BootMode::Usb));
}

#[test]
fn test_rollback_rejected() {
    let arena = DmaArena::default();
    let bundle = signed_image(Some(1), PubKeyType::Otp);
    let board = TestBoard::new(BootMode::Sd, bundle.to_bytes());
    let mut env = rom_env(&arena, provisioned_hsm(&arena, Some(vec![0x03])), board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    assert_eq!(
        flow_run(&mut env, ImageId::Bl2, &mut load),
        Err(SbootError::IMAGE_VERIFIER_ERR_ROLLBACK_TOO_LOW)
    );
    assert_eq!(
        env.board.errors,
        [BootErrorCode::Rollback, BootErrorCode::HsmVerify]
    );
    assert!(!env.board.log.reached(BootStep::VerifyOk));
    assert!(!env.board.log.reached(BootStep::PostLoad));
    assert_eq!(env.arena.mode(), None);
}

#[test]
fn test_signature_rejected() {
    let arena = DmaArena::default();
    let bundle = generator()
        .generate(&ImageGeneratorConfig {
            priv_key: ROGUE_KEY_PRIVATE,
            payload: payload(300),
            ..Default::default()
        })
        .unwrap();
    let board = TestBoard::new(BootMode::Sd, bundle.to_bytes());
    let mut env = rom_env(&arena, provisioned_hsm(&arena, None), board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    assert_eq!(
        flow_run(&mut env, ImageId::Bl2, &mut load),
        Err(SbootError::IMAGE_VERIFIER_ERR_SIGNATURE_INVALID)
    );
    assert_eq!(env.board.errors, [BootErrorCode::HsmVerify]);
    assert_eq!(env.board.log.error(), Some(BootErrorCode::HsmVerify));
}

#[test]
fn test_unresponsive_module() {
    let arena = DmaArena::default();
    let bundle = signed_image(None, PubKeyType::Otp);
    let board = TestBoard::new(BootMode::Sd, bundle.to_bytes());
    let mut emu = provisioned_hsm(&arena, None);
    emu.set_hang(true);
    let mut env = rom_env(&arena, emu, board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    assert_eq!(
        flow_run(&mut env, ImageId::Bl2, &mut load),
        Err(SbootError::ROM_HSM_INIT_FAILURE)
    );
    assert_eq!(env.board.errors, [BootErrorCode::HsmInit]);
    assert!(!env.board.log.reached(BootStep::HsmVerify));
}

#[test]
fn test_missing_otp_key_uses_builtin() {
    let arena = DmaArena::default();
    let bundle = signed_image(None, PubKeyType::Rom);
    let mut board = TestBoard::new(BootMode::Sd, bundle.to_bytes());
    board.anchors = signing_anchors();
    let mut env = rom_env(&arena, EmulatedHsm::new(&arena, DMA_OFFSET), board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    assert!(flow_run(&mut env, ImageId::Bl2, &mut load).unwrap().verified);
    assert!(env.board.log.reached(BootStep::HsmNoPubKey));
    assert!(!env.board.log.reached(BootStep::HsmNoPubHash));
}

#[test]
fn test_missing_otp_hash_without_fallback() {
    let arena = DmaArena::default();
    let bundle = signed_image(None, PubKeyType::Image);
    let board = TestBoard::new(BootMode::Sd, bundle.to_bytes());
    let key = signing_anchors().pub_key.unwrap();
    let emu = EmulatedHsm::new(&arena, DMA_OFFSET).with_asset(
        SECURE_BOOT_PUBKEY_NUM,
        StaticAsset::PublicData(key.as_bytes().to_vec()),
    );
    let mut env = rom_env(&arena, emu, board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    assert_eq!(
        flow_run(&mut env, ImageId::Bl2, &mut load),
        Err(SbootError::IMAGE_VERIFIER_ERR_TRUST_ANCHOR_MISSING)
    );
    assert!(env.board.log.reached(BootStep::HsmNoPubHash));
}

#[test]
fn test_board_builtin_key_rejects_test_image() {
    let arena = DmaArena::default();
    let bundle = signed_image(None, PubKeyType::Rom);
    let mut board = TestBoard::new(BootMode::Sd, bundle.to_bytes());
    board.anchors = TrustAnchors::builtin();
    let mut env = rom_env(&arena, EmulatedHsm::new(&arena, DMA_OFFSET), board);
    let mut load = vec![0; LOAD_REGION_SIZE];

    assert_eq!(
        flow_run(&mut env, ImageId::Bl2, &mut load),
        Err(SbootError::IMAGE_VERIFIER_ERR_SIGNATURE_INVALID)
    );
}
