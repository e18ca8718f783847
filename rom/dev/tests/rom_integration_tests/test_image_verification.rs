// Licensed under the Apache-2.0 license

use sboot_drivers::DmaArena;
use sboot_emu_hsm::EmulatedHsm;
use sboot_image_gen::fake_keys::ROGUE_KEY_PRIVATE;
use sboot_image_gen::{ImageBundle, ImageGeneratorConfig, ImageGeneratorCrypto, RustCrypto};
use sboot_image_types::{ImageId, PubKeyType};
use sboot_image_verify::{
    BootTrustDecision, ImageVerificationEnv, ImageVerifier, TrustOutcome, VerifyDiagnostic,
};
use sboot_rom::{RomImageVerificationEnv, TrustAnchors};
use zerocopy::AsBytes;

use crate::helpers::*;

fn verify<'a>(
    emu: EmulatedHsm<'a>,
    arena: &'a DmaArena,
    bundle: &ImageBundle,
) -> BootTrustDecision {
    verify_with(emu, arena, bundle, signing_anchors())
}

fn verify_with<'a>(
    emu: EmulatedHsm<'a>,
    arena: &'a DmaArena,
    bundle: &ImageBundle,
    anchors: TrustAnchors,
) -> BootTrustDecision {
    let mut hsm = hsm(arena, emu);
    let mut verifier = ImageVerifier::new(RomImageVerificationEnv::new(&mut hsm, anchors));
    verifier.verify(ImageId::Bl2, bundle.header.as_bytes(), &bundle.payload)
}

#[test]
fn test_accepted() {
    let arena = DmaArena::default();
    // Three bits burnt: floor 3
    let emu = provisioned_hsm(&arena, Some(vec![0x07, 0, 0, 0]));
    let bundle = signed_image(Some(3), PubKeyType::Otp);

    let decision = verify(emu, &arena, &bundle);
    assert_eq!(decision.outcome, TrustOutcome::Accepted);
    assert_eq!(decision.signature_valid, Some(true));
    assert_eq!(decision.rollback_ok, Some(true));
    assert_eq!(
        decision.digest,
        Some(
            generator()
                .signed_digest(&bundle.header, &bundle.payload)
                .unwrap()
        )
    );
    assert_eq!(decision.info.unwrap().rollback_id, 3);
}

#[test]
fn test_accepted_with_embedded_key() {
    let arena = DmaArena::default();
    let emu = provisioned_hsm(&arena, None);
    let bundle = signed_image(None, PubKeyType::Image);

    let decision = verify(emu, &arena, &bundle);
    assert!(decision.is_accepted());
    assert_eq!(decision.info.unwrap().rollback_id, 0);
}

#[test]
fn test_rejected_rollback_too_low() {
    let arena = DmaArena::default();
    // Nine bits burnt across two bytes
    let emu = provisioned_hsm(&arena, Some(vec![0xFF, 0x01, 0, 0]));
    let bundle = signed_image(Some(5), PubKeyType::Otp);

    let decision = verify(emu, &arena, &bundle);
    assert_eq!(decision.outcome, TrustOutcome::Rejected);
    assert_eq!(decision.diagnostic, Some(VerifyDiagnostic::RollbackTooLow));
    assert_eq!(decision.signature_valid, Some(true));
    assert_eq!(decision.rollback_ok, Some(false));
    assert_eq!(decision.info, None);
}

#[test]
fn test_rejected_signature_invalid() {
    let arena = DmaArena::default();
    let emu = provisioned_hsm(&arena, None);
    let bundle = generator()
        .generate(&ImageGeneratorConfig {
            priv_key: ROGUE_KEY_PRIVATE,
            payload: payload(700),
            ..Default::default()
        })
        .unwrap();

    let decision = verify(emu, &arena, &bundle);
    assert_eq!(decision.diagnostic, Some(VerifyDiagnostic::SignatureInvalid));
    assert_eq!(decision.signature_valid, Some(false));
    assert_eq!(decision.rollback_ok, None);
}

#[test]
fn test_rejected_tampered_payload() {
    let arena = DmaArena::default();
    let emu = provisioned_hsm(&arena, None);
    let mut bundle = signed_image(None, PubKeyType::Otp);
    bundle.payload[4321] ^= 0x10;

    let decision = verify(emu, &arena, &bundle);
    assert_eq!(decision.diagnostic, Some(VerifyDiagnostic::SignatureInvalid));
}

#[test]
fn test_rejected_hardware_timeout_skips_signature_check() {
    let arena = DmaArena::default();
    let mut emu = provisioned_hsm(&arena, None);
    emu.set_hang(true);
    let bundle = signed_image(None, PubKeyType::Otp);

    let decision = verify(emu, &arena, &bundle);
    assert_eq!(decision.diagnostic, Some(VerifyDiagnostic::HardwareTimeout));
    assert_eq!(decision.digest, None);
    assert_eq!(decision.signature_valid, None);
    assert_eq!(decision.rollback_ok, None);
}

#[test]
fn test_rejected_without_anchor() {
    let arena = DmaArena::default();
    let emu = provisioned_hsm(&arena, None);
    let bundle = signed_image(None, PubKeyType::Rom);

    let decision = verify_with(emu, &arena, &bundle, TrustAnchors::default());
    assert_eq!(decision.diagnostic, Some(VerifyDiagnostic::TrustAnchorMissing));
    assert_eq!(decision.signature_valid, None);
}

#[test]
fn test_streamed_digest_matches_one_shot() {
    let arena = DmaArena::default();
    let mut hsm = hsm(&arena, EmulatedHsm::new(&arena, DMA_OFFSET));
    let mut env = RomImageVerificationEnv::new(&mut hsm, TrustAnchors::default());
    let crypto = RustCrypto::default();

    for (a, b, c) in [
        (8, 192, 0),
        (8, 192, 1),
        (0, 63, 65),
        (64, 64, 64),
        (3, 5, 4096),
        (8, 192, 4096 * 2 + 5),
        (0, 0, 0),
    ] {
        let data = payload(a + b + c);
        let parts: [&[u8]; 3] = [&data[..a], &data[a..a + b], &data[a + b..]];
        assert_eq!(
            env.sha256_digest(&parts).unwrap(),
            crypto.sha256_digest(&[&data]).unwrap(),
            "split {a}/{b}/{c}"
        );
    }
}
