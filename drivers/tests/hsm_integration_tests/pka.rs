// Licensed under the Apache-2.0 license

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::mock::StepRng;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use sboot_drivers::token::{PkOperationCommand, TokenRequest};
use sboot_drivers::{
    DmaArena, Ecc256Digest, Ecc256PrivKey, Ecc256PubKey, Ecc256Signature, EccAttempt, SbootError,
};
use sboot_emu_hsm::{EmulatedHsm, StaticAsset};

use crate::{hsm_with, new_hsm, TestHsm, DMA_OFFSET};

const DIGEST: [u8; 32] = [
    0xAF, 0x2B, 0xDB, 0xE1, 0xAA, 0x9B, 0x6E, 0xC1, 0xE2, 0xAD, 0xE1, 0xD6, 0x94, 0xF4, 0x1F,
    0xC7, 0x1A, 0x83, 0x1D, 0x02, 0x68, 0xE9, 0x89, 0x15, 0x62, 0x11, 0x3D, 0x8A, 0x62, 0xAD,
    0xD1, 0xBF,
];

fn signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x2A; 32]).unwrap()
}

fn pub_key_of(key: &SigningKey) -> Ecc256PubKey {
    let point = key.verifying_key().to_encoded_point(false);
    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(point.x().unwrap());
    bytes[32..].copy_from_slice(point.y().unwrap());
    Ecc256PubKey::from_be_bytes(&bytes)
}

fn signature_of(sig: &Signature) -> Ecc256Signature {
    let bytes: [u8; 64] = sig.to_bytes().as_slice().try_into().unwrap();
    Ecc256Signature::from_be_bytes(&bytes)
}

/// Number of PKA operations of kind `command` the module has seen.
fn pk_operations(hsm: &TestHsm, command: PkOperationCommand) -> usize {
    hsm.transport()
        .history()
        .iter()
        .filter(|token| {
            matches!(
                TokenRequest::decode(token),
                Ok(TokenRequest::PkOperation(op)) if op.command == command
            )
        })
        .count()
}

#[test]
fn test_verify_external_signature() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    let key = signing_key();
    let sig: Signature = key.sign_prehash(&DIGEST).unwrap();

    let pub_key = pub_key_of(&key);
    let digest = Ecc256Digest::from(DIGEST);
    let signature = signature_of(&sig);
    assert_eq!(hsm.ecc256_verify(&pub_key, &digest, &signature), Ok(true));

    let mut tampered = DIGEST;
    tampered[0] ^= 1;
    assert_eq!(
        hsm.ecc256_verify(&pub_key, &Ecc256Digest::from(tampered), &signature),
        Ok(false)
    );

    let mut bad_sig = signature.to_be_bytes();
    bad_sig[63] ^= 1;
    assert_eq!(
        hsm.ecc256_verify(&pub_key, &digest, &Ecc256Signature::from_be_bytes(&bad_sig)),
        Ok(false)
    );

    let mut off_curve = pub_key;
    off_curve.y.0[7] ^= 1;
    assert_eq!(hsm.ecc256_verify(&off_curve, &digest, &signature), Ok(false));

    assert_eq!(hsm.dma().live_count(), 0);
    assert!(!hsm.transport_mut().pka_claimed());
}

#[test]
fn test_sign_and_key_pair_round_trip() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    let mut rng = SmallRng::seed_from_u64(0x5EED);

    let (priv_key, pub_key) = hsm.ecc256_key_pair_bounded(&mut rng, 4).unwrap();
    let digest = Ecc256Digest::from(DIGEST);
    let signature = hsm
        .ecc256_sign_bounded(&priv_key, &digest, &mut rng, 4)
        .unwrap();
    assert_eq!(hsm.ecc256_verify(&pub_key, &digest, &signature), Ok(true));

    // The signature also checks out outside the module.
    let mut sec1 = [0x04u8; 65];
    sec1[1..].copy_from_slice(&pub_key.to_be_bytes());
    let verifying_key = VerifyingKey::from_sec1_bytes(&sec1).unwrap();
    let sig = Signature::from_slice(&signature.to_be_bytes()).unwrap();
    assert!(verifying_key.verify_prehash(&DIGEST, &sig).is_ok());

    // And the private key matches the public key.
    let local = SigningKey::from_slice(&priv_key.to_be_bytes()).unwrap();
    assert_eq!(pub_key_of(&local), pub_key);
}

#[test]
fn test_single_attempts() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    let priv_key = Ecc256PrivKey::from([0x2A; 32]);

    match hsm.ecc256_key_pair(&priv_key).unwrap() {
        EccAttempt::Done(pub_key) => assert_eq!(pub_key, pub_key_of(&signing_key())),
        EccAttempt::Retry => panic!("valid scalar bounced"),
    }

    // Zero is not a usable scalar.
    assert_eq!(
        hsm.ecc256_key_pair(&Ecc256PrivKey::default()).unwrap(),
        EccAttempt::Retry
    );
    assert_eq!(
        hsm.ecc256_sign(&priv_key, &Ecc256Digest::from(DIGEST), &Ecc256PrivKey::default())
            .unwrap(),
        EccAttempt::Retry
    );
}

#[test]
fn test_retry_bound_with_degenerate_rng() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    let mut zeros = StepRng::new(0, 0);

    assert_eq!(
        hsm.ecc256_key_pair_bounded(&mut zeros, 5).err(),
        Some(SbootError::DRIVER_PKA_RETRY_EXHAUSTED)
    );
    assert_eq!(pk_operations(&hsm, PkOperationCommand::EccMultiply), 5);

    let priv_key = Ecc256PrivKey::from([0x2A; 32]);
    assert_eq!(
        hsm.ecc256_sign_bounded(&priv_key, &Ecc256Digest::from(DIGEST), &mut zeros, 3)
            .err(),
        Some(SbootError::DRIVER_PKA_RETRY_EXHAUSTED)
    );
    assert_eq!(pk_operations(&hsm, PkOperationCommand::EcdsaSign), 3);

    assert_eq!(
        hsm.ecc256_sign_bounded(&priv_key, &Ecc256Digest::from(DIGEST), &mut zeros, 0)
            .err(),
        Some(SbootError::DRIVER_PKA_ZERO_ATTEMPTS)
    );
    assert_eq!(hsm.dma().live_count(), 0);
}

#[test]
fn test_forced_retries_then_success() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    let mut rng = SmallRng::seed_from_u64(7);
    let priv_key = Ecc256PrivKey::from([0x2A; 32]);
    let digest = Ecc256Digest::from(DIGEST);

    hsm.transport_mut().force_pk_retries(2);
    assert_eq!(
        hsm.ecc256_sign_bounded(&priv_key, &digest, &mut rng, 2).err(),
        Some(SbootError::DRIVER_PKA_RETRY_EXHAUSTED)
    );

    hsm.transport_mut().force_pk_retries(2);
    let signature = hsm
        .ecc256_sign_bounded(&priv_key, &digest, &mut rng, 3)
        .unwrap();
    assert_eq!(
        hsm.ecc256_verify(&pub_key_of(&signing_key()), &digest, &signature),
        Ok(true)
    );
}

#[test]
fn test_verify_with_key_asset() {
    let arena = DmaArena::new();
    let key = signing_key();
    let pub_key = pub_key_of(&key);
    let emu_key = sboot_emu_hsm::Ecc256PubKey {
        x: pub_key.x.to_be_bytes(),
        y: pub_key.y.to_be_bytes(),
    };
    let emu = EmulatedHsm::new(&arena, DMA_OFFSET)
        .with_asset(5, StaticAsset::PublicKey(emu_key))
        .with_asset(6, StaticAsset::CurveParams);
    let mut hsm = hsm_with(&arena, emu, Default::default());

    let key_asset = hsm.asset_search(5).unwrap().unwrap().asset;
    let param_asset = hsm.asset_search(6).unwrap().unwrap().asset;
    let sig: Signature = key.sign_prehash(&DIGEST).unwrap();
    let signature = signature_of(&sig);
    let digest = Ecc256Digest::from(DIGEST);

    assert_eq!(
        hsm.ecc256_verify_with_key_asset(key_asset, param_asset, &digest, &signature),
        Ok(true)
    );
    let mut tampered = DIGEST;
    tampered[5] ^= 0x40;
    assert_eq!(
        hsm.ecc256_verify_with_key_asset(
            key_asset,
            param_asset,
            &Ecc256Digest::from(tampered),
            &signature
        ),
        Ok(false)
    );

    // Parameters and key swapped.
    assert_eq!(
        hsm.ecc256_verify_with_key_asset(param_asset, key_asset, &digest, &signature),
        Err(SbootError::HSM_ACCESS_ERROR)
    );
}
