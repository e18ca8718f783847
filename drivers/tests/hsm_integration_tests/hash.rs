// Licensed under the Apache-2.0 license

use sboot_drivers::token::{HashAlgorithm, HashLayout};
use sboot_drivers::{Array4x8, DmaArena, HsmConfig, SbootError, DMA_BUFFER_SIZE};
use sboot_emu_hsm::EmulatedHsm;
use sha2::Digest;

use crate::{hsm_with, new_hsm, pattern, DMA_OFFSET};

fn reference(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha224 => sha2::Sha224::digest(data).to_vec(),
        HashAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
        _ => unreachable!(),
    }
}

const ALGORITHMS: [HashAlgorithm; 4] = [
    HashAlgorithm::Sha224,
    HashAlgorithm::Sha256,
    HashAlgorithm::Sha384,
    HashAlgorithm::Sha512,
];

#[test]
fn test_digest_abc() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    let expected: [u8; 32] = [
        0xBA, 0x78, 0x16, 0xBF, 0x8F, 0x1, 0xCF, 0xEA, 0x41, 0x41, 0x40, 0xDE, 0x5D, 0xAE, 0x22,
        0x23, 0xB0, 0x3, 0x61, 0xA3, 0x96, 0x17, 0x7A, 0x9C, 0xB4, 0x10, 0xFF, 0x61, 0xF2, 0x0,
        0x15, 0xAD,
    ];
    let digest = hsm.hash_digest(HashAlgorithm::Sha256, b"abc").unwrap();
    assert_eq!(digest.as_bytes(), &expected);
    assert_eq!(digest.to_array4x8(), Some(Array4x8::from(expected)));
}

#[test]
fn test_digest_empty() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    let expected: [u8; 32] = [
        0xE3, 0xB0, 0xC4, 0x42, 0x98, 0xFC, 0x1C, 0x14, 0x9A, 0xFB, 0xF4, 0xC8, 0x99, 0x6F, 0xB9,
        0x24, 0x27, 0xAE, 0x41, 0xE4, 0x64, 0x9B, 0x93, 0x4C, 0xA4, 0x95, 0x99, 0x1B, 0x78, 0x52,
        0xB8, 0x55,
    ];
    let digest = hsm.hash_digest(HashAlgorithm::Sha256, &[]).unwrap();
    assert_eq!(digest.as_bytes(), &expected);
}

#[test]
fn test_chunked_matches_one_shot() {
    let data = pattern(3 * DMA_BUFFER_SIZE + 77);
    for algorithm in ALGORITHMS {
        let arena = DmaArena::new();
        let mut hsm = new_hsm(&arena);

        let one_shot = hsm.hash_digest(algorithm, &data).unwrap();

        let mut session = hsm.hash_init(algorithm).unwrap();
        session.update(&data[..256]).unwrap();
        session.update(&data[256..DMA_BUFFER_SIZE + 1280]).unwrap();
        assert_eq!(session.total_len(), (DMA_BUFFER_SIZE + 1280) as u64);
        let chunked = session.finish(&data[DMA_BUFFER_SIZE + 1280..]).unwrap();

        assert_eq!(one_shot, chunked, "{algorithm:?}");
        assert_eq!(one_shot.as_bytes(), reference(algorithm, &data), "{algorithm:?}");
        assert_eq!(one_shot.as_bytes().len(), algorithm.digest_size());
        assert_eq!(hsm.dma().live_count(), 0);
    }
}

#[test]
fn test_block_boundary_lengths() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    for len in [55, 56, 63, 64, 111, 112, 127, 128, 129, DMA_BUFFER_SIZE, DMA_BUFFER_SIZE + 1] {
        let data = pattern(len);
        for algorithm in ALGORITHMS {
            let digest = hsm.hash_digest(algorithm, &data).unwrap();
            assert_eq!(digest.as_bytes(), reference(algorithm, &data), "{algorithm:?} {len}");
        }
    }
}

#[test]
fn test_alternate_token_layout() {
    let arena = DmaArena::new();
    let mut hsm = hsm_with(
        &arena,
        EmulatedHsm::new(&arena, DMA_OFFSET),
        HsmConfig {
            hash_layout: HashLayout::V2,
            ..Default::default()
        },
    );
    let data = pattern(1000);
    let mut session = hsm.hash_init(HashAlgorithm::Sha384).unwrap();
    session.update(&data[..512]).unwrap();
    let digest = session.finish(&data[512..]).unwrap();
    assert_eq!(digest.as_bytes(), reference(HashAlgorithm::Sha384, &data));
}

#[test]
fn test_unaligned_update_rejected() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);

    let mut session = hsm.hash_init(HashAlgorithm::Sha256).unwrap();
    assert_eq!(
        session.update(&[0u8; 65]),
        Err(SbootError::DRIVER_HASH_UNALIGNED_UPDATE)
    );

    // 64 bytes is a whole block for SHA-256 but half of one for SHA-512.
    let mut session = hsm.hash_init(HashAlgorithm::Sha512).unwrap();
    assert_eq!(
        session.update(&[0u8; 64]),
        Err(SbootError::DRIVER_HASH_UNALIGNED_UPDATE)
    );
    session.update(&[0u8; 128]).unwrap();
    let digest = session.finish(&[0u8; 64]).unwrap();
    assert_eq!(digest.as_bytes(), reference(HashAlgorithm::Sha512, &[0u8; 192]));
}

#[test]
fn test_unsupported_algorithms() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);

    assert_eq!(
        hsm.hash_init(HashAlgorithm::Sha3_256).err(),
        Some(SbootError::DRIVER_HASH_UNSUPPORTED_ALGORITHM)
    );

    // The module has no SHA-1 engine; the session ends with its error.
    let mut session = hsm.hash_init(HashAlgorithm::Sha1).unwrap();
    assert_eq!(
        session.update(&[0u8; 64]),
        Err(SbootError::HSM_INVALID_PARAMETER)
    );
    assert_eq!(
        session.update(&[0u8; 64]),
        Err(SbootError::DRIVER_HASH_INVALID_STATE)
    );

    assert_eq!(
        hsm.hash_digest(HashAlgorithm::Sm3, b"abc").err(),
        Some(SbootError::HSM_INVALID_PARAMETER)
    );
    assert_eq!(hsm.dma().live_count(), 0);
}
