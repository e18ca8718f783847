// Licensed under the Apache-2.0 license

use sboot_drivers::token::{HashAlgorithm, Opcode};
use sboot_drivers::{
    DmaArena, HsmConfig, SbootError, DEFAULT_HOST_IDENTITY, DMA_POOL_CAPACITY,
};
use sboot_emu_hsm::EmulatedHsm;

use crate::{hsm_with, new_hsm, DMA_OFFSET};

const SHORT_POLL_LIMIT: u32 = 16;

#[test]
fn test_token_ids_and_identity() {
    let arena = DmaArena::new();
    let mut hsm = new_hsm(&arena);
    hsm.system_info().unwrap();
    hsm.hash_digest(HashAlgorithm::Sha256, b"abc").unwrap();
    hsm.system_info().unwrap();

    let history = hsm.transport().history();
    let ids: Vec<u16> = history.iter().map(|t| t.token_id()).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert!(history.iter().all(|t| t.identity() == DEFAULT_HOST_IDENTITY));
    assert_eq!(history[1].opcode(), Ok(Opcode::Hash));
}

#[test]
fn test_busy_module_within_poll_limit() {
    let arena = DmaArena::new();
    let mut emu = EmulatedHsm::new(&arena, DMA_OFFSET);
    emu.set_busy_polls(SHORT_POLL_LIMIT - 1);
    let mut hsm = hsm_with(
        &arena,
        emu,
        HsmConfig {
            poll_limit: SHORT_POLL_LIMIT,
            ..Default::default()
        },
    );
    assert!(hsm.system_info().is_ok());
}

#[test]
fn test_timeout_quarantines_buffer() {
    let arena = DmaArena::new();
    let mut emu = EmulatedHsm::new(&arena, DMA_OFFSET);
    emu.set_hang(true);
    let mut hsm = hsm_with(
        &arena,
        emu,
        HsmConfig {
            poll_limit: SHORT_POLL_LIMIT,
            ..Default::default()
        },
    );

    assert_eq!(
        hsm.hash_digest(HashAlgorithm::Sha256, b"abc").err(),
        Some(SbootError::DRIVER_MAILBOX_TIMEOUT)
    );
    // The module may still write to the buffer, so it stays allocated.
    assert_eq!(hsm.dma().live_count(), 1);
    assert_eq!(hsm.quarantined_count(), 1);

    // The abandoned token owns the mailbox until its result shows up.
    assert_eq!(
        hsm.system_info().err(),
        Some(SbootError::DRIVER_MAILBOX_BUSY)
    );
    assert_eq!(hsm.transport().history().len(), 1);

    hsm.transport_mut().set_hang(false);
    let info = hsm.system_info().unwrap();
    assert_eq!(info.identity, DEFAULT_HOST_IDENTITY);
    assert_eq!(hsm.transport().history().len(), 2);
    assert_eq!(hsm.dma().live_count(), 0);
    assert_eq!(hsm.quarantined_count(), 0);
}

#[test]
fn test_repeated_timeouts_do_not_exhaust_pool() {
    let arena = DmaArena::new();
    let emu = EmulatedHsm::new(&arena, DMA_OFFSET);
    let mut hsm = hsm_with(
        &arena,
        emu,
        HsmConfig {
            poll_limit: SHORT_POLL_LIMIT,
            ..Default::default()
        },
    );

    for _ in 0..DMA_POOL_CAPACITY + 1 {
        hsm.transport_mut().set_hang(true);
        assert_eq!(
            hsm.hash_digest(HashAlgorithm::Sha256, b"abc").err(),
            Some(SbootError::DRIVER_MAILBOX_TIMEOUT)
        );
        hsm.transport_mut().set_hang(false);
        hsm.system_info().unwrap();
        assert_eq!(hsm.dma().live_count(), 0);
    }

    let digest = hsm.hash_digest(HashAlgorithm::Sha256, b"abc").unwrap();
    assert_eq!(
        digest.as_bytes(),
        hex::decode("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
            .unwrap()
    );
}

#[test]
fn test_timeout_inside_buffer_call_recovers() {
    let arena = DmaArena::new();
    let mut emu = EmulatedHsm::new(&arena, DMA_OFFSET);
    emu.set_hang(true);
    let mut hsm = hsm_with(
        &arena,
        emu,
        HsmConfig {
            poll_limit: SHORT_POLL_LIMIT,
            ..Default::default()
        },
    );

    let mut out = [0u8; 16];
    assert_eq!(
        hsm.nop_copy(&[0x5A; 16], &mut out).err(),
        Some(SbootError::DRIVER_MAILBOX_TIMEOUT)
    );
    assert_eq!(hsm.quarantined_count(), 2);

    // Still held while the module has not answered.
    assert_eq!(
        hsm.nop_copy(&[0x5A; 16], &mut out).err(),
        Some(SbootError::DRIVER_MAILBOX_BUSY)
    );
    assert_eq!(hsm.dma().live_count(), 2);

    hsm.transport_mut().set_hang(false);
    hsm.nop_copy(&[0x5A; 16], &mut out).unwrap();
    assert_eq!(out, [0x5A; 16]);
    assert_eq!(hsm.dma().live_count(), 0);
}
