// Licensed under the Apache-2.0 license

mod asset;
mod hash;
mod mailbox;
mod pka;

use sboot_drivers::{DmaArena, Hsm, HsmConfig};
use sboot_emu_hsm::EmulatedHsm;

/// Offset between host and module addresses used by every test.
pub const DMA_OFFSET: u64 = 0x1000_0000;

pub type TestHsm<'a> = Hsm<'a, EmulatedHsm<'a>>;

pub fn hsm_with<'a>(arena: &'a DmaArena, emu: EmulatedHsm<'a>, config: HsmConfig) -> TestHsm<'a> {
    Hsm::new(
        emu,
        arena,
        HsmConfig {
            dma_offset: DMA_OFFSET,
            ..config
        },
    )
}

pub fn new_hsm(arena: &DmaArena) -> TestHsm<'_> {
    hsm_with(arena, EmulatedHsm::new(arena, DMA_OFFSET), HsmConfig::default())
}

/// Deterministic test message.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}
