/*++

Licensed under the Apache-2.0 license.

File Name:

    rom_env.rs

Abstract:

    File implements a context holding all the services utilized by ROM.
    The primary need for this abstraction is to hide the hardware details
    from the ROM flows. The natural side benefit of this abstraction is it
    makes authoring mocks and unit tests easy.

--*/

use rand_core::RngCore;
use sboot_drivers::{BootArena, Hsm, MailboxTransport};

use crate::board::BoardServices;

/// Rom Context
pub struct RomEnv<'m, T: MailboxTransport, B: BoardServices, R: RngCore> {
    /// Security module
    pub hsm: Hsm<'m, T>,

    /// Board hooks and boot status storage
    pub board: B,

    /// Memory shared by the boot media drivers and secure boot
    pub arena: BootArena,

    /// Seed source for the signing self test
    pub rng: R,
}

impl<'m, T: MailboxTransport, B: BoardServices, R: RngCore> RomEnv<'m, T, B, R> {
    pub fn new(hsm: Hsm<'m, T>, board: B, rng: R) -> Self {
        Self {
            hsm,
            board,
            arena: BootArena::new(),
            rng,
        }
    }
}
