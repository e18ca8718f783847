// Licensed under the Apache-2.0 license

use rand_core::RngCore;
use sboot_drivers::{Hsm, MailboxTransport};

pub struct KatsEnv<'a, 'm, T: MailboxTransport, R: RngCore> {
    /// Security module
    pub hsm: &'a mut Hsm<'m, T>,

    /// Seed source for signing
    pub rng: &'a mut R,
}
