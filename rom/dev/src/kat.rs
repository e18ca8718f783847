/*++

Licensed under the Apache-2.0 license.

File Name:

    kat.rs

Abstract:

    File contains execution routines for Known Answer Tests (KATs).

--*/

use rand_core::RngCore;
use sboot_drivers::{MailboxTransport, SbootResult};
use sboot_kat::KatsEnv;

use crate::board::BoardServices;
use crate::rom_env::RomEnv;

/// Execute Known Answer Tests
///
/// # Arguments
///
/// * `env` - ROM Environment
pub fn execute_kat<T, B, R>(env: &mut RomEnv<T, B, R>) -> SbootResult<()>
where
    T: MailboxTransport,
    B: BoardServices,
    R: RngCore,
{
    let mut kats_env = KatsEnv {
        hsm: &mut env.hsm,
        rng: &mut env.rng,
    };
    sboot_kat::execute_kat(&mut kats_env)
}
