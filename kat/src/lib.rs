/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the secure boot Known Answer Tests.

--*/

#![no_std]

mod ecc256_kat;
mod kats_env;
mod sha256_kat;
mod sha384_kat;

pub use ecc256_kat::Ecc256Kat;
pub use kats_env::KatsEnv;
pub use sboot_drivers::{SbootError, SbootResult};
pub use sha256_kat::Sha256Kat;
pub use sha384_kat::Sha384Kat;

use sboot_drivers::{cprintln, MailboxTransport};

/// Execute Known Answer Tests
///
/// # Arguments
///
/// * `env` - KAT Environment
pub fn execute_kat<T, R>(env: &mut KatsEnv<T, R>) -> SbootResult<()>
where
    T: MailboxTransport,
    R: rand_core::RngCore,
{
    cprintln!("[kat] ++");

    cprintln!("[kat] sha256");
    Sha256Kat::default().execute(env.hsm)?;

    cprintln!("[kat] sha384");
    Sha384Kat::default().execute(env.hsm)?;

    cprintln!("[kat] ecc256");
    Ecc256Kat::default().execute(env.hsm, env.rng)?;

    cprintln!("[kat] --");
    Ok(())
}
