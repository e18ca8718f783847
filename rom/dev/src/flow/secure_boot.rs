/*++

Licensed under the Apache-2.0 license.

File Name:

    secure_boot.rs

Abstract:

    File contains the secure boot half of the ROM flow: bring up the
    security module and verify the loaded image.

--*/

use rand_core::RngCore;
use sboot_drivers::printer::HexBytes;
use sboot_drivers::*;
use sboot_image_types::{ImageId, IMAGE_HEADER_BYTE_SIZE};
use sboot_image_verify::{ImageVerifier, VerifyDiagnostic};

use crate::anchors::TrustAnchors;
use crate::board::BoardServices;
use crate::kat::execute_kat;
use crate::rom_env::RomEnv;
use crate::verifier::RomImageVerificationEnv;

/// Verify `image` and report the outcome.
///
/// # Returns
///
/// * `u32` - Rollback identifier of the accepted image
pub(super) fn verify_image<T, B, R>(
    env: &mut RomEnv<T, B, R>,
    image_id: ImageId,
    image: &[u8],
) -> SbootResult<u32>
where
    T: MailboxTransport,
    B: BoardServices,
    R: RngCore,
{
    report_boot_step(&mut env.board, BootStep::HsmInit);
    let anchors = match hsm_init(env) {
        Ok(anchors) => anchors,
        Err(err) => {
            cprintln!("[rom] module init failed 0x{}", HexBytes(&u32::from(err).to_be_bytes()));
            report_boot_error(&mut env.board, BootErrorCode::HsmInit);
            return Err(SbootError::ROM_HSM_INIT_FAILURE);
        }
    };

    report_boot_step(&mut env.board, BootStep::HsmVerify);

    // The verifier works on a private copy of the header
    env.arena.reset();
    env.arena.select(BootMode::SecureBoot)?;
    let header_len = image.len().min(SECURE_BOOT_HEADER_CAPACITY);
    {
        let buffers = env.arena.secure_boot_mut()?;
        buffers.header[..header_len].copy_from_slice(&image[..header_len]);
        buffers.header_len = header_len;
    }
    let payload = image.get(IMAGE_HEADER_BYTE_SIZE..).unwrap_or_default();

    let decision = {
        let RomEnv { hsm, arena, .. } = &mut *env;
        let mut verifier = ImageVerifier::new(RomImageVerificationEnv::new(hsm, anchors));
        verifier.verify(image_id, arena.secure_boot_mut()?.header(), payload)
    };
    env.arena.reset();

    match decision.info {
        Some(info) if decision.is_accepted() => {
            report_boot_step(&mut env.board, BootStep::VerifyOk);
            env.board.watchdog_ping();
            Ok(info.rollback_id)
        }
        _ => {
            if decision.diagnostic == Some(VerifyDiagnostic::RollbackTooLow) {
                report_boot_error(&mut env.board, BootErrorCode::Rollback);
            }
            report_boot_error(&mut env.board, BootErrorCode::HsmVerify);
            Err(decision.error.unwrap_or(SbootError::ROM_IMAGE_REJECTED))
        }
    }
}

/// Check the module answers, run the self tests and fetch the trust anchors.
fn hsm_init<T, B, R>(env: &mut RomEnv<T, B, R>) -> SbootResult<TrustAnchors>
where
    T: MailboxTransport,
    B: BoardServices,
    R: RngCore,
{
    let info = env.hsm.system_info()?;
    cprintln!(
        "[rom] module fw {}.{}.{}",
        info.fw_major,
        info.fw_minor,
        info.fw_patch
    );
    if info.otp_error != 0 {
        cprintln!(
            "[rom] OTP error {} at {}",
            info.otp_error,
            info.otp_error_location
        );
    }

    execute_kat(env)?;

    let fallback = env.board.builtin_trust_anchors();
    TrustAnchors::load(&mut env.hsm, &mut env.board, fallback)
}
