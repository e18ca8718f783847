/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains the ROM flow: load the next image from the strapped boot
    media, read its header and, when secure boot is enabled, verify it
    before handing off.

--*/

mod secure_boot;

use rand_core::RngCore;
use sboot_drivers::printer::HexBytes;
use sboot_drivers::*;
use sboot_image_types::ImageId;

use crate::board::BoardServices;
use crate::header_info::HeaderInfo;
use crate::rom_env::RomEnv;

/// What the ROM hands to the next boot stage
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootHandoff {
    pub image_id: ImageId,

    /// Media the image was loaded from
    pub boot_mode: BootMode,

    /// Bytes loaded into the load region
    pub loaded_len: usize,

    /// Set when the image passed secure boot verification
    pub verified: bool,

    pub header: HeaderInfo,

    /// Rollback identifier of a verified image
    pub rollback_id: Option<u32>,
}

impl BootHandoff {
    /// Payload of the next stage within the loaded `image`.
    pub fn payload<'a>(&self, image: &'a [u8]) -> Option<&'a [u8]> {
        let start = self.header.bl_offset as usize;
        let end = start
            .checked_add(self.header.bl_image_size as usize)?
            .min(self.loaded_len)
            .min(image.len());
        image.get(start..end)
    }
}

/// Execute the ROM flow for `image_id`
///
/// # Arguments
///
/// * `env`      - ROM Environment
/// * `image_id` - Image to load
/// * `image`    - Load region; cleared before loading
///
/// # Returns
///
/// * `BootHandoff` - Entry information for the loaded image
pub fn flow_run<T, B, R>(
    env: &mut RomEnv<T, B, R>,
    image_id: ImageId,
    image: &mut [u8],
) -> SbootResult<BootHandoff>
where
    T: MailboxTransport,
    B: BoardServices,
    R: RngCore,
{
    cprintln!("[rom] ++");
    report_boot_step(&mut env.board, BootStep::GetDesc);

    report_boot_step(&mut env.board, BootStep::CleanBl2);
    image.fill(0);

    let (boot_mode, len) = match load_image(env, image_id, image) {
        Ok(loaded) => loaded,
        Err(err) => {
            cprintln!("[rom] load failed 0x{}", HexBytes(&u32::from(err).to_be_bytes()));
            report_boot_error(&mut env.board, BootErrorCode::LoadBl2);
            return Err(SbootError::ROM_IMAGE_LOAD_FAILURE);
        }
    };
    let image = image
        .get(..len)
        .ok_or(SbootError::ROM_IMAGE_LOAD_FAILURE)?;

    report_boot_step(&mut env.board, BootStep::HeaderInfo);
    let header = HeaderInfo::parse(image);
    let mut handoff = BootHandoff {
        image_id,
        boot_mode,
        loaded_len: len,
        verified: false,
        header,
        rollback_id: None,
    };

    if env.board.secure_boot_enabled() {
        handoff.rollback_id = Some(secure_boot::verify_image(env, image_id, image)?);
        handoff.verified = true;
    } else {
        report_boot_step(&mut env.board, BootStep::NsBoot);
        env.board.watchdog_ping();
    }

    report_boot_step(&mut env.board, BootStep::PostLoad);
    report_boot_step(&mut env.board, BootStep::NextEp);
    cprintln!("[rom] --");
    Ok(handoff)
}

/// Try the first boot media, then the fallback.
fn load_image<T, B, R>(
    env: &mut RomEnv<T, B, R>,
    image_id: ImageId,
    image: &mut [u8],
) -> SbootResult<(BootMode, usize)>
where
    T: MailboxTransport,
    B: BoardServices,
    R: RngCore,
{
    let select = env.board.boot_select();
    let mut result = Err(SbootError::ROM_IMAGE_LOAD_FAILURE);
    for (step, mode) in [
        (BootStep::BootMode1, select.first),
        (BootStep::BootMode2, select.second),
    ] {
        report_boot_step(&mut env.board, step);
        let Some(mode) = mode else {
            continue;
        };
        match load_from(env, mode, image_id, image) {
            Ok(len) => return Ok((mode, len)),
            Err(err) => result = Err(err),
        }
    }
    result
}

fn load_from<T, B, R>(
    env: &mut RomEnv<T, B, R>,
    mode: BootMode,
    image_id: ImageId,
    image: &mut [u8],
) -> SbootResult<usize>
where
    T: MailboxTransport,
    B: BoardServices,
    R: RngCore,
{
    if mode == BootMode::SecureBoot {
        return Err(SbootError::ROM_UNKNOWN_BOOT_MODE);
    }
    env.arena.reset();
    env.arena.select(mode)?;
    match env.board.load_image(mode, &mut env.arena, image_id, image)? {
        0 => Err(SbootError::ROM_IMAGE_LOAD_FAILURE),
        len if len > image.len() => Err(SbootError::ROM_IMAGE_LOAD_FAILURE),
        len => Ok(len),
    }
}
