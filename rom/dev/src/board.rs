/*++

Licensed under the Apache-2.0 license.

File Name:

    board.rs

Abstract:

    File contains the hooks a board provides to the ROM flow.

--*/

use sboot_drivers::{BootArena, BootMode, BootStatusRecorder, SbootResult};
use sboot_image_types::ImageId;

use crate::anchors::TrustAnchors;

/// Boot media strapped for the first and the fallback load attempt.
/// `None` skips the attempt.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct BootSelect {
    pub first: Option<BootMode>,
    pub second: Option<BootMode>,
}

/// Board services used by the ROM flow.
///
/// Boot steps and errors go through the `BootStatusRecorder` half, so a
/// board decides where they persist.
pub trait BoardServices: BootStatusRecorder {
    /// Boot media selection
    fn boot_select(&self) -> BootSelect;

    /// Whether the fuses require a verified image
    fn secure_boot_enabled(&self) -> bool;

    /// Read `image_id` from `mode` into `dest`.
    ///
    /// The arena is already handed to `mode`, so media drivers take their
    /// buffers from it.
    ///
    /// # Returns
    ///
    /// * `usize` - Bytes loaded
    fn load_image(
        &mut self,
        mode: BootMode,
        arena: &mut BootArena,
        image_id: ImageId,
        dest: &mut [u8],
    ) -> SbootResult<usize>;

    /// Trust anchors compiled into the ROM, used when OTP has none.
    fn builtin_trust_anchors(&self) -> TrustAnchors {
        TrustAnchors::builtin()
    }

    fn watchdog_ping(&mut self) {}
}
