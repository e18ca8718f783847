// Licensed under the Apache-2.0 license

use rand::rngs::SmallRng;
use rand::SeedableRng;
use sboot_drivers::{
    BootArena, BootErrorCode, BootMode, BootStatusLog, BootStatusRecorder, BootStep, DmaArena,
    Hsm, HsmConfig, SbootError, SbootResult,
};
use sboot_emu_hsm::{EmulatedHsm, StaticAsset};
use sboot_image_gen::fake_keys::SIGNING_KEY_PRIVATE;
use sboot_image_gen::{
    ImageBundle, ImageEccPrivKey, ImageGenerator, ImageGeneratorConfig, ImageGeneratorCrypto,
    RustCrypto,
};
use sboot_image_types::{ImageEccPubKey, ImageId, PubKeyType};
use sboot_rom::{
    monotonic_counter_num, BoardServices, BootSelect, RomEnv, TrustAnchors,
    SECURE_BOOT_PUBHASH_NUM, SECURE_BOOT_PUBKEY_NUM,
};
use zerocopy::AsBytes;

pub const DMA_OFFSET: u64 = 0x4000_0000;

pub const LOAD_REGION_SIZE: usize = 64 << 10;

pub type TestRomEnv<'a> = RomEnv<'a, EmulatedHsm<'a>, TestBoard, SmallRng>;

/// Board serving images from memory and keeping every reported status.
pub struct TestBoard {
    pub log: BootStatusLog,
    pub errors: Vec<BootErrorCode>,
    pub select: BootSelect,
    pub secure_boot: bool,
    pub media: Vec<(BootMode, Vec<u8>)>,
    pub loads: Vec<BootMode>,
    pub anchors: TrustAnchors,
    pub pings: u32,
}

impl TestBoard {
    pub fn new(mode: BootMode, image: Vec<u8>) -> Self {
        Self {
            log: BootStatusLog::default(),
            errors: Vec::new(),
            select: BootSelect {
                first: Some(mode),
                second: None,
            },
            secure_boot: true,
            media: vec![(mode, image)],
            loads: Vec::new(),
            anchors: TrustAnchors::default(),
            pings: 0,
        }
    }

    pub fn steps(&self) -> Vec<BootStep> {
        self.log.steps().collect()
    }
}

impl BootStatusRecorder for TestBoard {
    fn record_boot_step(&mut self, step: BootStep) {
        self.log.record_boot_step(step);
    }

    fn record_boot_error(&mut self, code: BootErrorCode) {
        self.errors.push(code);
        self.log.record_boot_error(code);
    }
}

impl BoardServices for TestBoard {
    fn boot_select(&self) -> BootSelect {
        self.select
    }

    fn secure_boot_enabled(&self) -> bool {
        self.secure_boot
    }

    fn load_image(
        &mut self,
        mode: BootMode,
        arena: &mut BootArena,
        _image_id: ImageId,
        dest: &mut [u8],
    ) -> SbootResult<usize> {
        self.loads.push(mode);
        // Media drivers only touch the buffers of their own mode
        match mode {
            BootMode::Usb => arena.usb_mut()?.bytes_expected = dest.len() as u32,
            BootMode::Sd => arena.sd_mut()?.fat_block[0] = 0xEB,
            BootMode::Spi => arena.spi_mut()?.rx_desc[0] = 1,
            BootMode::SecureBoot => return Err(SbootError::ROM_UNKNOWN_BOOT_MODE),
        }
        let image = self
            .media
            .iter()
            .find(|(m, _)| *m == mode)
            .map(|(_, image)| image)
            .ok_or(SbootError::ROM_IMAGE_LOAD_FAILURE)?;
        dest.get_mut(..image.len())
            .ok_or(SbootError::ROM_IMAGE_LOAD_FAILURE)?
            .copy_from_slice(image);
        Ok(image.len())
    }

    fn builtin_trust_anchors(&self) -> TrustAnchors {
        self.anchors
    }

    fn watchdog_ping(&mut self) {
        self.pings += 1;
    }
}

pub fn generator() -> ImageGenerator<RustCrypto> {
    ImageGenerator::new(RustCrypto::default())
}

pub fn pub_key(priv_key: &ImageEccPrivKey) -> ImageEccPubKey {
    RustCrypto::default().ecc256_pub_key(priv_key).unwrap()
}

/// Anchors matching the image signing key.
pub fn signing_anchors() -> TrustAnchors {
    let key = pub_key(&SIGNING_KEY_PRIVATE);
    TrustAnchors {
        pub_key: Some(key),
        pub_key_digest: Some(generator().pub_key_digest(&key).unwrap()),
    }
}

/// Module with the signing key anchors and an optional BL2 rollback counter.
pub fn provisioned_hsm(arena: &DmaArena, counter: Option<Vec<u8>>) -> EmulatedHsm<'_> {
    let anchors = signing_anchors();
    let mut emu = EmulatedHsm::new(arena, DMA_OFFSET)
        .with_asset(
            SECURE_BOOT_PUBKEY_NUM,
            StaticAsset::PublicData(anchors.pub_key.unwrap().as_bytes().to_vec()),
        )
        .with_asset(
            SECURE_BOOT_PUBHASH_NUM,
            StaticAsset::PublicData(anchors.pub_key_digest.unwrap().to_vec()),
        );
    if let Some(counter) = counter {
        emu = emu.with_asset(
            monotonic_counter_num(ImageId::Bl2),
            StaticAsset::MonotonicCounter(counter),
        );
    }
    emu
}

pub fn hsm<'a>(arena: &'a DmaArena, emu: EmulatedHsm<'a>) -> Hsm<'a, EmulatedHsm<'a>> {
    Hsm::new(
        emu,
        arena,
        HsmConfig {
            dma_offset: DMA_OFFSET,
            ..HsmConfig::default()
        },
    )
}

pub fn rom_env<'a>(arena: &'a DmaArena, emu: EmulatedHsm<'a>, board: TestBoard) -> TestRomEnv<'a> {
    RomEnv::new(hsm(arena, emu), board, SmallRng::seed_from_u64(0xB007))
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 13 + i / 256) as u8).collect()
}

pub fn signed_image(rollback_id: Option<u32>, pub_key_type: PubKeyType) -> ImageBundle {
    generator()
        .generate(&ImageGeneratorConfig {
            pub_key_type,
            rollback_id,
            payload: payload(5000),
            ..Default::default()
        })
        .unwrap()
}
