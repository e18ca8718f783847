/*++

Licensed under the Apache-2.0 license.

File Name:

    status_reporter.rs

Abstract:

    File contains the boot step and persisted boot error codes, and the
    recorder interface boards implement to store them.

--*/

use crate::cprintln;

/// Boot progress markers
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum BootStep {
    EarlySetup = 0,
    WdtStart = 1,
    MmuStart = 2,
    PlatSetup = 3,
    Tzc = 4,
    CleanBl2 = 5,
    BootMode1 = 6,
    BootMode2 = 7,
    HeaderInfo = 8,
    NsBoot = 9,
    HsmInit = 10,
    HsmNoPubKey = 11,
    HsmNoPubHash = 12,
    HsmVerify = 13,
    VerifyOk = 14,
    PostLoad = 15,
    GetDesc = 16,
    NextEp = 17,
}

/// Error codes persisted for post-mortem diagnosis
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u16)]
pub enum BootErrorCode {
    Success = 0,
    LoadBl2 = 1,
    Rollback = 2,
    HsmInit = 3,
    HsmVerify = 4,
    UsbCoreInit = 5,
    UsbFastbootCmd = 6,
    AuthModVerify = 7,
}

/// Board storage for boot progress.
pub trait BootStatusRecorder {
    fn record_boot_step(&mut self, step: BootStep);
    fn record_boot_error(&mut self, code: BootErrorCode);
}

/// Report boot progress
///
/// # Arguments
///
/// * `recorder` - Board storage
/// * `step`     - Boot step reached
pub fn report_boot_step<R: BootStatusRecorder + ?Sized>(recorder: &mut R, step: BootStep) {
    cprintln!("[boot] step {}", step as u8);
    recorder.record_boot_step(step);
}

/// Report a boot failure
pub fn report_boot_error<R: BootStatusRecorder + ?Sized>(recorder: &mut R, code: BootErrorCode) {
    cprintln!("[boot] error {}", code as u16);
    recorder.record_boot_error(code);
}

const BOOT_STATUS_LOG_DEPTH: usize = 32;

/// Recorder keeping the step history in memory.
#[derive(Debug, Clone)]
pub struct BootStatusLog {
    steps: [Option<BootStep>; BOOT_STATUS_LOG_DEPTH],
    count: usize,
    error: Option<BootErrorCode>,
}

impl Default for BootStatusLog {
    fn default() -> Self {
        Self {
            steps: [None; BOOT_STATUS_LOG_DEPTH],
            count: 0,
            error: None,
        }
    }
}

impl BootStatusLog {
    /// Steps in the order they were recorded. Older entries are dropped
    /// once the log is full.
    pub fn steps(&self) -> impl Iterator<Item = BootStep> + '_ {
        let start = self.count.saturating_sub(BOOT_STATUS_LOG_DEPTH);
        (start..self.count).filter_map(|i| self.steps[i % BOOT_STATUS_LOG_DEPTH])
    }

    pub fn last_step(&self) -> Option<BootStep> {
        self.count
            .checked_sub(1)
            .and_then(|i| self.steps[i % BOOT_STATUS_LOG_DEPTH])
    }

    pub fn reached(&self, step: BootStep) -> bool {
        self.steps().any(|s| s == step)
    }

    pub fn error(&self) -> Option<BootErrorCode> {
        self.error
    }
}

impl BootStatusRecorder for BootStatusLog {
    fn record_boot_step(&mut self, step: BootStep) {
        self.steps[self.count % BOOT_STATUS_LOG_DEPTH] = Some(step);
        self.count += 1;
    }

    fn record_boot_error(&mut self, code: BootErrorCode) {
        self.error = Some(code);
    }
}
