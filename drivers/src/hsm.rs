/*++

Licensed under the Apache-2.0 license.

File Name:

    hsm.rs

Abstract:

    File contains the security module context: the mailbox, the DMA pool
    and the settings every service call shares.

--*/

use crate::dma::{DmaArena, DmaDomain, DmaHandle, DmaPool, DmaProperties, DMA_POOL_CAPACITY};
use crate::mailbox::{Mailbox, MailboxTransport};
use crate::token::{HashLayout, ResultToken, TokenRequest};
use crate::wait::DEFAULT_POLL_LIMIT;
use crate::{SbootError, SbootResult};

/// Host identity stamped into every command token.
pub const DEFAULT_HOST_IDENTITY: u32 = 0x4F5A_3647;

/// Security module driver settings
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HsmConfig {
    pub identity: u32,

    /// Completion polls per token before the call fails with a timeout.
    pub poll_limit: u32,

    pub hash_layout: HashLayout,

    /// Offset from a host address to the module's view of the same memory.
    pub dma_offset: u64,
}

impl Default for HsmConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_HOST_IDENTITY,
            poll_limit: DEFAULT_POLL_LIMIT,
            hash_layout: HashLayout::from_config(),
            dma_offset: 0,
        }
    }
}

/// Security module context.
///
/// Owns the mailbox and the DMA pool. Service calls take `&mut self`, so
/// the module never sees two tokens at once.
pub struct Hsm<'m, T: MailboxTransport> {
    mailbox: Mailbox<T>,
    dma: DmaPool<'m>,
    config: HsmConfig,

    /// Buffers owned by a timed out token, released once its result drains.
    quarantine: [Option<DmaHandle>; DMA_POOL_CAPACITY],
}

impl<'m, T: MailboxTransport> Hsm<'m, T> {
    pub fn new(transport: T, arena: &'m DmaArena, config: HsmConfig) -> Self {
        Self {
            mailbox: Mailbox::new(transport, config.identity, config.poll_limit),
            dma: DmaPool::new(arena, config.dma_offset),
            config,
            quarantine: [None; DMA_POOL_CAPACITY],
        }
    }

    pub fn config(&self) -> &HsmConfig {
        &self.config
    }

    pub fn dma(&self) -> &DmaPool<'m> {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut DmaPool<'m> {
        &mut self.dma
    }

    pub fn transport(&self) -> &T {
        self.mailbox.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.mailbox.transport_mut()
    }

    /// Number of buffers held back for a timed out token.
    pub fn quarantined_count(&self) -> usize {
        self.quarantine.iter().flatten().count()
    }

    /// Encode `req`, exchange it and return the raw result.
    pub fn submit_raw(&mut self, req: &TokenRequest) -> SbootResult<ResultToken> {
        let token = req.encode(self.config.hash_layout)?;
        self.reclaim()?;
        self.mailbox.exchange(token)
    }

    /// Encode `req`, exchange it and fail on a negative result code.
    pub fn submit(&mut self, req: &TokenRequest) -> SbootResult<ResultToken> {
        let token = req.encode(self.config.hash_layout)?;
        self.reclaim()?;
        self.mailbox.exchange_checked(token)
    }

    /// Drain a stale result and release the buffers its token owned.
    ///
    /// Fails with `DRIVER_MAILBOX_BUSY` while the module still holds them.
    fn reclaim(&mut self) -> SbootResult<()> {
        if self.mailbox.has_stale() {
            self.mailbox.drain_stale()?;
        }
        for slot in self.quarantine.iter_mut() {
            if let Some(handle) = slot.take() {
                self.dma.release(handle)?;
            }
        }
        Ok(())
    }

    /// Module address of a DMA buffer.
    pub(crate) fn dma_addr(&self, handle: DmaHandle) -> SbootResult<u64> {
        self.dma.translate(handle, DmaDomain::HsmDma)
    }

    /// Run `f` with a freshly allocated DMA buffer.
    ///
    /// The buffer is released once `f` has consumed the result. After a
    /// mailbox timeout the module may still own the buffer, so it is
    /// quarantined until the stale result has been drained.
    pub(crate) fn with_dma<R, F>(&mut self, size: usize, f: F) -> SbootResult<R>
    where
        F: FnOnce(&mut Self, DmaHandle) -> SbootResult<R>,
    {
        self.reclaim()?;
        let handle = self.dma.alloc(DmaProperties::new(size))?;
        let result = f(self, handle);
        if result.as_ref().err() == Some(&SbootError::DRIVER_MAILBOX_TIMEOUT) {
            if let Some(slot) = self.quarantine.iter_mut().find(|s| s.is_none()) {
                *slot = Some(handle);
            }
            return result;
        }
        self.dma.release(handle)?;
        result
    }
}
