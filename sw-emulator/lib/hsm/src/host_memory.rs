/*++

Licensed under the Apache-2.0 license.

File Name:

    host_memory.rs

Abstract:

    File contains the model of the module's DMA view of host memory.

--*/

use std::marker::PhantomData;

use sboot_drivers::DmaArena;

/// Host memory reachable by the emulated DMA engine.
///
/// Only the DMA arena is mapped. Module addresses are host addresses plus
/// `dma_offset`; anything outside the arena is a bus error.
pub struct HostMemory<'a> {
    base: *mut u8,
    base_addr: u64,
    size: usize,
    dma_offset: u64,
    _arena: PhantomData<&'a DmaArena>,
}

/// DMA access outside the mapped window
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BusError {
    pub addr: u64,
    pub len: usize,
}

impl<'a> HostMemory<'a> {
    pub fn new(arena: &'a DmaArena, dma_offset: u64) -> Self {
        Self {
            base: arena.as_ptr(),
            base_addr: arena.as_ptr() as u64,
            size: arena.size(),
            dma_offset,
            _arena: PhantomData,
        }
    }

    /// Copy `len` bytes from module address `addr`.
    pub fn read(&self, addr: u64, len: usize) -> Result<Vec<u8>, BusError> {
        let offset = self.window_offset(addr, len)?;
        let mut out = vec![0u8; len];
        // SAFETY: `window_offset` checked that the range lies inside the
        // arena, whose bytes are all behind `UnsafeCell` and outlive 'a.
        unsafe {
            core::ptr::copy_nonoverlapping(self.base.add(offset), out.as_mut_ptr(), len);
        }
        Ok(out)
    }

    /// Copy `data` to module address `addr`.
    pub fn write(&mut self, addr: u64, data: &[u8]) -> Result<(), BusError> {
        let offset = self.window_offset(addr, data.len())?;
        // SAFETY: as in `read`; the host side holds no reference into the
        // arena while a token is being processed.
        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), self.base.add(offset), data.len());
        }
        Ok(())
    }

    fn window_offset(&self, addr: u64, len: usize) -> Result<usize, BusError> {
        let err = BusError { addr, len };
        let offset = addr
            .checked_sub(self.dma_offset)
            .and_then(|host| host.checked_sub(self.base_addr))
            .ok_or(err)?;
        let offset = usize::try_from(offset).map_err(|_| err)?;
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(offset),
            _ => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sboot_drivers::{DmaPool, DmaProperties};

    #[test]
    fn test_reads_through_offset() {
        let arena = DmaArena::new();
        let mut pool = DmaPool::new(&arena, 0x1000);
        let buf = pool.alloc(DmaProperties::new(16)).unwrap();
        pool.write(buf, 0, b"sixteen bytes!!!").unwrap();
        let addr = pool
            .translate(buf, sboot_drivers::DmaDomain::HsmDma)
            .unwrap();

        let mut mem = HostMemory::new(&arena, 0x1000);
        assert_eq!(mem.read(addr, 16).unwrap(), b"sixteen bytes!!!");
        mem.write(addr + 8, b"BYTES").unwrap();

        let mut out = [0u8; 16];
        pool.read(buf, 0, &mut out).unwrap();
        assert_eq!(&out, b"sixteen BYTES!!!");
    }

    #[test]
    fn test_rejects_outside_window() {
        let arena = DmaArena::new();
        let mem = HostMemory::new(&arena, 0);
        let end = arena.as_ptr() as u64 + arena.size() as u64;
        assert!(mem.read(end - 4, 4).is_ok());
        assert_eq!(mem.read(end - 4, 5), Err(BusError { addr: end - 4, len: 5 }));
        assert!(mem.read(0, 1).is_err());
        assert!(mem.read(u64::MAX, 1).is_err());
    }
}
