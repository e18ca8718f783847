/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains the DMA resource manager: a fixed-capacity table of
    records describing memory the security module may access, addressed by
    generation-checked handles.

--*/

use bitflags::bitflags;
use core::cell::UnsafeCell;
use core::marker::PhantomData;

use crate::{SbootError, SbootResult};

/// Number of DMA records, and of pool buffers backing allocations.
pub const DMA_POOL_CAPACITY: usize = 4;

/// Size of each pool buffer in bytes.
pub const DMA_BUFFER_SIZE: usize = 4096;

/// Alignment of each pool buffer.
pub const DMA_BUFFER_ALIGN: usize = 64;

/// Address pairs stored per record.
pub const DMA_MAX_ADDRESS_PAIRS: usize = 3;

const DMA_RECORD_MAGIC: u32 = 0xde42_b5e7;

/// Address space in which a buffer address is meaningful
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DmaDomain {
    Unknown,
    Host,
    HostUnaligned,
    Bus,
    Interhost,
    HsmDma,
    Alternative,
}

/// How a record came to exist
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum DmaOrigin {
    Allocated = b'A',
    Registered = b'R',
    Attached = b'T',
}

bitflags! {
    /// DMA buffer property flags
    pub struct DmaFlags: u32 {
        const CACHED = 1 << 0;
        const BYTE_SWAP = 1 << 1;
    }
}

/// Requested properties of a DMA buffer
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DmaProperties {
    pub size: usize,
    pub alignment: usize,
    pub bank: u8,
    pub flags: DmaFlags,
}

impl DmaProperties {
    pub const fn new(size: usize) -> Self {
        Self {
            size,
            alignment: 4,
            bank: 0,
            flags: DmaFlags::empty(),
        }
    }
}

/// Handle to a live DMA record
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DmaHandle {
    index: u8,
    generation: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct AddressPair {
    domain: DmaDomain,
    addr: u64,
}

#[derive(Debug, Copy, Clone)]
enum DmaMemory {
    None,
    Slot,
    Registered { ptr: *mut u8, len: usize },
}

#[derive(Debug, Copy, Clone)]
struct DmaRecord {
    magic: u32,
    generation: u32,
    props: DmaProperties,
    origin: DmaOrigin,
    pairs: [Option<AddressPair>; DMA_MAX_ADDRESS_PAIRS],
    memory: DmaMemory,
}

impl DmaRecord {
    const EMPTY: DmaRecord = DmaRecord {
        magic: 0,
        generation: 0,
        props: DmaProperties::new(0),
        origin: DmaOrigin::Allocated,
        pairs: [None; DMA_MAX_ADDRESS_PAIRS],
        memory: DmaMemory::None,
    };

    fn is_live(&self) -> bool {
        self.magic == DMA_RECORD_MAGIC
    }

    fn add_pair(&mut self, domain: DmaDomain, addr: u64) -> SbootResult<()> {
        if self.pairs.iter().flatten().any(|p| p.domain == domain) {
            return Err(SbootError::DRIVER_DMA_DOMAIN_EXISTS);
        }
        let free = self
            .pairs
            .iter_mut()
            .find(|p| p.is_none())
            .ok_or(SbootError::DRIVER_DMA_PAIR_TABLE_FULL)?;
        *free = Some(AddressPair { domain, addr });
        Ok(())
    }
}

#[repr(C, align(64))]
struct DmaSlot(UnsafeCell<[u8; DMA_BUFFER_SIZE]>);

impl DmaSlot {
    const NEW: DmaSlot = DmaSlot(UnsafeCell::new([0u8; DMA_BUFFER_SIZE]));
}

/// Backing memory for pool allocations.
///
/// The module reads and writes this memory behind the compiler's back, so
/// every buffer lives in an `UnsafeCell`.
pub struct DmaArena {
    slots: [DmaSlot; DMA_POOL_CAPACITY],
}

impl DmaArena {
    pub const fn new() -> Self {
        Self {
            slots: [DmaSlot::NEW; DMA_POOL_CAPACITY],
        }
    }

    /// Pointer to the first byte of the arena, for bus models that access
    /// pool memory the way the module's DMA engine does.
    pub fn as_ptr(&self) -> *mut u8 {
        self.slots.as_ptr() as *mut u8
    }

    /// Arena size in bytes.
    pub const fn size(&self) -> usize {
        DMA_POOL_CAPACITY * DMA_BUFFER_SIZE
    }
}

impl Default for DmaArena {
    fn default() -> Self {
        Self::new()
    }
}

/// DMA resource manager
pub struct DmaPool<'m> {
    arena: &'m DmaArena,
    records: [DmaRecord; DMA_POOL_CAPACITY],
    hsm_offset: u64,
    _registered: PhantomData<&'m mut [u8]>,
}

impl<'m> DmaPool<'m> {
    /// Create a pool over `arena`.
    ///
    /// # Arguments
    ///
    /// * `arena`      - Backing memory
    /// * `hsm_offset` - Offset added to host addresses to form module DMA addresses
    pub fn new(arena: &'m DmaArena, hsm_offset: u64) -> Self {
        Self {
            arena,
            records: [DmaRecord::EMPTY; DMA_POOL_CAPACITY],
            hsm_offset,
            _registered: PhantomData,
        }
    }

    /// Number of live records.
    pub fn live_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_live()).count()
    }

    /// Reserve a pool buffer.
    pub fn alloc(&mut self, props: DmaProperties) -> SbootResult<DmaHandle> {
        if props.size == 0 || props.size > DMA_BUFFER_SIZE {
            return Err(SbootError::DRIVER_DMA_INVALID_SIZE);
        }
        if !props.alignment.is_power_of_two() || props.alignment > DMA_BUFFER_ALIGN {
            return Err(SbootError::DRIVER_DMA_INVALID_ALIGNMENT);
        }

        let index = self.free_index()?;
        let host = self
            .arena
            .slots
            .get(index)
            .ok_or(SbootError::DRIVER_DMA_OUT_OF_RESOURCES)?
            .0
            .get() as u64;
        let hsm = host.wrapping_add(self.hsm_offset);
        self.claim(index, props, DmaOrigin::Allocated, DmaMemory::Slot, |rec| {
            rec.add_pair(DmaDomain::Host, host)?;
            rec.add_pair(DmaDomain::HsmDma, hsm)
        })
    }

    /// Wrap caller-owned memory without copying it.
    ///
    /// The memory stays borrowed for the lifetime of the pool.
    pub fn register(
        &mut self,
        memory: &'m mut [u8],
        props: DmaProperties,
    ) -> SbootResult<DmaHandle> {
        if memory.is_empty() || props.size > memory.len() {
            return Err(SbootError::DRIVER_DMA_INVALID_SIZE);
        }
        let host = memory.as_mut_ptr() as u64;
        if !props.alignment.is_power_of_two() || host % props.alignment as u64 != 0 {
            return Err(SbootError::DRIVER_DMA_INVALID_ALIGNMENT);
        }

        let index = self.free_index()?;
        let props = DmaProperties {
            size: memory.len(),
            ..props
        };
        let memory = DmaMemory::Registered {
            ptr: memory.as_mut_ptr(),
            len: memory.len(),
        };
        let hsm = host.wrapping_add(self.hsm_offset);
        self.claim(index, props, DmaOrigin::Registered, memory, |rec| {
            rec.add_pair(DmaDomain::Host, host)?;
            rec.add_pair(DmaDomain::HsmDma, hsm)
        })
    }

    /// Describe an existing mapping known only by its address in `domain`.
    pub fn attach(
        &mut self,
        domain: DmaDomain,
        addr: u64,
        props: DmaProperties,
    ) -> SbootResult<DmaHandle> {
        if props.size == 0 {
            return Err(SbootError::DRIVER_DMA_INVALID_SIZE);
        }
        let index = self.free_index()?;
        self.claim(index, props, DmaOrigin::Attached, DmaMemory::None, |rec| {
            rec.add_pair(domain, addr)
        })
    }

    /// Record the address of the buffer in another domain.
    pub fn add_pair(
        &mut self,
        handle: DmaHandle,
        domain: DmaDomain,
        addr: u64,
    ) -> SbootResult<()> {
        self.record_mut(handle)?.add_pair(domain, addr)
    }

    /// Address of the buffer in `domain`.
    pub fn translate(&self, handle: DmaHandle, domain: DmaDomain) -> SbootResult<u64> {
        self.record(handle)?
            .pairs
            .iter()
            .flatten()
            .find(|p| p.domain == domain)
            .map(|p| p.addr)
            .ok_or(SbootError::DRIVER_DMA_DOMAIN_NOT_FOUND)
    }

    pub fn properties(&self, handle: DmaHandle) -> SbootResult<DmaProperties> {
        Ok(self.record(handle)?.props)
    }

    pub fn origin(&self, handle: DmaHandle) -> SbootResult<DmaOrigin> {
        Ok(self.record(handle)?.origin)
    }

    /// Copy `data` into the buffer at `offset`.
    pub fn write(&mut self, handle: DmaHandle, offset: usize, data: &[u8]) -> SbootResult<()> {
        let buf = self.host_bytes(handle)?;
        let end = offset
            .checked_add(data.len())
            .ok_or(SbootError::DRIVER_DMA_OUT_OF_BOUNDS)?;
        buf.get_mut(offset..end)
            .ok_or(SbootError::DRIVER_DMA_OUT_OF_BOUNDS)?
            .copy_from_slice(data);
        Ok(())
    }

    /// Copy bytes from the buffer at `offset` into `out`.
    pub fn read(&mut self, handle: DmaHandle, offset: usize, out: &mut [u8]) -> SbootResult<()> {
        let buf = self.host_bytes(handle)?;
        let end = offset
            .checked_add(out.len())
            .ok_or(SbootError::DRIVER_DMA_OUT_OF_BOUNDS)?;
        out.copy_from_slice(
            buf.get(offset..end)
                .ok_or(SbootError::DRIVER_DMA_OUT_OF_BOUNDS)?,
        );
        Ok(())
    }

    /// Invalidate the record, scrub pool memory and return the slot.
    ///
    /// Releasing a stale handle is reported as `DRIVER_DMA_INVALID_HANDLE`.
    pub fn release(&mut self, handle: DmaHandle) -> SbootResult<()> {
        let record = *self.record(handle)?;
        if let DmaMemory::Slot = record.memory {
            if let Some(slot) = self.arena.slots.get(usize::from(handle.index)) {
                // SAFETY: the record is live, so no other handle refers to
                // this slot, and `&mut self` excludes concurrent pool access.
                unsafe { (*slot.0.get()).fill(0) };
            }
        }
        let rec = self
            .records
            .get_mut(usize::from(handle.index))
            .ok_or(SbootError::DRIVER_DMA_INVALID_HANDLE)?;
        *rec = DmaRecord {
            generation: record.generation.wrapping_add(1),
            ..DmaRecord::EMPTY
        };
        Ok(())
    }

    fn free_index(&self) -> SbootResult<usize> {
        self.records
            .iter()
            .position(|r| !r.is_live())
            .ok_or(SbootError::DRIVER_DMA_OUT_OF_RESOURCES)
    }

    fn claim<F>(
        &mut self,
        index: usize,
        props: DmaProperties,
        origin: DmaOrigin,
        memory: DmaMemory,
        pairs: F,
    ) -> SbootResult<DmaHandle>
    where
        F: FnOnce(&mut DmaRecord) -> SbootResult<()>,
    {
        let rec = self
            .records
            .get_mut(index)
            .ok_or(SbootError::DRIVER_DMA_OUT_OF_RESOURCES)?;
        let mut fresh = DmaRecord {
            magic: DMA_RECORD_MAGIC,
            generation: rec.generation,
            props,
            origin,
            pairs: [None; DMA_MAX_ADDRESS_PAIRS],
            memory,
        };
        pairs(&mut fresh)?;
        *rec = fresh;
        Ok(DmaHandle {
            index: index as u8,
            generation: fresh.generation,
        })
    }

    fn record(&self, handle: DmaHandle) -> SbootResult<&DmaRecord> {
        match self.records.get(usize::from(handle.index)) {
            Some(rec) if rec.is_live() && rec.generation == handle.generation => Ok(rec),
            _ => Err(SbootError::DRIVER_DMA_INVALID_HANDLE),
        }
    }

    fn record_mut(&mut self, handle: DmaHandle) -> SbootResult<&mut DmaRecord> {
        match self.records.get_mut(usize::from(handle.index)) {
            Some(rec) if rec.is_live() && rec.generation == handle.generation => Ok(rec),
            _ => Err(SbootError::DRIVER_DMA_INVALID_HANDLE),
        }
    }

    fn host_bytes(&mut self, handle: DmaHandle) -> SbootResult<&mut [u8]> {
        let rec = *self.record(handle)?;
        match rec.memory {
            DmaMemory::Slot => {
                let slot = self
                    .arena
                    .slots
                    .get(usize::from(handle.index))
                    .ok_or(SbootError::DRIVER_DMA_INVALID_HANDLE)?;
                // SAFETY: the live record owns the slot exclusively and the
                // returned borrow is tied to `&mut self`.
                let buf = unsafe { &mut *slot.0.get() };
                buf.get_mut(..rec.props.size)
                    .ok_or(SbootError::DRIVER_DMA_OUT_OF_BOUNDS)
            }
            DmaMemory::Registered { ptr, len } => {
                // SAFETY: `ptr`/`len` came from a `&'m mut [u8]` handed to
                // `register`, which stays borrowed for the pool lifetime.
                Ok(unsafe { core::slice::from_raw_parts_mut(ptr, len) })
            }
            DmaMemory::None => Err(SbootError::DRIVER_DMA_NOT_HOST_ACCESSIBLE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_translate_release() {
        let arena = DmaArena::new();
        let mut pool = DmaPool::new(&arena, 0x1000_0000);
        let handle = pool.alloc(DmaProperties::new(128)).unwrap();
        let host = pool.translate(handle, DmaDomain::Host).unwrap();
        assert_eq!(host % DMA_BUFFER_ALIGN as u64, 0);
        assert_eq!(
            pool.translate(handle, DmaDomain::HsmDma).unwrap(),
            host + 0x1000_0000
        );
        assert_eq!(
            pool.translate(handle, DmaDomain::Bus),
            Err(SbootError::DRIVER_DMA_DOMAIN_NOT_FOUND)
        );
        assert_eq!(pool.origin(handle), Ok(DmaOrigin::Allocated));
        assert_eq!(pool.live_count(), 1);

        pool.release(handle).unwrap();
        assert_eq!(pool.live_count(), 0);
        assert_eq!(
            pool.translate(handle, DmaDomain::Host),
            Err(SbootError::DRIVER_DMA_INVALID_HANDLE)
        );
        assert_eq!(
            pool.release(handle),
            Err(SbootError::DRIVER_DMA_INVALID_HANDLE)
        );
    }

    #[test]
    fn test_pool_exhaustion() {
        let arena = DmaArena::new();
        let mut pool = DmaPool::new(&arena, 0);
        let handles: Vec<_> = (0..DMA_POOL_CAPACITY)
            .map(|_| pool.alloc(DmaProperties::new(DMA_BUFFER_SIZE)).unwrap())
            .collect();
        assert_eq!(
            pool.alloc(DmaProperties::new(16)),
            Err(SbootError::DRIVER_DMA_OUT_OF_RESOURCES)
        );
        pool.release(handles[2]).unwrap();
        let again = pool.alloc(DmaProperties::new(16)).unwrap();
        assert_ne!(again, handles[2]);
        assert_eq!(
            pool.properties(handles[2]),
            Err(SbootError::DRIVER_DMA_INVALID_HANDLE)
        );
    }

    #[test]
    fn test_stale_handle_survives_u16_cycles() {
        let arena = DmaArena::new();
        let mut pool = DmaPool::new(&arena, 0);
        let props = DmaProperties::new(64);
        let stale = pool.attach(DmaDomain::Bus, 0x8000_0000, props).unwrap();
        pool.release(stale).unwrap();
        for _ in 0..u32::from(u16::MAX) {
            let handle = pool.attach(DmaDomain::Bus, 0x8000_0000, props).unwrap();
            pool.release(handle).unwrap();
        }
        let current = pool.attach(DmaDomain::Bus, 0x8000_0000, props).unwrap();
        assert_eq!(
            pool.translate(stale, DmaDomain::Bus),
            Err(SbootError::DRIVER_DMA_INVALID_HANDLE)
        );
        assert_eq!(pool.translate(current, DmaDomain::Bus), Ok(0x8000_0000));
    }

    #[test]
    fn test_alloc_rejects_bad_properties() {
        let arena = DmaArena::new();
        let mut pool = DmaPool::new(&arena, 0);
        assert_eq!(
            pool.alloc(DmaProperties::new(0)),
            Err(SbootError::DRIVER_DMA_INVALID_SIZE)
        );
        assert_eq!(
            pool.alloc(DmaProperties::new(DMA_BUFFER_SIZE + 1)),
            Err(SbootError::DRIVER_DMA_INVALID_SIZE)
        );
        let props = DmaProperties {
            alignment: 3,
            ..DmaProperties::new(16)
        };
        assert_eq!(
            pool.alloc(props),
            Err(SbootError::DRIVER_DMA_INVALID_ALIGNMENT)
        );
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_release_scrubs_buffer() {
        let arena = DmaArena::new();
        let mut pool = DmaPool::new(&arena, 0);
        let handle = pool.alloc(DmaProperties::new(32)).unwrap();
        pool.write(handle, 0, &[0xA5; 32]).unwrap();
        let mut out = [0u8; 32];
        pool.read(handle, 0, &mut out).unwrap();
        assert_eq!(out, [0xA5; 32]);
        pool.release(handle).unwrap();

        let handle = pool.alloc(DmaProperties::new(32)).unwrap();
        pool.read(handle, 0, &mut out).unwrap();
        assert_eq!(out, [0u8; 32]);
        assert_eq!(
            pool.write(handle, 16, &[0u8; 17]),
            Err(SbootError::DRIVER_DMA_OUT_OF_BOUNDS)
        );
    }

    #[test]
    fn test_register_and_attach() {
        let arena = DmaArena::new();
        let mut backing = [0u32; 8];
        let memory = zerocopy::AsBytes::as_bytes_mut(&mut backing[..]);
        let host = memory.as_ptr() as u64;
        let mut pool = DmaPool::new(&arena, 0x40);

        let reg = pool.register(memory, DmaProperties::new(32)).unwrap();
        assert_eq!(pool.origin(reg), Ok(DmaOrigin::Registered));
        assert_eq!(pool.translate(reg, DmaDomain::Host), Ok(host));
        assert_eq!(pool.translate(reg, DmaDomain::HsmDma), Ok(host + 0x40));
        pool.write(reg, 4, &[1, 2, 3, 4]).unwrap();

        let att = pool
            .attach(DmaDomain::Bus, 0x8000_0000, DmaProperties::new(64))
            .unwrap();
        assert_eq!(pool.origin(att), Ok(DmaOrigin::Attached));
        pool.add_pair(att, DmaDomain::HsmDma, 0x9000_0000).unwrap();
        assert_eq!(
            pool.add_pair(att, DmaDomain::Bus, 0),
            Err(SbootError::DRIVER_DMA_DOMAIN_EXISTS)
        );
        pool.add_pair(att, DmaDomain::Alternative, 0xA000_0000).unwrap();
        assert_eq!(
            pool.add_pair(att, DmaDomain::Interhost, 0),
            Err(SbootError::DRIVER_DMA_PAIR_TABLE_FULL)
        );
        assert_eq!(
            pool.write(att, 0, &[0]),
            Err(SbootError::DRIVER_DMA_NOT_HOST_ACCESSIBLE)
        );

        pool.release(reg).unwrap();
        pool.release(att).unwrap();
        assert_eq!(backing[1].to_ne_bytes(), [1, 2, 3, 4]);
    }
}
