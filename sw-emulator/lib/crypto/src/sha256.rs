/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains implementation of Secure Hash 256 Algorithm (SHA-256)
    with importable intermediate state.

--*/

use sha2::digest::consts::U64;
use sha2::digest::generic_array::GenericArray;

/// SHA-256 Mode
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sha256Mode {
    Sha224,
    Sha256,
}

/// SHA-256
#[derive(Debug, Clone)]
pub struct Sha256 {
    /// Hash
    hash: [u32; 8],

    /// SHA 256 Mode
    mode: Sha256Mode,
}

impl Sha256 {
    /// SHA-256 Block Size
    pub const BLOCK_SIZE: usize = 64;

    /// SHA-256 Hash Size
    pub const HASH_SIZE: usize = 32;

    /// Size of the exported intermediate state
    pub const STATE_SIZE: usize = 32;

    /// SHA-224 Initial Hash Vectors
    const HASH_IV_224: [u32; 8] = [
        0xc1059ed8, 0x367cd507, 0x3070dd17, 0xf70e5939, 0xffc00b31, 0x68581511, 0x64f98fa7,
        0xbefa4fa4,
    ];

    /// SHA-256 Initial Hash Vectors
    const HASH_IV_256: [u32; 8] = [
        0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab,
        0x5be0cd19,
    ];

    /// Create a new instance of Secure Hash Algorithm object
    ///
    /// # Arguments
    ///
    /// * `mode` - Mode of the SHA Operation
    pub fn new(mode: Sha256Mode) -> Self {
        let hash = match mode {
            Sha256Mode::Sha224 => Self::HASH_IV_224,
            Sha256Mode::Sha256 => Self::HASH_IV_256,
        };
        Self { hash, mode }
    }

    /// Resume from a state previously returned by `state`.
    ///
    /// Returns None if `state` is not `STATE_SIZE` bytes.
    pub fn from_state(mode: Sha256Mode, state: &[u8]) -> Option<Self> {
        if state.len() != Self::STATE_SIZE {
            return None;
        }
        let mut hash = [0u32; 8];
        for (word, chunk) in hash.iter_mut().zip(state.chunks_exact(4)) {
            *word = u32::from_be_bytes(chunk.try_into().ok()?);
        }
        Some(Self { hash, mode })
    }

    pub fn mode(&self) -> Sha256Mode {
        self.mode
    }

    /// Compress one block
    pub fn update(&mut self, block: &[u8; Self::BLOCK_SIZE]) {
        sha2::compress256(&mut self.hash, &[*GenericArray::<u8, U64>::from_slice(block)]);
    }

    /// Compress every whole block of `data` and return the unprocessed tail.
    pub fn update_blocks<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let mut blocks = data.chunks_exact(Self::BLOCK_SIZE);
        for block in &mut blocks {
            sha2::compress256(&mut self.hash, &[*GenericArray::<u8, U64>::from_slice(block)]);
        }
        blocks.remainder()
    }

    /// Hash the trailing bytes of the message and apply the padding.
    ///
    /// # Arguments
    ///
    /// * `tail`      - Remaining message bytes, of any length
    /// * `total_len` - Length in bytes of the whole message
    pub fn finalize(&mut self, tail: &[u8], total_len: u64) {
        let rest = self.update_blocks(tail);

        let mut pad = [0u8; 2 * Self::BLOCK_SIZE];
        pad[..rest.len()].copy_from_slice(rest);
        pad[rest.len()] = 0x80;
        let blocks = if rest.len() + 1 + 8 > Self::BLOCK_SIZE { 2 } else { 1 };
        let end = blocks * Self::BLOCK_SIZE;
        pad[end - 8..end].copy_from_slice(&total_len.wrapping_mul(8).to_be_bytes());
        self.update_blocks(&pad[..end]);
    }

    /// Export the full intermediate state, big-endian.
    pub fn state(&self, out: &mut [u8; Self::STATE_SIZE]) {
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.hash.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
    }

    /// Retrieve the digest, truncated to the mode's length.
    pub fn hash(&self, out: &mut [u8]) {
        let mut state = [0u8; Self::STATE_SIZE];
        self.state(&mut state);
        let len = out.len().min(self.hash_len());
        out[..len].copy_from_slice(&state[..len]);
    }

    /// Digest length in bytes
    pub fn hash_len(&self) -> usize {
        match self.mode {
            Sha256Mode::Sha224 => 28,
            Sha256Mode::Sha256 => Self::HASH_SIZE,
        }
    }
}
