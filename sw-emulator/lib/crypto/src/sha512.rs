/*++

Licensed under the Apache-2.0 license.

File Name:

    sha512.rs

Abstract:

    File contains implementation of Secure Hash 512 Algorithm (SHA-512)
    and its SHA-384 truncation, with importable intermediate state.

--*/

use sha2::digest::consts::U128;
use sha2::digest::generic_array::GenericArray;

/// SHA-512 Mode
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sha512Mode {
    Sha384,
    Sha512,
}

/// SHA-512
#[derive(Debug, Clone)]
pub struct Sha512 {
    /// Hash
    hash: [u64; 8],

    /// SHA 512 Mode
    mode: Sha512Mode,
}

impl Sha512 {
    /// SHA-512 Block Size
    pub const BLOCK_SIZE: usize = 128;

    /// SHA-512 Hash Size
    pub const HASH_SIZE: usize = 64;

    /// Size of the exported intermediate state
    pub const STATE_SIZE: usize = 64;

    /// SHA-384 Initial Hash Vectors
    const HASH_IV_384: [u64; 8] = [
        0xcbbb9d5dc1059ed8,
        0x629a292a367cd507,
        0x9159015a3070dd17,
        0x152fecd8f70e5939,
        0x67332667ffc00b31,
        0x8eb44a8768581511,
        0xdb0c2e0d64f98fa7,
        0x47b5481dbefa4fa4,
    ];

    /// SHA-512 Initial Hash Vectors
    const HASH_IV_512: [u64; 8] = [
        0x6a09e667f3bcc908,
        0xbb67ae8584caa73b,
        0x3c6ef372fe94f82b,
        0xa54ff53a5f1d36f1,
        0x510e527fade682d1,
        0x9b05688c2b3e6c1f,
        0x1f83d9abfb41bd6b,
        0x5be0cd19137e2179,
    ];

    /// Create a new instance of Secure Hash Algorithm object
    ///
    /// # Arguments
    ///
    /// * `mode` - Mode of the SHA Operation
    pub fn new(mode: Sha512Mode) -> Self {
        let hash = match mode {
            Sha512Mode::Sha384 => Self::HASH_IV_384,
            Sha512Mode::Sha512 => Self::HASH_IV_512,
        };
        Self { hash, mode }
    }

    /// Resume from a state previously returned by `state`.
    pub fn from_state(mode: Sha512Mode, state: &[u8]) -> Option<Self> {
        if state.len() != Self::STATE_SIZE {
            return None;
        }
        let mut hash = [0u64; 8];
        for (word, chunk) in hash.iter_mut().zip(state.chunks_exact(8)) {
            *word = u64::from_be_bytes(chunk.try_into().ok()?);
        }
        Some(Self { hash, mode })
    }

    pub fn mode(&self) -> Sha512Mode {
        self.mode
    }

    /// Compress every whole block of `data` and return the unprocessed tail.
    pub fn update_blocks<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let mut blocks = data.chunks_exact(Self::BLOCK_SIZE);
        for block in &mut blocks {
            sha2::compress512(
                &mut self.hash,
                &[*GenericArray::<u8, U128>::from_slice(block)],
            );
        }
        blocks.remainder()
    }

    /// Hash the trailing bytes of the message and apply the padding.
    pub fn finalize(&mut self, tail: &[u8], total_len: u64) {
        let rest = self.update_blocks(tail);

        let mut pad = [0u8; 2 * Self::BLOCK_SIZE];
        pad[..rest.len()].copy_from_slice(rest);
        pad[rest.len()] = 0x80;
        let blocks = if rest.len() + 1 + 16 > Self::BLOCK_SIZE { 2 } else { 1 };
        let end = blocks * Self::BLOCK_SIZE;
        let bits = u128::from(total_len) * 8;
        pad[end - 16..end].copy_from_slice(&bits.to_be_bytes());
        self.update_blocks(&pad[..end]);
    }

    /// Export the full intermediate state, big-endian.
    pub fn state(&self, out: &mut [u8; Self::STATE_SIZE]) {
        for (chunk, word) in out.chunks_exact_mut(8).zip(self.hash.iter()) {
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
            Sha512Mode::Sha384 => 48,
            Sha512Mode::Sha512 => Self::HASH_SIZE,
        }
    }
}
