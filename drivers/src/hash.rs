/*++

Licensed under the Apache-2.0 license.

File Name:

    hash.rs

Abstract:

    File contains the multi step hash session driven through the security
    module.

--*/

use crate::dma::DMA_BUFFER_SIZE;
use crate::hsm::Hsm;
use crate::mailbox::MailboxTransport;
use crate::token::{
    decode_hash_state, HashAlgorithm, HashRequest, TokenRequest, HASH_BLOCK_SIZE,
    HASH_STATE_MAX_SIZE,
};
use crate::{Array4x8, SbootError, SbootResult};

/// Message digest produced by a hash session
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HashDigest {
    algorithm: HashAlgorithm,
    bytes: [u8; HASH_STATE_MAX_SIZE],
}

impl HashDigest {
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.algorithm.digest_size()]
    }

    /// SHA-256 digest as big-endian words.
    pub fn to_array4x8(&self) -> Option<Array4x8> {
        match self.algorithm {
            HashAlgorithm::Sha256 => Array4x8::from_be_slice(self.as_bytes()),
            _ => None,
        }
    }
}

/// Hash session state
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HashSessionState {
    /// No data submitted yet
    Init,

    /// Intermediate state held by the session
    Pending,

    /// Digest produced
    Final,
}

/// Multi step hash operation.
///
/// Non-final updates must be a multiple of the algorithm's block size. The session
/// carries the intermediate state and total length between tokens, so the
/// module holds nothing between calls.
pub struct HashSession<'a, 'm, T: MailboxTransport> {
    hsm: &'a mut Hsm<'m, T>,
    algorithm: HashAlgorithm,
    state: HashSessionState,
    intermediate: [u8; HASH_STATE_MAX_SIZE],
    total_len: u64,
}

impl<'m, T: MailboxTransport> Hsm<'m, T> {
    /// Start a multi step hash operation.
    ///
    /// Algorithms without an intermediate state layout are refused here.
    /// Everything else is left to the module to accept or reject.
    pub fn hash_init(&mut self, algorithm: HashAlgorithm) -> SbootResult<HashSession<'_, 'm, T>> {
        if algorithm.state_size().is_none() {
            return Err(SbootError::DRIVER_HASH_UNSUPPORTED_ALGORITHM);
        }
        Ok(HashSession {
            hsm: self,
            algorithm,
            state: HashSessionState::Init,
            intermediate: [0u8; HASH_STATE_MAX_SIZE],
            total_len: 0,
        })
    }

    /// Hash `data` in one call.
    pub fn hash_digest(
        &mut self,
        algorithm: HashAlgorithm,
        data: &[u8],
    ) -> SbootResult<HashDigest> {
        self.hash_init(algorithm)?.finish(data)
    }
}

impl<'a, 'm, T: MailboxTransport> HashSession<'a, 'm, T> {
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Bytes hashed so far.
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Feed block aligned data into the session.
    pub fn update(&mut self, data: &[u8]) -> SbootResult<()> {
        if self.state == HashSessionState::Final {
            return Err(SbootError::DRIVER_HASH_INVALID_STATE);
        }
        if data.len() % self.algorithm.block_size() != 0 {
            return Err(SbootError::DRIVER_HASH_UNALIGNED_UPDATE);
        }
        for chunk in data.chunks(DMA_BUFFER_SIZE) {
            self.submit(chunk, false)?;
        }
        Ok(())
    }

    /// Hash the trailing `data` and produce the digest.
    ///
    /// `data` may have any length. Whatever does not fit in one DMA buffer
    /// is sent as block aligned intermediate chunks first.
    pub fn finish(mut self, data: &[u8]) -> SbootResult<HashDigest> {
        if self.state == HashSessionState::Final {
            return Err(SbootError::DRIVER_HASH_INVALID_STATE);
        }
        let split = data.len().saturating_sub(1) / DMA_BUFFER_SIZE * DMA_BUFFER_SIZE;
        let (head, tail) = data.split_at(split);
        for chunk in head.chunks(DMA_BUFFER_SIZE) {
            self.submit(chunk, false)?;
        }
        self.submit(tail, true)?;
        Ok(HashDigest {
            algorithm: self.algorithm,
            bytes: self.intermediate,
        })
    }

    fn submit(&mut self, chunk: &[u8], finalize: bool) -> SbootResult<()> {
        let total_len = self
            .total_len
            .checked_add(chunk.len() as u64)
            .ok_or(SbootError::DRIVER_HASH_MAX_DATA)?;
        let init_with_default = self.state == HashSessionState::Init;
        let out_len = if finalize {
            self.algorithm.digest_size()
        } else {
            self.algorithm
                .state_size()
                .ok_or(SbootError::DRIVER_HASH_UNSUPPORTED_ALGORITHM)?
        };
        let algorithm = self.algorithm;
        let intermediate = self.intermediate;

        let output = self
            .hsm
            .with_dma(chunk.len().max(HASH_BLOCK_SIZE), |hsm, buf| {
                hsm.dma_mut().write(buf, 0, chunk)?;
                let req = HashRequest {
                    init_with_default,
                    finalize,
                    state: intermediate,
                    total_len,
                    ..HashRequest::new(algorithm, hsm.dma_addr(buf)?, chunk.len() as u32)
                };
                let result = hsm.submit(&TokenRequest::Hash(req))?;
                decode_hash_state(&result, out_len)
            });

        match output {
            Ok(state) => {
                self.intermediate = state;
                self.total_len = total_len;
                self.state = if finalize {
                    HashSessionState::Final
                } else {
                    HashSessionState::Pending
                };
                Ok(())
            }
            Err(err) => {
                // A failed token leaves the chain unusable.
                self.state = HashSessionState::Final;
                Err(err)
            }
        }
    }
}
