/*++

Licensed under the Apache-2.0 license.

File Name:

    hash_engine.rs

Abstract:

    File contains the emulated hash engine. The engine keeps nothing
    between tokens; a continued operation brings its state in the token.

--*/

use sboot_drivers::token::{result_code, HashAlgorithm, HashRequest, ResultToken};
use sboot_emu_crypto::{Sha256, Sha256Mode, Sha512, Sha512Mode};

use crate::host_memory::HostMemory;

const RESULT_PAYLOAD_WORD: usize = 2;

enum Engine {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Engine {
    fn start(algorithm: HashAlgorithm, state: Option<&[u8]>) -> Result<Self, i8> {
        let engine = match (algorithm, state) {
            (HashAlgorithm::Sha224, None) => Engine::Sha256(Sha256::new(Sha256Mode::Sha224)),
            (HashAlgorithm::Sha256, None) => Engine::Sha256(Sha256::new(Sha256Mode::Sha256)),
            (HashAlgorithm::Sha384, None) => Engine::Sha512(Sha512::new(Sha512Mode::Sha384)),
            (HashAlgorithm::Sha512, None) => Engine::Sha512(Sha512::new(Sha512Mode::Sha512)),
            (HashAlgorithm::Sha224, Some(state)) => {
                Engine::Sha256(resume(Sha256::from_state(Sha256Mode::Sha224, state))?)
            }
            (HashAlgorithm::Sha256, Some(state)) => {
                Engine::Sha256(resume(Sha256::from_state(Sha256Mode::Sha256, state))?)
            }
            (HashAlgorithm::Sha384, Some(state)) => {
                Engine::Sha512(resume(Sha512::from_state(Sha512Mode::Sha384, state))?)
            }
            (HashAlgorithm::Sha512, Some(state)) => {
                Engine::Sha512(resume(Sha512::from_state(Sha512Mode::Sha512, state))?)
            }
            _ => return Err(result_code::INVALID_PARAMETER),
        };
        Ok(engine)
    }

    fn block_size(&self) -> usize {
        match self {
            Engine::Sha256(_) => Sha256::BLOCK_SIZE,
            Engine::Sha512(_) => Sha512::BLOCK_SIZE,
        }
    }

    fn update_blocks(&mut self, data: &[u8]) {
        match self {
            Engine::Sha256(sha) => {
                sha.update_blocks(data);
            }
            Engine::Sha512(sha) => {
                sha.update_blocks(data);
            }
        }
    }

    fn finalize(&mut self, tail: &[u8], total_len: u64) {
        match self {
            Engine::Sha256(sha) => sha.finalize(tail, total_len),
            Engine::Sha512(sha) => sha.finalize(tail, total_len),
        }
    }

    /// Intermediate state, or the digest once finalized.
    fn output(&self, digest: bool, out: &mut [u8; 64]) -> usize {
        match self {
            Engine::Sha256(sha) => {
                let mut state = [0u8; Sha256::STATE_SIZE];
                sha.state(&mut state);
                out[..state.len()].copy_from_slice(&state);
                if digest {
                    sha.hash_len()
                } else {
                    state.len()
                }
            }
            Engine::Sha512(sha) => {
                sha.state(out);
                if digest {
                    sha.hash_len()
                } else {
                    Sha512::STATE_SIZE
                }
            }
        }
    }
}

fn resume<T>(engine: Option<T>) -> Result<T, i8> {
    engine.ok_or(result_code::INVALID_PARAMETER)
}

/// Execute one hash token, placing the state or digest in `result`.
pub fn run(memory: &HostMemory, req: &HashRequest, result: &mut ResultToken) -> Result<(), i8> {
    if !req.state_asset.is_none() {
        // Module-held hash state is not emulated.
        return Err(result_code::INVALID_ASSET);
    }
    let state = if req.init_with_default {
        None
    } else {
        let size = req
            .algorithm
            .state_size()
            .ok_or(result_code::INVALID_PARAMETER)?;
        Some(&req.state[..size])
    };
    let mut engine = Engine::start(req.algorithm, state)?;

    let data = memory
        .read(req.data_addr, req.data_len as usize)
        .map_err(|_| result_code::INVALID_ADDRESS)?;

    if req.finalize {
        let total_len = if req.init_with_default {
            u64::from(req.data_len)
        } else {
            req.total_len
        };
        if total_len < u64::from(req.data_len) {
            return Err(result_code::INVALID_LENGTH);
        }
        engine.finalize(&data, total_len);
    } else {
        if data.len() % engine.block_size() != 0 {
            return Err(result_code::INVALID_LENGTH);
        }
        engine.update_blocks(&data);
    }

    let mut out = [0u8; 64];
    let len = engine.output(req.finalize, &mut out);
    result
        .write_byte_array(RESULT_PAYLOAD_WORD, &out[..len])
        .map_err(|_| result_code::INVALID_LENGTH)
}
