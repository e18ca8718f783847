/*++

Licensed under the Apache-2.0 license.

File Name:

    pka.rs

Abstract:

    File contains the emulated public key accelerator: the claim, vector
    load, operation and release sequence, plus asset based verification.

--*/

use sboot_drivers::token::{
    result_code, PkAssetCommand, PkAssetRequest, PkClaim, PkNumLoad, PkOperation,
    PkOperationCommand, ResultToken,
};
use sboot_drivers::EccCurve;
use sboot_emu_crypto::{Ecc256, Ecc256PubKey, Ecc256Scalar, Ecc256Signature};

use crate::asset_store::AssetStore;
use crate::host_memory::HostMemory;

const ECC256_WORDS: u8 = 8;
const SCALAR_SIZE: usize = 32;
const PAIR_SIZE: usize = 64;
const VECTOR_SLOTS: usize = 3;

#[derive(Default)]
pub struct PkaEngine {
    claim: Option<PkClaim>,
    vectors: [Option<Vec<u8>>; VECTOR_SLOTS],

    /// Randomized operations still to be bounced with a retry request.
    forced_retries: u32,
}

fn scalar(bytes: &[u8]) -> Result<Ecc256Scalar, i8> {
    bytes.try_into().map_err(|_| result_code::INVALID_LENGTH)
}

fn pair(bytes: &[u8]) -> Result<(Ecc256Scalar, Ecc256Scalar), i8> {
    if bytes.len() != PAIR_SIZE {
        return Err(result_code::INVALID_LENGTH);
    }
    let (a, b) = bytes.split_at(SCALAR_SIZE);
    Ok((scalar(a)?, scalar(b)?))
}

impl PkaEngine {
    pub fn force_retries(&mut self, count: u32) {
        self.forced_retries = count;
    }

    pub fn is_claimed(&self) -> bool {
        self.claim.is_some()
    }

    pub fn claim(&mut self, claim: PkClaim) -> Result<(), i8> {
        if self.claim.is_some() {
            return Err(result_code::INVALID_STATE);
        }
        if claim.nwords != ECC256_WORDS {
            return Err(result_code::INVALID_KEYSIZE);
        }
        self.claim = Some(claim);
        Ok(())
    }

    pub fn release(&mut self) {
        self.claim = None;
        self.vectors = Default::default();
    }

    pub fn num_load(&mut self, memory: &HostMemory, load: &PkNumLoad) -> Result<(), i8> {
        if self.claim.is_none() {
            return Err(result_code::INVALID_STATE);
        }
        let slot = self
            .vectors
            .get_mut(usize::from(load.index))
            .ok_or(result_code::INVALID_PARAMETER)?;
        let data = memory
            .read(load.addr, load.len as usize)
            .map_err(|_| result_code::INVALID_ADDRESS)?;
        *slot = Some(data);
        Ok(())
    }

    fn vector(&self, index: usize) -> Result<&[u8], i8> {
        self.vectors
            .get(index)
            .and_then(|v| v.as_deref())
            .ok_or(result_code::INVALID_STATE)
    }

    fn take_forced_retry(&mut self) -> bool {
        if self.forced_retries == 0 {
            return false;
        }
        self.forced_retries -= 1;
        true
    }

    pub fn operation(
        &mut self,
        memory: &mut HostMemory,
        op: &PkOperation,
        result: &mut ResultToken,
    ) -> Result<(), i8> {
        if self.claim.is_none() {
            return Err(result_code::INVALID_STATE);
        }
        if op.curve != EccCurve::P256 as u32 {
            return Err(result_code::INVALID_PARAMETER);
        }

        match op.command {
            PkOperationCommand::EcdsaVerify => {
                let (x, y) = pair(self.vector(0)?)?;
                let (r, s) = pair(self.vector(1)?)?;
                let digest = scalar(self.vector(2)?)?;
                if Ecc256::verify(&Ecc256PubKey { x, y }, &digest, &Ecc256Signature { r, s }) {
                    Ok(())
                } else {
                    Err(result_code::VERIFY_ERROR)
                }
            }

            PkOperationCommand::EcdsaSign => {
                let priv_key = scalar(self.vector(0)?)?;
                let digest = scalar(self.vector(1)?)?;
                let seed = scalar(self.vector(2)?)?;
                let signature = if self.take_forced_retry() {
                    None
                } else {
                    Ecc256::sign(&priv_key, &digest, &seed)
                };
                match signature {
                    Some(sig) => write_pair(memory, op, &sig.r, &sig.s),
                    None => {
                        result.set_pk_retry();
                        Ok(())
                    }
                }
            }

            PkOperationCommand::EccMultiply => {
                let seed = scalar(self.vector(0)?)?;
                let pub_key = if self.take_forced_retry() {
                    None
                } else {
                    Ecc256::public_key(&seed)
                };
                match pub_key {
                    Some(key) => write_pair(memory, op, &key.x, &key.y),
                    None => {
                        result.set_pk_retry();
                        Ok(())
                    }
                }
            }
        }
    }
}

fn write_pair(
    memory: &mut HostMemory,
    op: &PkOperation,
    a: &Ecc256Scalar,
    b: &Ecc256Scalar,
) -> Result<(), i8> {
    if (op.output_len as usize) < PAIR_SIZE {
        return Err(result_code::INVALID_LENGTH);
    }
    let mut out = [0u8; PAIR_SIZE];
    out[..SCALAR_SIZE].copy_from_slice(a);
    out[SCALAR_SIZE..].copy_from_slice(b);
    memory
        .write(op.output, &out)
        .map_err(|_| result_code::INVALID_ADDRESS)
}

/// ECDSA verify with a public key asset and an explicit digest.
pub fn asset_verify(
    memory: &HostMemory,
    assets: &AssetStore,
    req: &PkAssetRequest,
) -> Result<(), i8> {
    if req.command != PkAssetCommand::EcdsaVerify {
        return Err(result_code::INVALID_PARAMETER);
    }
    if req.nwords != ECC256_WORDS {
        return Err(result_code::INVALID_KEYSIZE);
    }
    let pub_key = assets.public_key(req.key_asset)?;
    assets.check_curve_params(req.param_asset)?;
    let digest = req
        .explicit_digest
        .as_ref()
        .ok_or(result_code::INVALID_PARAMETER)
        .and_then(|d| scalar(d.as_bytes()))?;
    if usize::from(req.input_len) != PAIR_SIZE {
        return Err(result_code::INVALID_LENGTH);
    }
    let signature = memory
        .read(req.input, PAIR_SIZE)
        .map_err(|_| result_code::INVALID_ADDRESS)?;
    let (r, s) = pair(&signature)?;
    if Ecc256::verify(&pub_key, &digest, &Ecc256Signature { r, s }) {
        Ok(())
    } else {
        Err(result_code::VERIFY_ERROR)
    }
}
