/*++

Licensed under the Apache-2.0 license.

File Name:

    asset.rs

Abstract:

    File contains the asset store, timer, system and authenticated unlock
    services of the security module.

--*/

use crate::hsm::Hsm;
use crate::mailbox::MailboxTransport;
use crate::token::{
    result_code, AssetId, AssetSearchResult, AuthUnlockNonce, AuthUnlockVerifyRequest,
    DataReadRequest, DataReadResult, NopRequest, SecureTimerOp, SecureTimerRequest,
    SecureTimerResult, SystemInfo, TokenRequest,
};
use crate::{SbootError, SbootResult};

/// Largest public data or counter object readable in one token.
pub const ASSET_DATA_MAX_SIZE: usize = 0x3FF;

impl<'m, T: MailboxTransport> Hsm<'m, T> {
    /// Look up a static asset by its OTP asset number.
    ///
    /// # Returns
    ///
    /// * `Option<AssetSearchResult>` - None when the module has no such asset
    pub fn asset_search(&mut self, number: u32) -> SbootResult<Option<AssetSearchResult>> {
        let result = self.submit_raw(&TokenRequest::AssetSearch { number })?;
        if result.code() == result_code::INVALID_ASSET {
            return Ok(None);
        }
        result.check()?;
        Ok(Some(AssetSearchResult::decode(&result)))
    }

    /// Read a public data object into `out`.
    ///
    /// # Returns
    ///
    /// * `usize` - Number of bytes written to `out`
    pub fn public_data_read(&mut self, asset: AssetId, out: &mut [u8]) -> SbootResult<usize> {
        self.data_read(asset, out, false)
    }

    /// Read a monotonic counter object into `out`.
    pub fn monotonic_counter_read(
        &mut self,
        asset: AssetId,
        out: &mut [u8],
    ) -> SbootResult<usize> {
        self.data_read(asset, out, true)
    }

    pub fn secure_timer(
        &mut self,
        asset: AssetId,
        operation: SecureTimerOp,
        seconds: bool,
    ) -> SbootResult<SecureTimerResult> {
        let result = self.submit(&TokenRequest::SecureTimer(SecureTimerRequest {
            asset,
            operation,
            seconds,
        }))?;
        Ok(SecureTimerResult::decode(&result))
    }

    pub fn system_info(&mut self) -> SbootResult<SystemInfo> {
        let result = self.submit(&TokenRequest::SystemInfo)?;
        Ok(SystemInfo::decode(&result))
    }

    /// Begin an authenticated unlock and fetch the challenge nonce.
    pub fn auth_unlock_start(
        &mut self,
        state_asset: AssetId,
        key_asset: AssetId,
    ) -> SbootResult<AuthUnlockNonce> {
        let result = self.submit(&TokenRequest::AuthUnlockStart {
            state_asset,
            key_asset,
        })?;
        AuthUnlockNonce::decode(&result)
    }

    /// Answer the unlock challenge with a signature over the nonce.
    pub fn auth_unlock_verify(
        &mut self,
        state_asset: AssetId,
        nonce: &AuthUnlockNonce,
        signature: &[u8],
    ) -> SbootResult<()> {
        if signature.is_empty() || signature.len() > ASSET_DATA_MAX_SIZE {
            return Err(SbootError::DRIVER_ASSET_INVALID_LENGTH);
        }
        self.with_dma(signature.len(), |hsm, buf| {
            hsm.dma_mut().write(buf, 0, signature)?;
            let req = AuthUnlockVerifyRequest {
                state_asset,
                signature: hsm.dma_addr(buf)?,
                signature_len: signature.len() as u32,
                nonce: nonce.0,
            };
            hsm.submit(&TokenRequest::AuthUnlockVerify(req))?;
            Ok(())
        })
    }

    pub fn set_secure_debug(&mut self, state_asset: AssetId, enable: bool) -> SbootResult<()> {
        self.submit(&TokenRequest::SetSecureDebug {
            state_asset,
            enable,
        })?;
        Ok(())
    }

    /// Copy `input` to `out` through the module's DMA engine.
    pub fn nop_copy(&mut self, input: &[u8], out: &mut [u8]) -> SbootResult<()> {
        if input.is_empty() || input.len() != out.len() {
            return Err(SbootError::DRIVER_ASSET_INVALID_LENGTH);
        }
        self.with_dma(input.len(), |hsm, src| {
            hsm.dma_mut().write(src, 0, input)?;
            hsm.with_dma(out.len(), |hsm, dst| {
                let req = NopRequest {
                    input: hsm.dma_addr(src)?,
                    input_len: input.len() as u32,
                    output: hsm.dma_addr(dst)?,
                    output_len: out.len() as u32,
                };
                hsm.submit(&TokenRequest::Nop(req))?;
                hsm.dma_mut().read(dst, 0, out)
            })
        })
    }

    fn data_read(
        &mut self,
        asset: AssetId,
        out: &mut [u8],
        monotonic: bool,
    ) -> SbootResult<usize> {
        if out.is_empty() {
            return Err(SbootError::DRIVER_ASSET_BUFFER_TOO_SMALL);
        }
        let capacity = out.len().min(ASSET_DATA_MAX_SIZE);
        self.with_dma(capacity, |hsm, buf| {
            let req = DataReadRequest {
                asset,
                output: hsm.dma_addr(buf)?,
                len: capacity as u32,
            };
            let req = if monotonic {
                TokenRequest::MonotonicRead(req)
            } else {
                TokenRequest::PublicDataRead(req)
            };
            let result = hsm.submit_raw(&req)?;
            if result.code() == result_code::INVALID_LENGTH {
                return Err(SbootError::DRIVER_ASSET_BUFFER_TOO_SMALL);
            }
            result.check()?;

            let len = DataReadResult::decode(&result).len as usize;
            let dst = out
                .get_mut(..len)
                .filter(|_| len <= capacity)
                .ok_or(SbootError::DRIVER_ASSET_BUFFER_TOO_SMALL)?;
            hsm.dma_mut().read(buf, 0, dst)?;
            Ok(len)
        })
    }
}
