/*++

Licensed under the Apache-2.0 license.

File Name:

    mailbox.rs

Abstract:

    File contains the token exchange over the security module mailbox.

--*/

use crate::token::{CommandToken, ResultToken};
use crate::wait::BoundedWait;
use crate::{SbootError, SbootResult};

/// Physical link to the security module.
///
/// Implemented by the register-level mailbox on hardware and by the
/// emulator in tests.
pub trait MailboxTransport {
    /// Hand a fully encoded command token to the module.
    fn write_command(&mut self, token: &CommandToken) -> SbootResult<()>;

    /// Completion indicator. Polled until it reports a result.
    fn result_ready(&mut self) -> bool;

    /// Fetch the result token. Only valid once `result_ready` returned true.
    fn read_result(&mut self) -> SbootResult<ResultToken>;
}

/// Mailbox driver.
///
/// At most one token is in flight. Every exchange stamps the token with a
/// fresh id and the host identity, then waits for the result with a
/// bounded poll.
pub struct Mailbox<T: MailboxTransport> {
    transport: T,
    identity: u32,
    wait: BoundedWait,
    next_token_id: u16,
    in_flight: Option<u16>,
}

impl<T: MailboxTransport> Mailbox<T> {
    pub fn new(transport: T, identity: u32, poll_limit: u32) -> Self {
        Self {
            transport,
            identity,
            wait: BoundedWait::new(poll_limit, SbootError::DRIVER_MAILBOX_TIMEOUT),
            next_token_id: 1,
            in_flight: None,
        }
    }

    pub fn identity(&self) -> u32 {
        self.identity
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Submit `token` and wait for its result.
    ///
    /// The result status is not interpreted; see `exchange_checked`.
    ///
    /// # Returns
    ///
    /// * `ResultToken` - Result whose token id matches the submitted one
    pub fn exchange(&mut self, mut token: CommandToken) -> SbootResult<ResultToken> {
        self.drain_stale()?;

        let id = self.next_token_id;
        self.next_token_id = match self.next_token_id.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        token.set_token_id(id);
        token.set_identity(self.identity);

        self.transport.write_command(&token)?;
        self.in_flight = Some(id);

        let transport = &mut self.transport;
        self.wait.until(|| transport.result_ready())?;

        let result = self.transport.read_result()?;
        self.in_flight = None;
        if result.token_id() != id {
            return Err(SbootError::DRIVER_MAILBOX_TOKEN_ID_MISMATCH);
        }
        Ok(result)
    }

    /// Submit `token` and map a negative result code to an error.
    pub fn exchange_checked(&mut self, token: CommandToken) -> SbootResult<ResultToken> {
        let result = self.exchange(token)?;
        result.check()?;
        Ok(result)
    }

    /// Whether a token abandoned by a timeout still owns the mailbox.
    pub fn has_stale(&self) -> bool {
        self.in_flight.is_some()
    }

    /// A token abandoned by a timeout still owns the mailbox until the
    /// module posts its result. Consume that result if it has arrived.
    pub fn drain_stale(&mut self) -> SbootResult<()> {
        if self.in_flight.is_none() {
            return Ok(());
        }
        if !self.transport.result_ready() {
            return Err(SbootError::DRIVER_MAILBOX_BUSY);
        }
        self.transport.read_result()?;
        self.in_flight = None;
        Ok(())
    }
}
