use aero_devremote_protocol::{Packet, PacketType, SdhciCommand, SdhciResponse};
use tracing::debug;

use crate::connection::{unexpected, RemoteConnection};
use crate::error::{FramingError, RemoteError, Result};
use crate::framing::Transport;

/// Results of a command list, in request order, plus their aggregate status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub results: Vec<SdhciResponse>,
    /// Sum of the individual durations, in milliseconds.
    pub duration: u32,
    /// Set when any command reported sense.
    pub sense: bool,
    /// First non-zero individual error number.
    pub error_no: u32,
}

impl BatchOutcome {
    pub fn from_responses(results: Vec<SdhciResponse>) -> Self {
        let duration = results
            .iter()
            .fold(0u32, |acc, res| acc.saturating_add(res.duration));
        let sense = results.iter().any(|res| res.sense);
        let error_no = results
            .iter()
            .map(|res| res.error_no)
            .find(|&errno| errno != 0)
            .unwrap_or(0);
        Self {
            results,
            duration,
            sense,
            error_no,
        }
    }
}

impl<S: Transport> RemoteConnection<S> {
    /// Sends one MMC/SD command to the open card.
    ///
    /// Commands that read a register held in the session's register cache are answered from
    /// the cache without touching the wire: the buffer is the cached register, the response
    /// words are zero and the duration is zero.
    pub fn send_mmc_command(&mut self, mut command: SdhciCommand) -> Result<SdhciResponse> {
        if self.is_closed() {
            return Err(RemoteError::Closed);
        }
        if let Some(register) = self.session().register_cache().lookup(command.command) {
            debug!(command = command.command, "answered from register cache");
            return Ok(SdhciResponse {
                buffer: register.to_vec(),
                ..Default::default()
            });
        }

        command.timeout = self.effective_timeout(command.timeout);
        match self.round_trip(&Packet::CommandSdhci(command), PacketType::ResponseSdhci)? {
            Packet::ResponseSdhci(res) => Ok(res),
            other => Err(unexpected(PacketType::ResponseSdhci, &other)),
        }
    }

    /// Sends a list of MMC/SD commands in order.
    ///
    /// With a negotiated protocol that supports batching the list goes out as one packet.
    /// Otherwise each command is sent on its own through [`send_mmc_command`]. A command the
    /// daemon refuses or does not implement is recorded as a failed result carrying the
    /// refusal's error number, or [`FAILED_COMMAND_ERROR_NO`] when it has none, and the
    /// remaining commands still run. Only errors that close the connection stop the list.
    ///
    /// [`send_mmc_command`]: Self::send_mmc_command
    pub fn send_multiple_mmc_commands(
        &mut self,
        commands: Vec<SdhciCommand>,
    ) -> Result<BatchOutcome> {
        let results = if self.session().supports_batching() {
            self.send_batch(commands)?
        } else {
            self.send_sequential(commands)?
        };
        Ok(BatchOutcome::from_responses(results))
    }

    fn send_batch(&mut self, mut commands: Vec<SdhciCommand>) -> Result<Vec<SdhciResponse>> {
        for command in &mut commands {
            command.timeout = self.effective_timeout(command.timeout);
        }
        let expected = commands.len();
        debug!(count = expected, "sending batched mmc commands");

        let results = match self.round_trip(
            &Packet::CommandMultiSdhci(commands),
            PacketType::ResponseMultiSdhci,
        )? {
            Packet::ResponseMultiSdhci(results) => results,
            other => return Err(unexpected(PacketType::ResponseMultiSdhci, &other)),
        };
        if results.len() != expected {
            let mismatch = FramingError::EntryCountMismatch {
                expected,
                found: results.len(),
            };
            return self.check(Err(mismatch.into()));
        }
        Ok(results)
    }

    fn send_sequential(&mut self, commands: Vec<SdhciCommand>) -> Result<Vec<SdhciResponse>> {
        debug!(count = commands.len(), "sending mmc commands one by one");
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            let result = match self.send_mmc_command(command) {
                Ok(res) => res,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => SdhciResponse {
                    sense: true,
                    error_no: failed_error_no(&err),
                    ..Default::default()
                },
            };
            results.push(result);
        }
        Ok(results)
    }
}

/// Error number recorded for a command that failed without a result of its own. Never `0`,
/// so the aggregate still reports the failure.
fn failed_error_no(err: &RemoteError) -> u32 {
    match err.errno() {
        Some(errno) if errno != 0 => errno as u32,
        _ => FAILED_COMMAND_ERROR_NO,
    }
}

/// `-1` as the daemon reports it.
pub const FAILED_COMMAND_ERROR_NO: u32 = u32::MAX;
