use aero_devremote_protocol::{
    AtaCommand, AtaProtocol, AtaRegisters, AtaResponse, AtaTransferRegister, Packet,
};

use crate::connection::{unexpected, RemoteConnection};
use crate::error::Result;
use crate::framing::Transport;

impl<S: Transport> RemoteConnection<S> {
    /// Sends an ATA command. The addressing mode, and with it the packet type, follows the
    /// register block variant; the response carries the error registers of the same mode.
    pub fn send_ata_command(
        &mut self,
        registers: impl Into<AtaRegisters>,
        protocol: AtaProtocol,
        transfer_register: AtaTransferRegister,
        transfer_blocks: bool,
        buffer: Vec<u8>,
        timeout: u32,
    ) -> Result<AtaResponse> {
        let command = AtaCommand {
            registers: registers.into(),
            protocol,
            transfer_register,
            transfer_blocks,
            timeout: self.effective_timeout(timeout),
            buffer,
        };
        let expected = command.mode().response_type();
        match self.round_trip(&Packet::CommandAta(command), expected)? {
            Packet::ResponseAta(res) => Ok(res),
            other => Err(unexpected(expected, &other)),
        }
    }
}
