use aero_devremote_protocol::{Packet, PacketType, ScsiCommand, ScsiDirection, ScsiResponse};

use crate::connection::{unexpected, RemoteConnection};
use crate::error::Result;
use crate::framing::Transport;

impl<S: Transport> RemoteConnection<S> {
    /// Sends a SCSI CDB to the open device.
    ///
    /// `buffer` is sent as-is and comes back in the response, filled in by the device for
    /// data-in transfers. A `timeout` of `0` uses the session default.
    pub fn send_scsi_command(
        &mut self,
        cdb: &[u8],
        buffer: Vec<u8>,
        direction: ScsiDirection,
        timeout: u32,
    ) -> Result<ScsiResponse> {
        let request = Packet::CommandScsi(ScsiCommand {
            cdb: cdb.to_vec(),
            buffer,
            direction,
            timeout: self.effective_timeout(timeout),
        });
        match self.round_trip(&request, PacketType::ResponseScsi)? {
            Packet::ResponseScsi(res) => Ok(res),
            other => Err(unexpected(PacketType::ResponseScsi, &other)),
        }
    }
}
