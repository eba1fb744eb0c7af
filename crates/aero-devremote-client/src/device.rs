use aero_devremote_protocol::{
    DeviceInfo, DeviceType, FireWireData, NopReason, OpenDevice, OsReadCommand, OsReadResponse,
    Packet, PacketType, PcmciaData, SdhciRegisters, UsbData,
};
use tracing::{debug, info, warn};

use crate::connection::{unexpected, RemoteConnection};
use crate::error::{RemoteError, Result};
use crate::framing::Transport;
use crate::uri::SCHEMES;

impl<S: Transport> RemoteConnection<S> {
    /// Lists the devices attached to the remote host.
    ///
    /// Each path is rewritten to `aaru://host/path` so it can be handed back to
    /// [`RemoteConnection::open_uri`].
    pub fn list_devices(&mut self) -> Result<Vec<DeviceInfo>> {
        let expected = PacketType::ResponseListDevices;
        let mut devices = match self.round_trip(&Packet::CommandListDevices, expected)? {
            Packet::ResponseListDevices(res) => res.devices,
            other => return Err(unexpected(expected, &other)),
        };
        for dev in &mut devices {
            dev.path = format!("{}://{}/{}", SCHEMES[0], self.host(), dev.path);
        }
        debug!(count = devices.len(), "listed remote devices");
        Ok(devices)
    }

    /// Opens `path` on the remote host.
    ///
    /// For SecureDigital and MMC cards the card registers are fetched right away and kept in
    /// the session's register cache.
    pub fn open(&mut self, path: &str) -> Result<()> {
        // The path field is NUL-padded; leave room for at least one terminator.
        if path.len() >= OpenDevice::PATH_LEN {
            return Err(RemoteError::InvalidArgument(format!(
                "device path is {} bytes, limit is {}",
                path.len(),
                OpenDevice::PATH_LEN - 1
            )));
        }
        let request = Packet::CommandOpen(OpenDevice {
            path: path.to_string(),
        });
        let nop = match self.round_trip(&request, PacketType::Nop)? {
            Packet::Nop(nop) => nop,
            other => return Err(unexpected(PacketType::Nop, &other)),
        };
        if nop.reason != NopReason::OpenOk {
            warn!(
                path,
                reason = ?nop.reason,
                text = %nop.text,
                errno = nop.errno,
                "open failed"
            );
            return Err(RemoteError::Refused {
                operation: PacketType::CommandOpen,
                reason: nop.reason,
                text: nop.text,
                errno: nop.errno,
            });
        }
        info!(path, host = %self.host(), "opened remote device");

        self.prime_register_cache()
    }

    fn prime_register_cache(&mut self) -> Result<()> {
        let device_type = match self.device_type() {
            Ok(ty) => ty,
            Err(err) if !err.is_fatal() => {
                warn!(error = %err, "cannot query device type");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if !device_type.has_card_registers() {
            return Ok(());
        }

        match self.sdhci_registers() {
            Ok(regs) => {
                debug!(?device_type, "caching card registers");
                self.session_mut().cache.prime(&regs);
                Ok(())
            }
            Err(err) if !err.is_fatal() => {
                warn!(error = %err, "cannot read card registers");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Asks the daemon to reopen the current device.
    pub fn reopen(&mut self) -> Result<()> {
        let nop = match self.round_trip(&Packet::CommandReOpenDevice, PacketType::Nop)? {
            Packet::Nop(nop) => nop,
            other => return Err(unexpected(PacketType::Nop, &other)),
        };
        match nop.reason {
            NopReason::ReOpenOk => Ok(()),
            reason => Err(RemoteError::Refused {
                operation: PacketType::CommandReOpenDevice,
                reason,
                text: nop.text,
                errno: nop.errno,
            }),
        }
    }

    /// Whether the daemon runs with administrator privileges.
    pub fn am_i_root(&mut self) -> Result<bool> {
        let expected = PacketType::ResponseAmIRoot;
        match self.round_trip(&Packet::CommandAmIRoot, expected)? {
            Packet::ResponseAmIRoot(root) => Ok(root),
            other => Err(unexpected(expected, &other)),
        }
    }

    pub fn device_type(&mut self) -> Result<DeviceType> {
        let expected = PacketType::ResponseGetType;
        match self.round_trip(&Packet::CommandGetType, expected)? {
            Packet::ResponseGetType(ty) => Ok(ty),
            other => Err(unexpected(expected, &other)),
        }
    }

    /// Card registers of the open device, each capped to its protocol maximum.
    pub fn sdhci_registers(&mut self) -> Result<SdhciRegisters> {
        let expected = PacketType::ResponseGetSdhciRegisters;
        match self.round_trip(&Packet::CommandGetSdhciRegisters, expected)? {
            Packet::ResponseGetSdhciRegisters(res) => Ok(res.registers()),
            other => Err(unexpected(expected, &other)),
        }
    }

    /// USB identity of the open device, `None` when it is not attached over USB.
    pub fn usb_data(&mut self) -> Result<Option<UsbData>> {
        let expected = PacketType::ResponseGetUsbData;
        match self.round_trip(&Packet::CommandGetUsbData, expected)? {
            Packet::ResponseGetUsbData(data) => Ok(data),
            other => Err(unexpected(expected, &other)),
        }
    }

    pub fn firewire_data(&mut self) -> Result<Option<FireWireData>> {
        let expected = PacketType::ResponseGetFireWireData;
        match self.round_trip(&Packet::CommandGetFireWireData, expected)? {
            Packet::ResponseGetFireWireData(data) => Ok(data),
            other => Err(unexpected(expected, &other)),
        }
    }

    pub fn pcmcia_data(&mut self) -> Result<Option<PcmciaData>> {
        let expected = PacketType::ResponseGetPcmciaData;
        match self.round_trip(&Packet::CommandGetPcmciaData, expected)? {
            Packet::ResponseGetPcmciaData(data) => Ok(data),
            other => Err(unexpected(expected, &other)),
        }
    }

    /// Reads `length` bytes at `offset` through the remote host's regular file API.
    ///
    /// `errno` in the result is the remote read's error number; the data never exceeds
    /// `length` bytes.
    pub fn os_read(&mut self, offset: u64, length: u32) -> Result<OsReadResponse> {
        let expected = PacketType::ResponseOsRead;
        let request = Packet::CommandOsRead(OsReadCommand { offset, length });
        let mut res = match self.round_trip(&request, expected)? {
            Packet::ResponseOsRead(res) => res,
            other => return Err(unexpected(expected, &other)),
        };
        res.data.truncate(length as usize);
        Ok(res)
    }
}
