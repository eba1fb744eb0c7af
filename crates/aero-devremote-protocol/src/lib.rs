#![forbid(unsafe_code)]

//! Wire codec for the remote device command protocol.
//!
//! The protocol forwards raw storage-device commands (SCSI CDBs, ATA register blocks, MMC/SD
//! commands, bus descriptor queries) to a daemon running on the host the device is attached to.
//! This crate is a pure codec: it has no I/O and knows nothing about sockets. Framing and the
//! request/response state machine live in `aero-devremote-client`.
//!
//! Every packet starts with a fixed 16-byte header (all integer fields little-endian):
//!
//! ```text
//! 0              4              8              12      13      14      16
//! +--------------+--------------+--------------+-------+-------+-------+
//! | remote magic | packet magic | length (u32) | ver   | type  | spare |
//! +--------------+--------------+--------------+-------+-------+-------+
//! | fixed body (per packet type)                                       |
//! +--------------------------------------------------------------------+
//! | variable tails (sizes declared by the fixed body)                  |
//! +--------------------------------------------------------------------+
//! ```
//!
//! `length` covers the whole packet, header included. Bodies are packed: explicit spare bytes
//! are written as zero and ignored on decode.

mod ata;
mod device;
mod error;
mod header;
mod hello;
mod mmc;
mod nop;
mod packet;
mod scsi;
pub mod wire;

pub use ata::{
    AtaCommand, AtaErrorRegisters, AtaErrorRegistersChs, AtaErrorRegistersLba28,
    AtaErrorRegistersLba48, AtaMode, AtaProtocol, AtaRegisters, AtaRegistersChs,
    AtaRegistersLba28, AtaRegistersLba48, AtaResponse, AtaTransferRegister,
};
pub use device::{
    DeviceInfo, DeviceType, FireWireData, ListDevicesResponse, OpenDevice, OsReadCommand,
    OsReadResponse, PcmciaData, SdhciRegisters, SdhciRegistersResponse, UsbData,
    CID_MAX_LEN, CSD_MAX_LEN, DEVICE_INFO_LEN, OCR_MAX_LEN, SCR_MAX_LEN,
};
pub use error::{DecodeError, EncodeError};
pub use header::{PacketHeader, PacketType, HEADER_LEN};
pub use hello::Hello;
pub use mmc::{opcode, MmcFlags, SdhciCommand, SdhciResponse, SDHCI_COMMAND_LEN, SDHCI_RESULT_LEN};
pub use nop::{Nop, NopReason};
pub use packet::Packet;
pub use scsi::{ScsiCommand, ScsiDirection, ScsiResponse};

/// First magic of every header (`"DICR"` read as a little-endian `u32`).
pub const REMOTE_ID: u32 = 0x5243_4944;

/// Second magic of every header (`"PCKT"` read as a little-endian `u32`).
pub const PACKET_ID: u32 = 0x544B_4350;

/// Packet revision written into every header, and the only one accepted during the handshake.
pub const PACKET_VERSION: u8 = 1;

/// Maximum protocol version this implementation announces by default.
pub const MAX_PROTOCOL: u8 = 1;

/// First protocol version that understands `CommandMultiSdhci`.
pub const MULTI_SDHCI_MIN_PROTOCOL: u8 = 2;

/// TCP port the remote daemon listens on by default.
pub const DEFAULT_PORT: u16 = 6666;

/// Largest data buffer a single command may carry by default.
pub const DEFAULT_MAX_BUFFER_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Upper bound for `header.length`, checked before any body bytes are read.
    pub max_packet_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // Room for the largest buffer plus the fixed structs and a multi-command table.
            max_packet_len: DEFAULT_MAX_BUFFER_LEN + 1024 * 1024,
        }
    }
}
