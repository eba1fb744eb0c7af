use crate::wire::{Reader, Writer};
use crate::{DecodeError, PACKET_ID, PACKET_VERSION, REMOTE_ID};

pub const HEADER_LEN: usize = 16;

/// Packet type byte. Codes are stable and shared with the existing daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum PacketType {
    Nop = -1,
    Hello = 1,
    CommandListDevices = 2,
    ResponseListDevices = 3,
    CommandOpen = 4,
    CommandScsi = 5,
    ResponseScsi = 6,
    CommandAtaChs = 7,
    ResponseAtaChs = 8,
    CommandAtaLba28 = 9,
    ResponseAtaLba28 = 10,
    CommandAtaLba48 = 11,
    ResponseAtaLba48 = 12,
    CommandSdhci = 13,
    ResponseSdhci = 14,
    CommandGetType = 15,
    ResponseGetType = 16,
    CommandGetSdhciRegisters = 17,
    ResponseGetSdhciRegisters = 18,
    CommandGetUsbData = 19,
    ResponseGetUsbData = 20,
    CommandGetFireWireData = 21,
    ResponseGetFireWireData = 22,
    CommandGetPcmciaData = 23,
    ResponseGetPcmciaData = 24,
    CommandCloseDevice = 25,
    CommandAmIRoot = 26,
    ResponseAmIRoot = 27,
    CommandMultiSdhci = 28,
    ResponseMultiSdhci = 29,
    CommandReOpenDevice = 30,
    CommandOsRead = 31,
    ResponseOsRead = 32,
}

impl PacketType {
    pub const fn code(self) -> i8 {
        self as i8
    }

    pub const fn from_code(code: i8) -> Option<Self> {
        Some(match code {
            -1 => Self::Nop,
            1 => Self::Hello,
            2 => Self::CommandListDevices,
            3 => Self::ResponseListDevices,
            4 => Self::CommandOpen,
            5 => Self::CommandScsi,
            6 => Self::ResponseScsi,
            7 => Self::CommandAtaChs,
            8 => Self::ResponseAtaChs,
            9 => Self::CommandAtaLba28,
            10 => Self::ResponseAtaLba28,
            11 => Self::CommandAtaLba48,
            12 => Self::ResponseAtaLba48,
            13 => Self::CommandSdhci,
            14 => Self::ResponseSdhci,
            15 => Self::CommandGetType,
            16 => Self::ResponseGetType,
            17 => Self::CommandGetSdhciRegisters,
            18 => Self::ResponseGetSdhciRegisters,
            19 => Self::CommandGetUsbData,
            20 => Self::ResponseGetUsbData,
            21 => Self::CommandGetFireWireData,
            22 => Self::ResponseGetFireWireData,
            23 => Self::CommandGetPcmciaData,
            24 => Self::ResponseGetPcmciaData,
            25 => Self::CommandCloseDevice,
            26 => Self::CommandAmIRoot,
            27 => Self::ResponseAmIRoot,
            28 => Self::CommandMultiSdhci,
            29 => Self::ResponseMultiSdhci,
            30 => Self::CommandReOpenDevice,
            31 => Self::CommandOsRead,
            32 => Self::ResponseOsRead,
            _ => return None,
        })
    }

    /// Response type the daemon answers a command with.
    ///
    /// `None` for response types and for commands whose only answer is a `Nop`
    /// (open, reopen) or that have no answer at all (close).
    pub const fn response_type(self) -> Option<Self> {
        Some(match self {
            Self::CommandListDevices => Self::ResponseListDevices,
            Self::CommandScsi => Self::ResponseScsi,
            Self::CommandAtaChs => Self::ResponseAtaChs,
            Self::CommandAtaLba28 => Self::ResponseAtaLba28,
            Self::CommandAtaLba48 => Self::ResponseAtaLba48,
            Self::CommandSdhci => Self::ResponseSdhci,
            Self::CommandGetType => Self::ResponseGetType,
            Self::CommandGetSdhciRegisters => Self::ResponseGetSdhciRegisters,
            Self::CommandGetUsbData => Self::ResponseGetUsbData,
            Self::CommandGetFireWireData => Self::ResponseGetFireWireData,
            Self::CommandGetPcmciaData => Self::ResponseGetPcmciaData,
            Self::CommandAmIRoot => Self::ResponseAmIRoot,
            Self::CommandMultiSdhci => Self::ResponseMultiSdhci,
            Self::CommandOsRead => Self::ResponseOsRead,
            _ => return None,
        })
    }
}

impl TryFrom<i8> for PacketType {
    type Error = DecodeError;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(DecodeError::UnknownPacketType { code })
    }
}

/// The 16-byte header in front of every packet.
///
/// The two trailing spare bytes are not represented: they are always written as zero and
/// ignored on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub remote_id: u32,
    pub packet_id: u32,
    /// Total packet size, header included.
    pub length: u32,
    pub version: u8,
    pub packet_type: PacketType,
}

impl PacketHeader {
    pub const fn new(packet_type: PacketType, length: u32) -> Self {
        Self {
            remote_id: REMOTE_ID,
            packet_id: PACKET_ID,
            length,
            version: PACKET_VERSION,
            packet_type,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut w = Writer::with_capacity(HEADER_LEN);
        self.write(&mut w);
        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(&w.into_inner());
        out
    }

    pub(crate) fn write(&self, w: &mut Writer) {
        w.u32(self.remote_id);
        w.u32(self.packet_id);
        w.u32(self.length);
        w.u8(self.version);
        w.i8(self.packet_type.code());
        w.zeros(2);
    }

    /// Parses and validates the first [`HEADER_LEN`] bytes of `buf`.
    ///
    /// Magics are checked before anything else so that a peer speaking a different protocol is
    /// rejected without interpreting any other field.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf, "packet header");
        let remote_id = r.u32()?;
        let packet_id = r.u32()?;
        if remote_id != REMOTE_ID {
            return Err(DecodeError::BadRemoteMagic {
                found: remote_id,
                expected: REMOTE_ID,
            });
        }
        if packet_id != PACKET_ID {
            return Err(DecodeError::BadPacketMagic {
                found: packet_id,
                expected: PACKET_ID,
            });
        }
        let length = r.u32()?;
        let version = r.u8()?;
        let packet_type = PacketType::try_from(r.i8()?)?;
        r.skip(2)?;

        if (length as usize) < HEADER_LEN {
            return Err(DecodeError::LengthTooSmall {
                len: length,
                min: HEADER_LEN,
            });
        }

        Ok(Self {
            remote_id,
            packet_id,
            length,
            version,
            packet_type,
        })
    }
}
