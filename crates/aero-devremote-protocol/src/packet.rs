use crate::ata::{AtaCommand, AtaMode, AtaResponse};
use crate::device::{
    DeviceType, FireWireData, ListDevicesResponse, OpenDevice, OsReadCommand, OsReadResponse,
    PcmciaData, SdhciRegistersResponse, UsbData,
};
use crate::mmc::{
    read_multi_commands, read_multi_responses, MultiSdhciCommand, MultiSdhciResponse,
};
use crate::wire::{Reader, Writer};
use crate::{
    DecodeError, EncodeError, Hello, Nop, PacketHeader, PacketType, ScsiCommand, ScsiResponse,
    SdhciCommand, SdhciResponse, HEADER_LEN, PACKET_VERSION,
};

/// A packet body: a fixed part followed by variable-length tails.
///
/// `write` must emit exactly `fixed_len() + tail_len()` bytes; [`Packet::encode`] derives the
/// header length from those two numbers before anything is written.
pub(crate) trait Body {
    fn fixed_len(&self) -> usize;

    fn tail_len(&self) -> usize {
        0
    }

    fn write(&self, w: &mut Writer);
}

/// Length of a tail as written into its `u32` length field.
///
/// Only called after [`Packet::encode`] has checked that the whole packet fits a `u32`.
pub(crate) fn tail_len_u32(tail: &[u8]) -> u32 {
    tail.len() as u32
}

/// Header-only bodies.
struct Empty;

impl Body for Empty {
    fn fixed_len(&self) -> usize {
        0
    }

    fn write(&self, _w: &mut Writer) {}
}

/// Presence-flagged bus descriptor bodies (USB, FireWire, PCMCIA).
struct BusData<'a, T> {
    data: Option<&'a T>,
    fixed_len: usize,
    write: fn(Option<&T>, &mut Writer),
}

impl<T> Body for BusData<'_, T> {
    fn fixed_len(&self) -> usize {
        self.fixed_len
    }

    fn write(&self, w: &mut Writer) {
        (self.write)(self.data, w);
    }
}

/// Every packet of the protocol, keyed by its packet type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Nop(Nop),
    Hello(Hello),
    CommandListDevices,
    ResponseListDevices(ListDevicesResponse),
    CommandOpen(OpenDevice),
    CommandScsi(ScsiCommand),
    ResponseScsi(ScsiResponse),
    /// `CommandAtaChs`, `CommandAtaLba28` or `CommandAtaLba48`, depending on the register block.
    CommandAta(AtaCommand),
    /// `ResponseAtaChs`, `ResponseAtaLba28` or `ResponseAtaLba48`.
    ResponseAta(AtaResponse),
    CommandSdhci(SdhciCommand),
    ResponseSdhci(SdhciResponse),
    CommandGetType,
    ResponseGetType(DeviceType),
    CommandGetSdhciRegisters,
    ResponseGetSdhciRegisters(SdhciRegistersResponse),
    CommandGetUsbData,
    ResponseGetUsbData(Option<UsbData>),
    CommandGetFireWireData,
    ResponseGetFireWireData(Option<FireWireData>),
    CommandGetPcmciaData,
    ResponseGetPcmciaData(Option<PcmciaData>),
    CommandCloseDevice,
    CommandAmIRoot,
    ResponseAmIRoot(bool),
    CommandMultiSdhci(Vec<SdhciCommand>),
    ResponseMultiSdhci(Vec<SdhciResponse>),
    CommandReOpenDevice,
    CommandOsRead(OsReadCommand),
    ResponseOsRead(OsReadResponse),
}

struct AmIRoot(bool);

impl Body for AmIRoot {
    fn fixed_len(&self) -> usize {
        4
    }

    fn write(&self, w: &mut Writer) {
        w.u32(u32::from(self.0));
    }
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Nop(_) => PacketType::Nop,
            Self::Hello(_) => PacketType::Hello,
            Self::CommandListDevices => PacketType::CommandListDevices,
            Self::ResponseListDevices(_) => PacketType::ResponseListDevices,
            Self::CommandOpen(_) => PacketType::CommandOpen,
            Self::CommandScsi(_) => PacketType::CommandScsi,
            Self::ResponseScsi(_) => PacketType::ResponseScsi,
            Self::CommandAta(cmd) => cmd.mode().command_type(),
            Self::ResponseAta(res) => res.mode().response_type(),
            Self::CommandSdhci(_) => PacketType::CommandSdhci,
            Self::ResponseSdhci(_) => PacketType::ResponseSdhci,
            Self::CommandGetType => PacketType::CommandGetType,
            Self::ResponseGetType(_) => PacketType::ResponseGetType,
            Self::CommandGetSdhciRegisters => PacketType::CommandGetSdhciRegisters,
            Self::ResponseGetSdhciRegisters(_) => PacketType::ResponseGetSdhciRegisters,
            Self::CommandGetUsbData => PacketType::CommandGetUsbData,
            Self::ResponseGetUsbData(_) => PacketType::ResponseGetUsbData,
            Self::CommandGetFireWireData => PacketType::CommandGetFireWireData,
            Self::ResponseGetFireWireData(_) => PacketType::ResponseGetFireWireData,
            Self::CommandGetPcmciaData => PacketType::CommandGetPcmciaData,
            Self::ResponseGetPcmciaData(_) => PacketType::ResponseGetPcmciaData,
            Self::CommandCloseDevice => PacketType::CommandCloseDevice,
            Self::CommandAmIRoot => PacketType::CommandAmIRoot,
            Self::ResponseAmIRoot(_) => PacketType::ResponseAmIRoot,
            Self::CommandMultiSdhci(_) => PacketType::CommandMultiSdhci,
            Self::ResponseMultiSdhci(_) => PacketType::ResponseMultiSdhci,
            Self::CommandReOpenDevice => PacketType::CommandReOpenDevice,
            Self::CommandOsRead(_) => PacketType::CommandOsRead,
            Self::ResponseOsRead(_) => PacketType::ResponseOsRead,
        }
    }

    /// Encode side of the dispatch table.
    fn with_body<R>(&self, f: impl FnOnce(&dyn Body) -> R) -> R {
        match self {
            Self::Nop(nop) => f(nop),
            Self::Hello(hello) => f(hello),
            Self::CommandListDevices
            | Self::CommandGetType
            | Self::CommandGetSdhciRegisters
            | Self::CommandGetUsbData
            | Self::CommandGetFireWireData
            | Self::CommandGetPcmciaData
            | Self::CommandCloseDevice
            | Self::CommandAmIRoot
            | Self::CommandReOpenDevice => f(&Empty),
            Self::ResponseListDevices(res) => f(res),
            Self::CommandOpen(open) => f(open),
            Self::CommandScsi(cmd) => f(cmd),
            Self::ResponseScsi(res) => f(res),
            Self::CommandAta(cmd) => f(cmd),
            Self::ResponseAta(res) => f(res),
            Self::CommandSdhci(cmd) => f(cmd),
            Self::ResponseSdhci(res) => f(res),
            Self::ResponseGetType(ty) => f(ty),
            Self::ResponseGetSdhciRegisters(res) => f(res),
            Self::ResponseGetUsbData(data) => f(&BusData {
                data: data.as_ref(),
                fixed_len: UsbData::FIXED_LEN,
                write: UsbData::write,
            }),
            Self::ResponseGetFireWireData(data) => f(&BusData {
                data: data.as_ref(),
                fixed_len: FireWireData::FIXED_LEN,
                write: FireWireData::write,
            }),
            Self::ResponseGetPcmciaData(data) => f(&BusData {
                data: data.as_ref(),
                fixed_len: PcmciaData::FIXED_LEN,
                write: PcmciaData::write,
            }),
            Self::ResponseAmIRoot(root) => f(&AmIRoot(*root)),
            Self::CommandMultiSdhci(cmds) => f(&MultiSdhciCommand(cmds)),
            Self::ResponseMultiSdhci(res) => f(&MultiSdhciResponse(res)),
            Self::CommandOsRead(cmd) => f(cmd),
            Self::ResponseOsRead(res) => f(res),
        }
    }

    /// Size of the fixed struct for this packet, header included.
    pub fn fixed_len(&self) -> usize {
        HEADER_LEN + self.with_body(|body| body.fixed_len())
    }

    /// Sum of all variable-length tails.
    pub fn tail_len(&self) -> usize {
        self.with_body(|body| body.tail_len())
    }

    /// Value of `header.length` for this packet.
    pub fn encoded_len(&self) -> usize {
        self.fixed_len() + self.tail_len()
    }

    pub fn header(&self) -> Result<PacketHeader, EncodeError> {
        let len = self.encoded_len();
        let len = u32::try_from(len).map_err(|_| EncodeError::PacketTooLarge { len })?;
        Ok(PacketHeader::new(self.packet_type(), len))
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        self.encode_with_version(PACKET_VERSION)
    }

    pub fn encode_with_version(&self, version: u8) -> Result<Vec<u8>, EncodeError> {
        if let Self::ResponseListDevices(res) = self {
            if res.devices.len() > usize::from(u16::MAX) {
                return Err(EncodeError::FieldTooLarge {
                    field: "device count",
                    len: res.devices.len(),
                    max: usize::from(u16::MAX),
                });
            }
        }

        let mut header = self.header()?;
        header.version = version;

        let len = header.length as usize;
        let mut w = Writer::with_capacity(len);
        header.write(&mut w);
        self.with_body(|body| body.write(&mut w));
        debug_assert_eq!(w.len(), len, "{:?} body length", self.packet_type());
        Ok(w.into_inner())
    }

    /// Decodes a complete packet, header included.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let header = PacketHeader::decode(buf)?;
        Self::decode_with_header(&header, buf)
    }

    /// Decodes the body of a packet whose header has already been validated.
    ///
    /// `buf` is the whole packet (header included) and must be exactly `header.length` long.
    /// The body must consume every byte: a packet whose declared length disagrees with its
    /// decoded fields is a framing error.
    pub fn decode_with_header(header: &PacketHeader, buf: &[u8]) -> Result<Self, DecodeError> {
        let declared = header.length as usize;
        if buf.len() != declared {
            return Err(DecodeError::BufferLengthMismatch {
                declared,
                actual: buf.len(),
            });
        }

        let ty = header.packet_type;
        let mut r = Reader::new(&buf[HEADER_LEN..], packet_name(ty));
        let packet = Self::decode_body(ty, &mut r)?;
        if r.remaining() != 0 {
            return Err(DecodeError::LengthMismatch {
                packet: packet_name(ty),
                declared,
                decoded: HEADER_LEN + r.position(),
            });
        }
        Ok(packet)
    }

    /// Decode side of the dispatch table.
    fn decode_body(ty: PacketType, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        use PacketType as T;

        Ok(match ty {
            T::Nop => Self::Nop(Nop::read(r)?),
            T::Hello => Self::Hello(Hello::read(r)?),
            T::CommandListDevices => Self::CommandListDevices,
            T::ResponseListDevices => Self::ResponseListDevices(ListDevicesResponse::read(r)?),
            T::CommandOpen => Self::CommandOpen(OpenDevice::read(r)?),
            T::CommandScsi => Self::CommandScsi(ScsiCommand::read(r)?),
            T::ResponseScsi => Self::ResponseScsi(ScsiResponse::read(r)?),
            T::CommandAtaChs => Self::CommandAta(AtaCommand::read(AtaMode::Chs, r)?),
            T::ResponseAtaChs => Self::ResponseAta(AtaResponse::read(AtaMode::Chs, r)?),
            T::CommandAtaLba28 => Self::CommandAta(AtaCommand::read(AtaMode::Lba28, r)?),
            T::ResponseAtaLba28 => Self::ResponseAta(AtaResponse::read(AtaMode::Lba28, r)?),
            T::CommandAtaLba48 => Self::CommandAta(AtaCommand::read(AtaMode::Lba48, r)?),
            T::ResponseAtaLba48 => Self::ResponseAta(AtaResponse::read(AtaMode::Lba48, r)?),
            T::CommandSdhci => Self::CommandSdhci(SdhciCommand::read(r)?),
            T::ResponseSdhci => Self::ResponseSdhci(SdhciResponse::read(r)?),
            T::CommandGetType => Self::CommandGetType,
            T::ResponseGetType => Self::ResponseGetType(DeviceType::read(r)?),
            T::CommandGetSdhciRegisters => Self::CommandGetSdhciRegisters,
            T::ResponseGetSdhciRegisters => {
                Self::ResponseGetSdhciRegisters(SdhciRegistersResponse::read(r)?)
            }
            T::CommandGetUsbData => Self::CommandGetUsbData,
            T::ResponseGetUsbData => Self::ResponseGetUsbData(UsbData::read(r)?),
            T::CommandGetFireWireData => Self::CommandGetFireWireData,
            T::ResponseGetFireWireData => Self::ResponseGetFireWireData(FireWireData::read(r)?),
            T::CommandGetPcmciaData => Self::CommandGetPcmciaData,
            T::ResponseGetPcmciaData => Self::ResponseGetPcmciaData(PcmciaData::read(r)?),
            T::CommandCloseDevice => Self::CommandCloseDevice,
            T::CommandAmIRoot => Self::CommandAmIRoot,
            T::ResponseAmIRoot => Self::ResponseAmIRoot(r.u32()? != 0),
            T::CommandMultiSdhci => Self::CommandMultiSdhci(read_multi_commands(r)?),
            T::ResponseMultiSdhci => Self::ResponseMultiSdhci(read_multi_responses(r)?),
            T::CommandReOpenDevice => Self::CommandReOpenDevice,
            T::CommandOsRead => Self::CommandOsRead(OsReadCommand::read(r)?),
            T::ResponseOsRead => Self::ResponseOsRead(OsReadResponse::read(r)?),
        })
    }
}

fn packet_name(ty: PacketType) -> &'static str {
    use PacketType as T;

    match ty {
        T::Nop => "Nop",
        T::Hello => "Hello",
        T::CommandListDevices => "CommandListDevices",
        T::ResponseListDevices => "ResponseListDevices",
        T::CommandOpen => "CommandOpen",
        T::CommandScsi => "CommandScsi",
        T::ResponseScsi => "ResponseScsi",
        T::CommandAtaChs => "CommandAtaChs",
        T::ResponseAtaChs => "ResponseAtaChs",
        T::CommandAtaLba28 => "CommandAtaLba28",
        T::ResponseAtaLba28 => "ResponseAtaLba28",
        T::CommandAtaLba48 => "CommandAtaLba48",
        T::ResponseAtaLba48 => "ResponseAtaLba48",
        T::CommandSdhci => "CommandSdhci",
        T::ResponseSdhci => "ResponseSdhci",
        T::CommandGetType => "CommandGetType",
        T::ResponseGetType => "ResponseGetType",
        T::CommandGetSdhciRegisters => "CommandGetSdhciRegisters",
        T::ResponseGetSdhciRegisters => "ResponseGetSdhciRegisters",
        T::CommandGetUsbData => "CommandGetUsbData",
        T::ResponseGetUsbData => "ResponseGetUsbData",
        T::CommandGetFireWireData => "CommandGetFireWireData",
        T::ResponseGetFireWireData => "ResponseGetFireWireData",
        T::CommandGetPcmciaData => "CommandGetPcmciaData",
        T::ResponseGetPcmciaData => "ResponseGetPcmciaData",
        T::CommandCloseDevice => "CommandCloseDevice",
        T::CommandAmIRoot => "CommandAmIRoot",
        T::ResponseAmIRoot => "ResponseAmIRoot",
        T::CommandMultiSdhci => "CommandMultiSdhci",
        T::ResponseMultiSdhci => "ResponseMultiSdhci",
        T::CommandReOpenDevice => "CommandReOpenDevice",
        T::CommandOsRead => "CommandOsRead",
        T::ResponseOsRead => "ResponseOsRead",
    }
}
