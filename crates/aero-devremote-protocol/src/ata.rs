//! ATA pass-through in its three addressing modes.
//!
//! The command and response packets only differ by the register block they carry, so a single
//! [`AtaCommand`]/[`AtaResponse`] pair is tagged with the addressing mode instead of having one
//! struct per mode.

use crate::packet::{tail_len_u32, Body};
use crate::wire::{Reader, Writer};
use crate::{DecodeError, PacketType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtaMode {
    Chs,
    Lba28,
    Lba48,
}

impl AtaMode {
    pub const fn command_type(self) -> PacketType {
        match self {
            Self::Chs => PacketType::CommandAtaChs,
            Self::Lba28 => PacketType::CommandAtaLba28,
            Self::Lba48 => PacketType::CommandAtaLba48,
        }
    }

    pub const fn response_type(self) -> PacketType {
        match self {
            Self::Chs => PacketType::ResponseAtaChs,
            Self::Lba28 => PacketType::ResponseAtaLba28,
            Self::Lba48 => PacketType::ResponseAtaLba48,
        }
    }

    const fn registers_len(self) -> usize {
        match self {
            Self::Chs | Self::Lba28 => 7,
            Self::Lba48 => 12,
        }
    }

    const fn error_registers_len(self) -> usize {
        match self {
            Self::Chs | Self::Lba28 => 7,
            Self::Lba48 => 11,
        }
    }
}

/// ATA protocol the daemon should use to issue the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AtaProtocol {
    HardReset = 0,
    SoftReset = 1,
    NonData = 3,
    PioIn = 4,
    PioOut = 5,
    Dma = 6,
    DmaQueued = 7,
    DeviceDiagnostic = 8,
    DeviceReset = 9,
    UDmaIn = 10,
    UDmaOut = 11,
    FpDma = 12,
    ReturnResponse = 15,
}

impl AtaProtocol {
    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        Ok(match code {
            0 => Self::HardReset,
            1 => Self::SoftReset,
            3 => Self::NonData,
            4 => Self::PioIn,
            5 => Self::PioOut,
            6 => Self::Dma,
            7 => Self::DmaQueued,
            8 => Self::DeviceDiagnostic,
            9 => Self::DeviceReset,
            10 => Self::UDmaIn,
            11 => Self::UDmaOut,
            12 => Self::FpDma,
            15 => Self::ReturnResponse,
            other => {
                return Err(DecodeError::InvalidField {
                    field: "ata protocol",
                    value: other.into(),
                })
            }
        })
    }
}

/// Register holding the transfer length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AtaTransferRegister {
    NoTransfer = 0,
    Feature = 1,
    SectorCount = 2,
    Sptsiu = 3,
}

impl AtaTransferRegister {
    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        Ok(match code {
            0 => Self::NoTransfer,
            1 => Self::Feature,
            2 => Self::SectorCount,
            3 => Self::Sptsiu,
            other => {
                return Err(DecodeError::InvalidField {
                    field: "ata transfer register",
                    value: other.into(),
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtaRegistersChs {
    pub feature: u8,
    pub sector_count: u8,
    pub sector: u8,
    pub cylinder_low: u8,
    pub cylinder_high: u8,
    pub device_head: u8,
    pub command: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtaRegistersLba28 {
    pub feature: u8,
    pub sector_count: u8,
    pub lba_low: u8,
    pub lba_mid: u8,
    pub lba_high: u8,
    pub device_head: u8,
    pub command: u8,
}

/// 48-bit register block; each 16-bit field holds the "previous" byte in its high half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtaRegistersLba48 {
    pub feature: u16,
    pub sector_count: u16,
    pub lba_low: u16,
    pub lba_mid: u16,
    pub lba_high: u16,
    pub device_head: u8,
    pub command: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtaErrorRegistersChs {
    pub status: u8,
    pub error: u8,
    pub sector_count: u8,
    pub sector: u8,
    pub cylinder_low: u8,
    pub cylinder_high: u8,
    pub device_head: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtaErrorRegistersLba28 {
    pub status: u8,
    pub error: u8,
    pub sector_count: u8,
    pub lba_low: u8,
    pub lba_mid: u8,
    pub lba_high: u8,
    pub device_head: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtaErrorRegistersLba48 {
    pub status: u8,
    pub error: u8,
    pub sector_count: u16,
    pub lba_low: u16,
    pub lba_mid: u16,
    pub lba_high: u16,
    pub device_head: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaRegisters {
    Chs(AtaRegistersChs),
    Lba28(AtaRegistersLba28),
    Lba48(AtaRegistersLba48),
}

impl From<AtaRegistersChs> for AtaRegisters {
    fn from(regs: AtaRegistersChs) -> Self {
        Self::Chs(regs)
    }
}

impl From<AtaRegistersLba28> for AtaRegisters {
    fn from(regs: AtaRegistersLba28) -> Self {
        Self::Lba28(regs)
    }
}

impl From<AtaRegistersLba48> for AtaRegisters {
    fn from(regs: AtaRegistersLba48) -> Self {
        Self::Lba48(regs)
    }
}

impl AtaRegisters {
    pub const fn mode(&self) -> AtaMode {
        match self {
            Self::Chs(_) => AtaMode::Chs,
            Self::Lba28(_) => AtaMode::Lba28,
            Self::Lba48(_) => AtaMode::Lba48,
        }
    }

    fn write(&self, w: &mut Writer) {
        match self {
            Self::Chs(r) => {
                w.bytes(&[
                    r.feature,
                    r.sector_count,
                    r.sector,
                    r.cylinder_low,
                    r.cylinder_high,
                    r.device_head,
                    r.command,
                ]);
            }
            Self::Lba28(r) => {
                w.bytes(&[
                    r.feature,
                    r.sector_count,
                    r.lba_low,
                    r.lba_mid,
                    r.lba_high,
                    r.device_head,
                    r.command,
                ]);
            }
            Self::Lba48(r) => {
                w.u16(r.feature);
                w.u16(r.sector_count);
                w.u16(r.lba_low);
                w.u16(r.lba_mid);
                w.u16(r.lba_high);
                w.u8(r.device_head);
                w.u8(r.command);
            }
        }
    }

    fn read(mode: AtaMode, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(match mode {
            AtaMode::Chs => {
                let [feature, sector_count, sector, cylinder_low, cylinder_high, device_head, command] =
                    r.array()?;
                Self::Chs(AtaRegistersChs {
                    feature,
                    sector_count,
                    sector,
                    cylinder_low,
                    cylinder_high,
                    device_head,
                    command,
                })
            }
            AtaMode::Lba28 => {
                let [feature, sector_count, lba_low, lba_mid, lba_high, device_head, command] =
                    r.array()?;
                Self::Lba28(AtaRegistersLba28 {
                    feature,
                    sector_count,
                    lba_low,
                    lba_mid,
                    lba_high,
                    device_head,
                    command,
                })
            }
            AtaMode::Lba48 => Self::Lba48(AtaRegistersLba48 {
                feature: r.u16()?,
                sector_count: r.u16()?,
                lba_low: r.u16()?,
                lba_mid: r.u16()?,
                lba_high: r.u16()?,
                device_head: r.u8()?,
                command: r.u8()?,
            }),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaErrorRegisters {
    Chs(AtaErrorRegistersChs),
    Lba28(AtaErrorRegistersLba28),
    Lba48(AtaErrorRegistersLba48),
}

impl AtaErrorRegisters {
    pub const fn mode(&self) -> AtaMode {
        match self {
            Self::Chs(_) => AtaMode::Chs,
            Self::Lba28(_) => AtaMode::Lba28,
            Self::Lba48(_) => AtaMode::Lba48,
        }
    }

    /// All-zero register block for `mode`.
    pub fn zeroed(mode: AtaMode) -> Self {
        match mode {
            AtaMode::Chs => Self::Chs(AtaErrorRegistersChs::default()),
            AtaMode::Lba28 => Self::Lba28(AtaErrorRegistersLba28::default()),
            AtaMode::Lba48 => Self::Lba48(AtaErrorRegistersLba48::default()),
        }
    }

    pub fn status(&self) -> u8 {
        match self {
            Self::Chs(r) => r.status,
            Self::Lba28(r) => r.status,
            Self::Lba48(r) => r.status,
        }
    }

    pub fn error(&self) -> u8 {
        match self {
            Self::Chs(r) => r.error,
            Self::Lba28(r) => r.error,
            Self::Lba48(r) => r.error,
        }
    }

    fn write(&self, w: &mut Writer) {
        match self {
            Self::Chs(r) => {
                w.bytes(&[
                    r.status,
                    r.error,
                    r.sector_count,
                    r.sector,
                    r.cylinder_low,
                    r.cylinder_high,
                    r.device_head,
                ]);
            }
            Self::Lba28(r) => {
                w.bytes(&[
                    r.status,
                    r.error,
                    r.sector_count,
                    r.lba_low,
                    r.lba_mid,
                    r.lba_high,
                    r.device_head,
                ]);
            }
            Self::Lba48(r) => {
                w.u8(r.status);
                w.u8(r.error);
                w.u16(r.sector_count);
                w.u16(r.lba_low);
                w.u16(r.lba_mid);
                w.u16(r.lba_high);
                w.u8(r.device_head);
            }
        }
    }

    fn read(mode: AtaMode, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(match mode {
            AtaMode::Chs => {
                let [status, error, sector_count, sector, cylinder_low, cylinder_high, device_head] =
                    r.array()?;
                Self::Chs(AtaErrorRegistersChs {
                    status,
                    error,
                    sector_count,
                    sector,
                    cylinder_low,
                    cylinder_high,
                    device_head,
                })
            }
            AtaMode::Lba28 => {
                let [status, error, sector_count, lba_low, lba_mid, lba_high, device_head] =
                    r.array()?;
                Self::Lba28(AtaErrorRegistersLba28 {
                    status,
                    error,
                    sector_count,
                    lba_low,
                    lba_mid,
                    lba_high,
                    device_head,
                })
            }
            AtaMode::Lba48 => Self::Lba48(AtaErrorRegistersLba48 {
                status: r.u8()?,
                error: r.u8()?,
                sector_count: r.u16()?,
                lba_low: r.u16()?,
                lba_mid: r.u16()?,
                lba_high: r.u16()?,
                device_head: r.u8()?,
            }),
        })
    }
}

/// `CommandAta{Chs,Lba28,Lba48}` body. Tail: the data buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtaCommand {
    pub registers: AtaRegisters,
    pub protocol: AtaProtocol,
    pub transfer_register: AtaTransferRegister,
    /// Transfer length is counted in blocks rather than bytes.
    pub transfer_blocks: bool,
    /// Seconds the daemon allows the device ioctl to run.
    pub timeout: u32,
    pub buffer: Vec<u8>,
}

impl AtaCommand {
    pub const fn mode(&self) -> AtaMode {
        self.registers.mode()
    }

    pub(crate) fn read(mode: AtaMode, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let buf_len = r.u32()?;
        let registers = AtaRegisters::read(mode, r)?;
        let protocol = AtaProtocol::from_code(r.u8()?)?;
        let transfer_register = AtaTransferRegister::from_code(r.u8()?)?;
        let transfer_blocks = r.bool()?;
        r.skip(1)?;
        let timeout = r.u32()?;
        Ok(Self {
            registers,
            protocol,
            transfer_register,
            transfer_blocks,
            timeout,
            buffer: r.tail(buf_len)?,
        })
    }
}

impl Body for AtaCommand {
    fn fixed_len(&self) -> usize {
        4 + self.mode().registers_len() + 4 + 4
    }

    fn tail_len(&self) -> usize {
        self.buffer.len()
    }

    fn write(&self, w: &mut Writer) {
        w.u32(tail_len_u32(&self.buffer));
        self.registers.write(w);
        w.u8(self.protocol as u8);
        w.u8(self.transfer_register as u8);
        w.bool(self.transfer_blocks);
        w.u8(0);
        w.u32(self.timeout);
        w.bytes(&self.buffer);
    }
}

/// `ResponseAta{Chs,Lba28,Lba48}` body. Tail: the data buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtaResponse {
    pub registers: AtaErrorRegisters,
    pub buffer: Vec<u8>,
    /// Milliseconds the command took on the remote host.
    pub duration: u32,
    pub sense: bool,
    pub error_no: u32,
}

impl AtaResponse {
    pub const fn mode(&self) -> AtaMode {
        self.registers.mode()
    }

    pub(crate) fn read(mode: AtaMode, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let buf_len = r.u32()?;
        let registers = AtaErrorRegisters::read(mode, r)?;
        let duration = r.u32()?;
        let sense = r.u32()? != 0;
        let error_no = r.u32()?;
        Ok(Self {
            registers,
            buffer: r.tail(buf_len)?,
            duration,
            sense,
            error_no,
        })
    }
}

impl Body for AtaResponse {
    fn fixed_len(&self) -> usize {
        4 + self.mode().error_registers_len() + 12
    }

    fn tail_len(&self) -> usize {
        self.buffer.len()
    }

    fn write(&self, w: &mut Writer) {
        w.u32(tail_len_u32(&self.buffer));
        self.registers.write(w);
        w.u32(self.duration);
        w.u32(u32::from(self.sense));
        w.u32(self.error_no);
        w.bytes(&self.buffer);
    }
}
