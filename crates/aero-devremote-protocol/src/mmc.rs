//! MMC/SD commands forwarded to an SDHCI controller on the remote host.

use bitflags::bitflags;

use crate::packet::{tail_len_u32, Body};
use crate::wire::{Reader, Writer};
use crate::DecodeError;

/// Size of one command entry, shared by `CommandSdhci` and `CommandMultiSdhci`.
pub const SDHCI_COMMAND_LEN: usize = 27;

/// Size of one result entry, shared by `ResponseSdhci` and `ResponseMultiSdhci`.
pub const SDHCI_RESULT_LEN: usize = 32;

/// Command indices with a special meaning to this crate or its users.
pub mod opcode {
    pub const GO_IDLE_STATE: u8 = 0;
    /// MMC `SEND_OP_COND`; answers with the OCR.
    pub const SEND_OP_COND: u8 = 1;
    pub const ALL_SEND_CID: u8 = 2;
    pub const SET_RELATIVE_ADDR: u8 = 3;
    pub const SELECT_CARD: u8 = 7;
    pub const SEND_EXT_CSD: u8 = 8;
    pub const SEND_CSD: u8 = 9;
    pub const SEND_CID: u8 = 10;
    pub const SEND_STATUS: u8 = 13;
    pub const SET_BLOCKLEN: u8 = 16;
    pub const READ_SINGLE_BLOCK: u8 = 17;
    pub const READ_MULTIPLE_BLOCK: u8 = 18;
    pub const SET_BLOCK_COUNT: u8 = 23;
    pub const APP_CMD: u8 = 55;
    /// SD application command `SD_SEND_OP_COND` (ACMD41); answers with the OCR.
    pub const SD_SEND_OP_COND: u8 = 41;
    /// SD application command `SEND_SCR` (ACMD51).
    pub const SD_SEND_SCR: u8 = 51;
}

bitflags! {
    /// Response format and command class, in the Linux `MMC_RSP_*`/`MMC_CMD_*` encoding.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct MmcFlags: u32 {
        const RESPONSE_PRESENT = 1 << 0;
        const RESPONSE_136 = 1 << 1;
        const RESPONSE_CRC = 1 << 2;
        const RESPONSE_BUSY = 1 << 3;
        const RESPONSE_OPCODE = 1 << 4;
        const COMMAND_ADTC = 1 << 5;
        const COMMAND_BC = 1 << 6;
        const COMMAND_BCR = (1 << 5) | (1 << 6);
        const RESPONSE_SPI_S1 = 1 << 7;
        const RESPONSE_SPI_S2 = 1 << 8;
        const RESPONSE_SPI_B4 = 1 << 9;
        const RESPONSE_SPI_BUSY = 1 << 10;

        const RESPONSE_R1 = Self::RESPONSE_PRESENT.bits() | Self::RESPONSE_CRC.bits() | Self::RESPONSE_OPCODE.bits();
        const RESPONSE_R1B = Self::RESPONSE_R1.bits() | Self::RESPONSE_BUSY.bits();
        const RESPONSE_R2 = Self::RESPONSE_PRESENT.bits() | Self::RESPONSE_136.bits() | Self::RESPONSE_CRC.bits();
        const RESPONSE_R3 = Self::RESPONSE_PRESENT.bits();
        const RESPONSE_R6 = Self::RESPONSE_R1.bits();
        const RESPONSE_R7 = Self::RESPONSE_R1.bits();
    }
}

/// One MMC/SD command. Tail: the data buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SdhciCommand {
    pub command: u8,
    pub write: bool,
    /// Command is an SD application command (sent after `APP_CMD`).
    pub application: bool,
    pub flags: MmcFlags,
    pub argument: u32,
    pub block_size: u32,
    pub blocks: u32,
    /// Seconds the daemon allows the device ioctl to run.
    pub timeout: u32,
    pub buffer: Vec<u8>,
}

impl SdhciCommand {
    pub(crate) fn write_fixed(&self, w: &mut Writer) {
        w.u8(self.command);
        w.bool(self.write);
        w.bool(self.application);
        w.u32(self.flags.bits());
        w.u32(self.argument);
        w.u32(self.block_size);
        w.u32(self.blocks);
        w.u32(tail_len_u32(&self.buffer));
        w.u32(self.timeout);
    }

    /// Reads the fixed entry, returning the command with an empty buffer and the declared
    /// buffer length.
    pub(crate) fn read_fixed(r: &mut Reader<'_>) -> Result<(Self, u32), DecodeError> {
        let command = r.u8()?;
        let write = r.bool()?;
        let application = r.bool()?;
        let flags = MmcFlags::from_bits_retain(r.u32()?);
        let argument = r.u32()?;
        let block_size = r.u32()?;
        let blocks = r.u32()?;
        let buf_len = r.u32()?;
        let timeout = r.u32()?;
        let cmd = Self {
            command,
            write,
            application,
            flags,
            argument,
            block_size,
            blocks,
            timeout,
            buffer: Vec::new(),
        };
        Ok((cmd, buf_len))
    }

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let (mut cmd, buf_len) = Self::read_fixed(r)?;
        cmd.buffer = r.tail(buf_len)?;
        Ok(cmd)
    }
}

impl Body for SdhciCommand {
    fn fixed_len(&self) -> usize {
        SDHCI_COMMAND_LEN
    }

    fn tail_len(&self) -> usize {
        self.buffer.len()
    }

    fn write(&self, w: &mut Writer) {
        self.write_fixed(w);
        w.bytes(&self.buffer);
    }
}

/// Result of one MMC/SD command. Tail: the data buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SdhciResponse {
    pub buffer: Vec<u8>,
    /// Raw response words as read from the controller.
    pub response: [u32; 4],
    /// Milliseconds the command took on the remote host.
    pub duration: u32,
    pub sense: bool,
    pub error_no: u32,
}

impl SdhciResponse {
    pub(crate) fn write_fixed(&self, w: &mut Writer) {
        w.u32(tail_len_u32(&self.buffer));
        for word in self.response {
            w.u32(word);
        }
        w.u32(self.duration);
        w.u32(u32::from(self.sense));
        w.u32(self.error_no);
    }

    pub(crate) fn read_fixed(r: &mut Reader<'_>) -> Result<(Self, u32), DecodeError> {
        let buf_len = r.u32()?;
        let response = [r.u32()?, r.u32()?, r.u32()?, r.u32()?];
        let duration = r.u32()?;
        let sense = r.u32()? != 0;
        let error_no = r.u32()?;
        let res = Self {
            buffer: Vec::new(),
            response,
            duration,
            sense,
            error_no,
        };
        Ok((res, buf_len))
    }

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let (mut res, buf_len) = Self::read_fixed(r)?;
        res.buffer = r.tail(buf_len)?;
        Ok(res)
    }
}

impl Body for SdhciResponse {
    fn fixed_len(&self) -> usize {
        SDHCI_RESULT_LEN
    }

    fn tail_len(&self) -> usize {
        self.buffer.len()
    }

    fn write(&self, w: &mut Writer) {
        self.write_fixed(w);
        w.bytes(&self.buffer);
    }
}

/// `CommandMultiSdhci` body: a count, every fixed entry, then every buffer in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct MultiSdhciCommand<'a>(pub(crate) &'a [SdhciCommand]);

impl Body for MultiSdhciCommand<'_> {
    fn fixed_len(&self) -> usize {
        8
    }

    fn tail_len(&self) -> usize {
        self.0
            .iter()
            .map(|cmd| SDHCI_COMMAND_LEN + cmd.buffer.len())
            .sum()
    }

    fn write(&self, w: &mut Writer) {
        w.u64(self.0.len() as u64);
        for cmd in self.0 {
            cmd.write_fixed(w);
        }
        for cmd in self.0 {
            w.bytes(&cmd.buffer);
        }
    }
}

/// `ResponseMultiSdhci` body, laid out like [`MultiSdhciCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct MultiSdhciResponse<'a>(pub(crate) &'a [SdhciResponse]);

impl Body for MultiSdhciResponse<'_> {
    fn fixed_len(&self) -> usize {
        8
    }

    fn tail_len(&self) -> usize {
        self.0
            .iter()
            .map(|res| SDHCI_RESULT_LEN + res.buffer.len())
            .sum()
    }

    fn write(&self, w: &mut Writer) {
        w.u64(self.0.len() as u64);
        for res in self.0 {
            res.write_fixed(w);
        }
        for res in self.0 {
            w.bytes(&res.buffer);
        }
    }
}

/// Validates a `cmd_count` against the bytes actually present before allocating for it.
fn read_count(r: &mut Reader<'_>, entry_len: usize) -> Result<usize, DecodeError> {
    let count = r.u64()?;
    let needed = usize::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(entry_len))
        .unwrap_or(usize::MAX);
    if needed > r.remaining() {
        return Err(DecodeError::Truncated {
            context: "multi sdhci entries",
            needed,
            remaining: r.remaining(),
        });
    }
    Ok(needed / entry_len)
}

pub(crate) fn read_multi_commands(r: &mut Reader<'_>) -> Result<Vec<SdhciCommand>, DecodeError> {
    let count = read_count(r, SDHCI_COMMAND_LEN)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(SdhciCommand::read_fixed(r)?);
    }
    entries
        .into_iter()
        .map(|(mut cmd, buf_len)| {
            cmd.buffer = r.tail(buf_len)?;
            Ok(cmd)
        })
        .collect()
}

pub(crate) fn read_multi_responses(r: &mut Reader<'_>) -> Result<Vec<SdhciResponse>, DecodeError> {
    let count = read_count(r, SDHCI_RESULT_LEN)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(SdhciResponse::read_fixed(r)?);
    }
    entries
        .into_iter()
        .map(|(mut res, buf_len)| {
            res.buffer = r.tail(buf_len)?;
            Ok(res)
        })
        .collect()
}
