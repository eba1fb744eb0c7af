use crate::packet::{tail_len_u32, Body};
use crate::wire::{Reader, Writer};
use crate::DecodeError;

/// Data transfer direction of a SCSI command, as seen from the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ScsiDirection {
    Unspecified = -1,
    None = 0,
    In = 1,
    Out = 2,
    Bidirectional = 3,
}

impl ScsiDirection {
    pub fn from_code(code: i32) -> Result<Self, DecodeError> {
        Ok(match code {
            -1 => Self::Unspecified,
            0 => Self::None,
            1 => Self::In,
            2 => Self::Out,
            3 => Self::Bidirectional,
            other => {
                return Err(DecodeError::InvalidField {
                    field: "scsi direction",
                    value: other.into(),
                })
            }
        })
    }
}

/// `CommandScsi` body. Tails: CDB bytes, then the data buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScsiCommand {
    pub cdb: Vec<u8>,
    pub buffer: Vec<u8>,
    pub direction: ScsiDirection,
    /// Seconds the daemon allows the device ioctl to run.
    pub timeout: u32,
}

impl ScsiCommand {
    pub(crate) const FIXED_LEN: usize = 16;

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let cdb_len = r.u32()?;
        let buf_len = r.u32()?;
        let direction = ScsiDirection::from_code(r.i32()?)?;
        let timeout = r.u32()?;
        Ok(Self {
            cdb: r.tail(cdb_len)?,
            buffer: r.tail(buf_len)?,
            direction,
            timeout,
        })
    }
}

impl Body for ScsiCommand {
    fn fixed_len(&self) -> usize {
        Self::FIXED_LEN
    }

    fn tail_len(&self) -> usize {
        self.cdb.len() + self.buffer.len()
    }

    fn write(&self, w: &mut Writer) {
        w.u32(tail_len_u32(&self.cdb));
        w.u32(tail_len_u32(&self.buffer));
        w.i32(self.direction as i32);
        w.u32(self.timeout);
        w.bytes(&self.cdb);
        w.bytes(&self.buffer);
    }
}

/// `ResponseScsi` body. Tails: sense bytes, then the data buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScsiResponse {
    pub sense_data: Vec<u8>,
    pub buffer: Vec<u8>,
    /// Milliseconds the command took on the remote host.
    pub duration: u32,
    /// Whether the device reported a check condition.
    pub sense: bool,
    pub error_no: u32,
}

impl ScsiResponse {
    pub(crate) const FIXED_LEN: usize = 20;

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let sense_len = r.u32()?;
        let buf_len = r.u32()?;
        let duration = r.u32()?;
        let sense = r.u32()? != 0;
        let error_no = r.u32()?;
        Ok(Self {
            sense_data: r.tail(sense_len)?,
            buffer: r.tail(buf_len)?,
            duration,
            sense,
            error_no,
        })
    }
}

impl Body for ScsiResponse {
    fn fixed_len(&self) -> usize {
        Self::FIXED_LEN
    }

    fn tail_len(&self) -> usize {
        self.sense_data.len() + self.buffer.len()
    }

    fn write(&self, w: &mut Writer) {
        w.u32(tail_len_u32(&self.sense_data));
        w.u32(tail_len_u32(&self.buffer));
        w.u32(self.duration);
        w.u32(u32::from(self.sense));
        w.u32(self.error_no);
        w.bytes(&self.sense_data);
        w.bytes(&self.buffer);
    }
}
