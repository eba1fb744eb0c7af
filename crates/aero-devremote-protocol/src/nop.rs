use crate::packet::Body;
use crate::wire::{Reader, Writer};
use crate::DecodeError;

pub(crate) const NOP_TEXT_LEN: usize = 256;

/// Reason carried by a `Nop` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NopReason {
    OutOfOrder,
    NotImplemented,
    NotRecognized,
    ErrorListDevices,
    OpenOk,
    OpenError,
    ReOpenOk,
    CloseError,
    /// A reason code this implementation does not know about.
    Other(u8),
}

impl NopReason {
    pub const fn code(self) -> u8 {
        match self {
            Self::OutOfOrder => 0,
            Self::NotImplemented => 1,
            Self::NotRecognized => 2,
            Self::ErrorListDevices => 3,
            Self::OpenOk => 4,
            Self::OpenError => 5,
            Self::ReOpenOk => 6,
            Self::CloseError => 7,
            Self::Other(code) => code,
        }
    }

    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::OutOfOrder,
            1 => Self::NotImplemented,
            2 => Self::NotRecognized,
            3 => Self::ErrorListDevices,
            4 => Self::OpenOk,
            5 => Self::OpenError,
            6 => Self::ReOpenOk,
            7 => Self::CloseError,
            other => Self::Other(other),
        }
    }
}

/// Out-of-band status packet: refusals, and the acknowledgement of open/reopen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nop {
    pub reason: NopReason,
    /// Free-form explanation from the peer.
    pub text: String,
    /// Peer-side error number (`errno` or equivalent), zero when not applicable.
    pub errno: i32,
}

impl Nop {
    pub fn new(reason: NopReason, text: impl Into<String>, errno: i32) -> Self {
        Self {
            reason,
            text: text.into(),
            errno,
        }
    }

    pub(crate) const FIXED_LEN: usize = 1 + 3 + NOP_TEXT_LEN + 4;

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let reason = NopReason::from_code(r.u8()?);
        r.skip(3)?;
        let text = r.fixed_str(NOP_TEXT_LEN)?;
        let errno = r.i32()?;
        Ok(Self {
            reason,
            text,
            errno,
        })
    }
}

impl Body for Nop {
    fn fixed_len(&self) -> usize {
        Self::FIXED_LEN
    }

    fn write(&self, w: &mut Writer) {
        w.u8(self.reason.code());
        w.zeros(3);
        w.fixed_str(&self.text, NOP_TEXT_LEN);
        w.i32(self.errno);
    }
}
