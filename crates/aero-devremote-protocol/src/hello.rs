use crate::packet::Body;
use crate::wire::{Reader, Writer};
use crate::DecodeError;

pub(crate) const APPLICATION_LEN: usize = 128;
pub(crate) const APPLICATION_VERSION_LEN: usize = 64;
pub(crate) const UNAME_FIELD_LEN: usize = 256;

/// Identity announcement exchanged once, in both directions, when a connection is set up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hello {
    pub application: String,
    pub version: String,
    /// Highest protocol version the sender understands.
    pub max_protocol: u8,
    pub sysname: String,
    pub release: String,
    pub machine: String,
}

impl Hello {
    pub(crate) const FIXED_LEN: usize =
        APPLICATION_LEN + APPLICATION_VERSION_LEN + 1 + 3 + 3 * UNAME_FIELD_LEN;

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let application = r.fixed_str(APPLICATION_LEN)?;
        let version = r.fixed_str(APPLICATION_VERSION_LEN)?;
        let max_protocol = r.u8()?;
        r.skip(3)?;
        Ok(Self {
            application,
            version,
            max_protocol,
            sysname: r.fixed_str(UNAME_FIELD_LEN)?,
            release: r.fixed_str(UNAME_FIELD_LEN)?,
            machine: r.fixed_str(UNAME_FIELD_LEN)?,
        })
    }
}

impl Body for Hello {
    fn fixed_len(&self) -> usize {
        Self::FIXED_LEN
    }

    fn write(&self, w: &mut Writer) {
        w.fixed_str(&self.application, APPLICATION_LEN);
        w.fixed_str(&self.version, APPLICATION_VERSION_LEN);
        w.u8(self.max_protocol);
        w.zeros(3);
        w.fixed_str(&self.sysname, UNAME_FIELD_LEN);
        w.fixed_str(&self.release, UNAME_FIELD_LEN);
        w.fixed_str(&self.machine, UNAME_FIELD_LEN);
    }
}
