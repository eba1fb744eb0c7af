//! Device enumeration, open, and descriptor queries.

use crate::packet::Body;
use crate::wire::{Reader, Writer};
use crate::DecodeError;

const DEVICE_PATH_LEN: usize = 1024;
const DEVICE_STRING_LEN: usize = 256;
const OPEN_PATH_LEN: usize = 4096;

/// Size of one device descriptor in a `ResponseListDevices` packet.
pub const DEVICE_INFO_LEN: usize = DEVICE_PATH_LEN + 4 * DEVICE_STRING_LEN + 4;

pub const CSD_MAX_LEN: usize = 16;
pub const CID_MAX_LEN: usize = 16;
pub const SCR_MAX_LEN: usize = 8;
pub const OCR_MAX_LEN: usize = 4;

const USB_DESCRIPTORS_LEN: usize = 65536;
const PCMCIA_CIS_LEN: usize = 65536;
const BUS_STRING_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceInfo {
    pub path: String,
    pub vendor: String,
    pub model: String,
    pub serial: String,
    pub bus: String,
    /// Whether the daemon can forward commands to this device.
    pub supported: bool,
}

impl DeviceInfo {
    fn write(&self, w: &mut Writer) {
        w.fixed_str(&self.path, DEVICE_PATH_LEN);
        w.fixed_str(&self.vendor, DEVICE_STRING_LEN);
        w.fixed_str(&self.model, DEVICE_STRING_LEN);
        w.fixed_str(&self.serial, DEVICE_STRING_LEN);
        w.fixed_str(&self.bus, DEVICE_STRING_LEN);
        w.bool(self.supported);
        w.zeros(3);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let info = Self {
            path: r.fixed_str(DEVICE_PATH_LEN)?,
            vendor: r.fixed_str(DEVICE_STRING_LEN)?,
            model: r.fixed_str(DEVICE_STRING_LEN)?,
            serial: r.fixed_str(DEVICE_STRING_LEN)?,
            bus: r.fixed_str(DEVICE_STRING_LEN)?,
            supported: r.bool()?,
        };
        r.skip(3)?;
        Ok(info)
    }
}

/// `ResponseListDevices` body: a `u16` count followed by that many descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListDevicesResponse {
    pub devices: Vec<DeviceInfo>,
}

impl ListDevicesResponse {
    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let count = r.u16()?;
        let devices = (0..count)
            .map(|_| DeviceInfo::read(r))
            .collect::<Result<_, _>>()?;
        Ok(Self { devices })
    }
}

impl Body for ListDevicesResponse {
    fn fixed_len(&self) -> usize {
        2
    }

    fn tail_len(&self) -> usize {
        self.devices.len() * DEVICE_INFO_LEN
    }

    fn write(&self, w: &mut Writer) {
        // Packet::encode rejects lists that overflow the count.
        w.u16(self.devices.len() as u16);
        for dev in &self.devices {
            dev.write(w);
        }
    }
}

/// `CommandOpen` body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenDevice {
    pub path: String,
}

impl OpenDevice {
    /// Size of the fixed path field.
    pub const PATH_LEN: usize = OPEN_PATH_LEN;

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            path: r.fixed_str(OPEN_PATH_LEN)?,
        })
    }
}

impl Body for OpenDevice {
    fn fixed_len(&self) -> usize {
        OPEN_PATH_LEN
    }

    fn write(&self, w: &mut Writer) {
        w.fixed_str(&self.path, OPEN_PATH_LEN);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DeviceType {
    #[default]
    Unknown,
    Ata,
    Atapi,
    Scsi,
    SecureDigital,
    Mmc,
    Nvme,
}

impl DeviceType {
    pub const fn code(self) -> i32 {
        match self {
            Self::Unknown => -1,
            Self::Ata => 1,
            Self::Atapi => 2,
            Self::Scsi => 3,
            Self::SecureDigital => 4,
            Self::Mmc => 5,
            Self::Nvme => 6,
        }
    }

    /// Unrecognized codes map to [`DeviceType::Unknown`].
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Ata,
            2 => Self::Atapi,
            3 => Self::Scsi,
            4 => Self::SecureDigital,
            5 => Self::Mmc,
            6 => Self::Nvme,
            _ => Self::Unknown,
        }
    }

    /// Whether the card registers (CID/CSD/OCR/SCR) can be queried for this device.
    pub const fn has_card_registers(self) -> bool {
        matches!(self, Self::SecureDigital | Self::Mmc)
    }

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self::from_code(r.i32()?))
    }
}

impl Body for DeviceType {
    fn fixed_len(&self) -> usize {
        4
    }

    fn write(&self, w: &mut Writer) {
        w.i32(self.code());
    }
}

/// Card registers as copied out of a `ResponseGetSdhciRegisters` packet.
///
/// Each register is `None` when the daemon reported a zero length for it, and never longer than
/// the protocol maximum for that register.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SdhciRegisters {
    pub is_sdhci: bool,
    pub csd: Option<Vec<u8>>,
    pub cid: Option<Vec<u8>>,
    pub scr: Option<Vec<u8>>,
    pub ocr: Option<Vec<u8>>,
}

/// `ResponseGetSdhciRegisters` body exactly as carried on the wire.
///
/// The `*_len` fields are whatever the daemon reported; use [`Self::registers`] to get the
/// capped copies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SdhciRegistersResponse {
    pub is_sdhci: bool,
    pub csd: [u8; CSD_MAX_LEN],
    pub cid: [u8; CID_MAX_LEN],
    pub scr: [u8; SCR_MAX_LEN],
    pub ocr: [u8; OCR_MAX_LEN],
    pub csd_len: u32,
    pub cid_len: u32,
    pub scr_len: u32,
    pub ocr_len: u32,
}

fn capped<const N: usize>(field: &[u8; N], len: u32) -> Option<Vec<u8>> {
    let len = (len as usize).min(N);
    (len > 0).then(|| field[..len].to_vec())
}

fn fill<const N: usize>(src: Option<&[u8]>) -> ([u8; N], u32) {
    let mut out = [0u8; N];
    let src = src.unwrap_or_default();
    let len = src.len().min(N);
    out[..len].copy_from_slice(&src[..len]);
    (out, len as u32)
}

impl SdhciRegistersResponse {
    pub fn registers(&self) -> SdhciRegisters {
        SdhciRegisters {
            is_sdhci: self.is_sdhci,
            csd: capped(&self.csd, self.csd_len),
            cid: capped(&self.cid, self.cid_len),
            scr: capped(&self.scr, self.scr_len),
            ocr: capped(&self.ocr, self.ocr_len),
        }
    }

    pub fn from_registers(regs: &SdhciRegisters) -> Self {
        let (csd, csd_len) = fill(regs.csd.as_deref());
        let (cid, cid_len) = fill(regs.cid.as_deref());
        let (scr, scr_len) = fill(regs.scr.as_deref());
        let (ocr, ocr_len) = fill(regs.ocr.as_deref());
        Self {
            is_sdhci: regs.is_sdhci,
            csd,
            cid,
            scr,
            ocr,
            csd_len,
            cid_len,
            scr_len,
            ocr_len,
        }
    }

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            is_sdhci: r.bool()?,
            csd: r.array()?,
            cid: r.array()?,
            scr: r.array()?,
            ocr: r.array()?,
            csd_len: r.u32()?,
            cid_len: r.u32()?,
            scr_len: r.u32()?,
            ocr_len: r.u32()?,
        })
    }
}

impl Body for SdhciRegistersResponse {
    fn fixed_len(&self) -> usize {
        1 + CSD_MAX_LEN + CID_MAX_LEN + SCR_MAX_LEN + OCR_MAX_LEN + 16
    }

    fn write(&self, w: &mut Writer) {
        w.bool(self.is_sdhci);
        w.bytes(&self.csd);
        w.bytes(&self.cid);
        w.bytes(&self.scr);
        w.bytes(&self.ocr);
        w.u32(self.csd_len);
        w.u32(self.cid_len);
        w.u32(self.scr_len);
        w.u32(self.ocr_len);
    }
}

/// USB identity of the open device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UsbData {
    /// Raw descriptors, at most 65535 bytes.
    pub descriptors: Vec<u8>,
    pub id_vendor: u16,
    pub id_product: u16,
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
}

impl UsbData {
    pub(crate) const FIXED_LEN: usize = 1 + 2 + USB_DESCRIPTORS_LEN + 2 + 2 + 3 * BUS_STRING_LEN;

    /// `None` when the daemon reports that the device is not on USB.
    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Option<Self>, DecodeError> {
        let is_usb = r.bool()?;
        let desc_len = usize::from(r.u16()?);
        let descriptors = r.take(USB_DESCRIPTORS_LEN)?;
        let data = Self {
            descriptors: descriptors[..desc_len].to_vec(),
            id_vendor: r.u16()?,
            id_product: r.u16()?,
            manufacturer: r.fixed_str(BUS_STRING_LEN)?,
            product: r.fixed_str(BUS_STRING_LEN)?,
            serial: r.fixed_str(BUS_STRING_LEN)?,
        };
        Ok(is_usb.then_some(data))
    }

    pub(crate) fn write(data: Option<&Self>, w: &mut Writer) {
        let Some(data) = data else {
            w.zeros(Self::FIXED_LEN);
            return;
        };
        let desc_len = data.descriptors.len().min(usize::from(u16::MAX));
        w.bool(true);
        w.u16(desc_len as u16);
        w.fixed_bytes(&data.descriptors[..desc_len], USB_DESCRIPTORS_LEN);
        w.u16(data.id_vendor);
        w.u16(data.id_product);
        w.fixed_str(&data.manufacturer, BUS_STRING_LEN);
        w.fixed_str(&data.product, BUS_STRING_LEN);
        w.fixed_str(&data.serial, BUS_STRING_LEN);
    }
}

/// FireWire identity of the open device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FireWireData {
    pub id_model: u32,
    pub id_vendor: u32,
    pub guid: u64,
    pub vendor: String,
    pub model: String,
}

impl FireWireData {
    pub(crate) const FIXED_LEN: usize = 1 + 4 + 4 + 8 + 2 * BUS_STRING_LEN;

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Option<Self>, DecodeError> {
        let is_firewire = r.bool()?;
        let data = Self {
            id_model: r.u32()?,
            id_vendor: r.u32()?,
            guid: r.u64()?,
            vendor: r.fixed_str(BUS_STRING_LEN)?,
            model: r.fixed_str(BUS_STRING_LEN)?,
        };
        Ok(is_firewire.then_some(data))
    }

    pub(crate) fn write(data: Option<&Self>, w: &mut Writer) {
        let Some(data) = data else {
            w.zeros(Self::FIXED_LEN);
            return;
        };
        w.bool(true);
        w.u32(data.id_model);
        w.u32(data.id_vendor);
        w.u64(data.guid);
        w.fixed_str(&data.vendor, BUS_STRING_LEN);
        w.fixed_str(&data.model, BUS_STRING_LEN);
    }
}

/// PCMCIA card information structure of the open device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PcmciaData {
    pub cis: Vec<u8>,
}

impl PcmciaData {
    pub(crate) const FIXED_LEN: usize = 1 + 2 + PCMCIA_CIS_LEN;

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Option<Self>, DecodeError> {
        let is_pcmcia = r.bool()?;
        let cis_len = usize::from(r.u16()?);
        let cis = r.take(PCMCIA_CIS_LEN)?;
        Ok(is_pcmcia.then(|| Self {
            cis: cis[..cis_len].to_vec(),
        }))
    }

    pub(crate) fn write(data: Option<&Self>, w: &mut Writer) {
        let Some(data) = data else {
            w.zeros(Self::FIXED_LEN);
            return;
        };
        let cis_len = data.cis.len().min(usize::from(u16::MAX));
        w.bool(true);
        w.u16(cis_len as u16);
        w.fixed_bytes(&data.cis[..cis_len], PCMCIA_CIS_LEN);
    }
}

/// `CommandOsRead` body: a plain read through the host OS rather than a device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OsReadCommand {
    pub offset: u64,
    pub length: u32,
}

impl OsReadCommand {
    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            offset: r.u64()?,
            length: r.u32()?,
        })
    }
}

impl Body for OsReadCommand {
    fn fixed_len(&self) -> usize {
        12
    }

    fn write(&self, w: &mut Writer) {
        w.u64(self.offset);
        w.u32(self.length);
    }
}

/// `ResponseOsRead` body. The data is everything after the fixed fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OsReadResponse {
    pub errno: i32,
    /// Milliseconds the read took on the remote host.
    pub duration: u32,
    pub data: Vec<u8>,
}

impl OsReadResponse {
    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let errno = r.i32()?;
        let duration = r.u32()?;
        Ok(Self {
            errno,
            duration,
            data: r.rest().to_vec(),
        })
    }
}

impl Body for OsReadResponse {
    fn fixed_len(&self) -> usize {
        8
    }

    fn tail_len(&self) -> usize {
        self.data.len()
    }

    fn write(&self, w: &mut Writer) {
        w.i32(self.errno);
        w.u32(self.duration);
        w.bytes(&self.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_is_2052_bytes() {
        let mut w = Writer::default();
        DeviceInfo {
            path: "/dev/sda".into(),
            supported: true,
            ..Default::default()
        }
        .write(&mut w);
        assert_eq!(w.len(), DEVICE_INFO_LEN);
        assert_eq!(DEVICE_INFO_LEN, 2052);
    }

    #[test]
    fn oversized_register_lengths_are_capped() {
        let mut resp = SdhciRegistersResponse::from_registers(&SdhciRegisters {
            is_sdhci: true,
            csd: Some((0..16).collect()),
            ..Default::default()
        });
        resp.csd_len = 32;
        resp.ocr_len = 1000;

        let regs = resp.registers();
        assert_eq!(regs.csd.as_deref(), Some(&(0..16).collect::<Vec<u8>>()[..]));
        assert_eq!(regs.ocr.as_deref().map(<[u8]>::len), Some(OCR_MAX_LEN));
        assert_eq!(regs.cid, None);
        assert_eq!(regs.scr, None);
    }

    #[test]
    fn absent_bus_data_decodes_to_none() {
        let mut w = Writer::default();
        FireWireData::write(None, &mut w);
        assert_eq!(w.len(), FireWireData::FIXED_LEN);
        let bytes = w.into_inner();
        assert_eq!(FireWireData::read(&mut Reader::new(&bytes, "test")).unwrap(), None);
    }

    #[test]
    fn unknown_device_type_codes_map_to_unknown() {
        assert_eq!(DeviceType::from_code(42), DeviceType::Unknown);
        assert_eq!(DeviceType::from_code(DeviceType::Mmc.code()), DeviceType::Mmc);
        assert!(DeviceType::SecureDigital.has_card_registers());
        assert!(!DeviceType::Scsi.has_card_registers());
    }
}
