use aero_devremote_protocol::{opcode, SdhciRegisters};

/// Card registers fetched once when a card is opened.
///
/// A register is filled at most once; later [`RegisterCache::prime`] calls only fill registers
/// that are still missing. Nothing is ever evicted while the connection lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterCache {
    cid: Option<Vec<u8>>,
    csd: Option<Vec<u8>>,
    ocr: Option<Vec<u8>>,
    scr: Option<Vec<u8>>,
}

impl RegisterCache {
    pub fn prime(&mut self, regs: &SdhciRegisters) {
        fill(&mut self.cid, &regs.cid);
        fill(&mut self.csd, &regs.csd);
        fill(&mut self.ocr, &regs.ocr);
        fill(&mut self.scr, &regs.scr);
    }

    /// Cached contents of the register that MMC/SD command `command` reads, if any.
    pub fn lookup(&self, command: u8) -> Option<&[u8]> {
        let slot = match command {
            opcode::SEND_CID => &self.cid,
            opcode::SEND_CSD => &self.csd,
            opcode::SEND_OP_COND | opcode::SD_SEND_OP_COND => &self.ocr,
            opcode::SD_SEND_SCR => &self.scr,
            _ => return None,
        };
        slot.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.cid.is_none() && self.csd.is_none() && self.ocr.is_none() && self.scr.is_none()
    }
}

fn fill(slot: &mut Option<Vec<u8>>, value: &Option<Vec<u8>>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}
