#![forbid(unsafe_code)]

mod report;

use aero_devremote_client::protocol::{
    AtaProtocol, AtaRegistersChs, AtaTransferRegister, DeviceType, FireWireData, PcmciaData,
    ScsiDirection, SdhciRegisters, UsbData,
};
use aero_devremote_client::{ClientConfig, RemoteConnection, RemoteError, ServerIdentity};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::report::{parse_identify, parse_inquiry, IDENTIFY_LEN, INQUIRY_LEN};

const ATA_IDENTIFY_DEVICE: u8 = 0xec;
const SCSI_INQUIRY: u8 = 0x12;

#[derive(Debug, Parser)]
#[command(name = "aero-devremote", version, about = "Diagnostics for remote device daemons")]
struct Args {
    /// Port used when a host does not name one.
    ///
    /// Environment variable: `DEVREMOTE_PORT`.
    #[arg(long, global = true, env = "DEVREMOTE_PORT")]
    port: Option<u16>,

    /// Default device command timeout in seconds.
    ///
    /// Environment variable: `DEVREMOTE_COMMAND_TIMEOUT_SECS`.
    #[arg(long, global = true, env = "DEVREMOTE_COMMAND_TIMEOUT_SECS")]
    timeout: Option<u32>,

    /// Highest protocol version to announce.
    ///
    /// Environment variable: `DEVREMOTE_MAX_PROTOCOL`.
    #[arg(long, global = true, env = "DEVREMOTE_MAX_PROTOCOL")]
    max_protocol: Option<u8>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Log filter (tracing-subscriber EnvFilter syntax). Defaults to `RUST_LOG`, then `info`.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect and print what the daemon announces about itself.
    Hello { host: String },
    /// List the devices attached to a remote host.
    List { host: String },
    /// Open a device and print its type and bus identity.
    Probe { uri: String },
    /// Send a SCSI INQUIRY to a device.
    Inquiry { uri: String },
    /// Send an ATA IDENTIFY DEVICE to a device.
    Identify { uri: String },
}

impl Args {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env().context("reading DEVREMOTE_* environment")?;
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(timeout) = self.timeout {
            config.command_timeout = timeout;
        }
        if let Some(max_protocol) = self.max_protocol {
            if max_protocol == 0 {
                bail!("--max-protocol must be at least 1");
            }
            config.max_protocol = max_protocol;
        }
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct HelloReport<'a> {
    host: &'a str,
    server: &'a ServerIdentity,
    protocol: u8,
    daemon_is_root: bool,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    uri: String,
    device_type: DeviceType,
    usb: Option<UsbData>,
    firewire: Option<FireWireData>,
    pcmcia: Option<PcmciaData>,
    card_registers: Option<SdhciRegisters>,
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

/// Treats "not implemented by this daemon" as an absent answer.
fn optional<T>(result: aero_devremote_client::Result<Option<T>>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(value),
        Err(RemoteError::NotImplemented { operation, .. }) => {
            tracing::debug!(?operation, "not supported by daemon");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hello(args: &Args, host: &str) -> Result<()> {
    let mut conn = RemoteConnection::connect(host, args.client_config()?)
        .with_context(|| format!("connecting to {host}"))?;
    let daemon_is_root = conn.am_i_root()?;
    let report = HelloReport {
        host,
        server: conn.server(),
        protocol: conn.session().protocol(),
        daemon_is_root,
    };
    emit(args.json, &report, |r| {
        let s = r.server;
        println!(
            "{} {} on {} {} ({})",
            s.application, s.version, s.os, s.os_version, s.architecture
        );
        println!("protocol version {}", r.protocol);
        println!("daemon running as root: {}", r.daemon_is_root);
    })?;
    conn.close()?;
    Ok(())
}

fn list(args: &Args, host: &str) -> Result<()> {
    let mut conn = RemoteConnection::connect(host, args.client_config()?)
        .with_context(|| format!("connecting to {host}"))?;
    let devices = conn.list_devices()?;
    emit(args.json, &devices, |devices| {
        for dev in devices {
            let support = if dev.supported { "" } else { " (unsupported)" };
            println!("{}  {} {} [{}]{support}", dev.path, dev.vendor, dev.model, dev.bus);
        }
    })?;
    conn.close()?;
    Ok(())
}

fn probe(args: &Args, uri: &str) -> Result<()> {
    let mut conn = RemoteConnection::open_uri(uri, args.client_config()?)
        .with_context(|| format!("opening {uri}"))?;
    let device_type = conn.device_type()?;
    let card_registers = if device_type.has_card_registers() {
        Some(conn.sdhci_registers()?)
    } else {
        None
    };
    let report = ProbeReport {
        uri: uri.to_string(),
        device_type,
        usb: optional(conn.usb_data())?,
        firewire: optional(conn.firewire_data())?,
        pcmcia: optional(conn.pcmcia_data())?,
        card_registers,
    };
    emit(args.json, &report, |r| {
        println!("{}: {:?}", r.uri, r.device_type);
        if let Some(usb) = &r.usb {
            println!(
                "usb {:04x}:{:04x} {} {} serial {}",
                usb.id_vendor, usb.id_product, usb.manufacturer, usb.product, usb.serial
            );
        }
        if let Some(fw) = &r.firewire {
            println!("firewire guid {:016x} {} {}", fw.guid, fw.vendor, fw.model);
        }
        if let Some(pcmcia) = &r.pcmcia {
            println!("pcmcia cis {} bytes", pcmcia.cis.len());
        }
        if let Some(regs) = &r.card_registers {
            for (name, value) in [
                ("cid", &regs.cid),
                ("csd", &regs.csd),
                ("scr", &regs.scr),
                ("ocr", &regs.ocr),
            ] {
                if let Some(value) = value {
                    println!("{name} {}", hex(value));
                }
            }
        }
    })?;
    conn.close()?;
    Ok(())
}

fn inquiry(args: &Args, uri: &str) -> Result<()> {
    let mut conn = RemoteConnection::open_uri(uri, args.client_config()?)
        .with_context(|| format!("opening {uri}"))?;
    let cdb = [SCSI_INQUIRY, 0, 0, 0, INQUIRY_LEN as u8, 0];
    let res = conn.send_scsi_command(&cdb, vec![0; INQUIRY_LEN], ScsiDirection::In, 0)?;
    if res.sense || res.error_no != 0 {
        bail!(
            "INQUIRY failed: errno {}, sense {}",
            res.error_no,
            hex(&res.sense_data)
        );
    }
    let inq = parse_inquiry(&res.buffer)
        .ok_or_else(|| anyhow!("short INQUIRY data ({} bytes)", res.buffer.len()))?;
    emit(args.json, &inq, |inq| {
        println!(
            "{} {} {} (type {:#04x})",
            inq.vendor, inq.product, inq.revision, inq.peripheral_type
        );
    })?;
    conn.close()?;
    Ok(())
}

fn identify(args: &Args, uri: &str) -> Result<()> {
    let mut conn = RemoteConnection::open_uri(uri, args.client_config()?)
        .with_context(|| format!("opening {uri}"))?;
    let registers = AtaRegistersChs {
        sector_count: 1,
        device_head: 0xa0,
        command: ATA_IDENTIFY_DEVICE,
        ..Default::default()
    };
    let res = conn.send_ata_command(
        registers,
        AtaProtocol::PioIn,
        AtaTransferRegister::SectorCount,
        true,
        vec![0; IDENTIFY_LEN],
        0,
    )?;
    if res.sense || res.error_no != 0 {
        bail!(
            "IDENTIFY DEVICE failed: errno {}, status {:#04x}, error {:#04x}",
            res.error_no,
            res.registers.status(),
            res.registers.error()
        );
    }
    let id = parse_identify(&res.buffer)
        .ok_or_else(|| anyhow!("short IDENTIFY data ({} bytes)", res.buffer.len()))?;
    emit(args.json, &id, |id| {
        println!("{} serial {} firmware {}", id.model, id.serial, id.firmware);
        println!("{} sectors{}", id.sectors, if id.lba48 { " (lba48)" } else { "" });
    })?;
    conn.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Hello { host } => hello(&args, host),
        Command::List { host } => list(&args, host),
        Command::Probe { uri } => probe(&args, uri),
        Command::Inquiry { uri } => inquiry(&args, uri),
        Command::Identify { uri } => identify(&args, uri),
    }
}
