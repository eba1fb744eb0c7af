use std::cell::RefCell;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;

use aero_devremote_client::protocol::{
    opcode, AtaErrorRegisters, AtaErrorRegistersChs, AtaErrorRegistersLba28,
    AtaErrorRegistersLba48, AtaMode, AtaProtocol, AtaRegistersChs, AtaRegistersLba28,
    AtaRegistersLba48, AtaResponse, AtaTransferRegister, DeviceInfo, DeviceType, Hello,
    ListDevicesResponse, Nop, NopReason, OsReadResponse, Packet, PacketHeader, PacketType,
    ScsiDirection, ScsiResponse, SdhciCommand, SdhciRegisters, SdhciRegistersResponse,
    SdhciResponse,
};
use aero_devremote_client::{
    ClientConfig, FramingError, RemoteConnection, RemoteError, Transport,
    FAILED_COMMAND_ERROR_NO,
};

/// Replays canned daemon output and records everything the client writes.
#[derive(Debug)]
struct Scripted {
    input: Cursor<Vec<u8>>,
    output: Rc<RefCell<Vec<u8>>>,
    shut_down: Rc<RefCell<bool>>,
}

impl Read for Scripted {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for Scripted {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for Scripted {
    fn shutdown(&mut self) -> io::Result<()> {
        *self.shut_down.borrow_mut() = true;
        Ok(())
    }
}

struct Wire {
    output: Rc<RefCell<Vec<u8>>>,
    shut_down: Rc<RefCell<bool>>,
}

impl Wire {
    /// Every packet the client has written so far.
    fn sent(&self) -> Vec<Packet> {
        let bytes = self.output.borrow();
        let mut packets = Vec::new();
        let mut rest = &bytes[..];
        while !rest.is_empty() {
            let header = PacketHeader::decode(rest).unwrap();
            let (packet, tail) = rest.split_at(header.length as usize);
            packets.push(Packet::decode(packet).unwrap());
            rest = tail;
        }
        packets
    }

    fn is_shut_down(&self) -> bool {
        *self.shut_down.borrow()
    }
}

fn server_hello(max_protocol: u8) -> Packet {
    Packet::Hello(Hello {
        application: "fake-daemon".into(),
        version: "9.9".into(),
        max_protocol,
        sysname: "Linux".into(),
        release: "6.1.0".into(),
        machine: "x86_64".into(),
    })
}

fn script(packets: &[Packet]) -> (Scripted, Wire) {
    let mut input = Vec::new();
    for packet in packets {
        input.extend(packet.encode().unwrap());
    }
    let output = Rc::new(RefCell::new(Vec::new()));
    let shut_down = Rc::new(RefCell::new(false));
    let stream = Scripted {
        input: Cursor::new(input),
        output: Rc::clone(&output),
        shut_down: Rc::clone(&shut_down),
    };
    (stream, Wire { output, shut_down })
}

fn connect_with(
    config: ClientConfig,
    server_protocol: u8,
    responses: &[Packet],
) -> (RemoteConnection<Scripted>, Wire) {
    let mut packets = vec![server_hello(server_protocol)];
    packets.extend_from_slice(responses);
    let (stream, wire) = script(&packets);
    let conn = RemoteConnection::handshake(stream, "lab-box", config).unwrap();
    (conn, wire)
}

fn connect(responses: &[Packet]) -> (RemoteConnection<Scripted>, Wire) {
    connect_with(ClientConfig::default(), 1, responses)
}

fn sdhci_ok(duration: u32, error_no: u32, buffer: Vec<u8>) -> Packet {
    Packet::ResponseSdhci(SdhciResponse {
        buffer,
        response: [0x900, 0, 0, 0],
        duration,
        sense: error_no != 0,
        error_no,
    })
}

fn read_block(command: u8) -> SdhciCommand {
    SdhciCommand {
        command,
        block_size: 512,
        blocks: 1,
        buffer: vec![0; 512],
        ..Default::default()
    }
}

#[test]
fn handshake_answers_with_client_hello() {
    let (conn, wire) = connect(&[]);
    assert_eq!(conn.server().application, "fake-daemon");
    assert_eq!(conn.server().os, "Linux");
    assert_eq!(conn.server().architecture, "x86_64");
    assert_eq!(conn.session().protocol(), 1);

    let sent = wire.sent();
    assert_eq!(sent.len(), 1);
    let Packet::Hello(hello) = &sent[0] else {
        panic!("expected a Hello, got {:?}", sent[0].packet_type());
    };
    assert_eq!(hello.application, "aero-devremote");
    assert_eq!(hello.max_protocol, 1);
    assert_eq!(hello.machine, std::env::consts::ARCH);
}

#[test]
fn nop_instead_of_hello_is_a_refusal() {
    let (stream, wire) = script(&[Packet::Nop(Nop::new(
        NopReason::NotImplemented,
        "go away",
        0,
    ))]);
    let err = RemoteConnection::handshake(stream, "lab-box", ClientConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        RemoteError::HandshakeRefused {
            reason: NopReason::NotImplemented,
            ref text,
            ..
        } if text == "go away"
    ));
    assert!(wire.sent().is_empty());
    assert!(wire.is_shut_down());
}

#[test]
fn hello_with_other_packet_version_is_rejected() {
    let (mut stream, wire) = script(&[]);
    stream.input = Cursor::new(server_hello(1).encode_with_version(2).unwrap());
    let err = RemoteConnection::handshake(stream, "lab-box", ClientConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        RemoteError::VersionMismatch {
            found: 2,
            expected: 1
        }
    ));
    assert!(wire.sent().is_empty());
}

#[test]
fn first_packet_other_than_hello_is_a_protocol_mismatch() {
    let (stream, _wire) = script(&[Packet::ResponseAmIRoot(true)]);
    let err = RemoteConnection::handshake(stream, "lab-box", ClientConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        RemoteError::UnexpectedPacket {
            expected: PacketType::Hello,
            received: PacketType::ResponseAmIRoot
        }
    ));
}

#[test]
fn zero_timeout_is_replaced_by_the_session_default() {
    let scsi = Packet::ResponseScsi(ScsiResponse::default());
    let (mut conn, wire) = connect(&[scsi.clone(), scsi.clone(), scsi]);

    conn.send_scsi_command(&[0x00; 6], Vec::new(), ScsiDirection::None, 0)
        .unwrap();
    conn.set_command_timeout(42);
    conn.send_scsi_command(&[0x00; 6], Vec::new(), ScsiDirection::None, 0)
        .unwrap();
    conn.send_scsi_command(&[0x00; 6], Vec::new(), ScsiDirection::None, 7)
        .unwrap();

    let timeouts: Vec<u32> = wire.sent()[1..]
        .iter()
        .map(|packet| match packet {
            Packet::CommandScsi(cmd) => cmd.timeout,
            other => panic!("unexpected {:?}", other.packet_type()),
        })
        .collect();
    assert_eq!(timeouts, [15, 42, 7]);
}

#[test]
fn not_implemented_nop_leaves_connection_usable() {
    let (mut conn, _wire) = connect(&[
        Packet::Nop(Nop::new(NopReason::NotImplemented, "no usb here", 0)),
        Packet::ResponseAmIRoot(true),
    ]);

    let err = conn.usb_data().unwrap_err();
    assert!(matches!(
        err,
        RemoteError::NotImplemented {
            operation: PacketType::CommandGetUsbData,
            ..
        }
    ));
    assert!(!err.is_fatal());
    assert!(conn.am_i_root().unwrap());
}

#[test]
fn other_nop_reasons_carry_the_peer_errno() {
    let (mut conn, _wire) = connect(&[Packet::Nop(Nop::new(
        NopReason::OutOfOrder,
        "device not open",
        19,
    ))]);
    let err = conn.device_type().unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Refused {
            reason: NopReason::OutOfOrder,
            errno: 19,
            ..
        }
    ));
    assert_eq!(err.errno(), Some(19));
}

#[test]
fn unexpected_response_closes_the_connection() {
    let (mut conn, wire) = connect(&[
        Packet::ResponseGetType(DeviceType::Scsi),
        Packet::ResponseAmIRoot(true),
    ]);

    let err = conn.am_i_root().unwrap_err();
    assert!(matches!(
        err,
        RemoteError::UnexpectedPacket {
            expected: PacketType::ResponseAmIRoot,
            received: PacketType::ResponseGetType
        }
    ));
    assert!(conn.is_closed());
    assert!(wire.is_shut_down());

    assert!(matches!(conn.am_i_root(), Err(RemoteError::Closed)));
    // The second call never reached the wire.
    assert_eq!(wire.sent().len(), 2);
}

#[test]
fn truncated_response_is_a_fatal_short_read() {
    let (mut conn, _wire) = connect(&[]);
    let err = conn.am_i_root().unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Framing(FramingError::ShortRead { expected: 16, got: 0 })
    ));
    assert!(conn.is_closed());
}

#[test]
fn responses_arrive_in_request_order() {
    let (mut conn, wire) = connect(&[
        Packet::ResponseAmIRoot(false),
        Packet::ResponseGetType(DeviceType::Ata),
        Packet::ResponseGetUsbData(None),
        Packet::ResponseGetFireWireData(None),
        Packet::ResponseGetPcmciaData(None),
    ]);

    assert!(!conn.am_i_root().unwrap());
    assert_eq!(conn.device_type().unwrap(), DeviceType::Ata);
    assert_eq!(conn.usb_data().unwrap(), None);
    assert_eq!(conn.firewire_data().unwrap(), None);
    assert_eq!(conn.pcmcia_data().unwrap(), None);

    let types: Vec<PacketType> = wire.sent().iter().map(Packet::packet_type).collect();
    assert_eq!(
        types,
        [
            PacketType::Hello,
            PacketType::CommandAmIRoot,
            PacketType::CommandGetType,
            PacketType::CommandGetUsbData,
            PacketType::CommandGetFireWireData,
            PacketType::CommandGetPcmciaData,
        ]
    );
}

#[test]
fn listed_paths_are_rewritten_to_remote_uris() {
    let (mut conn, _wire) = connect(&[Packet::ResponseListDevices(ListDevicesResponse {
        devices: vec![
            DeviceInfo {
                path: "/dev/sda".into(),
                vendor: "ATA".into(),
                model: "Disk".into(),
                bus: "SATA".into(),
                supported: true,
                ..Default::default()
            },
            DeviceInfo {
                path: "/dev/sr0".into(),
                ..Default::default()
            },
        ],
    })]);

    let devices = conn.list_devices().unwrap();
    let paths: Vec<&str> = devices.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, ["aaru://lab-box//dev/sda", "aaru://lab-box//dev/sr0"]);
    assert!(devices[0].supported);

    let uri: aero_devremote_client::RemoteUri = devices[0].path.parse().unwrap();
    assert_eq!(uri.path, "/dev/sda");
}

#[test]
fn open_failure_is_a_refusal_with_errno() {
    let (mut conn, _wire) = connect(&[Packet::Nop(Nop::new(
        NopReason::OpenError,
        "permission denied",
        13,
    ))]);
    let err = conn.open("/dev/sda").unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Refused {
            operation: PacketType::CommandOpen,
            reason: NopReason::OpenError,
            errno: 13,
            ..
        }
    ));
    assert!(!conn.is_closed());
}

#[test]
fn overlong_open_path_is_rejected_locally() {
    let (mut conn, wire) = connect(&[]);
    let err = conn.open(&"a".repeat(4096)).unwrap_err();
    assert!(matches!(err, RemoteError::InvalidArgument(_)));
    assert_eq!(wire.sent().len(), 1);
}

#[test]
fn opening_a_card_caches_its_registers() {
    let cid: Vec<u8> = (0..16).collect();
    let csd = vec![0x40; 16];
    let (mut conn, wire) = connect(&[
        Packet::Nop(Nop::new(NopReason::OpenOk, "", 0)),
        Packet::ResponseGetType(DeviceType::SecureDigital),
        Packet::ResponseGetSdhciRegisters(SdhciRegistersResponse::from_registers(
            &SdhciRegisters {
                is_sdhci: true,
                cid: Some(cid.clone()),
                csd: Some(csd.clone()),
                ..Default::default()
            },
        )),
        sdhci_ok(4, 0, vec![0xee; 512]),
    ]);

    conn.open("/dev/mmcblk0").unwrap();
    let after_open = wire.sent().len();
    assert_eq!(after_open, 4);

    for _ in 0..3 {
        let res = conn.send_mmc_command(read_block(opcode::SEND_CID)).unwrap();
        assert_eq!(res.buffer, cid);
        assert_eq!(res.duration, 0);
        assert_eq!(res.response, [0; 4]);
        assert!(!res.sense);
    }
    let res = conn.send_mmc_command(read_block(opcode::SEND_CSD)).unwrap();
    assert_eq!(res.buffer, csd);
    assert_eq!(wire.sent().len(), after_open);

    // Registers the daemon did not report are still read from the card.
    let res = conn.send_mmc_command(read_block(opcode::SD_SEND_SCR)).unwrap();
    assert_eq!(res.duration, 4);
    assert_eq!(wire.sent().len(), after_open + 1);
}

#[test]
fn opening_a_disk_does_not_touch_card_registers() {
    let (mut conn, wire) = connect(&[
        Packet::Nop(Nop::new(NopReason::OpenOk, "", 0)),
        Packet::ResponseGetType(DeviceType::Ata),
    ]);
    conn.open("/dev/sda").unwrap();
    assert!(conn.session().register_cache().is_empty());
    assert_eq!(wire.sent().len(), 3);
}

#[test]
fn oversized_register_lengths_are_capped() {
    let mut wire_regs = SdhciRegistersResponse::from_registers(&SdhciRegisters {
        is_sdhci: true,
        csd: Some(vec![7; 16]),
        ..Default::default()
    });
    wire_regs.csd_len = 32;
    let (mut conn, _wire) = connect(&[Packet::ResponseGetSdhciRegisters(wire_regs)]);

    let regs = conn.sdhci_registers().unwrap();
    assert_eq!(regs.csd.map(|csd| csd.len()), Some(16));
    assert_eq!(regs.cid, None);
}

#[test]
fn batch_falls_back_to_single_commands_and_keeps_going() {
    let (mut conn, wire) = connect(&[
        sdhci_ok(2, 0, vec![1; 512]),
        Packet::Nop(Nop::new(NopReason::NotRecognized, "bad command", 5)),
        sdhci_ok(3, 9, vec![2; 512]),
    ]);

    let outcome = conn
        .send_multiple_mmc_commands(vec![
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
        ])
        .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.duration, 5);
    assert!(outcome.sense);
    assert_eq!(outcome.error_no, 5);
    assert!(outcome.results[1].sense);
    assert_eq!(outcome.results[2].buffer, vec![2; 512]);

    let sent = wire.sent();
    assert_eq!(sent.len(), 4);
    assert!(sent[1..]
        .iter()
        .all(|p| p.packet_type() == PacketType::CommandSdhci));
}

#[test]
fn batch_uses_one_packet_when_both_sides_support_it() {
    let config = ClientConfig {
        max_protocol: 2,
        ..Default::default()
    };
    let results = vec![
        SdhciResponse {
            duration: 2,
            ..Default::default()
        },
        SdhciResponse {
            duration: 3,
            sense: true,
            error_no: 9,
            ..Default::default()
        },
    ];
    let (mut conn, wire) = connect_with(config, 2, &[Packet::ResponseMultiSdhci(results)]);
    assert!(conn.session().supports_batching());

    let outcome = conn
        .send_multiple_mmc_commands(vec![
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
        ])
        .unwrap();
    assert_eq!(outcome.duration, 5);
    assert!(outcome.sense);
    assert_eq!(outcome.error_no, 9);

    let sent = wire.sent();
    assert_eq!(sent.len(), 2);
    let Packet::CommandMultiSdhci(cmds) = &sent[1] else {
        panic!("expected a batched command");
    };
    assert_eq!(cmds.len(), 2);
    assert!(cmds.iter().all(|c| c.timeout == 15));
}

#[test]
fn batch_result_count_must_match() {
    let config = ClientConfig {
        max_protocol: 2,
        ..Default::default()
    };
    let (mut conn, wire) = connect_with(
        config,
        2,
        &[Packet::ResponseMultiSdhci(vec![SdhciResponse::default()])],
    );
    let err = conn
        .send_multiple_mmc_commands(vec![
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
        ])
        .unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Framing(FramingError::EntryCountMismatch {
            expected: 2,
            found: 1
        })
    ));
    assert!(conn.is_closed());
    assert!(wire.is_shut_down());

    // Nothing more goes out on the desynchronized stream.
    assert!(matches!(conn.am_i_root(), Err(RemoteError::Closed)));
    assert_eq!(wire.sent().len(), 2);
}

#[test]
fn batch_fallback_records_unimplemented_commands_and_keeps_going() {
    let (mut conn, wire) = connect(&[
        sdhci_ok(2, 0, vec![1; 512]),
        Packet::Nop(Nop::new(NopReason::NotImplemented, "no sdhci", 0)),
        sdhci_ok(3, 0, vec![2; 512]),
    ]);

    let outcome = conn
        .send_multiple_mmc_commands(vec![
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
        ])
        .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.results[0].buffer, vec![1; 512]);
    assert!(outcome.results[1].sense);
    assert_eq!(outcome.results[1].error_no, FAILED_COMMAND_ERROR_NO);
    assert_eq!(outcome.results[2].buffer, vec![2; 512]);
    assert_eq!(outcome.duration, 5);
    assert!(outcome.sense);
    assert_eq!(outcome.error_no, FAILED_COMMAND_ERROR_NO);
    assert!(!conn.is_closed());
    assert_eq!(wire.sent().len(), 4);
}

#[test]
fn refusal_without_errno_still_fails_the_batch() {
    let (mut conn, _wire) = connect(&[
        Packet::Nop(Nop::new(NopReason::NotRecognized, "", 0)),
        sdhci_ok(1, 0, vec![0; 512]),
    ]);

    let outcome = conn
        .send_multiple_mmc_commands(vec![
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
        ])
        .unwrap();
    assert!(outcome.sense);
    assert_eq!(outcome.results[0].error_no, FAILED_COMMAND_ERROR_NO);
    assert_eq!(outcome.error_no, FAILED_COMMAND_ERROR_NO);
    assert_eq!(outcome.duration, 1);
}

#[test]
fn batch_fallback_stops_when_the_connection_dies() {
    let (mut conn, wire) = connect(&[sdhci_ok(2, 0, vec![1; 512])]);

    let err = conn
        .send_multiple_mmc_commands(vec![
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
            read_block(opcode::READ_SINGLE_BLOCK),
        ])
        .unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Framing(FramingError::ShortRead { got: 0, .. })
    ));
    assert!(conn.is_closed());
    // Hello plus the two commands sent before the stream ran dry.
    assert_eq!(wire.sent().len(), 3);
}

#[test]
fn cached_registers_are_dropped_with_the_connection() {
    let cid: Vec<u8> = (0..16).collect();
    let (mut conn, wire) = connect(&[
        Packet::Nop(Nop::new(NopReason::OpenOk, "", 0)),
        Packet::ResponseGetType(DeviceType::Mmc),
        Packet::ResponseGetSdhciRegisters(SdhciRegistersResponse::from_registers(
            &SdhciRegisters {
                is_sdhci: false,
                cid: Some(cid.clone()),
                ..Default::default()
            },
        )),
    ]);
    conn.open("/dev/mmcblk0").unwrap();
    let res = conn.send_mmc_command(read_block(opcode::SEND_CID)).unwrap();
    assert_eq!(res.buffer, cid);

    // The script is exhausted, so the next exchange is a fatal short read.
    assert!(conn.am_i_root().unwrap_err().is_fatal());
    assert!(conn.is_closed());

    let err = conn.send_mmc_command(read_block(opcode::SEND_CID)).unwrap_err();
    assert!(matches!(err, RemoteError::Closed));
    assert!(matches!(
        conn.send_multiple_mmc_commands(vec![read_block(opcode::SEND_CID)]),
        Err(RemoteError::Closed)
    ));
    assert!(wire.is_shut_down());
}

fn identify_response(registers: AtaErrorRegisters) -> Packet {
    Packet::ResponseAta(AtaResponse {
        registers,
        buffer: vec![0x5a; 512],
        duration: 6,
        sense: false,
        error_no: 0,
    })
}

#[test]
fn chs_ata_command_is_answered_with_chs_registers() {
    let (mut conn, wire) = connect(&[identify_response(AtaErrorRegisters::Chs(
        AtaErrorRegistersChs {
            status: 0x50,
            ..Default::default()
        },
    ))]);

    let res = conn
        .send_ata_command(
            AtaRegistersChs {
                sector_count: 1,
                device_head: 0xa0,
                command: 0xec,
                ..Default::default()
            },
            AtaProtocol::PioIn,
            AtaTransferRegister::SectorCount,
            true,
            vec![0; 512],
            0,
        )
        .unwrap();
    assert_eq!(res.registers.mode(), AtaMode::Chs);
    assert_eq!(res.registers.status(), 0x50);

    assert_eq!(wire.sent()[1].packet_type(), PacketType::CommandAtaChs);
}

#[test]
fn lba28_ata_command_is_answered_with_lba28_registers() {
    let (mut conn, wire) = connect(&[identify_response(AtaErrorRegisters::Lba28(
        AtaErrorRegistersLba28 {
            status: 0x50,
            lba_low: 0x12,
            ..Default::default()
        },
    ))]);

    let res = conn
        .send_ata_command(
            AtaRegistersLba28 {
                sector_count: 1,
                lba_low: 0x12,
                device_head: 0x40,
                command: 0x20,
                ..Default::default()
            },
            AtaProtocol::PioIn,
            AtaTransferRegister::SectorCount,
            true,
            vec![0; 512],
            0,
        )
        .unwrap();
    assert_eq!(res.registers.mode(), AtaMode::Lba28);
    assert_eq!(res.registers.status(), 0x50);
    assert_eq!(res.buffer, vec![0x5a; 512]);
    assert_eq!(res.duration, 6);

    let Packet::CommandAta(cmd) = &wire.sent()[1] else {
        panic!("expected an ata command");
    };
    assert_eq!(cmd.mode(), AtaMode::Lba28);
    assert_eq!(cmd.timeout, 15);
}

#[test]
fn lba48_ata_command_is_answered_with_lba48_registers() {
    let (mut conn, wire) = connect(&[identify_response(AtaErrorRegisters::Lba48(
        AtaErrorRegistersLba48 {
            status: 0x51,
            error: 0x04,
            lba_high: 0xbeef,
            ..Default::default()
        },
    ))]);

    let res = conn
        .send_ata_command(
            AtaRegistersLba48 {
                sector_count: 1,
                lba_high: 0xbeef,
                device_head: 0x40,
                command: 0x24,
                ..Default::default()
            },
            AtaProtocol::PioIn,
            AtaTransferRegister::SectorCount,
            true,
            vec![0; 512],
            30,
        )
        .unwrap();
    let AtaErrorRegisters::Lba48(regs) = res.registers else {
        panic!("expected lba48 error registers");
    };
    assert_eq!(regs.lba_high, 0xbeef);
    assert_eq!(res.registers.error(), 0x04);

    let Packet::CommandAta(cmd) = &wire.sent()[1] else {
        panic!("expected an ata command");
    };
    assert_eq!(cmd.mode(), AtaMode::Lba48);
    assert_eq!(cmd.timeout, 30);
}

#[test]
fn ata_response_in_another_mode_is_fatal() {
    let (mut conn, _wire) = connect(&[identify_response(AtaErrorRegisters::zeroed(
        AtaMode::Chs,
    ))]);

    let err = conn
        .send_ata_command(
            AtaRegistersLba48::default(),
            AtaProtocol::NonData,
            AtaTransferRegister::NoTransfer,
            false,
            Vec::new(),
            0,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RemoteError::UnexpectedPacket {
            expected: PacketType::ResponseAtaLba48,
            received: PacketType::ResponseAtaChs
        }
    ));
    assert!(conn.is_closed());
}

#[test]
fn os_read_never_returns_more_than_requested() {
    let (mut conn, wire) = connect(&[Packet::ResponseOsRead(OsReadResponse {
        errno: 0,
        duration: 1,
        data: vec![0xab; 600],
    })]);
    let res = conn.os_read(4096, 512).unwrap();
    assert_eq!(res.data.len(), 512);
    assert_eq!(res.errno, 0);

    let Packet::CommandOsRead(cmd) = &wire.sent()[1] else {
        panic!("expected an os read");
    };
    assert_eq!((cmd.offset, cmd.length), (4096, 512));
}

#[test]
fn close_sends_close_device_and_shuts_down() {
    let (conn, wire) = connect(&[]);
    conn.close().unwrap();
    let sent = wire.sent();
    assert_eq!(sent.last(), Some(&Packet::CommandCloseDevice));
    assert!(wire.is_shut_down());
}
