#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use aero_devremote::framing::{read_packet, write_packet};
use aero_devremote::protocol::{Hello, Limits, Nop, NopReason, Packet, SdhciResponse};
use aero_devremote::{ClientConfig, FramingError, RemoteError};
use anyhow::{anyhow, bail, Context, Result};

/// Routes client logs through the test harness so they show up for failing tests only.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Daemon side of one accepted connection.
pub struct Peer {
    stream: TcpStream,
    received: Vec<Packet>,
}

impl Peer {
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        write_packet(&mut self.stream, packet).context("daemon write")
    }

    /// Sends raw bytes, for framing the codec would refuse to produce.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        use std::io::Write;
        self.stream.write_all(bytes).context("daemon raw write")
    }

    pub fn recv(&mut self) -> Result<Packet> {
        let (_, buf) = read_packet(&mut self.stream, &Limits::default()).context("daemon read")?;
        let packet = Packet::decode(&buf).context("daemon decode")?;
        self.received.push(packet.clone());
        Ok(packet)
    }

    /// Sends the daemon's Hello and waits for the client's.
    pub fn greet(&mut self, max_protocol: u8) -> Result<Hello> {
        self.send(&daemon_hello(max_protocol))?;
        match self.recv()? {
            Packet::Hello(hello) => Ok(hello),
            other => bail!("expected client hello, got {:?}", other.packet_type()),
        }
    }

    /// Answers each incoming request with the next canned response.
    pub fn serve(&mut self, responses: &[Packet]) -> Result<()> {
        for response in responses {
            self.recv()?;
            self.send(response)?;
        }
        Ok(())
    }

    /// Records requests until the client hangs up.
    pub fn drain(&mut self) -> Result<()> {
        loop {
            match self.recv() {
                Ok(_) => {}
                Err(err) => {
                    let hung_up = matches!(
                        err.downcast_ref::<RemoteError>(),
                        Some(RemoteError::Framing(FramingError::ShortRead { got: 0, .. }))
                    );
                    return if hung_up { Ok(()) } else { Err(err) };
                }
            }
        }
    }
}

/// A single-connection daemon running a script on its own thread.
pub struct FakeDaemon {
    addr: SocketAddr,
    handle: Option<JoinHandle<Result<Vec<Packet>>>>,
}

impl FakeDaemon {
    pub fn spawn<F>(script: F) -> Result<Self>
    where
        F: FnOnce(&mut Peer) -> Result<()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").context("bind fake daemon")?;
        let addr = listener.local_addr()?;
        let handle = std::thread::spawn(move || -> Result<Vec<Packet>> {
            let (stream, _) = listener.accept().context("accept")?;
            stream.set_read_timeout(Some(Duration::from_secs(10)))?;
            let mut peer = Peer {
                stream,
                received: Vec::new(),
            };
            script(&mut peer)?;
            Ok(peer.received)
        });
        Ok(Self {
            addr,
            handle: Some(handle),
        })
    }

    /// `host:port` suitable for [`aero_devremote::RemoteConnection::connect`].
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Waits for the script to finish and returns every packet the daemon received.
    pub fn finish(mut self) -> Result<Vec<Packet>> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("fake daemon already joined"))?;
        handle
            .join()
            .map_err(|_| anyhow!("fake daemon thread panicked"))?
    }
}

pub fn daemon_hello(max_protocol: u8) -> Packet {
    Packet::Hello(Hello {
        application: "fake-daemon".into(),
        version: "9.9".into(),
        max_protocol,
        sysname: "Linux".into(),
        release: "6.1.0".into(),
        machine: "x86_64".into(),
    })
}

pub fn nop(reason: NopReason, errno: i32) -> Packet {
    Packet::Nop(Nop::new(reason, format!("{reason:?}"), errno))
}

pub fn sdhci_result(duration: u32, error_no: u32) -> SdhciResponse {
    SdhciResponse {
        buffer: vec![0xa5; 8],
        response: [0x900, 0, 0, 0],
        duration,
        sense: error_no != 0,
        error_no,
    }
}

pub fn config(max_protocol: u8) -> ClientConfig {
    ClientConfig {
        max_protocol,
        io_timeout: Some(Duration::from_secs(10)),
        ..ClientConfig::default()
    }
}
