//! Connection setup: the daemon speaks first with its Hello, we answer with ours.

use std::io::{self, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};

use aero_devremote_protocol::{Hello, Packet, PacketType, PACKET_VERSION};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::RemoteError;
use crate::framing::{read_packet, write_packet, Transport};
use crate::session::{ServerIdentity, Session};
use crate::uri::split_authority;

/// Opens a TCP stream to `host` (`host`, `host:port` or `[v6]:port`) with the configured
/// connect and I/O deadlines.
pub(crate) fn open_stream(host: &str, config: &ClientConfig) -> Result<TcpStream, RemoteError> {
    let connect_err = |source: io::Error| RemoteError::Connect {
        addr: host.to_string(),
        source,
    };

    let (name, port) = split_authority(host).map_err(|reason| RemoteError::InvalidUri {
        uri: host.to_string(),
        reason,
    })?;
    let port = port.unwrap_or(config.port);
    let addrs = (name.as_str(), port).to_socket_addrs().map_err(connect_err)?;

    let mut last_err = None;
    for addr in addrs {
        debug!(%addr, "connecting");
        match TcpStream::connect_timeout(&addr, config.connect_timeout) {
            Ok(stream) => {
                stream.set_nodelay(true).map_err(connect_err)?;
                stream.set_read_timeout(config.io_timeout).map_err(connect_err)?;
                stream.set_write_timeout(config.io_timeout).map_err(connect_err)?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }

    Err(connect_err(last_err.unwrap_or_else(|| {
        io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
    })))
}

fn os_release() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

pub(crate) fn client_hello(config: &ClientConfig) -> Hello {
    Hello {
        application: config.application.clone(),
        version: config.application_version.clone(),
        max_protocol: config.max_protocol,
        sysname: std::env::consts::OS.to_string(),
        release: os_release(),
        machine: std::env::consts::ARCH.to_string(),
    }
}

/// Runs the handshake over an already connected stream.
pub(crate) fn handshake<S: Transport + ?Sized>(
    stream: &mut S,
    config: &ClientConfig,
) -> Result<Session, RemoteError> {
    let (header, buf) = read_packet(stream, &config.limits)?;
    match header.packet_type {
        PacketType::Hello => {}
        PacketType::Nop => {
            let nop = match Packet::decode_with_header(&header, &buf)? {
                Packet::Nop(nop) => nop,
                other => {
                    return Err(RemoteError::UnexpectedPacket {
                        expected: PacketType::Hello,
                        received: other.packet_type(),
                    })
                }
            };
            warn!(reason = ?nop.reason, text = %nop.text, "server refused connection");
            return Err(RemoteError::HandshakeRefused {
                reason: nop.reason,
                text: nop.text,
                errno: nop.errno,
            });
        }
        received => {
            return Err(RemoteError::UnexpectedPacket {
                expected: PacketType::Hello,
                received,
            })
        }
    }

    if header.version != PACKET_VERSION {
        return Err(RemoteError::VersionMismatch {
            found: header.version,
            expected: PACKET_VERSION,
        });
    }

    let server = match Packet::decode_with_header(&header, &buf)? {
        Packet::Hello(hello) => ServerIdentity::from(hello),
        other => {
            return Err(RemoteError::UnexpectedPacket {
                expected: PacketType::Hello,
                received: other.packet_type(),
            })
        }
    };

    write_packet(stream, &Packet::Hello(client_hello(config)))?;

    let session = Session::new(server, config.max_protocol, config.command_timeout);
    info!(
        application = %session.server().application,
        version = %session.server().version,
        os = %session.server().os,
        os_version = %session.server().os_version,
        architecture = %session.server().architecture,
        protocol = session.protocol(),
        "connected to remote device daemon"
    );
    Ok(session)
}
