use std::net::TcpStream;

use aero_devremote_protocol::{Nop, NopReason, Packet, PacketType};
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, DEFAULT_COMMAND_TIMEOUT_SECS};
use crate::error::{RemoteError, Result};
use crate::framing::{read_packet, write_packet, Transport};
use crate::handshake::{handshake, open_stream};
use crate::session::{ServerIdentity, Session};
use crate::uri::RemoteUri;

/// A handshaken connection to a remote device daemon.
///
/// Every operation takes `&mut self` and blocks until its response has been read, so at most
/// one request is ever in flight. After a transport or framing failure the connection is
/// shut down and every later call fails with [`RemoteError::Closed`].
#[derive(Debug)]
pub struct RemoteConnection<S: Transport = TcpStream> {
    stream: S,
    host: String,
    config: ClientConfig,
    session: Session,
    poisoned: bool,
}

impl RemoteConnection<TcpStream> {
    /// Connects to `host` (`name`, `name:port` or `[v6]:port`) and runs the handshake.
    pub fn connect(host: &str, config: ClientConfig) -> Result<Self> {
        let stream = open_stream(host, &config)?;
        Self::handshake(stream, host, config)
    }

    /// Connects to the host named by an `aaru://` or `dic://` URI and opens its device.
    pub fn open_uri(uri: &str, config: ClientConfig) -> Result<Self> {
        let uri: RemoteUri = uri.parse()?;
        let mut conn = Self::connect(&uri.authority(), config)?;
        conn.open(&uri.path)?;
        Ok(conn)
    }
}

impl<S: Transport> RemoteConnection<S> {
    /// Runs the handshake over an already connected stream.
    ///
    /// `host` is only used to build the remote paths reported by
    /// [`list_devices`](Self::list_devices).
    pub fn handshake(mut stream: S, host: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let session = match handshake(&mut stream, &config) {
            Ok(session) => session,
            Err(err) => {
                let _ = stream.shutdown();
                return Err(err);
            }
        };
        Ok(Self {
            stream,
            host: host.into(),
            config,
            session,
            poisoned: false,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn server(&self) -> &ServerIdentity {
        self.session.server()
    }

    pub fn is_closed(&self) -> bool {
        self.poisoned
    }

    /// Sets the default timeout, in seconds, for commands issued with a timeout of `0`.
    pub fn set_command_timeout(&mut self, secs: u32) {
        self.session.set_command_timeout(secs);
    }

    /// Resolves a caller-supplied timeout: `0` falls back to the session default, and to
    /// [`DEFAULT_COMMAND_TIMEOUT_SECS`] when that is unset too.
    pub fn effective_timeout(&self, timeout: u32) -> u32 {
        if timeout != 0 {
            timeout
        } else if self.session.command_timeout() != 0 {
            self.session.command_timeout()
        } else {
            DEFAULT_COMMAND_TIMEOUT_SECS
        }
    }

    /// Sends `request` and reads the packet answering it.
    ///
    /// Returns the decoded packet when it has type `expected`. A `Nop` in its place becomes a
    /// refusal; anything else desynchronizes the stream and is fatal.
    pub(crate) fn round_trip(&mut self, request: &Packet, expected: PacketType) -> Result<Packet> {
        if self.poisoned {
            return Err(RemoteError::Closed);
        }
        let operation = request.packet_type();
        debug!(request = ?operation, "exchange");
        let result = self.round_trip_inner(request, expected);
        self.check(result)
    }

    fn round_trip_inner(&mut self, request: &Packet, expected: PacketType) -> Result<Packet> {
        write_packet(&mut self.stream, request)?;
        let (header, buf) = read_packet(&mut self.stream, &self.config.limits)?;

        match header.packet_type {
            ty if ty == expected => Ok(Packet::decode_with_header(&header, &buf)?),
            PacketType::Nop => match Packet::decode_with_header(&header, &buf)? {
                Packet::Nop(nop) => Err(refusal(request.packet_type(), nop)),
                other => Err(unexpected(expected, &other)),
            },
            received => Err(RemoteError::UnexpectedPacket { expected, received }),
        }
    }

    /// Sends a packet that has no response.
    pub(crate) fn send_only(&mut self, request: &Packet) -> Result<()> {
        if self.poisoned {
            return Err(RemoteError::Closed);
        }
        debug!(request = ?request.packet_type(), "send");
        let result = write_packet(&mut self.stream, request);
        self.check(result)
    }

    /// Poisons and shuts down the connection when `result` is a fatal error.
    pub(crate) fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_fatal() {
                warn!(error = %err, "closing connection after fatal error");
                self.poisoned = true;
                let _ = self.stream.shutdown();
            } else {
                debug!(error = %err, "request failed");
            }
        }
        result
    }

    /// Tells the daemon to close the open device and shuts the connection down.
    pub fn close(mut self) -> Result<()> {
        if self.poisoned {
            return Ok(());
        }
        let sent = self.send_only(&Packet::CommandCloseDevice);
        let _ = self.stream.shutdown();
        info!(host = %self.host, "connection closed");
        sent
    }
}

fn refusal(operation: PacketType, nop: Nop) -> RemoteError {
    warn!(
        ?operation,
        reason = ?nop.reason,
        text = %nop.text,
        errno = nop.errno,
        "server refused request"
    );
    match nop.reason {
        NopReason::NotImplemented => RemoteError::NotImplemented {
            operation,
            text: nop.text,
        },
        reason => RemoteError::Refused {
            operation,
            reason,
            text: nop.text,
            errno: nop.errno,
        },
    }
}

/// The response decoded to a variant other than the one its type promised.
pub(crate) fn unexpected(expected: PacketType, packet: &Packet) -> RemoteError {
    RemoteError::UnexpectedPacket {
        expected,
        received: packet.packet_type(),
    }
}
