//! Packet framing over a byte stream.
//!
//! Reads pull the fixed header first, validate it, and only then read the remainder of the
//! declared length into the same buffer, so the returned bytes always hold one whole packet,
//! header included. This relies on there being at most one request in flight: the next bytes
//! on the stream are always the start of the response to the last request.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

use aero_devremote_protocol::{Limits, Packet, PacketHeader, HEADER_LEN};
use tracing::trace;

use crate::error::{FramingError, RemoteError};

/// A connected, ordered byte stream to a remote device daemon.
pub trait Transport: Read + Write {
    /// Tears down both directions of the stream. The default does nothing.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn shutdown(&mut self) -> io::Result<()> {
        (**self).shutdown()
    }
}

/// Reads into `buf` until it is full or the stream ends, returning how many bytes arrived.
fn fill<R: Read + ?Sized>(stream: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Reads one whole packet. The returned buffer starts with the header and is exactly
/// `header.length` bytes long.
pub fn read_packet<R: Read + ?Sized>(
    stream: &mut R,
    limits: &Limits,
) -> Result<(PacketHeader, Vec<u8>), RemoteError> {
    let mut buf = vec![0u8; HEADER_LEN];
    let got = fill(stream, &mut buf)?;
    if got < HEADER_LEN {
        return Err(FramingError::ShortRead {
            expected: HEADER_LEN,
            got,
        }
        .into());
    }

    let header = PacketHeader::decode(&buf)?;
    let len = header.length as usize;
    if len > limits.max_packet_len {
        return Err(FramingError::PacketTooLarge {
            len,
            max: limits.max_packet_len,
        }
        .into());
    }

    buf.resize(len, 0);
    let got = HEADER_LEN + fill(stream, &mut buf[HEADER_LEN..])?;
    if got < len {
        return Err(FramingError::ShortRead { expected: len, got }.into());
    }

    trace!(packet_type = ?header.packet_type, len, "read packet");
    Ok((header, buf))
}

/// Serializes and writes one whole packet.
///
/// Encoding happens before anything touches the stream, so an encoding failure leaves the
/// connection usable.
pub fn write_packet<W: Write + ?Sized>(stream: &mut W, packet: &Packet) -> Result<(), RemoteError> {
    let bytes = packet.encode()?;
    stream.write_all(&bytes)?;
    stream.flush()?;
    trace!(packet_type = ?packet.packet_type(), len = bytes.len(), "wrote packet");
    Ok(())
}
