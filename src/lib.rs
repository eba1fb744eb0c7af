#![forbid(unsafe_code)]

//! Umbrella crate for the remote device command protocol.
//!
//! ```text
//! aero-devremote-protocol   packet types and the wire codec (no I/O)
//!          ^
//! aero-devremote-client     framing, handshake, blocking request/response connection
//!          ^
//! aero-devremote-cli        `aero-devremote` diagnostics binary
//! ```
//!
//! Most users only need [`RemoteConnection`]:
//!
//! ```no_run
//! use aero_devremote::{ClientConfig, RemoteConnection};
//!
//! let mut conn = RemoteConnection::open_uri("aaru://lab-box/dev/sg0", ClientConfig::default())?;
//! let kind = conn.device_type()?;
//! println!("{kind:?}");
//! conn.close()?;
//! # Ok::<(), aero_devremote::RemoteError>(())
//! ```

pub use aero_devremote_client::*;
