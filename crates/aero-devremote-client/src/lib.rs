#![forbid(unsafe_code)]

//! Blocking client for remote device daemons.
//!
//! A [`RemoteConnection`] owns one stream to a daemon that executes raw device commands on the
//! host the device is attached to. The daemon greets first with its Hello, the client answers
//! with its own, and from then on every call is a single request followed by its response:
//!
//! ```text
//! client                         daemon
//!   |  <---------- Hello --------   |
//!   |  ----------- Hello ------->   |
//!   |  ------ CommandOpen ------>   |
//!   |  <------ Nop(OpenOk) ------   |
//!   |  ------ CommandScsi ------>   |
//!   |  <----- ResponseScsi ------   |
//!   |  --- CommandCloseDevice -->   |
//! ```
//!
//! A `Nop` may answer any request; it is reported as [`RemoteError::NotImplemented`] or
//! [`RemoteError::Refused`] and leaves the connection usable. Transport and framing failures
//! close the connection for good.

mod ata;
mod cache;
mod config;
mod connection;
mod device;
mod error;
pub mod framing;
mod handshake;
mod mmc;
mod scsi;
mod session;
mod uri;

pub use aero_devremote_protocol as protocol;

pub use cache::RegisterCache;
pub use config::{ClientConfig, ConfigError, DEFAULT_COMMAND_TIMEOUT_SECS};
pub use connection::RemoteConnection;
pub use error::{FramingError, RemoteError, Result};
pub use framing::Transport;
pub use mmc::{BatchOutcome, FAILED_COMMAND_ERROR_NO};
pub use session::{ServerIdentity, Session};
pub use uri::{RemoteUri, SCHEMES};
