use aero_devremote_protocol::{Hello, MULTI_SDHCI_MIN_PROTOCOL};

use crate::cache::RegisterCache;

/// What the daemon announced about itself in its Hello.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ServerIdentity {
    pub application: String,
    pub version: String,
    pub os: String,
    pub os_version: String,
    pub architecture: String,
    /// Highest protocol version the daemon understands.
    pub max_protocol: u8,
}

impl From<Hello> for ServerIdentity {
    fn from(hello: Hello) -> Self {
        Self {
            application: hello.application,
            version: hello.version,
            os: hello.sysname,
            os_version: hello.release,
            architecture: hello.machine,
            max_protocol: hello.max_protocol,
        }
    }
}

/// Per-connection state established by the handshake.
///
/// The server identity and negotiated version never change after the handshake; the register
/// cache only ever gains entries.
#[derive(Debug, Clone)]
pub struct Session {
    server: ServerIdentity,
    protocol: u8,
    command_timeout: u32,
    pub(crate) cache: RegisterCache,
}

impl Session {
    pub(crate) fn new(server: ServerIdentity, client_max_protocol: u8, command_timeout: u32) -> Self {
        Self {
            protocol: server.max_protocol.min(client_max_protocol),
            server,
            command_timeout,
            cache: RegisterCache::default(),
        }
    }

    pub fn server(&self) -> &ServerIdentity {
        &self.server
    }

    /// The smaller of the two announced maximum protocol versions.
    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn supports_batching(&self) -> bool {
        self.protocol >= MULTI_SDHCI_MIN_PROTOCOL
    }

    /// Default device command timeout, in seconds.
    pub fn command_timeout(&self) -> u32 {
        self.command_timeout
    }

    pub(crate) fn set_command_timeout(&mut self, secs: u32) {
        self.command_timeout = secs;
    }

    pub fn register_cache(&self) -> &RegisterCache {
        &self.cache
    }
}
