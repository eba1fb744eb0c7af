use std::fmt;
use std::str::FromStr;

use crate::error::RemoteError;

/// Schemes that name a device behind a remote daemon. Both mean the same thing.
pub const SCHEMES: [&str; 2] = ["aaru", "dic"];

/// A device on a remote host: `aaru://host[:port]/device-path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUri {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Device path on the remote host. Paths rooted at `dev` are always absolute.
    pub path: String,
}

impl RemoteUri {
    /// `host` or `host:port` as it should be passed to a connect call.
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) if self.host.contains(':') => format!("[{}]:{port}", self.host),
            Some(port) => format!("{}:{port}", self.host),
            None if self.host.contains(':') => format!("[{}]", self.host),
            None => self.host.clone(),
        }
    }

    /// Whether `s` names a remote device rather than a local path.
    pub fn is_remote(s: &str) -> bool {
        s.split_once("://")
            .is_some_and(|(scheme, _)| SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)))
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.authority(), self.path)
    }
}

/// Splits `host`, `host:port` or `[v6]:port`.
pub(crate) fn split_authority(authority: &str) -> Result<(String, Option<u16>), &'static str> {
    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, rest) = rest.split_once(']').ok_or("unterminated IPv6 literal")?;
        match rest {
            "" => (host, None),
            _ => (host, Some(rest.strip_prefix(':').ok_or("junk after IPv6 literal")?)),
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => (host, Some(port)),
            Some(_) => return Err("IPv6 hosts must be bracketed"),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err("missing host");
    }
    let port = match port {
        Some(port) => Some(
            port.parse::<u16>()
                .ok()
                .filter(|&p| p != 0)
                .ok_or("invalid port")?,
        ),
        None => None,
    };
    Ok((host.to_string(), port))
}

impl FromStr for RemoteUri {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| RemoteError::InvalidUri {
            uri: s.to_string(),
            reason,
        };

        let (scheme, rest) = s.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        let scheme = scheme.to_ascii_lowercase();
        if !SCHEMES.contains(&scheme.as_str()) {
            return Err(invalid("unsupported scheme"));
        }

        let (authority, path) = rest
            .split_once('/')
            .ok_or_else(|| invalid("missing device path"))?;
        let (host, port) = split_authority(authority).map_err(invalid)?;
        if path.is_empty() {
            return Err(invalid("missing device path"));
        }

        let path = if path.starts_with("dev") {
            format!("/{path}")
        } else {
            path.to_string()
        };

        Ok(Self {
            scheme,
            host,
            port,
            path,
        })
    }
}
