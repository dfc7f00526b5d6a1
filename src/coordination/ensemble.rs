//! Ensemble connection definitions.
//!
//! Connection strings take the form `<kind>://host:port[,host:port...][/chroot]`,
//! e.g. `zookeeper://zk1:2181,zk2:2181/tideline`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CoordinationError;

/// Kind of coordination ensemble behind a connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsembleKind {
    /// Fixed list of ZooKeeper servers.
    Zookeeper,
    /// Exhibitor-managed ensemble (server list discovered at runtime).
    Exhibitor,
}

impl EnsembleKind {
    fn scheme(self) -> &'static str {
        match self {
            EnsembleKind::Zookeeper => "zookeeper",
            EnsembleKind::Exhibitor => "exhibitor",
        }
    }
}

impl fmt::Display for EnsembleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A single `host:port` pair of the ensemble.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressPort {
    pub address: String,
    pub port: u16,
}

impl AddressPort {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for AddressPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Parsed ensemble connection: kind, server list and chroot path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleConnection {
    pub kind: EnsembleKind,
    pub addresses: Vec<AddressPort>,
    /// Chroot path; `None` roots the session at `/`.
    pub path: Option<String>,
}

impl EnsembleConnection {
    /// Comma-joined `host:port` list as handed to the ensemble client.
    pub fn addresses_joined(&self) -> String {
        self.addresses
            .iter()
            .map(AddressPort::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Chroot normalized to a leading `/`, or empty when there is none.
    pub fn path_prepared(&self) -> String {
        match self.path.as_deref() {
            None | Some("") | Some("/") => String::new(),
            Some(p) if p.starts_with('/') => p.trim_end_matches('/').to_string(),
            Some(p) => format!("/{}", p.trim_end_matches('/')),
        }
    }
}

impl fmt::Display for EnsembleConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}",
            self.kind,
            self.addresses_joined(),
            self.path_prepared()
        )
    }
}

impl FromStr for EnsembleConnection {
    type Err = CoordinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoordinationError::InvalidConnection {
            connection: s.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| invalid("missing '<kind>://' prefix"))?;
        let kind = match scheme {
            "zookeeper" => EnsembleKind::Zookeeper,
            "exhibitor" => EnsembleKind::Exhibitor,
            other => return Err(invalid(&format!("unknown ensemble kind '{}'", other))),
        };

        let (hosts, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(rest[idx..].to_string())),
            None => (rest, None),
        };

        let mut addresses = Vec::new();
        for host in hosts.split(',').filter(|h| !h.is_empty()) {
            let (address, port) = host
                .rsplit_once(':')
                .ok_or_else(|| invalid(&format!("'{}' has no port", host)))?;
            let port = port
                .parse::<u16>()
                .map_err(|_| invalid(&format!("'{}' has an invalid port", host)))?;
            if address.is_empty() {
                return Err(invalid(&format!("'{}' has no address", host)));
            }
            addresses.push(AddressPort::new(address, port));
        }

        Ok(Self {
            kind,
            addresses,
            path,
        })
    }
}
