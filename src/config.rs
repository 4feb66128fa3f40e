// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device and session configuration

use std::{
    net::{SocketAddr, TcpStream, ToSocketAddrs as _},
    time::Duration,
};

use crate::{
    frame::{Address, Quantity, RegisterKind},
    session::{self, Session},
    unit::Unit,
    Error, Result,
};

/// Default Modbus TCP port.
pub const DEFAULT_PORT: u16 = 502;

/// Modbus devices are slow, shorter timeouts are raised to this value.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Socket settings of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Timeout for connecting and for each read and write on the socket.
    pub timeout: Duration,

    /// Disable Nagle's algorithm, requests are small and latency bound.
    pub nodelay: bool,
}

impl SessionConfig {
    /// The timeout actually applied to the socket.
    #[must_use]
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.max(MIN_TIMEOUT)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: MIN_TIMEOUT,
            nodelay: true,
        }
    }
}

/// A contiguous block of registers of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterBlock {
    pub name: String,
    pub kind: RegisterKind,
    pub address: Address,
    pub count: Quantity,
}

/// Where to find a device and which registers to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    pub host: String,
    #[cfg_attr(feature = "serde", serde(default = "default_port"))]
    pub port: u16,
    #[cfg_attr(feature = "serde", serde(default))]
    pub unit: Unit,
    #[cfg_attr(feature = "serde", serde(default))]
    pub session: SessionConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub registers: Vec<RegisterBlock>,
}

#[cfg(feature = "serde")]
const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl DeviceConfig {
    /// A device on the default port, addressed as a directly connected
    /// TCP device.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            unit: Unit::default(),
            session: SessionConfig::default(),
            registers: Vec::new(),
        }
    }

    /// Look up a register block by name.
    #[must_use]
    pub fn register_block(&self, name: &str) -> Option<&RegisterBlock> {
        self.registers.iter().find(|block| block.name == name)
    }

    /// Resolve host and port.
    pub fn socket_addrs(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<_> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(Error::ConnectionError)?
            .collect();
        if addrs.is_empty() {
            return Err(self.unresolved());
        }
        Ok(addrs)
    }

    fn unresolved(&self) -> Error {
        Error::InvalidArgument(format!(
            "host {} did not resolve to any address",
            self.host
        ))
    }

    /// Open a session to the device.
    ///
    /// The addresses of the host are tried in turn, the error of the last
    /// attempt is returned if none of them accepts the connection.
    pub fn connect(&self) -> Result<Session<TcpStream>> {
        let mut last_err = None;
        for socket_addr in self.socket_addrs()? {
            match session::tcp::connect_unit(socket_addr, self.unit, &self.session) {
                Ok(session) => return Ok(session),
                Err(err) => {
                    log::debug!("Failed to connect to {socket_addr}: {err}");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| self.unresolved()))
    }
}
