// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP sessions

use std::{
    net::{SocketAddr, TcpStream},
    time::Duration,
};

use socket2::{Domain, Protocol, Socket, Type};

use super::Session;
use crate::{
    config::{DeviceConfig, SessionConfig, MIN_TIMEOUT},
    unit::Unit,
    Error, Result,
};

/// Establish a direct connection to a Modbus TCP device.
pub fn connect(socket_addr: SocketAddr) -> Result<Session<TcpStream>> {
    connect_unit(socket_addr, Unit::tcp_device(), &SessionConfig::default())
}

/// Connect to `host` and `port` with the given read/write timeout.
///
/// Timeouts below 10 seconds are raised to 10 seconds.
pub fn connect_host(host: &str, port: u16, timeout: Duration) -> Result<Session<TcpStream>> {
    let mut device = DeviceConfig::new(host);
    device.port = port;
    device.session.timeout = timeout;
    device.connect()
}

/// Connect to any kind of Modbus device, probably through a Modbus TCP/RTU
/// gateway that is forwarding messages to/from the corresponding unit.
pub fn connect_unit(
    socket_addr: SocketAddr,
    unit: Unit,
    config: &SessionConfig,
) -> Result<Session<TcpStream>> {
    if config.timeout < MIN_TIMEOUT {
        log::warn!(
            "Raising timeout of {:?} to the minimum of {MIN_TIMEOUT:?}",
            config.timeout
        );
    }
    let timeout = config.effective_timeout();
    log::info!("Connecting to {socket_addr} (unit {unit})");
    let stream = open_stream(socket_addr, timeout, config.nodelay).map_err(Error::ConnectionError)?;
    Ok(Session::attach_unit(stream, unit))
}

fn open_stream(
    socket_addr: SocketAddr,
    timeout: Duration,
    nodelay: bool,
) -> std::io::Result<TcpStream> {
    let socket = Socket::new(
        Domain::for_address(socket_addr),
        Type::STREAM,
        Some(Protocol::TCP),
    )?;
    socket.connect_timeout(&socket_addr.into(), timeout)?;
    socket.set_read_timeout(Some(timeout))?;
    socket.set_write_timeout(Some(timeout))?;
    socket.set_nodelay(nodelay)?;
    socket.set_keepalive(true)?;
    Ok(socket.into())
}
