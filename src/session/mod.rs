// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blocking request/response exchange over a stream transport
//!
//! A [`Session`] owns one connection to one device and keeps at most
//! one request in flight. Any timeout, short read or header mismatch
//! tears the connection down, all further calls fail with
//! [`Error::SessionClosed`]. There is no automatic reconnect.

pub mod tcp;

use std::{
    fmt,
    io::{self, Read, Write},
    net::{Shutdown, TcpStream},
};

use bytes::{Bytes, BytesMut};

use crate::{
    codec::{self, ResponseLayout},
    frame::{
        tcp::{
            Frame, Header, TransactionId, HEADER_SIZE, MAX_ADU_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_ID,
        },
        Exception, ExceptionResponse,
    },
    unit::{Unit, UnitContext},
    Error, Result,
};

const INITIAL_TRANSACTION_ID: TransactionId = 0;

/// A byte stream that carries Modbus TCP frames.
pub trait Transport: Read + Write {
    /// Release the underlying connection.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Connection state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
}

/// A Modbus TCP client session.
pub struct Session<T> {
    transport: Option<T>,
    unit: Unit,
    transaction_id: TransactionId,
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("unit", &self.unit)
            .field("transaction_id", &self.transaction_id)
            .finish()
    }
}

impl<T> Session<T> {
    /// The connection state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.transport.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// The unit addressed by the [`Reader`](crate::client::Reader) and
    /// [`Writer`](crate::client::Writer) shortcuts.
    #[must_use]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// The transaction id that will be assigned to the next request.
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    fn next_transaction_id(&mut self) -> TransactionId {
        let transaction_id = self.transaction_id;
        self.transaction_id = transaction_id.wrapping_add(1);
        transaction_id
    }
}

impl<T> UnitContext for Session<T> {
    fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }
}

impl<T: Transport> Session<T> {
    /// Attach a session to an already connected transport.
    ///
    /// Timeouts must be configured on the transport by the caller.
    pub fn attach(transport: T) -> Self {
        Self::attach_unit(transport, Unit::tcp_device())
    }

    /// Attach a session to an already connected transport that addresses
    /// the given unit by default.
    pub fn attach_unit(transport: T, unit: Unit) -> Self {
        Self {
            transport: Some(transport),
            unit,
            transaction_id: INITIAL_TRANSACTION_ID,
        }
    }

    /// Close the connection.
    ///
    /// Subsequent operations fail with [`Error::SessionClosed`].
    /// Disconnecting a session that is already closed has no effect.
    pub fn disconnect(&mut self) -> Result<()> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        log::info!("Disconnecting session");
        transport.close().map_err(Error::ConnectionError)
    }

    fn teardown(&mut self, err: &Error) {
        if let Some(mut transport) = self.transport.take() {
            log::warn!("Disconnecting session after failed exchange: {err}");
            if let Err(err) = transport.close() {
                log::debug!("Failed to close transport: {err}");
            }
        }
    }

    /// Send one request frame and wait for its response.
    ///
    /// The transaction id of `frame` is replaced by the next id of the
    /// session. The returned payload contains all bytes following the
    /// function code of the response.
    ///
    /// An exception response fails with [`Error::ProtocolException`] and
    /// keeps the session connected. Transport failures and responses that
    /// do not belong to the request disconnect the session.
    pub fn exchange(&mut self, mut frame: Frame) -> Result<(Header, Bytes)> {
        if self.transport.is_none() {
            return Err(Error::SessionClosed);
        }
        if frame.encoded_len() > MAX_ADU_SIZE {
            return Err(Error::InvalidArgument(format!(
                "frame of {} bytes exceeds {MAX_ADU_SIZE} bytes",
                frame.encoded_len()
            )));
        }
        frame.transaction_id = self.next_transaction_id();
        let req_hdr = frame.header();
        let req_adu = codec::tcp::encode(&frame)?;
        log::debug!(
            "Exchange function {} with unit {} (transaction {})",
            req_hdr.function(),
            req_hdr.unit_id,
            req_hdr.transaction_id
        );
        log::trace!("Request {:02X?}", &req_adu[..]);

        let Some(transport) = self.transport.as_mut() else {
            return Err(Error::SessionClosed);
        };
        match transact(transport, &req_hdr, &req_adu) {
            Ok(res) => res,
            Err(err) => {
                self.teardown(&err);
                Err(err)
            }
        }
    }
}

/// Perform one write-then-read cycle.
///
/// The outer result carries failures after which the stream cannot be
/// used any longer. The inner result carries exception responses that
/// have been received completely.
fn transact<T: Read + Write>(
    transport: &mut T,
    req_hdr: &Header,
    req_adu: &[u8],
) -> Result<Result<(Header, Bytes)>> {
    transport.write_all(req_adu).map_err(write_error)?;
    transport.flush().map_err(write_error)?;

    let mut rdr = ResponseReader::new(transport);
    let mut hdr_buf = [0; HEADER_SIZE];
    rdr.read_exact(&mut hdr_buf)?;
    let rsp_hdr = codec::tcp::decode_header(&hdr_buf)?;
    verify_response_header(req_hdr, &rsp_hdr)?;

    if rsp_hdr.is_exception() {
        verify_response_length(&rsp_hdr, 1)?;
        let code = rdr.read_u8()?;
        let exception = ExceptionResponse {
            function: rsp_hdr.function(),
            exception: Exception::new(code),
        };
        log::debug!("Received exception response: {exception}");
        return Ok(Err(Error::ProtocolException(exception)));
    }

    let payload = match ResponseLayout::of(rsp_hdr.function()) {
        ResponseLayout::ByteCount => {
            let byte_count = rdr.read_u8()?;
            verify_response_length(&rsp_hdr, 1 + usize::from(byte_count))?;
            let mut payload = BytesMut::zeroed(1 + usize::from(byte_count));
            payload[0] = byte_count;
            rdr.read_exact(&mut payload[1..])?;
            payload
        }
        ResponseLayout::Fixed(len) => {
            verify_response_length(&rsp_hdr, len)?;
            let mut payload = BytesMut::zeroed(len);
            rdr.read_exact(&mut payload)?;
            payload
        }
        ResponseLayout::Header => {
            let len = rsp_hdr.payload_len();
            if len > MAX_PAYLOAD_SIZE {
                return Err(Error::UnexpectedResponse(format!(
                    "announced payload of {len} bytes exceeds {MAX_PAYLOAD_SIZE} bytes"
                )));
            }
            verify_response_length(&rsp_hdr, len)?;
            let mut payload = BytesMut::zeroed(len);
            rdr.read_exact(&mut payload)?;
            payload
        }
    };
    log::trace!("Response payload {:02X?}", &payload[..]);
    Ok(Ok((rsp_hdr, payload.freeze())))
}

/// Check that `rsp_hdr` answers the request described by `req_hdr`.
fn verify_response_header(req_hdr: &Header, rsp_hdr: &Header) -> Result<()> {
    if rsp_hdr.protocol_id != PROTOCOL_ID {
        return Err(Error::UnexpectedResponse(format!(
            "invalid protocol id: {}",
            rsp_hdr.protocol_id
        )));
    }
    if req_hdr.transaction_id != rsp_hdr.transaction_id
        || req_hdr.unit_id != rsp_hdr.unit_id
        || req_hdr.function() != rsp_hdr.function()
    {
        return Err(Error::UnexpectedResponse(format!(
            "Invalid response header: expected/request = {req_hdr:?}, actual/response = {rsp_hdr:?}"
        )));
    }
    Ok(())
}

/// Check that the header announces exactly the payload implied by the
/// function code, before waiting for it.
fn verify_response_length(rsp_hdr: &Header, payload_len: usize) -> Result<()> {
    if rsp_hdr.payload_len() != payload_len || rsp_hdr.length == 0 {
        return Err(Error::UnexpectedResponse(format!(
            "header announces {} bytes after the unit id, function {} implies {}",
            rsp_hdr.length,
            rsp_hdr.function(),
            payload_len + 1
        )));
    }
    Ok(())
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn write_error(err: io::Error) -> Error {
    if is_timeout(&err) {
        Error::Timeout
    } else {
        Error::ConnectionError(err)
    }
}

/// Reads a response while counting the received bytes.
struct ResponseReader<'a, R> {
    rdr: &'a mut R,
    received: usize,
}

impl<'a, R: Read> ResponseReader<'a, R> {
    fn new(rdr: &'a mut R) -> Self {
        Self { rdr, received: 0 }
    }

    fn truncated(&self, missing: usize) -> Error {
        Error::TruncatedFrame {
            expected: self.received + missing,
            received: self.received,
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.rdr.read(&mut buf[filled..]) {
                Ok(0) => return Err(self.truncated(buf.len() - filled)),
                Ok(n) => {
                    filled += n;
                    self.received += n;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) if is_timeout(&err) => {
                    if self.received == 0 {
                        return Err(Error::Timeout);
                    }
                    return Err(self.truncated(buf.len() - filled));
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::UnexpectedEof
                            | io::ErrorKind::ConnectionReset
                            | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    return Err(self.truncated(buf.len() - filled));
                }
                Err(err) => return Err(Error::ConnectionError(err)),
            }
        }
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }
}
