// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt as _};
use bytes::{BufMut as _, BytesMut};

use crate::{
    frame::{
        tcp::{Frame, UnitId, MAX_ADU_SIZE, MAX_PAYLOAD_SIZE},
        Address, FunctionCode, Request, Word,
    },
    Error, Result,
};

pub(crate) mod tcp;

/// Maximum number of registers per read request.
///
/// The response (byte count plus two bytes per register) must fit into
/// a single application data unit.
pub const MAX_READ_QUANTITY: usize = (MAX_PAYLOAD_SIZE - 1) / 2;

/// Maximum number of registers per write request.
///
/// Address, quantity and byte count precede the values.
pub const MAX_WRITE_QUANTITY: usize = (MAX_PAYLOAD_SIZE - 5) / 2;

/// Size of the echo in a write acknowledgement.
const WRITE_ECHO_SIZE: usize = 4;

#[allow(clippy::cast_possible_truncation)]
fn u16_len(len: usize) -> u16 {
    // Bounded by MAX_PAYLOAD_SIZE after validate_request.
    debug_assert!(len <= u16::MAX.into());
    len as u16
}

#[allow(clippy::cast_possible_truncation)]
fn u8_len(len: usize) -> u8 {
    debug_assert!(len <= u8::MAX.into());
    len as u8
}

/// How the body of a successful response is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseLayout {
    /// A byte count followed by that many data bytes.
    ByteCount,
    /// A fixed number of bytes.
    Fixed(usize),
    /// As many bytes as announced by the header.
    Header,
}

impl ResponseLayout {
    pub(crate) const fn of(function: FunctionCode) -> Self {
        match function {
            FunctionCode::ReadInputRegisters | FunctionCode::ReadHoldingRegisters => {
                Self::ByteCount
            }
            FunctionCode::WriteSingleCoil | FunctionCode::WriteMultipleRegisters => {
                Self::Fixed(WRITE_ECHO_SIZE)
            }
            FunctionCode::Custom(_) => Self::Header,
        }
    }
}

/// Check the request against the protocol limits.
pub(crate) fn validate_request(request: &Request<'_>) -> Result<()> {
    use crate::frame::Request::*;
    match request {
        ReadInputRegisters(_, quantity) | ReadHoldingRegisters(_, quantity) => {
            if *quantity == 0 || usize::from(*quantity) > MAX_READ_QUANTITY {
                return Err(Error::InvalidArgument(format!(
                    "invalid register quantity {quantity}, expected 1..={MAX_READ_QUANTITY}"
                )));
            }
        }
        WriteMultipleRegisters(_, words) => {
            if words.is_empty() {
                return Err(Error::InvalidArgument("no register values to write".into()));
            }
        }
        WriteSingleCoil(_, _) => {}
    }
    let size = request_payload_size(request);
    if size > MAX_PAYLOAD_SIZE {
        return Err(Error::InvalidArgument(format!(
            "request frame of {} bytes exceeds {MAX_ADU_SIZE} bytes",
            size + crate::frame::tcp::HEADER_SIZE,
        )));
    }
    Ok(())
}

fn request_payload_size(request: &Request<'_>) -> usize {
    use crate::frame::Request::*;
    match request {
        ReadInputRegisters(_, _) | ReadHoldingRegisters(_, _) | WriteSingleCoil(_, _) => 4,
        WriteMultipleRegisters(_, words) => 5 + words.len() * 2,
    }
}

/// Encode the payload of a request, i.e. everything after the function code.
fn encode_request_payload(buf: &mut BytesMut, request: &Request<'_>) {
    use crate::frame::Request::*;
    match request {
        ReadInputRegisters(address, quantity) | ReadHoldingRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        WriteSingleCoil(address, state) => {
            buf.put_u16(*address);
            buf.put_u16(bool_to_coil(*state));
        }
        WriteMultipleRegisters(address, words) => {
            buf.put_u16(*address);
            let len = words.len();
            buf.put_u16(u16_len(len));
            buf.put_u8(u8_len(len * 2));
            for w in words.as_ref() {
                buf.put_u16(*w);
            }
        }
    }
}

/// Build the frame for `request`, failing before any I/O if it would
/// violate the protocol limits.
pub(crate) fn request_frame(unit_id: UnitId, request: &Request<'_>) -> Result<Frame> {
    validate_request(request)?;
    let mut buf = BytesMut::with_capacity(request_payload_size(request));
    encode_request_payload(&mut buf, request);
    Ok(Frame::new(unit_id, request.function_code(), buf.freeze()))
}

/// Decode the echoed address and value/quantity of a write acknowledgement.
pub(crate) fn decode_write_echo(payload: &[u8]) -> Result<(Address, Word)> {
    if payload.len() != WRITE_ECHO_SIZE {
        return Err(Error::UnexpectedResponse(format!(
            "write acknowledgement of {} bytes, expected {WRITE_ECHO_SIZE}",
            payload.len()
        )));
    }
    let rdr = &mut Cursor::new(payload);
    let address = read_u16_be(rdr)?;
    let word = read_u16_be(rdr)?;
    Ok((address, word))
}

fn read_u16_be(rdr: &mut Cursor<&[u8]>) -> Result<u16> {
    rdr.read_u16::<BigEndian>()
        .map_err(|err| Error::UnexpectedResponse(err.to_string()))
}

pub(crate) const fn bool_to_coil(state: bool) -> u16 {
    if state {
        0xFF00
    } else {
        0x0000
    }
}

pub(crate) fn coil_to_bool(coil: u16) -> Result<bool> {
    match coil {
        0xFF00 => Ok(true),
        0x0000 => Ok(false),
        _ => Err(Error::UnexpectedResponse(format!(
            "invalid coil value: 0x{coil:04X}"
        ))),
    }
}
